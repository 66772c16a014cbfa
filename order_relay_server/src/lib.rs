//! # Order Relay server
//!
//! This crate hosts the HTTP surface and the long-running workers of the
//! order relay. It is responsible for:
//! * Listening for incoming webhook requests from the merchant platform and
//!   status callbacks from the courier network, and recording them in the
//!   engine's event inbox.
//! * Running the ingest consumer that turns queued events into canonical
//!   order state.
//! * Running the outbound dispatcher that pushes merchant-facing changes
//!   back upstream under a client-side rate limit.
//! * Streaming committed order changes to dashboards over SSE.
//!
//! ## Configuration
//! The server is configured via environment variables. See [`config`] for
//! the full list.
//!
//! ## Routes
//! * `GET /health`: liveness check.
//! * `POST /webhooks/shopify/orders`: merchant order webhooks.
//! * `POST /events/courier/status_update`: courier status callbacks.
//! * `GET /orders`, `GET /orders/{id}`: the read API.
//! * `GET /stream/shipments`: the SSE change feed.

pub mod config;
pub mod data_objects;
pub mod errors;
pub mod ingest_worker;
pub mod integrations;
pub mod outbound_worker;
pub mod routes;
pub mod server;

#[cfg(test)]
mod endpoint_tests;
