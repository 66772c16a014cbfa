//! Backend traits for the relay pipeline.
//!
//! The write path (`RelayDatabase`) and the read path (`OrderManagement`) are
//! split so that the HTTP read API and the endpoint tests only need to mock
//! the surface they actually touch.

mod order_management;
mod relay_database;

pub use order_management::{OrderManagement, OrderPage, OrderWithShipments};
pub use relay_database::{
    ClaimOptions,
    IngestDisposition,
    IngestOutcome,
    InsertEventResult,
    OrderRelayError,
    RelayDatabase,
    INGEST_QUEUE,
    OUTBOUND_QUEUE,
};
