mod ingest_api;
mod query_api;

pub use ingest_api::IngestApi;
pub use query_api::OrderQueryApi;
