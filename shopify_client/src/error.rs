use thiserror::Error;

#[derive(Debug, Error)]
pub enum ShopifyApiError {
    #[error("Could not initialize the upstream client. {0}")]
    Initialization(String),
    #[error("The upstream request failed in transit. {0}")]
    Transport(String),
}
