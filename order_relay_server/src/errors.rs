use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Event conversion error. {0}")]
    EventConversionError(#[from] EventConversionError),
    #[error("Could not initialize the server. {0}")]
    InitializeError(String),
    #[error("The storage backend failed. {0}")]
    BackendError(String),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequestBody(_) | Self::EventConversionError(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .json(serde_json::json!({ "error": self.to_string() }))
    }
}

/// A boundary payload that cannot be turned into a pipeline event.
#[derive(Debug, Error)]
#[error("Could not convert the request into a pipeline event. {0}.")]
pub struct EventConversionError(pub String);
