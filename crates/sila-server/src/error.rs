use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use sila_inventory::InventoryError;
use sila_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type ServerResult<T> = Result<T, ServerError>;

/// Failure of a single HTTP request.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The addressed entity does not exist. Rendered with an empty body.
    #[error("not found")]
    NotFound,

    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    Inventory(#[from] InventoryError),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Inventory(err) => match err {
                InventoryError::InvalidFilterCombination { .. } | InventoryError::Type(_) => {
                    StatusCode::BAD_REQUEST
                }
                InventoryError::Hierarchy(_) => StatusCode::CONFLICT,
                InventoryError::Store(StoreError::Unavailable(_)) => StatusCode::SERVICE_UNAVAILABLE,
                InventoryError::Store(StoreError::Timeout(_)) => StatusCode::GATEWAY_TIMEOUT,
                InventoryError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            Self::NotFound => status.into_response(),
            other => {
                if status.is_server_error() {
                    tracing::error!(error = %other, "request failed");
                } else {
                    tracing::debug!(error = %other, "request rejected");
                }
                (status, other.to_string()).into_response()
            }
        }
    }
}
