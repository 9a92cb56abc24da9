use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    /// The request body could not be parsed; carries the parser message.
    InvalidBody(String),
    Unauthorized,
    NotFound(&'static str),
    /// Carries the client-facing message only. The cause is logged where it happens.
    UnexpectedError(String),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl ErrorBody {
    fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            Self::BadRequest(e) => (StatusCode::BAD_REQUEST, ErrorBody::new(e)),
            Self::InvalidBody(details) => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    error: "Invalid request body".to_string(),
                    details: Some(details),
                },
            ),
            Self::Unauthorized => (StatusCode::UNAUTHORIZED, ErrorBody::new("Unauthorized")),
            Self::NotFound(message) => (StatusCode::NOT_FOUND, ErrorBody::new(message)),
            Self::UnexpectedError(message) => {
                (StatusCode::INTERNAL_SERVER_ERROR, ErrorBody::new(message))
            }
        };
        (status, Json(body)).into_response()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("a row with id {0} already exists")]
    Duplicate(String),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}
