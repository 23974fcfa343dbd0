use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::warn;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Missing X-Code")]
    MissingCode,

    #[error("Missing refresh token")]
    MissingRefreshToken,

    #[error("Not authorised")]
    Unauthorized,

    #[error("Method Not Allowed")]
    MethodNotAllowed,

    #[error("Forbidden file type")]
    ForbiddenFileType,

    #[error("Token endpoint rejected grant: {0}")]
    AuthenticationFailed(String),

    #[error("Token lifetime of {0}s cannot back a session cookie")]
    InvalidExpiry(i64),

    #[error("{0}")]
    BadRequest(String),

    #[error("Upstream request failed: {0}")]
    Upstream(#[from] reqwest::Error),

    #[error("Proxy error: {0}")]
    ProxyError(String),

    #[error("Transform failed: {0}")]
    Transform(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::MissingCode
            | AppError::AuthenticationFailed(_)
            | AppError::InvalidExpiry(_)
            | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::MissingRefreshToken | AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            AppError::ForbiddenFileType => StatusCode::FORBIDDEN,
            AppError::ProxyError(_) => StatusCode::BAD_GATEWAY,
            AppError::Upstream(_) | AppError::Transform(_) | AppError::Configuration(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Message shown to the client. Never carries upstream detail.
    pub fn public_message(&self) -> String {
        match self {
            AppError::MissingCode => "Missing X-Code".to_string(),
            AppError::MissingRefreshToken => "Unauthorised".to_string(),
            AppError::Unauthorized => "Not authorised".to_string(),
            AppError::MethodNotAllowed => "Method Not Allowed".to_string(),
            AppError::ForbiddenFileType => "Server Error".to_string(),
            AppError::AuthenticationFailed(_) => "Error Authenticating".to_string(),
            AppError::InvalidExpiry(_) => "Cookie cannot be set".to_string(),
            AppError::BadRequest(msg) => msg.clone(),
            AppError::Upstream(_) => "Error retrieving authentication".to_string(),
            AppError::ProxyError(_) => "Proxy error".to_string(),
            AppError::Transform(_) | AppError::Configuration(_) => {
                "internal server error".to_string()
            }
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        warn!("Rejected request body: {}", rejection.body_text());
        AppError::BadRequest("Invalid request body".to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": self.public_message()
        }));

        (self.status(), body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
