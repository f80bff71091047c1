use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde_json::json;
use thiserror::Error;

/// Every way a proxy request can fail. Each variant maps to its own status.
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("host not allowed: {0}")]
    HostNotAllowed(String),

    #[error("address {address} of {host} is not public")]
    BlockedAddress { host: String, address: String },

    #[error("more than {0} redirects")]
    TooManyRedirects(usize),

    #[error("payload exceeds {0} bytes")]
    PayloadTooLarge(u64),

    #[error("unsupported content type: {0}")]
    UnsupportedContent(String),

    #[error("upstream fetch failed: {0}")]
    Upstream(String),

    #[error("transcode failed: {0}")]
    Transcode(String),
}

impl ProxyError {
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ProxyError::HostNotAllowed(_) => StatusCode::FORBIDDEN,
            ProxyError::BlockedAddress { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            ProxyError::TooManyRedirects(_) => StatusCode::LOOP_DETECTED,
            ProxyError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ProxyError::UnsupportedContent(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ProxyError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ProxyError::Transcode(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable code, also used as the rejection metric label.
    pub fn code(&self) -> &'static str {
        match self {
            ProxyError::InvalidInput(_) => "invalid_input",
            ProxyError::HostNotAllowed(_) => "host_not_allowed",
            ProxyError::BlockedAddress { .. } => "blocked_address",
            ProxyError::TooManyRedirects(_) => "too_many_redirects",
            ProxyError::PayloadTooLarge(_) => "payload_too_large",
            ProxyError::UnsupportedContent(_) => "unsupported_content",
            ProxyError::Upstream(_) => "upstream",
            ProxyError::Transcode(_) => "transcode",
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let body = json!({
            "error": self.to_string(),
            "code": self.code(),
        });
        (self.status(), Json(body)).into_response()
    }
}
