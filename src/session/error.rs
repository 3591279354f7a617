use axum::http::StatusCode;
use thiserror::Error;

/// Failures surfaced by the auth client and the session controller.
///
/// Backend rejections keep the upstream status and message so the UI can show
/// them verbatim.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("{0}")]
    Validation(String),
    #[error("{message}")]
    OtpRequest { status: u16, message: String },
    #[error("{message}")]
    InvalidOtp { status: u16, message: String },
    #[error("{0}")]
    AccessDenied(String),
    #[error("{message}")]
    Refresh { status: u16, message: String },
    #[error("{0}")]
    Unauthenticated(String),
    #[error("Network error: {0}")]
    Network(String),
    #[error("Request failed ({status}): {message}")]
    Upstream { status: u16, message: String },
    #[error("Response error: {0}")]
    Protocol(String),
}

impl AuthError {
    /// Status used when the error crosses the HTTP facade.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::OtpRequest { status, .. } | Self::InvalidOtp { status, .. } => {
                client_status(*status)
            }
            Self::AccessDenied(_) => StatusCode::FORBIDDEN,
            Self::Refresh { .. } | Self::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            Self::Network(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Upstream { .. } | Self::Protocol(_) => StatusCode::BAD_GATEWAY,
        }
    }

    /// Transient failures; existing credentials must be kept.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Upstream { .. })
    }
}

// Backend 4xx statuses pass through; anything else becomes a plain 400.
fn client_status(status: u16) -> StatusCode {
    StatusCode::from_u16(status)
        .ok()
        .filter(StatusCode::is_client_error)
        .unwrap_or(StatusCode::BAD_REQUEST)
}
