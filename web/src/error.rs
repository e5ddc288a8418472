//! Error type for HTTP handlers.
//!
//! Business failures are reported in-band through the response envelope (see
//! [`crate::envelope`]); `ApiError` covers everything that must surface as a
//! non-2xx status instead: authentication failures, webhook signature
//! rejections, and unexpected internal errors.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::fmt;

/// Error type for handlers that need a non-2xx response.
///
/// Implements Axum's `IntoResponse`, so handlers can return
/// `Result<Json<T>, ApiError>` and use `?` freely.
///
/// # Examples
///
/// ```ignore
/// async fn handler() -> Result<Json<Data>, ApiError> {
///     let user = load_user(id).await
///         .map_err(|e| ApiError::internal("user lookup failed").with_source(e.into()))?;
///     Ok(Json(user))
/// }
/// ```
#[derive(Debug)]
pub struct ApiError {
    /// HTTP status code
    status: StatusCode,
    /// User-facing message
    message: String,
    /// Internal error (logged, never exposed to the client)
    source: Option<anyhow::Error>,
}

impl ApiError {
    /// Create a new error with an explicit status.
    #[must_use]
    pub const fn new(status: StatusCode, message: String) -> Self {
        Self {
            status,
            message,
            source: None,
        }
    }

    /// Attach a source error for logging.
    #[must_use]
    pub fn with_source(mut self, source: anyhow::Error) -> Self {
        self.source = Some(source);
        self
    }

    /// 400 Bad Request — used for webhook signature failures so the provider
    /// sees a client error and retries with a corrected request.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message.into())
    }

    /// 401 Unauthorized — missing or unknown caller identity.
    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message.into())
    }

    /// 500 Internal Server Error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message.into())
    }

    /// The HTTP status this error renders as.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.status, self.message)
    }
}

impl std::error::Error for ApiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Error response body. Mirrors the envelope shape so clients can treat
/// every body uniformly.
#[derive(Debug, Serialize)]
struct ErrorBody {
    /// Always `false` for errors.
    success: bool,
    /// Human-readable message.
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            if let Some(source) = &self.source {
                tracing::error!(
                    status = %self.status,
                    message = %self.message,
                    error = %source,
                    "request failed"
                );
            } else {
                tracing::error!(status = %self.status, message = %self.message, "request failed");
            }
        }

        let body = ErrorBody {
            success: false,
            message: self.message,
        };

        (self.status, Json(body)).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self::internal("An internal error occurred").with_source(err)
    }
}
