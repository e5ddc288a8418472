//! The in-band response envelope.
//!
//! Business outcomes — including business *failures* like "room is not
//! available" — travel as HTTP 200 with `{ "success": bool, "message"?: … }`
//! plus operation-specific fields flattened alongside. Clients branch on
//! `success` instead of the status code, which keeps retry semantics for the
//! transport layer only.

use axum::{
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Response envelope wrapping a payload `T`.
///
/// `T` is flattened into the envelope, so
/// `Envelope::ok(BookingBody { booking })` serializes as
/// `{"success":true,"booking":{…}}`.
#[derive(Debug, Clone, Serialize)]
pub struct Envelope<T: Serialize> {
    /// Whether the operation succeeded.
    pub success: bool,
    /// Human-readable message, present on failures and some successes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Operation-specific payload, flattened into the envelope.
    #[serde(flatten)]
    pub body: Option<T>,
}

impl<T: Serialize> Envelope<T> {
    /// Successful outcome with a payload.
    #[must_use]
    pub const fn ok(body: T) -> Self {
        Self {
            success: true,
            message: None,
            body: Some(body),
        }
    }

    /// Successful outcome with a payload and a message.
    #[must_use]
    pub fn ok_with_message(body: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            body: Some(body),
        }
    }

    /// Business failure, reported in-band.
    #[must_use]
    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            body: None,
        }
    }
}

impl<T: Serialize> IntoResponse for Envelope<T> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct Body {
        value: u32,
    }

    #[test]
    fn ok_flattens_body() {
        let json = serde_json::to_value(Envelope::ok(Body { value: 7 })).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["value"], 7);
        assert!(json.get("message").is_none());
    }

    #[test]
    fn fail_carries_message_only() {
        let json = serde_json::to_value(Envelope::<Body>::fail("Room is not available")).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["message"], "Room is not available");
        assert!(json.get("value").is_none());
    }
}
