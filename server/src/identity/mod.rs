//! Identity provider sync.
//!
//! User records are owned by an external identity provider and mirrored
//! locally through signed webhooks. The signature scheme differs from the
//! payment provider's: the provider sends `svix-id`, `svix-timestamp`, and
//! `svix-signature` headers, signs `"{id}.{timestamp}.{raw body}"` with the
//! base64 key behind the `whsec_` prefix, and encodes digests in base64.

pub mod webhook;

pub use webhook::{IdentityWebhook, WebhookHeaders};

use crate::types::{User, UserId, UserRole};
use serde::Deserialize;

/// Identity events this service mirrors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityEvent {
    /// A user signed up; create the local record.
    UserCreated(User),
    /// Profile fields changed; update the local record.
    UserUpdated(User),
    /// The account was removed; delete the local record.
    UserDeleted(UserId),
    /// Any other event type; acknowledged without side effects.
    Unhandled(String),
}

#[derive(Debug, Deserialize)]
struct RawEvent {
    #[serde(rename = "type")]
    event_type: String,
    data: RawUser,
}

#[derive(Debug, Deserialize)]
struct RawUser {
    id: String,
    #[serde(default)]
    first_name: Option<String>,
    #[serde(default)]
    last_name: Option<String>,
    #[serde(default)]
    email_addresses: Vec<RawEmail>,
    #[serde(default)]
    image_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawEmail {
    email_address: String,
}

impl RawUser {
    fn primary_email(&self) -> String {
        self.email_addresses
            .first()
            .map(|e| e.email_address.clone())
            .unwrap_or_default()
    }

    /// Display name: joined name parts, falling back to the email
    /// local-part when the profile has no name at all.
    fn username(&self) -> String {
        let joined = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        if !joined.is_empty() {
            return joined;
        }
        let email = self.primary_email();
        email
            .split_once('@')
            .map_or(email.clone(), |(local, _)| local.to_string())
    }

    fn into_user(self) -> User {
        let username = self.username();
        let email = self.primary_email();
        User {
            id: UserId::new(self.id),
            username,
            email,
            image: self.image_url.unwrap_or_default(),
            role: UserRole::User,
            recent_searched_cities: Vec::new(),
        }
    }
}

/// Parse a verified payload into an [`IdentityEvent`].
///
/// # Errors
///
/// Returns the serde error message when the body is not a well-formed event.
pub fn parse_event(payload: &[u8]) -> Result<IdentityEvent, String> {
    let raw: RawEvent = serde_json::from_slice(payload).map_err(|e| e.to_string())?;
    Ok(match raw.event_type.as_str() {
        "user.created" => IdentityEvent::UserCreated(raw.data.into_user()),
        "user.updated" => IdentityEvent::UserUpdated(raw.data.into_user()),
        "user.deleted" => IdentityEvent::UserDeleted(UserId::new(raw.data.id)),
        _ => IdentityEvent::Unhandled(raw.event_type),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn created_event_assembles_username_from_name_parts() {
        let payload = br#"{
            "type": "user.created",
            "data": {
                "id": "user_1",
                "first_name": "Ada",
                "last_name": "Lovelace",
                "email_addresses": [{"email_address": "ada@example.com"}],
                "image_url": "https://img.example.com/ada.png"
            }
        }"#;

        let event = parse_event(payload).unwrap();
        let IdentityEvent::UserCreated(user) = event else {
            panic!("expected UserCreated");
        };
        assert_eq!(user.id.as_str(), "user_1");
        assert_eq!(user.username, "Ada Lovelace");
        assert_eq!(user.email, "ada@example.com");
        assert_eq!(user.role, UserRole::User);
        assert!(user.recent_searched_cities.is_empty());
    }

    #[test]
    fn missing_name_falls_back_to_email_local_part() {
        let payload = br#"{
            "type": "user.updated",
            "data": {
                "id": "user_2",
                "email_addresses": [{"email_address": "grace.hopper@example.com"}]
            }
        }"#;

        let IdentityEvent::UserUpdated(user) = parse_event(payload).unwrap() else {
            panic!("expected UserUpdated");
        };
        assert_eq!(user.username, "grace.hopper");
    }

    #[test]
    fn deleted_event_carries_only_the_id() {
        let payload = br#"{"type": "user.deleted", "data": {"id": "user_3"}}"#;
        assert_eq!(
            parse_event(payload).unwrap(),
            IdentityEvent::UserDeleted(UserId::from("user_3"))
        );
    }

    #[test]
    fn unknown_event_types_are_unhandled() {
        let payload = br#"{"type": "session.created", "data": {"id": "sess_1"}}"#;
        assert_eq!(
            parse_event(payload).unwrap(),
            IdentityEvent::Unhandled("session.created".to_string())
        );
    }
}
