//! Request authentication.
//!
//! The identity provider terminates the actual session; by the time a
//! request reaches this service a gateway has already validated it and
//! forwards the subject in the `X-User-Id` header. The extractor resolves
//! that id against the user store so handlers receive a full profile, and
//! rejects with 401 when the header is missing or the user is unknown.

use crate::server::state::AppState;
use crate::types::{User, UserId};
use axum::{async_trait, extract::FromRef, extract::FromRequestParts, http::request::Parts};
use lodging_web::ApiError;

/// Header carrying the gateway-verified subject.
pub const USER_ID_HEADER: &str = "X-User-Id";

/// The resolved caller.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub User);

impl AuthenticatedUser {
    /// The caller's id.
    #[must_use]
    pub const fn id(&self) -> &UserId {
        &self.0.id
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);

        let id = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .filter(|s| !s.is_empty())
            .map(UserId::from)
            .ok_or_else(|| ApiError::unauthorized("not authenticated"))?;

        let user = state
            .users
            .get(&id)
            .await
            .map_err(|e| ApiError::internal("authentication lookup failed").with_source(e.into()))?
            .ok_or_else(|| ApiError::unauthorized("not authenticated"))?;

        Ok(Self(user))
    }
}
