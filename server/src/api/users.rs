//! User endpoints.

use super::Empty;
use crate::auth::AuthenticatedUser;
use crate::server::state::AppState;
use crate::types::UserRole;
use axum::extract::State;
use axum::Json;
use lodging_web::{ApiError, Envelope};
use serde::{Deserialize, Serialize};

/// Caller profile fields the frontend needs.
#[derive(Debug, Serialize)]
pub struct ProfileBody {
    role: UserRole,
    #[serde(rename = "recentSearchedCities")]
    recent_searched_cities: Vec<String>,
}

/// `GET /api/user`
pub async fn get_profile(
    AuthenticatedUser(user): AuthenticatedUser,
) -> Envelope<ProfileBody> {
    Envelope::ok(ProfileBody {
        role: user.role,
        recent_searched_cities: user.recent_searched_cities,
    })
}

/// Body for recording a searched city.
#[derive(Debug, Deserialize)]
pub struct RecentSearch {
    /// City the user just searched for
    #[serde(rename = "recentSearchedCity")]
    pub city: String,
}

/// `POST /api/user/store-recent-search`
pub async fn store_recent_search(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(body): Json<RecentSearch>,
) -> Result<Envelope<Empty>, ApiError> {
    state
        .users
        .push_recent_city(&user.id, body.city)
        .await
        .map_err(|e| ApiError::internal("Failed to store search").with_source(e.into()))?;

    Ok(Envelope::ok_with_message(Empty {}, "City added"))
}
