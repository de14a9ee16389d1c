use axum::{extract::State, Json};

use crate::auth::Session;
use crate::error::AppResult;
use crate::services::profiles::{self, ProfileUpdate, ProfileView};
use crate::AppState;

#[utoipa::path(
    get,
    path = "/profile",
    responses((status = 200, description = "Current profile", body = ProfileView)),
    security(("bearer_auth" = [])),
    tag = "profile"
)]
pub async fn get_profile(
    State(state): State<AppState>,
    session: Session,
) -> AppResult<Json<ProfileView>> {
    Ok(Json(profiles::get(&state.db, &session).await?))
}

/// Replace contact, payout and organization details
#[utoipa::path(
    put,
    path = "/profile",
    request_body = ProfileUpdate,
    responses(
        (status = 200, description = "Profile updated", body = ProfileView),
        (status = 422, description = "Invalid profile fields")
    ),
    security(("bearer_auth" = [])),
    tag = "profile"
)]
pub async fn update_profile(
    State(state): State<AppState>,
    session: Session,
    Json(update): Json<ProfileUpdate>,
) -> AppResult<Json<ProfileView>> {
    Ok(Json(profiles::update(&state.db, &session, update).await?))
}
