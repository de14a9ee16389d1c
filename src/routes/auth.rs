use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::auth::{Session, SessionResponse};
use crate::error::AppResult;
use crate::services::profiles::{self, ProfileView};
use crate::{validation, AppState};

#[derive(Debug, Deserialize, ToSchema)]
pub struct SignUpRequest {
    pub email: String,
    /// At least 8 characters.
    pub password: String,
    pub full_name: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

/// Create an account and its profile
#[utoipa::path(
    post,
    path = "/auth/signup",
    request_body = SignUpRequest,
    responses(
        (status = 201, description = "Account created", body = SessionResponse),
        (status = 409, description = "Email already registered"),
        (status = 422, description = "Invalid email, password or name")
    ),
    tag = "auth"
)]
pub async fn sign_up(
    State(state): State<AppState>,
    Json(request): Json<SignUpRequest>,
) -> AppResult<(StatusCode, Json<SessionResponse>)> {
    let email = validation::email(&request.email)?;
    validation::password(&request.password)?;
    let full_name = validation::text("full_name", &request.full_name, 120)?;

    let grant = state.identity.sign_up(&email, &request.password).await?;
    profiles::ensure_profile(&state.db, &state.config, &grant.user, Some(&full_name)).await?;
    Ok((StatusCode::CREATED, Json(grant.into())))
}

/// Exchange email and password for a bearer token
#[utoipa::path(
    post,
    path = "/auth/signin",
    request_body = SignInRequest,
    responses(
        (status = 200, description = "Signed in", body = SessionResponse),
        (status = 401, description = "Invalid credentials")
    ),
    tag = "auth"
)]
pub async fn sign_in(
    State(state): State<AppState>,
    Json(request): Json<SignInRequest>,
) -> AppResult<Json<SessionResponse>> {
    let grant = state.identity.sign_in(&request.email, &request.password).await?;
    Ok(Json(grant.into()))
}

/// Revoke the current bearer token
#[utoipa::path(
    post,
    path = "/auth/signout",
    responses((status = 204, description = "Signed out")),
    security(("bearer_auth" = [])),
    tag = "auth"
)]
pub async fn sign_out(State(state): State<AppState>, session: Session) -> AppResult<StatusCode> {
    state.identity.sign_out(&session.token).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Profile of the signed-in user
#[utoipa::path(
    get,
    path = "/auth/me",
    responses(
        (status = 200, description = "Current profile", body = ProfileView),
        (status = 401, description = "Missing or invalid token")
    ),
    security(("bearer_auth" = [])),
    tag = "auth"
)]
pub async fn me(State(state): State<AppState>, session: Session) -> AppResult<Json<ProfileView>> {
    Ok(Json(profiles::get(&state.db, &session).await?))
}
