//! Sessions and the identity provider seam.
//!
//! Handlers never look at ambient user state: every authenticated route takes
//! a [`Session`] extracted from the `Authorization: Bearer` header and passes
//! it explicitly into the data-access call.

pub mod hosted;
pub mod local;

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::services::profiles;
use crate::AppState;

pub use hosted::HostedIdentity;
pub use local::LocalIdentity;

/// A user as the identity provider knows it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
}

/// Result of a successful sign-up or sign-in.
#[derive(Debug, Clone)]
pub struct AuthGrant {
    /// Absent when the provider wants the address confirmed first.
    pub access_token: Option<String>,
    pub user: AuthUser,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_up(&self, email: &str, password: &str) -> AppResult<AuthGrant>;
    async fn sign_in(&self, email: &str, password: &str) -> AppResult<AuthGrant>;
    async fn user_for_token(&self, token: &str) -> AppResult<AuthUser>;
    async fn sign_out(&self, token: &str) -> AppResult<()>;
}

/// The caller of an authenticated request.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: Uuid,
    pub email: String,
    pub is_admin: bool,
    pub token: String,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("user_id", &self.user_id)
            .field("email", &self.email)
            .field("is_admin", &self.is_admin)
            .field("token", &"[REDACTED]")
            .finish()
    }
}

impl Session {
    pub fn require_admin(&self) -> AppResult<()> {
        if self.is_admin {
            Ok(())
        } else {
            Err(AppError::Forbidden("administrator role required".into()))
        }
    }

    /// Owners act on their own records, admins on anyone's.
    pub fn require_owner_or_admin(&self, owner_id: Uuid) -> AppResult<()> {
        if self.is_admin || self.user_id == owner_id {
            Ok(())
        } else {
            Err(AppError::Forbidden("only the campaign owner can do this".into()))
        }
    }
}

/// Session of a caller who may also be anonymous (donations).
#[derive(Debug, Clone)]
pub struct MaybeSession(pub Option<Session>);

/// Response body for sign-up and sign-in.
#[derive(Debug, Serialize, ToSchema)]
pub struct SessionResponse {
    pub user_id: Uuid,
    pub email: String,
    /// Bearer token for subsequent requests; null while email confirmation is pending.
    pub access_token: Option<String>,
}

impl From<AuthGrant> for SessionResponse {
    fn from(grant: AuthGrant) -> Self {
        SessionResponse {
            user_id: grant.user.id,
            email: grant.user.email,
            access_token: grant.access_token,
        }
    }
}

fn bearer_token(parts: &Parts) -> Option<AppResult<&str>> {
    let value = parts.headers.get(header::AUTHORIZATION)?;
    let token = value
        .to_str()
        .ok()
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::Unauthorized("malformed Authorization header".into()));
    Some(token)
}

async fn resolve(state: &AppState, token: &str) -> AppResult<Session> {
    let user = state.identity.user_for_token(token).await?;
    let profile = profiles::ensure_profile(&state.db, &state.config, &user, None).await?;
    Ok(Session {
        user_id: user.id,
        email: user.email,
        is_admin: profile.is_admin,
        token: token.to_string(),
    })
}

impl FromRequestParts<AppState> for Session {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)
            .ok_or_else(|| AppError::Unauthorized("missing bearer token".into()))??;
        resolve(state, token).await
    }
}

impl FromRequestParts<AppState> for MaybeSession {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        match bearer_token(parts) {
            None => Ok(MaybeSession(None)),
            Some(token) => resolve(state, token?).await.map(|s| MaybeSession(Some(s))),
        }
    }
}
