use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use serde_json::json;
use url::Url;

use super::{AuthGrant, AuthUser, IdentityProvider};
use crate::error::{AppError, AppResult};

/// Client for a GoTrue-compatible hosted auth service (`/auth/v1/...`).
pub struct HostedIdentity {
    client: Client,
    base: Url,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct GoTrueUser {
    id: uuid::Uuid,
    email: Option<String>,
}

/// Sign-up returns either a full session or, when confirmation is on, the bare user.
#[derive(Debug, Deserialize)]
struct GoTrueSession {
    access_token: Option<String>,
    user: Option<GoTrueUser>,
    id: Option<uuid::Uuid>,
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GoTrueError {
    msg: Option<String>,
    error_description: Option<String>,
    message: Option<String>,
}

impl HostedIdentity {
    pub fn new(client: Client, base: Url, api_key: String) -> Self {
        Self { client, base, api_key }
    }

    fn endpoint(&self, path: &str) -> AppResult<Url> {
        self.base
            .join(path)
            .map_err(|e| AppError::Internal(format!("bad identity endpoint {path}: {e}")))
    }

    async fn fail(response: Response) -> AppError {
        let status = response.status();
        let body = response.json::<GoTrueError>().await.ok();
        let message = body
            .and_then(|b| b.msg.or(b.error_description).or(b.message))
            .unwrap_or_else(|| status.to_string());
        tracing::warn!(%status, %message, "identity provider rejected request");
        match status {
            StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                AppError::Unauthorized(message)
            }
            StatusCode::UNPROCESSABLE_ENTITY => AppError::Validation(message),
            _ => AppError::Identity(message),
        }
    }

    async fn password_call(&self, url: Url, email: &str, password: &str) -> AppResult<AuthGrant> {
        let response = self
            .client
            .post(url)
            .header("apikey", &self.api_key)
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(Self::fail(response).await);
        }

        let session: GoTrueSession = response.json().await?;
        let user = match (session.user, session.id) {
            (Some(u), _) => AuthUser {
                id: u.id,
                email: u.email.unwrap_or_else(|| email.to_string()),
            },
            (None, Some(id)) => AuthUser {
                id,
                email: session.email.unwrap_or_else(|| email.to_string()),
            },
            (None, None) => {
                return Err(AppError::Identity("response carried no user".into()));
            }
        };
        Ok(AuthGrant {
            access_token: session.access_token,
            user,
        })
    }
}

#[async_trait]
impl IdentityProvider for HostedIdentity {
    #[tracing::instrument(skip(self, password))]
    async fn sign_up(&self, email: &str, password: &str) -> AppResult<AuthGrant> {
        let url = self.endpoint("auth/v1/signup")?;
        self.password_call(url, email, password).await
    }

    #[tracing::instrument(skip(self, password))]
    async fn sign_in(&self, email: &str, password: &str) -> AppResult<AuthGrant> {
        let mut url = self.endpoint("auth/v1/token")?;
        url.query_pairs_mut().append_pair("grant_type", "password");
        self.password_call(url, email, password).await
    }

    async fn user_for_token(&self, token: &str) -> AppResult<AuthUser> {
        let response = self
            .client
            .get(self.endpoint("auth/v1/user")?)
            .header("apikey", &self.api_key)
            .bearer_auth(token)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(Self::fail(response).await);
        }
        let user: GoTrueUser = response.json().await?;
        Ok(AuthUser {
            id: user.id,
            email: user.email.unwrap_or_default(),
        })
    }

    async fn sign_out(&self, token: &str) -> AppResult<()> {
        let response = self
            .client
            .post(self.endpoint("auth/v1/logout")?)
            .header("apikey", &self.api_key)
            .bearer_auth(token)
            .send()
            .await?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(Self::fail(response).await)
        }
    }
}
