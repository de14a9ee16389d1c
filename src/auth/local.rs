use std::collections::HashMap;

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use uuid::Uuid;

use super::{AuthGrant, AuthUser, IdentityProvider};
use crate::entities::{user, User};
use crate::error::{AppError, AppResult};

/// Identity provider for single-node deployments and tests.
///
/// Credentials live in the `users` table; issued tokens live in memory and are
/// lost on restart.
pub struct LocalIdentity {
    db: DatabaseConnection,
    sessions: RwLock<HashMap<String, AuthUser>>,
}

impl LocalIdentity {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            db,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    fn issue(&self, user: AuthUser) -> AuthGrant {
        let token = format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple());
        self.sessions.write().insert(token.clone(), user.clone());
        AuthGrant {
            access_token: Some(token),
            user,
        }
    }
}

/// Argon2id PHC string (`$argon2id$v=19$...`) with a fresh random salt.
fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(format!("password hashing failed: {e}")))
}

fn verify_password(stored: &str, password: &str) -> bool {
    match PasswordHash::new(stored) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

/// Argon2 is deliberately slow; keep it off the async worker threads.
async fn blocking<T, F>(work: F) -> AppResult<T>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| AppError::Internal(format!("password task failed: {e}")))
}

#[async_trait]
impl IdentityProvider for LocalIdentity {
    #[tracing::instrument(skip(self, password))]
    async fn sign_up(&self, email: &str, password: &str) -> AppResult<AuthGrant> {
        let email = email.trim().to_lowercase();
        let existing = User::find()
            .filter(user::Column::Email.eq(email.as_str()))
            .one(&self.db)
            .await?;
        if existing.is_some() {
            return Err(AppError::Conflict("an account with this email already exists".into()));
        }

        let password = password.to_owned();
        let password_hash = blocking(move || hash_password(&password)).await??;
        let created = user::ActiveModel {
            id: Set(Uuid::new_v4()),
            email: Set(email),
            password_hash: Set(password_hash),
            created_at: Set(Utc::now()),
        }
        .insert(&self.db)
        .await?;

        tracing::info!(user_id = %created.id, "local account created");
        Ok(self.issue(AuthUser {
            id: created.id,
            email: created.email,
        }))
    }

    #[tracing::instrument(skip(self, password))]
    async fn sign_in(&self, email: &str, password: &str) -> AppResult<AuthGrant> {
        let email = email.trim().to_lowercase();
        let found = User::find()
            .filter(user::Column::Email.eq(email.as_str()))
            .one(&self.db)
            .await?;
        let Some(found) = found else {
            tracing::warn!("sign-in for unknown email");
            return Err(AppError::Unauthorized("invalid email or password".into()));
        };

        let stored = found.password_hash.clone();
        let password = password.to_owned();
        if !blocking(move || verify_password(&stored, &password)).await? {
            tracing::warn!(user_id = %found.id, "rejected sign-in attempt");
            return Err(AppError::Unauthorized("invalid email or password".into()));
        }
        Ok(self.issue(AuthUser {
            id: found.id,
            email: found.email,
        }))
    }

    async fn user_for_token(&self, token: &str) -> AppResult<AuthUser> {
        self.sessions
            .read()
            .get(token)
            .cloned()
            .ok_or_else(|| AppError::Unauthorized("session expired or unknown".into()))
    }

    async fn sign_out(&self, token: &str) -> AppResult<()> {
        self.sessions.write().remove(token);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_hash_is_argon2id_phc() {
        let stored = hash_password("correct horse").unwrap();
        assert!(stored.starts_with("$argon2id$"));
        assert!(verify_password(&stored, "correct horse"));
        assert!(!verify_password(&stored, "correct horse "));
        assert!(!verify_password("garbage", "correct horse"));
    }

    #[test]
    fn same_password_gets_distinct_salts() {
        let first = hash_password("correct horse").unwrap();
        let second = hash_password("correct horse").unwrap();
        assert_ne!(first, second);
        assert!(verify_password(&second, "correct horse"));
    }
}
