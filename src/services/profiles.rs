use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, DatabaseConnection, EntityTrait, QueryOrder, QuerySelect, Set,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::PageQuery;
use crate::auth::{AuthUser, Session};
use crate::config::AppConfig;
use crate::entities::{profile, Profile};
use crate::error::{AppError, AppResult};
use crate::validation;

#[derive(Debug, Serialize, ToSchema)]
pub struct ProfileView {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub payout_details: Option<String>,
    pub is_organization: bool,
    pub organization_name: Option<String>,
    pub organization_registration: Option<String>,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
}

impl From<profile::Model> for ProfileView {
    fn from(p: profile::Model) -> Self {
        ProfileView {
            id: p.id,
            full_name: p.full_name,
            email: p.email,
            phone: p.phone,
            payout_details: p.payout_details,
            is_organization: p.is_organization,
            organization_name: p.organization_name,
            organization_registration: p.organization_registration,
            is_admin: p.is_admin,
            created_at: p.created_at,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ProfileUpdate {
    pub full_name: String,
    pub phone: Option<String>,
    /// Bank or mobile-money details used for withdrawals.
    pub payout_details: Option<String>,
    #[serde(default)]
    pub is_organization: bool,
    pub organization_name: Option<String>,
    pub organization_registration: Option<String>,
}

/// Return the profile for `user`, creating it on first sight.
///
/// Accounts made directly at a hosted provider arrive here without a profile,
/// so session extraction calls this on every request.
pub async fn ensure_profile(
    db: &DatabaseConnection,
    config: &AppConfig,
    user: &AuthUser,
    full_name: Option<&str>,
) -> AppResult<profile::Model> {
    if let Some(existing) = Profile::find_by_id(user.id).one(db).await? {
        return Ok(existing);
    }

    let fallback_name = user.email.split('@').next().unwrap_or("member").to_string();
    let now = Utc::now();
    let created = profile::ActiveModel {
        id: Set(user.id),
        full_name: Set(full_name.map(str::to_string).unwrap_or(fallback_name)),
        email: Set(user.email.clone()),
        phone: Set(None),
        payout_details: Set(None),
        is_organization: Set(false),
        organization_name: Set(None),
        organization_registration: Set(None),
        is_admin: Set(config.is_admin_email(&user.email)),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await;

    match created {
        Ok(p) => {
            tracing::info!(user_id = %p.id, is_admin = p.is_admin, "profile created");
            Ok(p)
        }
        // Lost a race with a concurrent request for the same user.
        Err(err) => match Profile::find_by_id(user.id).one(db).await? {
            Some(p) => Ok(p),
            None => Err(err.into()),
        },
    }
}

pub async fn get(db: &DatabaseConnection, session: &Session) -> AppResult<ProfileView> {
    Profile::find_by_id(session.user_id)
        .one(db)
        .await?
        .map(ProfileView::from)
        .ok_or_else(|| AppError::NotFound("profile".into()))
}

#[tracing::instrument(skip(db, update), fields(user_id = %session.user_id))]
pub async fn update(
    db: &DatabaseConnection,
    session: &Session,
    update: ProfileUpdate,
) -> AppResult<ProfileView> {
    let full_name = validation::text("full_name", &update.full_name, 120)?;
    let phone = validation::optional_text("phone", update.phone.as_deref(), 40)?;
    let payout_details =
        validation::optional_text("payout_details", update.payout_details.as_deref(), 500)?;
    let organization_name =
        validation::optional_text("organization_name", update.organization_name.as_deref(), 200)?;
    let organization_registration = validation::optional_text(
        "organization_registration",
        update.organization_registration.as_deref(),
        100,
    )?;
    if update.is_organization && organization_name.is_none() {
        return Err(AppError::Validation(
            "organization_name is required for organization accounts".into(),
        ));
    }

    let current = Profile::find_by_id(session.user_id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("profile".into()))?;
    let mut active: profile::ActiveModel = current.into();
    active.full_name = Set(full_name);
    active.phone = Set(phone);
    active.payout_details = Set(payout_details);
    active.is_organization = Set(update.is_organization);
    // Individuals carry no organization fields.
    active.organization_name = Set(organization_name.filter(|_| update.is_organization));
    active.organization_registration =
        Set(organization_registration.filter(|_| update.is_organization));
    active.updated_at = Set(Utc::now());
    Ok(active.update(db).await?.into())
}

pub async fn list_all(
    db: &DatabaseConnection,
    session: &Session,
    page: &PageQuery,
) -> AppResult<Vec<ProfileView>> {
    session.require_admin()?;
    let rows = Profile::find()
        .order_by_desc(profile::Column::CreatedAt)
        .limit(page.limit())
        .offset(page.offset())
        .all(db)
        .await?;
    Ok(rows.into_iter().map(ProfileView::from).collect())
}

