use chrono::{DateTime, Utc};
use sea_orm::sea_query::{Expr, Func, LikeExpr};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use super::{notifications, PageQuery};
use crate::auth::Session;
use crate::entities::{campaign, Campaign, Moderation};
use crate::error::{AppError, AppResult};
use crate::ledger::{CampaignProgress, CampaignStatus};
use crate::storage::{self, ObjectStore};
use crate::validation;

const TITLE_MAX: usize = 120;
const DESCRIPTION_MAX: usize = 10_000;
const CATEGORY_MAX: usize = 60;

#[derive(Debug, Serialize, ToSchema)]
pub struct CampaignView {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub category: String,
    pub image_url: Option<String>,
    pub creator_id: Uuid,
    pub end_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub moderation: Moderation,
    pub progress: CampaignProgress,
}

impl CampaignView {
    pub fn new(model: campaign::Model, now: DateTime<Utc>) -> Self {
        let progress = CampaignProgress::derive(&model, now);
        CampaignView {
            id: model.id,
            title: model.title,
            description: model.description,
            category: model.category,
            image_url: model.image_url,
            creator_id: model.creator_id,
            end_date: model.end_date,
            created_at: model.created_at,
            moderation: model.moderation,
            progress,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct NewCampaign {
    pub title: String,
    pub description: String,
    pub category: String,
    /// Target in minor currency units.
    pub goal_amount: i64,
    pub end_date: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct CampaignUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub end_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CampaignQuery {
    /// Exact category match.
    #[param(required = false)]
    pub category: Option<String>,
    /// Case-insensitive substring of the title. `%` and `_` match literally.
    #[param(required = false)]
    pub search: Option<String>,
    /// Derived status: active, funded or completed.
    #[param(required = false)]
    pub status: Option<String>,
    #[param(required = false)]
    pub limit: Option<u64>,
    #[param(required = false)]
    pub offset: Option<u64>,
}

impl CampaignQuery {
    fn page(&self) -> PageQuery {
        PageQuery {
            limit: self.limit,
            offset: self.offset,
        }
    }
}

/// SQL form of [`crate::ledger::campaign_status`], so status filters paginate correctly.
fn status_condition(status: CampaignStatus, now: DateTime<Utc>) -> Condition {
    let reached_goal =
        Expr::col(campaign::Column::CurrentAmount).gte(Expr::col(campaign::Column::GoalAmount));
    let below_goal =
        Expr::col(campaign::Column::CurrentAmount).lt(Expr::col(campaign::Column::GoalAmount));
    match status {
        CampaignStatus::Completed => Condition::all().add(campaign::Column::EndDate.lt(now)),
        CampaignStatus::Funded => Condition::all()
            .add(campaign::Column::EndDate.gte(now))
            .add(reached_goal),
        CampaignStatus::Active => Condition::all()
            .add(campaign::Column::EndDate.gte(now))
            .add(below_goal),
    }
}

pub async fn load(db: &DatabaseConnection, id: Uuid) -> AppResult<campaign::Model> {
    Campaign::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("campaign {id}")))
}

/// Campaign as seen by `viewer`; hidden campaigns only exist for their owner and admins.
pub async fn load_visible(
    db: &DatabaseConnection,
    id: Uuid,
    viewer: Option<&Session>,
) -> AppResult<campaign::Model> {
    let model = load(db, id).await?;
    let privileged = viewer.is_some_and(|s| s.is_admin || s.user_id == model.creator_id);
    if model.moderation == Moderation::Hidden && !privileged {
        return Err(AppError::NotFound(format!("campaign {id}")));
    }
    Ok(model)
}

pub async fn get(
    db: &DatabaseConnection,
    id: Uuid,
    viewer: Option<&Session>,
    now: DateTime<Utc>,
) -> AppResult<CampaignView> {
    Ok(CampaignView::new(load_visible(db, id, viewer).await?, now))
}

const LIKE_ESCAPE: char = '|';

/// Lowercased `%term%` with LIKE wildcards in the term escaped.
fn like_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.to_lowercase().chars() {
        if matches!(c, '%' | '_' | LIKE_ESCAPE) {
            pattern.push(LIKE_ESCAPE);
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

pub async fn list_public(
    db: &DatabaseConnection,
    query: &CampaignQuery,
    now: DateTime<Utc>,
) -> AppResult<Vec<CampaignView>> {
    let mut select = Campaign::find().filter(campaign::Column::Moderation.eq(Moderation::Approved));

    if let Some(category) = query.category.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
        select = select.filter(campaign::Column::Category.eq(category));
    }
    if let Some(search) = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let title = Expr::expr(Func::lower(Expr::col(campaign::Column::Title)));
        select = select.filter(title.like(LikeExpr::new(like_pattern(search)).escape(LIKE_ESCAPE)));
    }
    if let Some(raw) = query.status.as_deref() {
        let status = CampaignStatus::parse(raw)
            .ok_or_else(|| AppError::Validation(format!("unknown campaign status {raw:?}")))?;
        select = select.filter(status_condition(status, now));
    }

    let page = query.page();
    let rows = select
        .order_by_desc(campaign::Column::CreatedAt)
        .limit(page.limit())
        .offset(page.offset())
        .all(db)
        .await?;
    Ok(rows.into_iter().map(|m| CampaignView::new(m, now)).collect())
}

#[tracing::instrument(skip(db, input), fields(user_id = %session.user_id))]
pub async fn create(
    db: &DatabaseConnection,
    session: &Session,
    input: NewCampaign,
    now: DateTime<Utc>,
) -> AppResult<CampaignView> {
    let title = validation::text("title", &input.title, TITLE_MAX)?;
    let description = validation::text("description", &input.description, DESCRIPTION_MAX)?;
    let category = validation::text("category", &input.category, CATEGORY_MAX)?;
    let goal_amount = validation::positive_amount("goal_amount", input.goal_amount)?;
    if input.end_date <= now {
        return Err(AppError::Validation("end_date must be in the future".into()));
    }

    let created = campaign::ActiveModel {
        id: Set(Uuid::new_v4()),
        title: Set(title),
        description: Set(description),
        category: Set(category),
        goal_amount: Set(goal_amount),
        current_amount: Set(0),
        donor_count: Set(0),
        creator_id: Set(session.user_id),
        image_url: Set(None),
        moderation: Set(Moderation::Approved),
        end_date: Set(input.end_date),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await?;

    tracing::info!(campaign_id = %created.id, goal_amount, "campaign created");
    Ok(CampaignView::new(created, now))
}

#[tracing::instrument(skip(db, input), fields(user_id = %session.user_id))]
pub async fn update(
    db: &DatabaseConnection,
    session: &Session,
    id: Uuid,
    input: CampaignUpdate,
    now: DateTime<Utc>,
) -> AppResult<CampaignView> {
    let current = load(db, id).await?;
    session.require_owner_or_admin(current.creator_id)?;

    let mut active: campaign::ActiveModel = current.into();
    if let Some(title) = input.title {
        active.title = Set(validation::text("title", &title, TITLE_MAX)?);
    }
    if let Some(description) = input.description {
        active.description = Set(validation::text("description", &description, DESCRIPTION_MAX)?);
    }
    if let Some(category) = input.category {
        active.category = Set(validation::text("category", &category, CATEGORY_MAX)?);
    }
    if let Some(end_date) = input.end_date {
        if end_date <= now {
            return Err(AppError::Validation("end_date must be in the future".into()));
        }
        active.end_date = Set(end_date);
    }
    active.updated_at = Set(now);
    Ok(CampaignView::new(active.update(db).await?, now))
}

/// Raw image body as received, with the size cap it must respect.
#[derive(Debug, Clone, Copy)]
pub struct ImageUpload<'a> {
    pub content_type: &'a str,
    pub bytes: &'a [u8],
    pub max_bytes: usize,
}

#[tracing::instrument(
    skip(db, objects, upload),
    fields(user_id = %session.user_id, size = upload.bytes.len())
)]
pub async fn set_image(
    db: &DatabaseConnection,
    objects: &dyn ObjectStore,
    session: &Session,
    id: Uuid,
    upload: ImageUpload<'_>,
    now: DateTime<Utc>,
) -> AppResult<CampaignView> {
    let ImageUpload {
        content_type,
        bytes,
        max_bytes,
    } = upload;
    let current = load(db, id).await?;
    if current.creator_id != session.user_id {
        return Err(AppError::Forbidden("only the campaign owner can change its image".into()));
    }
    let extension = storage::image_extension(content_type).ok_or_else(|| {
        AppError::Validation(format!("unsupported image type {content_type:?}"))
    })?;
    if bytes.is_empty() {
        return Err(AppError::Validation("image body is empty".into()));
    }
    if bytes.len() > max_bytes {
        return Err(AppError::Validation(format!("image larger than {max_bytes} bytes")));
    }

    let key = format!("campaign-images/{}/{}.{}", id, Uuid::new_v4().simple(), extension);
    objects.put(&key, bytes).await?;

    let mut active: campaign::ActiveModel = current.into();
    active.image_url = Set(Some(objects.public_url(&key)));
    active.updated_at = Set(now);
    Ok(CampaignView::new(active.update(db).await?, now))
}

/// Owner dashboard, hidden campaigns included.
pub async fn list_for_owner(
    db: &DatabaseConnection,
    session: &Session,
    now: DateTime<Utc>,
) -> AppResult<Vec<CampaignView>> {
    let rows = Campaign::find()
        .filter(campaign::Column::CreatorId.eq(session.user_id))
        .order_by_desc(campaign::Column::CreatedAt)
        .all(db)
        .await?;
    Ok(rows.into_iter().map(|m| CampaignView::new(m, now)).collect())
}

/// Approved campaigns whose raised total met the goal.
pub async fn success_stories(
    db: &DatabaseConnection,
    limit: u64,
    now: DateTime<Utc>,
) -> AppResult<Vec<CampaignView>> {
    let rows = Campaign::find()
        .filter(campaign::Column::Moderation.eq(Moderation::Approved))
        .filter(
            Expr::col(campaign::Column::CurrentAmount)
                .gte(Expr::col(campaign::Column::GoalAmount)),
        )
        .order_by_desc(campaign::Column::CreatedAt)
        .limit(limit.clamp(1, 50))
        .all(db)
        .await?;
    Ok(rows.into_iter().map(|m| CampaignView::new(m, now)).collect())
}

pub async fn list_all(
    db: &DatabaseConnection,
    session: &Session,
    page: &PageQuery,
    now: DateTime<Utc>,
) -> AppResult<Vec<CampaignView>> {
    session.require_admin()?;
    let rows = Campaign::find()
        .order_by_desc(campaign::Column::CreatedAt)
        .limit(page.limit())
        .offset(page.offset())
        .all(db)
        .await?;
    Ok(rows.into_iter().map(|m| CampaignView::new(m, now)).collect())
}

#[tracing::instrument(skip(db), fields(admin_id = %session.user_id))]
pub async fn set_moderation(
    db: &DatabaseConnection,
    session: &Session,
    id: Uuid,
    moderation: Moderation,
    now: DateTime<Utc>,
) -> AppResult<CampaignView> {
    session.require_admin()?;
    let current = load(db, id).await?;
    if current.moderation == moderation {
        return Ok(CampaignView::new(current, now));
    }

    let owner = current.creator_id;
    let title = current.title.clone();
    let mut active: campaign::ActiveModel = current.into();
    active.moderation = Set(moderation);
    active.updated_at = Set(now);
    let updated = active.update(db).await?;

    if moderation == Moderation::Hidden {
        notifications::notify(
            db,
            owner,
            notifications::CAMPAIGN_HIDDEN,
            format!("Your campaign \"{title}\" was hidden by a moderator."),
        )
        .await?;
    }
    tracing::info!(campaign_id = %id, ?moderation, "campaign moderation changed");
    Ok(CampaignView::new(updated, now))
}
