use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use super::PageQuery;
use crate::auth::Session;
use crate::entities::{notification, Notification};
use crate::error::{AppError, AppResult};

pub const DONATION_RECEIVED: &str = "donation_received";
pub const WITHDRAWAL_COMPLETED: &str = "withdrawal_completed";
pub const WITHDRAWAL_REJECTED: &str = "withdrawal_rejected";
pub const CAMPAIGN_HIDDEN: &str = "campaign_hidden";

#[derive(Debug, Serialize, ToSchema)]
pub struct NotificationView {
    pub id: Uuid,
    pub kind: String,
    pub message: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

impl From<notification::Model> for NotificationView {
    fn from(n: notification::Model) -> Self {
        NotificationView {
            id: n.id,
            kind: n.kind,
            message: n.message,
            is_read: n.is_read,
            created_at: n.created_at,
        }
    }
}

/// Queue a message for `user_id`. Runs on whatever connection or transaction the caller holds.
pub async fn notify<C: ConnectionTrait>(
    conn: &C,
    user_id: Uuid,
    kind: &str,
    message: String,
) -> AppResult<()> {
    notification::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        kind: Set(kind.to_string()),
        message: Set(message),
        is_read: Set(false),
        created_at: Set(Utc::now()),
    }
    .insert(conn)
    .await?;
    Ok(())
}

pub async fn list(
    db: &DatabaseConnection,
    session: &Session,
    page: &PageQuery,
) -> AppResult<Vec<NotificationView>> {
    let rows = Notification::find()
        .filter(notification::Column::UserId.eq(session.user_id))
        .order_by_desc(notification::Column::CreatedAt)
        .limit(page.limit())
        .offset(page.offset())
        .all(db)
        .await?;
    Ok(rows.into_iter().map(NotificationView::from).collect())
}

pub async fn mark_read(
    db: &DatabaseConnection,
    session: &Session,
    id: Uuid,
) -> AppResult<NotificationView> {
    let found = Notification::find_by_id(id)
        .one(db)
        .await?
        .filter(|n| n.user_id == session.user_id)
        .ok_or_else(|| AppError::NotFound(format!("notification {id}")))?;
    if found.is_read {
        return Ok(found.into());
    }
    let mut active: notification::ActiveModel = found.into();
    active.is_read = Set(true);
    Ok(active.update(db).await?.into())
}
