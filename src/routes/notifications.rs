use axum::{
    extract::{Path, Query, State},
    Json,
};
use uuid::Uuid;

use crate::auth::Session;
use crate::error::AppResult;
use crate::services::notifications::{self, NotificationView};
use crate::services::PageQuery;
use crate::AppState;

#[utoipa::path(
    get,
    path = "/notifications",
    params(PageQuery),
    responses(
        (status = 200, description = "Notifications, newest first", body = [NotificationView])
    ),
    security(("bearer_auth" = [])),
    tag = "notifications"
)]
pub async fn list_notifications(
    State(state): State<AppState>,
    session: Session,
    Query(page): Query<PageQuery>,
) -> AppResult<Json<Vec<NotificationView>>> {
    Ok(Json(notifications::list(&state.db, &session, &page).await?))
}

#[utoipa::path(
    post,
    path = "/notifications/{id}/read",
    params(("id" = Uuid, Path, description = "Notification id")),
    responses(
        (status = 200, description = "Marked as read", body = NotificationView),
        (status = 404, description = "No such notification for this user")
    ),
    security(("bearer_auth" = [])),
    tag = "notifications"
)]
pub async fn mark_read(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
) -> AppResult<Json<NotificationView>> {
    Ok(Json(notifications::mark_read(&state.db, &session, id).await?))
}
