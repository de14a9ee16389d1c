use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::auth::Session;
use crate::entities::{Moderation, WithdrawalStatus};
use crate::error::AppResult;
use crate::jobs::{self, ReconcileReport};
use crate::services::blog::{self, BlogPostView, NewBlogPost};
use crate::services::campaigns::{self, CampaignView};
use crate::services::donations;
use crate::services::profiles::{self, ProfileView};
use crate::services::withdrawals::{self, ReviewDecision, WithdrawalView};
use crate::services::PageQuery;
use crate::AppState;

#[derive(Debug, Deserialize, ToSchema)]
pub struct ModerationRequest {
    pub moderation: Moderation,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct WithdrawalFilter {
    /// pending, completed or rejected. All when omitted.
    #[param(required = false, value_type = Option<String>)]
    status: Option<WithdrawalStatus>,
    #[param(required = false)]
    limit: Option<u64>,
    #[param(required = false)]
    offset: Option<u64>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ReviewRequest {
    /// Shown to the campaign owner.
    pub note: Option<String>,
}

#[utoipa::path(
    get,
    path = "/admin/campaigns",
    params(PageQuery),
    responses(
        (status = 200, description = "All campaigns, hidden included", body = [CampaignView])
    ),
    security(("bearer_auth" = [])),
    tag = "admin"
)]
pub async fn list_campaigns(
    State(state): State<AppState>,
    session: Session,
    Query(page): Query<PageQuery>,
) -> AppResult<Json<Vec<CampaignView>>> {
    Ok(Json(campaigns::list_all(&state.db, &session, &page, Utc::now()).await?))
}

/// Hide or re-approve a campaign
#[utoipa::path(
    patch,
    path = "/admin/campaigns/{id}/moderation",
    params(("id" = Uuid, Path, description = "Campaign id")),
    request_body = ModerationRequest,
    responses(
        (status = 200, description = "Moderation updated", body = CampaignView),
        (status = 403, description = "Caller is not an administrator")
    ),
    security(("bearer_auth" = [])),
    tag = "admin"
)]
pub async fn moderate_campaign(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
    Json(request): Json<ModerationRequest>,
) -> AppResult<Json<CampaignView>> {
    Ok(Json(
        campaigns::set_moderation(&state.db, &session, id, request.moderation, Utc::now()).await?,
    ))
}

#[utoipa::path(
    get,
    path = "/admin/withdrawals",
    params(WithdrawalFilter),
    responses((status = 200, description = "Withdrawals, oldest first", body = [WithdrawalView])),
    security(("bearer_auth" = [])),
    tag = "admin"
)]
pub async fn list_withdrawals(
    State(state): State<AppState>,
    session: Session,
    Query(filter): Query<WithdrawalFilter>,
) -> AppResult<Json<Vec<WithdrawalView>>> {
    let page = PageQuery {
        limit: filter.limit,
        offset: filter.offset,
    };
    Ok(Json(
        withdrawals::list_by_status(&state.db, &session, filter.status, &page).await?,
    ))
}

/// Mark a pending withdrawal as paid out
#[utoipa::path(
    post,
    path = "/admin/withdrawals/{id}/complete",
    params(("id" = Uuid, Path, description = "Withdrawal id")),
    responses(
        (status = 200, description = "Withdrawal completed", body = WithdrawalView),
        (status = 409, description = "Withdrawal is not pending")
    ),
    security(("bearer_auth" = [])),
    tag = "admin"
)]
pub async fn complete_withdrawal(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
) -> AppResult<Json<WithdrawalView>> {
    Ok(Json(
        withdrawals::review(&state.db, &session, id, ReviewDecision::Complete, None).await?,
    ))
}

/// Reject a pending withdrawal, releasing its amount back to the balance.
/// The JSON body carrying a note is optional.
#[utoipa::path(
    post,
    path = "/admin/withdrawals/{id}/reject",
    params(("id" = Uuid, Path, description = "Withdrawal id")),
    request_body(content = ReviewRequest, description = "Optional review note"),
    responses(
        (status = 200, description = "Withdrawal rejected", body = WithdrawalView),
        (status = 409, description = "Withdrawal is not pending")
    ),
    security(("bearer_auth" = [])),
    tag = "admin"
)]
pub async fn reject_withdrawal(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
    body: Option<Json<ReviewRequest>>,
) -> AppResult<Json<WithdrawalView>> {
    let note = body.and_then(|Json(request)| request.note);
    Ok(Json(
        withdrawals::review(&state.db, &session, id, ReviewDecision::Reject, note).await?,
    ))
}

#[utoipa::path(
    get,
    path = "/admin/users",
    params(PageQuery),
    responses((status = 200, description = "Profiles, newest first", body = [ProfileView])),
    security(("bearer_auth" = [])),
    tag = "admin"
)]
pub async fn list_users(
    State(state): State<AppState>,
    session: Session,
    Query(page): Query<PageQuery>,
) -> AppResult<Json<Vec<ProfileView>>> {
    Ok(Json(profiles::list_all(&state.db, &session, &page).await?))
}

/// All donations as CSV
#[utoipa::path(
    get,
    path = "/admin/donations/export",
    responses(
        (status = 200, description = "CSV document", body = String, content_type = "text/csv")
    ),
    security(("bearer_auth" = [])),
    tag = "admin"
)]
pub async fn export_donations(
    State(state): State<AppState>,
    session: Session,
) -> AppResult<impl IntoResponse> {
    let csv = donations::export_csv(&state.db, &session).await?;
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (header::CONTENT_DISPOSITION, "attachment; filename=\"donations.csv\""),
        ],
        csv,
    ))
}

/// Recompute denormalized campaign totals from completed donations
#[utoipa::path(
    post,
    path = "/admin/reconcile",
    responses((status = 200, description = "Reconciliation report", body = ReconcileReport)),
    security(("bearer_auth" = [])),
    tag = "admin"
)]
pub async fn reconcile(
    State(state): State<AppState>,
    session: Session,
) -> AppResult<Json<ReconcileReport>> {
    session.require_admin()?;
    Ok(Json(jobs::reconcile_totals(&state.db).await?))
}

#[utoipa::path(
    post,
    path = "/admin/blog",
    request_body = NewBlogPost,
    responses(
        (status = 201, description = "Post created", body = BlogPostView),
        (status = 409, description = "Slug already used")
    ),
    security(("bearer_auth" = [])),
    tag = "admin"
)]
pub async fn create_blog_post(
    State(state): State<AppState>,
    session: Session,
    Json(input): Json<NewBlogPost>,
) -> AppResult<(StatusCode, Json<BlogPostView>)> {
    let created = blog::create(&state.db, &session, input, Utc::now()).await?;
    Ok((StatusCode::CREATED, Json(created)))
}
