use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

use crate::auth::{MaybeSession, Session};
use crate::error::AppResult;
use crate::services::campaigns::{
    self, CampaignQuery, CampaignUpdate, CampaignView, ImageUpload, NewCampaign,
};
use crate::AppState;

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SuccessStoriesQuery {
    /// Number of stories, 1 to 50. Defaults to 6.
    #[serde(default = "default_story_count")]
    #[param(required = false)]
    limit: u64,
}

fn default_story_count() -> u64 {
    6
}

/// Browse approved campaigns
#[utoipa::path(
    get,
    path = "/campaigns",
    params(CampaignQuery),
    responses(
        (status = 200, description = "Campaigns, newest first", body = [CampaignView]),
        (status = 422, description = "Unknown status filter")
    ),
    tag = "campaigns"
)]
pub async fn list_campaigns(
    State(state): State<AppState>,
    Query(query): Query<CampaignQuery>,
) -> AppResult<Json<Vec<CampaignView>>> {
    Ok(Json(campaigns::list_public(&state.db, &query, Utc::now()).await?))
}

/// Start a new campaign owned by the caller
#[utoipa::path(
    post,
    path = "/campaigns",
    request_body = NewCampaign,
    responses(
        (status = 201, description = "Campaign created", body = CampaignView),
        (status = 422, description = "Invalid campaign fields")
    ),
    security(("bearer_auth" = [])),
    tag = "campaigns"
)]
pub async fn create_campaign(
    State(state): State<AppState>,
    session: Session,
    Json(input): Json<NewCampaign>,
) -> AppResult<(StatusCode, Json<CampaignView>)> {
    let created = campaigns::create(&state.db, &session, input, Utc::now()).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Campaign detail with derived progress
#[utoipa::path(
    get,
    path = "/campaigns/{id}",
    params(("id" = Uuid, Path, description = "Campaign id")),
    responses(
        (status = 200, description = "Campaign", body = CampaignView),
        (status = 404, description = "No such campaign")
    ),
    tag = "campaigns"
)]
pub async fn get_campaign(
    State(state): State<AppState>,
    MaybeSession(viewer): MaybeSession,
    Path(id): Path<Uuid>,
) -> AppResult<Json<CampaignView>> {
    Ok(Json(campaigns::get(&state.db, id, viewer.as_ref(), Utc::now()).await?))
}

/// Edit title, description, category or end date
#[utoipa::path(
    patch,
    path = "/campaigns/{id}",
    params(("id" = Uuid, Path, description = "Campaign id")),
    request_body = CampaignUpdate,
    responses(
        (status = 200, description = "Campaign updated", body = CampaignView),
        (status = 403, description = "Caller does not own the campaign")
    ),
    security(("bearer_auth" = [])),
    tag = "campaigns"
)]
pub async fn update_campaign(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
    Json(input): Json<CampaignUpdate>,
) -> AppResult<Json<CampaignView>> {
    Ok(Json(campaigns::update(&state.db, &session, id, input, Utc::now()).await?))
}

/// Upload the campaign image as the raw request body
#[utoipa::path(
    put,
    path = "/campaigns/{id}/image",
    params(("id" = Uuid, Path, description = "Campaign id")),
    request_body(
        content = Vec<u8>,
        content_type = "image/png",
        description = "PNG, JPEG, WebP or GIF bytes"
    ),
    responses(
        (status = 200, description = "Image stored", body = CampaignView),
        (status = 422, description = "Unsupported type, empty or oversized image")
    ),
    security(("bearer_auth" = [])),
    tag = "campaigns"
)]
pub async fn upload_image(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<Json<CampaignView>> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    let upload = ImageUpload {
        content_type,
        bytes: &body,
        max_bytes: state.config.max_image_bytes,
    };
    let updated = campaigns::set_image(
        &state.db,
        state.objects.as_ref(),
        &session,
        id,
        upload,
        Utc::now(),
    )
    .await?;
    Ok(Json(updated))
}

/// Campaigns owned by the caller, hidden ones included
#[utoipa::path(
    get,
    path = "/me/campaigns",
    responses((status = 200, description = "Owner dashboard", body = [CampaignView])),
    security(("bearer_auth" = [])),
    tag = "campaigns"
)]
pub async fn my_campaigns(
    State(state): State<AppState>,
    session: Session,
) -> AppResult<Json<Vec<CampaignView>>> {
    Ok(Json(campaigns::list_for_owner(&state.db, &session, Utc::now()).await?))
}

/// Campaigns that reached their goal
#[utoipa::path(
    get,
    path = "/success-stories",
    params(SuccessStoriesQuery),
    responses((status = 200, description = "Funded campaigns", body = [CampaignView])),
    tag = "content"
)]
pub async fn success_stories(
    State(state): State<AppState>,
    Query(query): Query<SuccessStoriesQuery>,
) -> AppResult<Json<Vec<CampaignView>>> {
    Ok(Json(campaigns::success_stories(&state.db, query.limit, Utc::now()).await?))
}
