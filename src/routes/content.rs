use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::AppResult;
use crate::services::blog::{self, BlogPostSummary, BlogPostView};
use crate::services::newsletter::{self, Subscription};
use crate::services::PageQuery;
use crate::AppState;

#[derive(Debug, Deserialize, ToSchema)]
pub struct SubscribeRequest {
    pub email: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SubscribeResponse {
    pub subscribed: bool,
    pub message: String,
}

/// Join the newsletter
#[utoipa::path(
    post,
    path = "/newsletter/subscribe",
    request_body = SubscribeRequest,
    responses(
        (status = 201, description = "Subscribed", body = SubscribeResponse),
        (status = 200, description = "Already subscribed", body = SubscribeResponse),
        (status = 422, description = "Invalid email")
    ),
    tag = "content"
)]
pub async fn subscribe(
    State(state): State<AppState>,
    Json(request): Json<SubscribeRequest>,
) -> AppResult<(StatusCode, Json<SubscribeResponse>)> {
    let (status, message) = match newsletter::subscribe(&state.db, &request.email).await? {
        Subscription::Created => (StatusCode::CREATED, "Thanks for subscribing!"),
        Subscription::AlreadySubscribed => (StatusCode::OK, "You are already subscribed."),
    };
    Ok((
        status,
        Json(SubscribeResponse {
            subscribed: true,
            message: message.to_string(),
        }),
    ))
}

#[utoipa::path(
    get,
    path = "/blog",
    params(PageQuery),
    responses(
        (status = 200, description = "Published posts, newest first", body = [BlogPostSummary])
    ),
    tag = "content"
)]
pub async fn list_posts(
    State(state): State<AppState>,
    Query(page): Query<PageQuery>,
) -> AppResult<Json<Vec<BlogPostSummary>>> {
    Ok(Json(blog::list_published(&state.db, &page).await?))
}

#[utoipa::path(
    get,
    path = "/blog/{slug}",
    params(("slug" = String, Path, description = "Post slug")),
    responses(
        (status = 200, description = "Post", body = BlogPostView),
        (status = 404, description = "No published post with this slug")
    ),
    tag = "content"
)]
pub async fn get_post(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> AppResult<Json<BlogPostView>> {
    Ok(Json(blog::get_by_slug(&state.db, &slug).await?))
}

/// RSS 2.0 feed of published posts
#[utoipa::path(
    get,
    path = "/blog/feed.xml",
    responses(
        (
            status = 200,
            description = "RSS document",
            body = String,
            content_type = "application/rss+xml"
        )
    ),
    tag = "content"
)]
pub async fn feed(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let xml = blog::feed(&state.db, &state.config.public_base_url).await?;
    Ok(([(header::CONTENT_TYPE, "application/rss+xml; charset=utf-8")], xml))
}
