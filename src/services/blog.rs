use chrono::{DateTime, Utc};
use rss::{ChannelBuilder, GuidBuilder, ItemBuilder};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::PageQuery;
use crate::auth::Session;
use crate::entities::{blog_post, BlogPost};
use crate::error::{AppError, AppResult};
use crate::validation;

const FEED_SIZE: u64 = 20;

#[derive(Debug, Serialize, ToSchema)]
pub struct BlogPostSummary {
    pub slug: String,
    pub title: String,
    pub excerpt: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BlogPostView {
    pub id: Uuid,
    pub slug: String,
    pub title: String,
    pub excerpt: Option<String>,
    pub body: String,
    pub author_id: Uuid,
    pub is_published: bool,
    pub published_at: Option<DateTime<Utc>>,
}

impl From<blog_post::Model> for BlogPostSummary {
    fn from(p: blog_post::Model) -> Self {
        BlogPostSummary {
            slug: p.slug,
            title: p.title,
            excerpt: p.excerpt,
            published_at: p.published_at,
        }
    }
}

impl From<blog_post::Model> for BlogPostView {
    fn from(p: blog_post::Model) -> Self {
        BlogPostView {
            id: p.id,
            slug: p.slug,
            title: p.title,
            excerpt: p.excerpt,
            body: p.body,
            author_id: p.author_id,
            is_published: p.is_published,
            published_at: p.published_at,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct NewBlogPost {
    pub slug: String,
    pub title: String,
    pub excerpt: Option<String>,
    pub body: String,
    #[serde(default)]
    pub publish: bool,
}

async fn published(
    db: &DatabaseConnection,
    limit: u64,
    offset: u64,
) -> AppResult<Vec<blog_post::Model>> {
    Ok(BlogPost::find()
        .filter(blog_post::Column::IsPublished.eq(true))
        .order_by_desc(blog_post::Column::PublishedAt)
        .limit(limit)
        .offset(offset)
        .all(db)
        .await?)
}

pub async fn list_published(
    db: &DatabaseConnection,
    page: &PageQuery,
) -> AppResult<Vec<BlogPostSummary>> {
    let rows = published(db, page.limit(), page.offset()).await?;
    Ok(rows.into_iter().map(BlogPostSummary::from).collect())
}

pub async fn get_by_slug(db: &DatabaseConnection, slug: &str) -> AppResult<BlogPostView> {
    BlogPost::find()
        .filter(blog_post::Column::Slug.eq(slug))
        .filter(blog_post::Column::IsPublished.eq(true))
        .one(db)
        .await?
        .map(BlogPostView::from)
        .ok_or_else(|| AppError::NotFound(format!("blog post {slug:?}")))
}

#[tracing::instrument(skip(db, input), fields(admin_id = %session.user_id))]
pub async fn create(
    db: &DatabaseConnection,
    session: &Session,
    input: NewBlogPost,
    now: DateTime<Utc>,
) -> AppResult<BlogPostView> {
    session.require_admin()?;
    let slug = validation::slug(&input.slug)?;
    let title = validation::text("title", &input.title, 200)?;
    let excerpt = validation::optional_text("excerpt", input.excerpt.as_deref(), 500)?;
    let body = validation::text("body", &input.body, 100_000)?;

    let taken = BlogPost::find()
        .filter(blog_post::Column::Slug.eq(slug.as_str()))
        .one(db)
        .await?;
    if taken.is_some() {
        return Err(AppError::Conflict(format!("slug {slug:?} is already used")));
    }

    let created = blog_post::ActiveModel {
        id: Set(Uuid::new_v4()),
        slug: Set(slug),
        title: Set(title),
        excerpt: Set(excerpt),
        body: Set(body),
        author_id: Set(session.user_id),
        is_published: Set(input.publish),
        published_at: Set(input.publish.then_some(now)),
        created_at: Set(now),
    }
    .insert(db)
    .await?;
    tracing::info!(slug = %created.slug, published = created.is_published, "blog post created");
    Ok(created.into())
}

/// RSS 2.0 document for the latest published posts.
pub async fn feed(db: &DatabaseConnection, public_base_url: &str) -> AppResult<String> {
    let posts = published(db, FEED_SIZE, 0).await?;
    let items = posts
        .into_iter()
        .map(|post| {
            let link = format!("{}/blog/{}", public_base_url, post.slug);
            ItemBuilder::default()
                .title(Some(post.title))
                .link(Some(link.clone()))
                .description(post.excerpt)
                .pub_date(post.published_at.map(|d| d.to_rfc2822()))
                .guid(Some(GuidBuilder::default().value(link).permalink(true).build()))
                .build()
        })
        .collect::<Vec<_>>();

    let channel = ChannelBuilder::default()
        .title("Crowdfund blog")
        .link(format!("{}/blog", public_base_url))
        .description("Stories and updates from the community")
        .items(items)
        .build();
    Ok(channel.to_string())
}
