use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch, post, put},
    Router,
};
use sea_orm::DatabaseConnection;
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor, GovernorLayer,
};
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod error;
pub mod jobs;
pub mod ledger;
pub mod openapi;
pub mod payments;
pub mod routes;
pub mod services;
pub mod storage;
pub mod validation;

use auth::{HostedIdentity, IdentityProvider, LocalIdentity};
use config::{AppConfig, IdentityConfig};
use payments::{PaymentGateway, SimulatedGateway};
use storage::{LocalObjectStore, ObjectStore};

/// Shared handles passed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub identity: Arc<dyn IdentityProvider>,
    pub objects: Arc<dyn ObjectStore>,
    pub payments: Arc<dyn PaymentGateway>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    /// Wire the default collaborators named by `config` around an open connection.
    pub fn from_config(db: DatabaseConnection, config: AppConfig) -> Self {
        let identity: Arc<dyn IdentityProvider> = match &config.identity {
            IdentityConfig::Local => Arc::new(LocalIdentity::new(db.clone())),
            IdentityConfig::Hosted { url, api_key } => Arc::new(HostedIdentity::new(
                reqwest::Client::new(),
                url.clone(),
                api_key.clone(),
            )),
        };
        let objects = Arc::new(LocalObjectStore::new(
            config.storage_dir.clone(),
            config.public_base_url.clone(),
        ));
        let payments = Arc::new(SimulatedGateway::new(config.payment_decline_above));
        AppState {
            db,
            identity,
            objects,
            payments,
            config: Arc::new(config),
        }
    }
}

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy", body = String)
    ),
    tag = "health"
)]
async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "Service is healthy")
}

/// Create the application with all routes and middleware
pub fn create_app(state: AppState) -> Router {
    use routes::{admin, auth, campaigns, content, donations, notifications, profile, withdrawals};

    let api_doc = openapi::ApiDoc::openapi();
    // slack for headers the raw body limit would otherwise count against
    let image_limit = state.config.max_image_bytes + 16 * 1024;

    let api_routes = Router::new()
        .route("/auth/signup", post(auth::sign_up))
        .route("/auth/signin", post(auth::sign_in))
        .route("/auth/signout", post(auth::sign_out))
        .route("/auth/me", get(auth::me))
        .route("/profile", get(profile::get_profile).put(profile::update_profile))
        .route(
            "/campaigns",
            get(campaigns::list_campaigns).post(campaigns::create_campaign),
        )
        .route(
            "/campaigns/{id}",
            get(campaigns::get_campaign).patch(campaigns::update_campaign),
        )
        .route(
            "/campaigns/{id}/image",
            put(campaigns::upload_image).layer(DefaultBodyLimit::max(image_limit)),
        )
        .route(
            "/campaigns/{id}/donations",
            get(donations::list_campaign_donations).post(donations::donate),
        )
        .route("/campaigns/{id}/balance", get(withdrawals::campaign_balance))
        .route(
            "/campaigns/{id}/withdrawals",
            get(withdrawals::list_withdrawals).post(withdrawals::request_withdrawal),
        )
        .route("/me/campaigns", get(campaigns::my_campaigns))
        .route("/me/donations", get(donations::my_donations))
        .route("/notifications", get(notifications::list_notifications))
        .route("/notifications/{id}/read", post(notifications::mark_read))
        .route("/success-stories", get(campaigns::success_stories))
        .route("/newsletter/subscribe", post(content::subscribe))
        .route("/blog", get(content::list_posts))
        .route("/blog/feed.xml", get(content::feed))
        .route("/blog/{slug}", get(content::get_post))
        .route("/admin/campaigns", get(admin::list_campaigns))
        .route("/admin/campaigns/{id}/moderation", patch(admin::moderate_campaign))
        .route("/admin/withdrawals", get(admin::list_withdrawals))
        .route("/admin/withdrawals/{id}/complete", post(admin::complete_withdrawal))
        .route("/admin/withdrawals/{id}/reject", post(admin::reject_withdrawal))
        .route("/admin/users", get(admin::list_users))
        .route("/admin/donations/export", get(admin::export_donations))
        .route("/admin/reconcile", post(admin::reconcile))
        .route("/admin/blog", post(admin::create_blog_post));

    // Rate limiting applies to the API only, never to health, docs or static files.
    let api_routes = match state.config.rate_limit_burst {
        Some(burst) => match GovernorConfigBuilder::default()
            .key_extractor(SmartIpKeyExtractor)
            .period(std::time::Duration::from_secs(60) / burst)
            .burst_size(burst)
            .finish()
        {
            Some(governor_conf) => api_routes.layer(GovernorLayer {
                config: Arc::new(governor_conf),
            }),
            None => {
                tracing::warn!(burst, "invalid rate limit settings; rate limiting disabled");
                api_routes
            }
        },
        None => api_routes,
    };

    let storage_dir = state.config.storage_dir.clone();

    Router::new()
        .merge(api_routes)
        .route("/health", get(health_check))
        .nest_service(storage::PUBLIC_PREFIX, ServeDir::new(storage_dir))
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", api_doc))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}
