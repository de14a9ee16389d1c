#![allow(dead_code)]

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    response::Response,
    Router,
};
use crowdfund::{config::AppConfig, create_app, db, AppState};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;
use uuid::Uuid;

pub const ADMIN_EMAIL: &str = "admin@example.com";
pub const DECLINE_ABOVE: i64 = 1_000_000;

/// Router over a fresh in-memory database and a throwaway storage directory.
pub struct TestApp {
    pub app: Router,
    pub state: AppState,
    _storage: TempDir,
}

impl TestApp {
    pub async fn spawn() -> Self {
        let storage = tempfile::tempdir().unwrap();
        let storage_dir = storage.path().to_string_lossy().into_owned();
        let decline_above = DECLINE_ABOVE.to_string();
        let config = AppConfig::from_lookup(|key| {
            let value = match key {
                "DATABASE_URL" => "sqlite::memory:",
                "STORAGE_DIR" => storage_dir.as_str(),
                "PUBLIC_BASE_URL" => "http://localhost:3000",
                "ADMIN_EMAILS" => ADMIN_EMAIL,
                "RATE_LIMIT_BURST" => "0",
                "MAX_IMAGE_BYTES" => "1024",
                "SIMULATED_PAYMENT_DECLINE_ABOVE" => decline_above.as_str(),
                _ => return None,
            };
            Some(value.to_string())
        })
        .unwrap();

        let conn = db::connect(&config.database_url, true).await.unwrap();
        let state = AppState::from_config(conn, config);
        TestApp {
            app: create_app(state.clone()),
            state,
            _storage: storage,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Response {
        self.app.clone().oneshot(request).await.unwrap()
    }

    /// JSON request; the body comes back as JSON, or as a string when it is not JSON.
    pub async fn call(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.send(request).await;
        let status = response.status();
        let bytes = to_bytes(response.into_body(), 1024 * 1024).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        (status, value)
    }

    /// Register `email` and return its bearer token.
    pub async fn sign_up(&self, email: &str) -> String {
        let (status, body) = self
            .call(
                Method::POST,
                "/auth/signup",
                None,
                Some(json!({
                    "email": email,
                    "password": "correct-horse",
                    "full_name": "Test Member",
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["access_token"].as_str().unwrap().to_string()
    }

    pub async fn create_campaign(&self, token: &str, goal: i64) -> Uuid {
        let end_date = chrono::Utc::now() + chrono::Duration::days(30);
        let (status, body) = self
            .call(
                Method::POST,
                "/campaigns",
                Some(token),
                Some(json!({
                    "title": "Clean water for Kibera",
                    "description": "Boreholes and filters for two schools.",
                    "category": "community",
                    "goal_amount": goal,
                    "end_date": end_date,
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["id"].as_str().unwrap().parse().unwrap()
    }

    pub async fn donate(
        &self,
        campaign_id: Uuid,
        token: Option<&str>,
        amount: i64,
    ) -> (StatusCode, Value) {
        self.call(
            Method::POST,
            &format!("/campaigns/{campaign_id}/donations"),
            token,
            Some(json!({
                "amount": amount,
                "donor_name": "Amina",
                "donor_email": "amina@example.com",
            })),
        )
        .await
    }
}
