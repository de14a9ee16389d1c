mod common;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
};
use common::{TestApp, ADMIN_EMAIL, DECLINE_ABOVE};
use crowdfund::entities::{user, User};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use serde_json::json;
use uuid::Uuid;

#[tokio::test]
async fn test_health_check() {
    let app = TestApp::spawn().await;

    let (status, body) = app.call(Method::GET, "/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "Service is healthy");
}

#[tokio::test]
async fn test_openapi_document_lists_routes() {
    let app = TestApp::spawn().await;

    let (status, doc) = app.call(Method::GET, "/api-doc/openapi.json", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert!(doc["paths"]["/campaigns/{id}/donations"].is_object());
    assert!(doc["paths"]["/admin/withdrawals/{id}/complete"].is_object());
    assert!(doc["components"]["securitySchemes"]["bearer_auth"].is_object());
}

#[tokio::test]
async fn test_sign_up_sign_in_and_me() {
    let app = TestApp::spawn().await;
    app.sign_up("zawadi@example.com").await;

    let (status, grant) = app
        .call(
            Method::POST,
            "/auth/signin",
            None,
            Some(json!({"email": "zawadi@example.com", "password": "correct-horse"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let token = grant["access_token"].as_str().unwrap();

    let (status, me) = app.call(Method::GET, "/auth/me", Some(token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["email"], "zawadi@example.com");
    assert_eq!(me["full_name"], "Test Member");
    assert_eq!(me["is_admin"], false);

    let (status, _) = app
        .call(
            Method::POST,
            "/auth/signin",
            None,
            Some(json!({"email": "zawadi@example.com", "password": "wrong-password"})),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_local_passwords_are_stored_as_argon2() {
    let app = TestApp::spawn().await;
    app.sign_up("hashed@example.com").await;

    let stored = User::find()
        .filter(user::Column::Email.eq("hashed@example.com"))
        .one(&app.state.db)
        .await
        .unwrap()
        .unwrap();

    assert!(stored.password_hash.starts_with("$argon2id$"));
    assert!(!stored.password_hash.contains("correct-horse"));
}

#[tokio::test]
async fn test_duplicate_sign_up_conflicts() {
    let app = TestApp::spawn().await;
    app.sign_up("twice@example.com").await;

    let (status, _) = app
        .call(
            Method::POST,
            "/auth/signup",
            None,
            Some(json!({
                "email": "twice@example.com",
                "password": "correct-horse",
                "full_name": "Again",
            })),
        )
        .await;

    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_sign_out_revokes_token() {
    let app = TestApp::spawn().await;
    let token = app.sign_up("leaving@example.com").await;

    let (status, _) = app.call(Method::POST, "/auth/signout", Some(&token), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = app.call(Method::GET, "/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_protected_routes_require_token() {
    let app = TestApp::spawn().await;

    let (status, _) = app.call(Method::GET, "/me/campaigns", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app.call(Method::GET, "/profile", Some("not-a-token"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_profile_update_requires_organization_name() {
    let app = TestApp::spawn().await;
    let token = app.sign_up("org@example.com").await;

    let (status, _) = app
        .call(
            Method::PUT,
            "/profile",
            Some(&token),
            Some(json!({"full_name": "Harambee Trust", "is_organization": true})),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, profile) = app
        .call(
            Method::PUT,
            "/profile",
            Some(&token),
            Some(json!({
                "full_name": "Harambee Trust",
                "is_organization": true,
                "organization_name": "Harambee Trust",
                "payout_details": "M-Pesa 0700 000 000",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(profile["organization_name"], "Harambee Trust");
    assert_eq!(profile["is_organization"], true);
}

#[tokio::test]
async fn test_campaign_progress_after_donations() {
    let app = TestApp::spawn().await;
    let owner = app.sign_up("owner@example.com").await;
    let campaign = app.create_campaign(&owner, 1_200_000).await;

    let (status, detail) = app
        .call(Method::GET, &format!("/campaigns/{campaign}"), None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["progress"]["raised"], 0);
    assert_eq!(detail["progress"]["status"], "active");
    assert!(detail["progress"]["days_left"].as_i64().unwrap() >= 29);

    for amount in [500_000, 350_000] {
        let (status, _) = app.donate(campaign, None, amount).await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (_, detail) = app.call(Method::GET, &format!("/campaigns/{campaign}"), None, None).await;
    assert_eq!(detail["progress"]["raised"], 850_000);
    assert_eq!(detail["progress"]["donor_count"], 2);
    assert_eq!(detail["progress"]["percent_funded"], 71);
    assert_eq!(detail["progress"]["status"], "active");
}

#[tokio::test]
async fn test_campaign_validation() {
    let app = TestApp::spawn().await;
    let owner = app.sign_up("owner@example.com").await;

    let (status, _) = app
        .call(
            Method::POST,
            "/campaigns",
            Some(&owner),
            Some(json!({
                "title": "Past",
                "description": "Already over",
                "category": "education",
                "goal_amount": 1000,
                "end_date": chrono::Utc::now() - chrono::Duration::days(1),
            })),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = app
        .call(
            Method::POST,
            "/campaigns",
            Some(&owner),
            Some(json!({
                "title": "No goal",
                "description": "Zero target",
                "category": "education",
                "goal_amount": 0,
                "end_date": chrono::Utc::now() + chrono::Duration::days(1),
            })),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_campaign_list_filters() {
    let app = TestApp::spawn().await;
    let owner = app.sign_up("owner@example.com").await;
    let small = app.create_campaign(&owner, 1_000).await;
    let large = app.create_campaign(&owner, 1_000_000).await;
    app.donate(small, None, 1_500).await;

    let (status, funded) = app.call(Method::GET, "/campaigns?status=funded", None, None).await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<&str> = funded
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["id"].as_str().unwrap())
        .collect();
    let small_id = small.to_string();
    assert_eq!(ids, vec![small_id.as_str()]);
    assert_eq!(funded[0]["progress"]["percent_funded"], 100);

    let (_, active) = app.call(Method::GET, "/campaigns?status=active", None, None).await;
    assert_eq!(active.as_array().unwrap().len(), 1);
    assert_eq!(active[0]["id"], large.to_string());

    let (_, by_category) = app.call(Method::GET, "/campaigns?category=medical", None, None).await;
    assert!(by_category.as_array().unwrap().is_empty());

    let (_, searched) = app.call(Method::GET, "/campaigns?search=Kibera&limit=1", None, None).await;
    assert_eq!(searched.as_array().unwrap().len(), 1);

    let (status, _) = app.call(Method::GET, "/campaigns?status=paused", None, None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_campaign_search_ignores_case_and_wildcards() {
    let app = TestApp::spawn().await;
    let owner = app.sign_up("owner@example.com").await;
    app.create_campaign(&owner, 10_000).await;
    let end_date = chrono::Utc::now() + chrono::Duration::days(30);
    let (status, solar) = app
        .call(
            Method::POST,
            "/campaigns",
            Some(&owner),
            Some(json!({
                "title": "100% solar_lamps",
                "description": "Lamps for the night market.",
                "category": "community",
                "goal_amount": 5_000,
                "end_date": end_date,
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, lower) = app.call(Method::GET, "/campaigns?search=kibera", None, None).await;
    assert_eq!(lower.as_array().unwrap().len(), 1);
    assert_eq!(lower[0]["title"], "Clean water for Kibera");

    for term in ["%25", "_", "SOLAR_"] {
        let (status, found) = app
            .call(Method::GET, &format!("/campaigns?search={term}"), None, None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(found.as_array().unwrap().len(), 1, "{term}");
        assert_eq!(found[0]["id"], solar["id"], "{term}");
    }
}

#[tokio::test]
async fn test_offset_beyond_signed_range_is_empty_page() {
    let app = TestApp::spawn().await;
    let owner = app.sign_up("owner@example.com").await;
    app.create_campaign(&owner, 10_000).await;
    let huge = u64::MAX;

    let (status, page) = app
        .call(Method::GET, &format!("/campaigns?offset={huge}"), None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(page.as_array().unwrap().is_empty());

    let (status, page) = app
        .call(Method::GET, &format!("/notifications?offset={huge}"), Some(&owner), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(page.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_only_owner_can_edit_campaign() {
    let app = TestApp::spawn().await;
    let owner = app.sign_up("owner@example.com").await;
    let stranger = app.sign_up("stranger@example.com").await;
    let campaign = app.create_campaign(&owner, 10_000).await;
    let uri = format!("/campaigns/{campaign}");

    let (status, _) = app
        .call(Method::PATCH, &uri, Some(&stranger), Some(json!({"title": "Mine now"})))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, updated) = app
        .call(Method::PATCH, &uri, Some(&owner), Some(json!({"title": "Boreholes for Kibera"})))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["title"], "Boreholes for Kibera");
    assert_eq!(updated["category"], "community");
}

#[tokio::test]
async fn test_unknown_campaign_is_not_found() {
    let app = TestApp::spawn().await;

    let (status, body) = app
        .call(Method::GET, &format!("/campaigns/{}", Uuid::new_v4()), None, None)
        .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().starts_with("Not found"));
}

#[tokio::test]
async fn test_anonymous_donation_hides_donor() {
    let app = TestApp::spawn().await;
    let owner = app.sign_up("owner@example.com").await;
    let campaign = app.create_campaign(&owner, 10_000).await;

    let (status, receipt) = app
        .call(
            Method::POST,
            &format!("/campaigns/{campaign}/donations"),
            None,
            Some(json!({
                "amount": 2_500,
                "donor_name": "Secret Sam",
                "donor_email": "sam@example.com",
                "is_anonymous": true,
                "message": "Keep going!",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(receipt["donation"]["status"], "completed");
    assert!(receipt["donation"]["donor_name"].is_null());
    assert!(receipt["donation"]["donor_email"].is_null());
    assert_eq!(receipt["campaign"]["raised"], 2_500);
    assert_eq!(receipt["campaign"]["percent_funded"], 25);

    let (_, listed) = app
        .call(Method::GET, &format!("/campaigns/{campaign}/donations"), None, None)
        .await;
    assert_eq!(listed[0]["donor_name"], "Anonymous");
    assert_eq!(listed[0]["message"], "Keep going!");
    assert!(listed[0].get("donor_email").is_none());
}

#[tokio::test]
async fn test_signed_in_donation_shows_in_history() {
    let app = TestApp::spawn().await;
    let owner = app.sign_up("owner@example.com").await;
    let donor = app.sign_up("donor@example.com").await;
    let campaign = app.create_campaign(&owner, 10_000).await;

    let (status, _) = app.donate(campaign, Some(&donor), 700).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, history) = app.call(Method::GET, "/me/donations", Some(&donor), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(history.as_array().unwrap().len(), 1);
    assert_eq!(history[0]["amount"], 700);
    assert_eq!(history[0]["campaign_id"], campaign.to_string());
}

#[tokio::test]
async fn test_declined_payment_does_not_count() {
    let app = TestApp::spawn().await;
    let owner = app.sign_up("owner@example.com").await;
    let campaign = app.create_campaign(&owner, 10_000_000).await;

    let (status, body) = app.donate(campaign, None, DECLINE_ABOVE + 1).await;
    assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
    assert!(body["error"].as_str().unwrap().contains("declined"));

    let (_, detail) = app.call(Method::GET, &format!("/campaigns/{campaign}"), None, None).await;
    assert_eq!(detail["progress"]["raised"], 0);
    assert_eq!(detail["progress"]["donor_count"], 0);

    let (_, listed) = app
        .call(Method::GET, &format!("/campaigns/{campaign}/donations"), None, None)
        .await;
    assert!(listed.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_donation_amount_must_be_positive() {
    let app = TestApp::spawn().await;
    let owner = app.sign_up("owner@example.com").await;
    let campaign = app.create_campaign(&owner, 10_000).await;

    let (status, _) = app.donate(campaign, None, 0).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_owner_notified_of_donation() {
    let app = TestApp::spawn().await;
    let owner = app.sign_up("owner@example.com").await;
    let campaign = app.create_campaign(&owner, 10_000).await;
    app.donate(campaign, None, 1_000).await;

    let (status, inbox) = app.call(Method::GET, "/notifications", Some(&owner), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(inbox.as_array().unwrap().len(), 1);
    assert_eq!(inbox[0]["kind"], "donation_received");
    assert_eq!(inbox[0]["is_read"], false);

    let id = inbox[0]["id"].as_str().unwrap();
    let (status, read) = app
        .call(Method::POST, &format!("/notifications/{id}/read"), Some(&owner), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(read["is_read"], true);

    let other = app.sign_up("other@example.com").await;
    let (status, _) = app
        .call(Method::POST, &format!("/notifications/{id}/read"), Some(&other), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_withdrawal_limited_to_available_balance() {
    let app = TestApp::spawn().await;
    let owner = app.sign_up("owner@example.com").await;
    let admin = app.sign_up(ADMIN_EMAIL).await;
    let campaign = app.create_campaign(&owner, 200_000).await;
    app.donate(campaign, None, 60_000).await;
    app.donate(campaign, None, 40_000).await;
    let withdrawals = format!("/campaigns/{campaign}/withdrawals");
    let request = |amount: i64| {
        json!({
            "amount": amount,
            "payment_method": "bank_transfer",
            "payment_details": "KCB 0011223344",
        })
    };

    let (status, paid) = app
        .call(Method::POST, &withdrawals, Some(&owner), Some(request(50_000)))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let paid_id = paid["id"].as_str().unwrap();
    let (status, _) = app
        .call(Method::POST, &format!("/admin/withdrawals/{paid_id}/complete"), Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .call(Method::POST, &withdrawals, Some(&owner), Some(request(10_000)))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, balance) = app
        .call(Method::GET, &format!("/campaigns/{campaign}/balance"), Some(&owner), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(balance["current_amount"], 100_000);
    assert_eq!(balance["ledger"]["completed_withdrawals"], 50_000);
    assert_eq!(balance["ledger"]["pending_withdrawals"], 10_000);
    assert_eq!(balance["ledger"]["available"], 40_000);

    let (status, body) = app
        .call(Method::POST, &withdrawals, Some(&owner), Some(request(40_001)))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"].as_str().unwrap().contains("exceeds available balance 40000"));

    let (status, _) = app
        .call(Method::POST, &withdrawals, Some(&owner), Some(request(40_000)))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, listed) = app.call(Method::GET, &withdrawals, Some(&owner), None).await;
    assert_eq!(listed.as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_only_owner_requests_withdrawals() {
    let app = TestApp::spawn().await;
    let owner = app.sign_up("owner@example.com").await;
    let stranger = app.sign_up("stranger@example.com").await;
    let campaign = app.create_campaign(&owner, 10_000).await;
    app.donate(campaign, None, 5_000).await;

    let (status, _) = app
        .call(
            Method::POST,
            &format!("/campaigns/{campaign}/withdrawals"),
            Some(&stranger),
            Some(json!({
                "amount": 100,
                "payment_method": "mobile_money",
                "payment_details": "0700",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .call(Method::GET, &format!("/campaigns/{campaign}/balance"), Some(&stranger), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_rejected_withdrawal_releases_funds() {
    let app = TestApp::spawn().await;
    let owner = app.sign_up("owner@example.com").await;
    let admin = app.sign_up(ADMIN_EMAIL).await;
    let campaign = app.create_campaign(&owner, 10_000).await;
    app.donate(campaign, None, 5_000).await;

    let (_, pending) = app
        .call(
            Method::POST,
            &format!("/campaigns/{campaign}/withdrawals"),
            Some(&owner),
            Some(json!({
                "amount": 5_000,
                "payment_method": "mobile_money",
                "payment_details": "0700",
            })),
        )
        .await;
    let id = pending["id"].as_str().unwrap();

    let (status, queue) = app
        .call(Method::GET, "/admin/withdrawals?status=pending", Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(queue.as_array().unwrap().len(), 1);

    let reject_uri = format!("/admin/withdrawals/{id}/reject");
    let (status, rejected) = app
        .call(Method::POST, &reject_uri, Some(&admin), Some(json!({"note": "details incomplete"})))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(rejected["status"], "rejected");
    assert_eq!(rejected["review_note"], "details incomplete");

    let (status, _) = app
        .call(Method::POST, &format!("/admin/withdrawals/{id}/complete"), Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, balance) = app
        .call(Method::GET, &format!("/campaigns/{campaign}/balance"), Some(&owner), None)
        .await;
    assert_eq!(balance["ledger"]["available"], 5_000);

    let (_, inbox) = app.call(Method::GET, "/notifications", Some(&owner), None).await;
    assert!(inbox
        .as_array()
        .unwrap()
        .iter()
        .any(|n| n["kind"] == "withdrawal_rejected"
            && n["message"].as_str().unwrap().contains("details incomplete")));
}

#[tokio::test]
async fn test_reject_withdrawal_without_note() {
    let app = TestApp::spawn().await;
    let owner = app.sign_up("owner@example.com").await;
    let admin = app.sign_up(ADMIN_EMAIL).await;
    let campaign = app.create_campaign(&owner, 10_000).await;
    app.donate(campaign, None, 2_000).await;

    let (_, pending) = app
        .call(
            Method::POST,
            &format!("/campaigns/{campaign}/withdrawals"),
            Some(&owner),
            Some(json!({
                "amount": 2_000,
                "payment_method": "bank_transfer",
                "payment_details": "ACC 123",
            })),
        )
        .await;
    let id = pending["id"].as_str().unwrap();

    let (status, rejected) = app
        .call(Method::POST, &format!("/admin/withdrawals/{id}/reject"), Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(rejected["status"], "rejected");
    assert!(rejected["review_note"].is_null());
}

#[tokio::test]
async fn test_admin_routes_require_admin() {
    let app = TestApp::spawn().await;
    let member = app.sign_up("member@example.com").await;

    let admin_pages = [
        "/admin/campaigns",
        "/admin/withdrawals",
        "/admin/users",
        "/admin/donations/export",
    ];
    for uri in admin_pages {
        let (status, _) = app.call(Method::GET, uri, Some(&member), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN, "{uri}");
    }
    let (status, _) = app.call(Method::POST, "/admin/reconcile", Some(&member), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_hidden_campaign_visibility() {
    let app = TestApp::spawn().await;
    let owner = app.sign_up("owner@example.com").await;
    let admin = app.sign_up(ADMIN_EMAIL).await;
    let campaign = app.create_campaign(&owner, 10_000).await;
    let detail = format!("/campaigns/{campaign}");

    let (status, hidden) = app
        .call(
            Method::PATCH,
            &format!("/admin/campaigns/{campaign}/moderation"),
            Some(&admin),
            Some(json!({"moderation": "hidden"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(hidden["moderation"], "hidden");

    let (status, _) = app.call(Method::GET, &detail, None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (_, listed) = app.call(Method::GET, "/campaigns", None, None).await;
    assert!(listed.as_array().unwrap().is_empty());

    let (status, _) = app.call(Method::GET, &detail, Some(&owner), None).await;
    assert_eq!(status, StatusCode::OK);
    let (_, mine) = app.call(Method::GET, "/me/campaigns", Some(&owner), None).await;
    assert_eq!(mine.as_array().unwrap().len(), 1);
    let (_, all) = app.call(Method::GET, "/admin/campaigns", Some(&admin), None).await;
    assert_eq!(all.as_array().unwrap().len(), 1);

    let (status, _) = app.donate(campaign, None, 100).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, inbox) = app.call(Method::GET, "/notifications", Some(&owner), None).await;
    assert_eq!(inbox[0]["kind"], "campaign_hidden");
}

#[tokio::test]
async fn test_admin_lists_users_and_exports_donations() {
    let app = TestApp::spawn().await;
    let owner = app.sign_up("owner@example.com").await;
    let admin = app.sign_up(ADMIN_EMAIL).await;
    let campaign = app.create_campaign(&owner, 10_000).await;
    app.donate(campaign, None, 1_234).await;

    let (status, users) = app.call(Method::GET, "/admin/users", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(users.as_array().unwrap().len(), 2);

    let request = Request::builder()
        .uri("/admin/donations/export")
        .header(header::AUTHORIZATION, format!("Bearer {admin}"))
        .body(Body::empty())
        .unwrap();
    let response = app.send(request).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers()[header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("text/csv"));
    let bytes = to_bytes(response.into_body(), 1024 * 1024).await.unwrap();
    let csv = String::from_utf8(bytes.to_vec()).unwrap();
    let mut lines = csv.lines();
    let header_row = lines.next().unwrap();
    assert!(header_row.starts_with("donation_id,campaign_id,campaign_title,amount,status"));
    let row = lines.next().unwrap();
    assert!(row.contains("Clean water for Kibera"));
    assert!(row.contains(",1234,completed,"));
    assert!(lines.next().is_none());
}

#[tokio::test]
async fn test_success_stories_lists_funded_campaigns() {
    let app = TestApp::spawn().await;
    let owner = app.sign_up("owner@example.com").await;
    let funded = app.create_campaign(&owner, 1_000).await;
    app.create_campaign(&owner, 1_000).await;
    app.donate(funded, None, 1_000).await;

    let (status, stories) = app.call(Method::GET, "/success-stories", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(stories.as_array().unwrap().len(), 1);
    assert_eq!(stories[0]["id"], funded.to_string());
    assert_eq!(stories[0]["progress"]["status"], "funded");
}

#[tokio::test]
async fn test_newsletter_subscribe_is_idempotent() {
    let app = TestApp::spawn().await;
    let body = json!({"email": "Reader@Example.com"});

    let (status, first) = app
        .call(Method::POST, "/newsletter/subscribe", None, Some(body.clone()))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(first["subscribed"], true);

    let (status, second) = app
        .call(
            Method::POST,
            "/newsletter/subscribe",
            None,
            Some(json!({"email": "reader@example.com"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["subscribed"], true);

    let (status, _) = app
        .call(Method::POST, "/newsletter/subscribe", None, Some(json!({"email": "not-an-email"})))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_blog_posts_and_feed() {
    let app = TestApp::spawn().await;
    let admin = app.sign_up(ADMIN_EMAIL).await;

    let (status, post) = app
        .call(
            Method::POST,
            "/admin/blog",
            Some(&admin),
            Some(json!({
                "slug": "first-boreholes",
                "title": "The first boreholes are flowing",
                "excerpt": "An update from Kibera.",
                "body": "Both schools now have clean water.",
                "publish": true,
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(post["slug"], "first-boreholes");

    let (status, _) = app
        .call(
            Method::POST,
            "/admin/blog",
            Some(&admin),
            Some(json!({"slug": "draft-notes", "title": "Draft", "body": "Not yet."})),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = app
        .call(
            Method::POST,
            "/admin/blog",
            Some(&admin),
            Some(json!({"slug": "first-boreholes", "title": "Again", "body": "Dup"})),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, posts) = app.call(Method::GET, "/blog", None, None).await;
    assert_eq!(posts.as_array().unwrap().len(), 1);

    let (status, _) = app.call(Method::GET, "/blog/draft-notes", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, full) = app.call(Method::GET, "/blog/first-boreholes", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(full["body"], "Both schools now have clean water.");

    let response = app
        .send(Request::builder().uri("/blog/feed.xml").body(Body::empty()).unwrap())
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers()[header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("application/rss+xml"));
    let bytes = to_bytes(response.into_body(), 1024 * 1024).await.unwrap();
    let xml = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(xml.contains("<rss"));
    assert!(xml.contains("The first boreholes are flowing"));
    assert!(xml.contains("http://localhost:3000/blog/first-boreholes"));
    assert!(!xml.contains("draft-notes"));
}

#[tokio::test]
async fn test_campaign_image_upload_and_serve() {
    let app = TestApp::spawn().await;
    let owner = app.sign_up("owner@example.com").await;
    let campaign = app.create_campaign(&owner, 10_000).await;
    let uri = format!("/campaigns/{campaign}/image");
    let upload = |content_type: &str, bytes: Vec<u8>| {
        Request::builder()
            .method(Method::PUT)
            .uri(&uri)
            .header(header::AUTHORIZATION, format!("Bearer {owner}"))
            .header(header::CONTENT_TYPE, content_type)
            .body(Body::from(bytes))
            .unwrap()
    };

    let response = app.send(upload("text/plain", b"hello".to_vec())).await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let response = app.send(upload("image/png", vec![0u8; 2048])).await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let png = b"\x89PNG\r\n\x1a\nfake image".to_vec();
    let response = app.send(upload("image/png", png.clone())).await;
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), 1024 * 1024).await.unwrap();
    let updated: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    let image_url = updated["image_url"].as_str().unwrap();
    let expected_prefix = format!("http://localhost:3000/storage/campaign-images/{campaign}/");
    assert!(image_url.starts_with(&expected_prefix));
    assert!(image_url.ends_with(".png"));

    let path = image_url.trim_start_matches("http://localhost:3000");
    let response = app
        .send(Request::builder().uri(path).body(Body::empty()).unwrap())
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let served = to_bytes(response.into_body(), 1024 * 1024).await.unwrap();
    assert_eq!(served.to_vec(), png);
}
