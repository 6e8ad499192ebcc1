use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use pitchpoint_api::{AppState, AppStateInner, auth, router};
use pitchpoint_db::Database;

const SECRET: &str = "integration-secret";
const ADMIN_EMAIL: &str = "admin@pitchpoint.co.za";
const ADMIN_PASSWORD: &str = "admin-pass";

fn app() -> (Router, AppState) {
    let db = Database::open_in_memory().unwrap();
    auth::seed_admin(&db, ADMIN_EMAIL, ADMIN_PASSWORD).unwrap();
    let state = AppStateInner::new(db, SECRET.into(), 30);
    (router(state.clone()), state)
}

async fn call(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut req = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        req = req.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let req = match body {
        Some(body) => req
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => req.body(Body::empty()).unwrap(),
    };

    let res = app.clone().oneshot(req).await.unwrap();
    let status = res.status();
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

fn entrepreneur_form(email: &str) -> Value {
    json!({
        "full_name": "Thabo Nkosi",
        "email": email,
        "password": "secret1",
        "company_name": "AgriFlow",
        "industry": "AgriTech",
        "founding_year": 2021,
        "location": "Durban",
        "funding_stage": "Seed",
        "funding_amount": 500000.0,
        "pitch_summary": "x".repeat(50),
        "website": ""
    })
}

fn investor_form(email: &str) -> Value {
    json!({
        "full_name": "Sarah Molefe",
        "email": email,
        "password": "secret1",
        "location": "Johannesburg",
        "ticket_size_min": 100000.0,
        "ticket_size_max": 1000000.0,
        "portfolio_count": 4,
        "bio": "b".repeat(60),
        "website": "https://capital.co.za",
        "investment_focus": ["FinTech"],
        "preferred_stages": ["Seed"]
    })
}

async fn signup_entrepreneur(app: &Router, email: &str) -> (String, String) {
    let (status, body) = call(
        app,
        "POST",
        "/auth/signup/entrepreneur",
        None,
        Some(entrepreneur_form(email)),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    (
        body["token"].as_str().unwrap().to_string(),
        body["user_id"].as_str().unwrap().to_string(),
    )
}

async fn signup_investor(app: &Router, email: &str) -> (String, String) {
    let (status, body) =
        call(app, "POST", "/auth/signup/investor", None, Some(investor_form(email))).await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    (
        body["token"].as_str().unwrap().to_string(),
        body["user_id"].as_str().unwrap().to_string(),
    )
}

async fn admin_token(app: &Router) -> String {
    let (status, body) = call(
        app,
        "POST",
        "/auth/signin",
        None,
        Some(json!({ "email": ADMIN_EMAIL, "password": ADMIN_PASSWORD })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["role"], "admin");
    body["token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn entrepreneur_signup_reaches_dashboard() {
    let (app, _) = app();
    let (token, user_id) = signup_entrepreneur(&app, "thabo@agriflow.co.za").await;

    let (status, body) = call(&app, "GET", "/dashboard/entrepreneur", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["profile"]["id"], user_id);
    assert_eq!(body["profile_completion"], 100);

    let (status, body) = call(&app, "GET", "/auth/session", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["role"], "entrepreneur");
    assert_eq!(body["email"], "thabo@agriflow.co.za");
}

#[tokio::test]
async fn basic_signup_completion_starts_at_zero() {
    let (app, _) = app();
    let (status, body) = call(
        &app,
        "POST",
        "/auth/signup",
        None,
        Some(json!({
            "email": "lerato@example.com",
            "password": "secret1",
            "full_name": "Lerato",
            "role": "entrepreneur"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let token = body["token"].as_str().unwrap();

    let (_, body) = call(&app, "GET", "/dashboard/entrepreneur", Some(token), None).await;
    assert_eq!(body["profile_completion"], 0);

    let (status, _) = call(
        &app,
        "PATCH",
        "/profile",
        Some(token),
        Some(json!({ "company_name": "Kasi Pay", "industry": "FinTech" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = call(&app, "GET", "/dashboard/entrepreneur", Some(token), None).await;
    assert_eq!(body["profile_completion"], 40);
}

#[tokio::test]
async fn public_signup_cannot_create_admins() {
    let (app, state) = app();
    let (status, body) = call(
        &app,
        "POST",
        "/auth/signup",
        None,
        Some(json!({
            "email": "sneaky@example.com",
            "password": "secret1",
            "full_name": "Sneaky",
            "role": "admin"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["field"], "role");
    assert!(state.db.get_user_by_email("sneaky@example.com").unwrap().is_none());
}

#[tokio::test]
async fn short_pitch_is_rejected_before_storage() {
    let (app, state) = app();

    let mut form = entrepreneur_form("short@example.com");
    form["pitch_summary"] = json!("x".repeat(49));
    let (status, body) = call(&app, "POST", "/auth/signup/entrepreneur", None, Some(form)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "validation_error");
    assert_eq!(body["field"], "pitch_summary");
    assert_eq!(body["message"], "Pitch summary must be at least 50 characters");
    assert!(state.db.get_user_by_email("short@example.com").unwrap().is_none());

    signup_entrepreneur(&app, "short@example.com").await;
}

#[tokio::test]
async fn inverted_ticket_range_is_rejected_before_storage() {
    let (app, state) = app();

    let mut form = investor_form("inverted@example.com");
    form["ticket_size_min"] = json!(2000000.0);
    let (status, body) = call(&app, "POST", "/auth/signup/investor", None, Some(form)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        body["message"],
        "Minimum ticket size cannot be greater than maximum"
    );
    assert!(state.db.get_user_by_email("inverted@example.com").unwrap().is_none());
}

#[tokio::test]
async fn duplicate_email_conflicts() {
    let (app, _) = app();
    signup_investor(&app, "sarah@capital.co.za").await;

    let (status, body) = call(
        &app,
        "POST",
        "/auth/signup/investor",
        None,
        Some(investor_form("sarah@capital.co.za")),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "conflict");
}

#[tokio::test]
async fn role_mismatch_is_refused_without_data() {
    let (app, _) = app();
    let (investor, _) = signup_investor(&app, "sarah@capital.co.za").await;

    let (status, body) = call(&app, "GET", "/dashboard/entrepreneur", Some(&investor), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "access_denied");
    assert_eq!(body["message"], "This dashboard is only for entrepreneurs");
    assert!(body.get("profile").is_none());

    let (status, body) = call(&app, "GET", "/admin/users", Some(&investor), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "This dashboard is only for admins");
    assert!(body.get("users").is_none());

    let (status, body) = call(&app, "GET", "/dashboard/investor", Some(&investor), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["startups"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn missing_or_revoked_session_is_unauthorized() {
    let (app, _) = app();
    let (status, _) = call(&app, "GET", "/auth/user", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (token, _) = signup_entrepreneur(&app, "thabo@agriflow.co.za").await;
    let (status, body) = call(&app, "GET", "/auth/user", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["role"], "entrepreneur");

    let (status, _) = call(&app, "POST", "/auth/signout", Some(&token), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = call(&app, "GET", "/auth/user", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn investor_sees_startups() {
    let (app, _) = app();
    signup_entrepreneur(&app, "thabo@agriflow.co.za").await;
    let (investor, _) = signup_investor(&app, "sarah@capital.co.za").await;

    let (status, body) = call(&app, "GET", "/dashboard/investor", Some(&investor), None).await;
    assert_eq!(status, StatusCode::OK);
    let startups = body["startups"].as_array().unwrap();
    assert_eq!(startups.len(), 1);
    assert_eq!(startups[0]["company_name"], "AgriFlow");
}

#[tokio::test]
async fn verification_actions_only_while_pending() {
    let (app, _) = app();
    let admin = admin_token(&app).await;
    let (founder, founder_id) = signup_entrepreneur(&app, "thabo@agriflow.co.za").await;

    let (status, body) = call(
        &app,
        "POST",
        "/verifications",
        Some(&founder),
        Some(json!({ "documents": 3 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["type"], "company");
    assert_eq!(body["subject_name"], "AgriFlow");
    assert_eq!(body["actions"], json!(["approve", "reject"]));
    let id = body["id"].as_str().unwrap().to_string();

    let (status, _) = call(&app, "POST", "/verifications", Some(&founder), Some(json!({}))).await;
    assert_eq!(status, StatusCode::CONFLICT);

    // Unverified users cannot be messaged yet
    let message = json!({
        "recipient_id": founder_id,
        "subject": "Welcome",
        "body": "Glad to have you"
    });
    let (status, body) =
        call(&app, "POST", "/admin/messages", Some(&admin), Some(message.clone())).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["field"], "recipient_id");

    let (_, body) = call(&app, "GET", "/admin/verifications", Some(&admin), None).await;
    assert_eq!(body["counts"]["pending"], 1);
    assert_eq!(body["verifications"].as_array().unwrap().len(), 1);

    let uri = format!("/admin/verifications/{}/approve", id);
    let (status, body) = call(&app, "POST", &uri, Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "approved");
    assert_eq!(body["actions"], json!([]));

    let (status, _) = call(&app, "POST", &uri, Some(&admin), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    let reject = format!("/admin/verifications/{}/reject", id);
    let (status, _) = call(&app, "POST", &reject, Some(&admin), None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, body) = call(&app, "GET", "/admin/verifications", Some(&admin), None).await;
    assert!(body["verifications"].as_array().unwrap().is_empty());
    let (_, body) =
        call(&app, "GET", "/admin/verifications?status=approved", Some(&admin), None).await;
    assert_eq!(body["verifications"][0]["actions"], json!([]));

    let (status, _) = call(&app, "POST", "/admin/messages", Some(&admin), Some(message)).await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn admins_cannot_request_verification() {
    let (app, _) = app();
    let admin = admin_token(&app).await;
    let (status, body) = call(&app, "POST", "/verifications", Some(&admin), Some(json!({}))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "access_denied");
}

#[tokio::test]
async fn message_reply_round_trip() {
    let (app, _) = app();
    let admin = admin_token(&app).await;
    let (investor, investor_id) = signup_investor(&app, "sarah@capital.co.za").await;

    let (_, body) =
        call(&app, "POST", "/verifications", Some(&investor), Some(json!({ "documents": 1 }))).await;
    let vid = body["id"].as_str().unwrap().to_string();
    call(
        &app,
        "POST",
        &format!("/admin/verifications/{}/approve", vid),
        Some(&admin),
        None,
    )
    .await;

    let (status, sent) = call(
        &app,
        "POST",
        "/admin/messages",
        Some(&admin),
        Some(json!({ "recipient_id": investor_id, "subject": "Welcome", "body": "Hello" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(sent["sender_name"], "Administrator");

    let (_, inbox) = call(&app, "GET", "/messages", Some(&investor), None).await;
    assert_eq!(inbox["unread"], 1);

    let uri = format!("/messages/{}/reply", sent["id"].as_str().unwrap());
    let (status, reply) =
        call(&app, "POST", &uri, Some(&investor), Some(json!({ "body": "Thanks" }))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(reply["subject"], "Re: Welcome");

    // The original sender cannot "reply" to their own message
    let (status, _) = call(&app, "POST", &uri, Some(&admin), Some(json!({ "body": "x" }))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let uri = format!("/admin/messages/{}/reply", reply["id"].as_str().unwrap());
    let (status, again) =
        call(&app, "POST", &uri, Some(&admin), Some(json!({ "body": "Anytime" }))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(again["subject"], "Re: Welcome");

    let (_, inbox) = call(&app, "GET", "/admin/messages?search=welcome", Some(&admin), None).await;
    assert_eq!(inbox["unread"], 1);

    let star = format!("/admin/messages/{}/star", reply["id"].as_str().unwrap());
    let (_, starred) = call(&app, "POST", &star, Some(&admin), None).await;
    assert_eq!(starred["starred"], true);
    let (_, unstarred) = call(&app, "POST", &star, Some(&admin), None).await;
    assert_eq!(unstarred["starred"], false);
}

#[tokio::test]
async fn toggling_publish_twice_restores_status() {
    let (app, _) = app();
    let admin = admin_token(&app).await;

    let (status, item) = call(
        &app,
        "POST",
        "/admin/content",
        Some(&admin),
        Some(json!({ "title": "Raising a seed round", "type": "article", "body": "..." })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(item["status"], "draft");

    let uri = format!("/admin/content/{}/toggle-publish", item["id"].as_str().unwrap());
    let (_, once) = call(&app, "POST", &uri, Some(&admin), None).await;
    assert_eq!(once["status"], "published");
    let (_, twice) = call(&app, "POST", &uri, Some(&admin), None).await;
    assert_eq!(twice["status"], "draft");

    let (_, list) = call(&app, "GET", "/admin/content?status=published", Some(&admin), None).await;
    assert!(list["items"].as_array().unwrap().is_empty());
    assert_eq!(list["counts"]["articles"], 1);

    let item_uri = format!("/admin/content/{}", item["id"].as_str().unwrap());
    let (status, _) = call(&app, "DELETE", &item_uri, Some(&admin), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = call(&app, "GET", &item_uri, Some(&admin), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn dismissed_report_leaves_working_views() {
    let (app, _) = app();
    let admin = admin_token(&app).await;
    let (investor, _) = signup_investor(&app, "sarah@capital.co.za").await;

    let (status, report) = call(
        &app,
        "POST",
        "/reports",
        Some(&investor),
        Some(json!({
            "reported_entity": "FakeStartup Ltd",
            "type": "fraud",
            "severity": "critical",
            "description": "Pitch deck is copied"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(report["reporter_name"], "Sarah Molefe");
    let uri = format!("/admin/reports/{}/status", report["id"].as_str().unwrap());

    let (_, open) = call(&app, "GET", "/admin/reports", Some(&admin), None).await;
    assert_eq!(open["reports"].as_array().unwrap().len(), 1);
    assert_eq!(open["stats"]["critical"], 1);

    let (status, dismissed) =
        call(&app, "POST", &uri, Some(&admin), Some(json!({ "status": "dismissed" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(dismissed["transitions"], json!([]));

    for view in ["open", "investigating"] {
        let (_, list) = call(
            &app,
            "GET",
            &format!("/admin/reports?status={}", view),
            Some(&admin),
            None,
        )
        .await;
        assert!(list["reports"].as_array().unwrap().is_empty(), "{} view", view);
    }
    let (_, all) = call(&app, "GET", "/admin/reports?status=all", Some(&admin), None).await;
    assert_eq!(all["reports"].as_array().unwrap().len(), 1);

    let (status, _) =
        call(&app, "POST", &uri, Some(&admin), Some(json!({ "status": "investigating" }))).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn settings_are_validated_and_stored() {
    let (app, _) = app();
    let admin = admin_token(&app).await;

    let (status, defaults) = call(&app, "GET", "/admin/settings", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(defaults["platform_name"], "PitchPoint");
    assert_eq!(defaults["session_timeout_minutes"], 30);

    let mut changed = defaults.clone();
    changed["session_timeout_minutes"] = json!(45);
    let (status, body) = call(&app, "PUT", "/admin/settings", Some(&admin), Some(changed.clone())).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["field"], "session_timeout_minutes");

    changed["session_timeout_minutes"] = json!(60);
    changed["maintenance_mode"] = json!(true);
    let (status, _) = call(&app, "PUT", "/admin/settings", Some(&admin), Some(changed)).await;
    assert_eq!(status, StatusCode::OK);

    let (_, stored) = call(&app, "GET", "/admin/settings", Some(&admin), None).await;
    assert_eq!(stored["session_timeout_minutes"], 60);
    assert_eq!(stored["maintenance_mode"], true);
}

#[tokio::test]
async fn admin_analytics_and_user_search() {
    let (app, _) = app();
    let admin = admin_token(&app).await;
    signup_entrepreneur(&app, "thabo@agriflow.co.za").await;
    signup_investor(&app, "sarah@capital.co.za").await;

    let (status, body) = call(&app, "GET", "/dashboard/admin", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_users"], 3);
    assert_eq!(body["roles"]["entrepreneurs"], 1);
    assert_eq!(body["roles"]["investors"], 1);
    assert_eq!(body["roles"]["admins"], 1);

    let (_, users) = call(&app, "GET", "/admin/users?search=agri", Some(&admin), None).await;
    let users = users["users"].as_array().unwrap();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0]["role"], "entrepreneur");

    let (_, users) = call(&app, "GET", "/admin/users?search=INVESTOR", Some(&admin), None).await;
    assert_eq!(users["users"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn health_is_public() {
    let (app, _) = app();
    let (status, body) = call(&app, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn only_the_recipient_can_mark_a_message_read() {
    let (app, _) = app();
    let admin = admin_token(&app).await;
    let (investor, investor_id) = signup_investor(&app, "sarah@capital.co.za").await;

    let (_, body) =
        call(&app, "POST", "/verifications", Some(&investor), Some(json!({ "documents": 1 }))).await;
    let approve = format!("/admin/verifications/{}/approve", body["id"].as_str().unwrap());
    call(&app, "POST", &approve, Some(&admin), None).await;

    let (_, sent) = call(
        &app,
        "POST",
        "/admin/messages",
        Some(&admin),
        Some(json!({ "recipient_id": investor_id, "subject": "Welcome", "body": "Hello" })),
    )
    .await;
    let id = sent["id"].as_str().unwrap();

    // The sender cannot clear the recipient's unread state
    let (status, _) =
        call(&app, "POST", &format!("/admin/messages/{}/read", id), Some(&admin), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (_, inbox) = call(&app, "GET", "/messages", Some(&investor), None).await;
    assert_eq!(inbox["unread"], 1);

    // Starring is still open to both sides
    let (status, _) =
        call(&app, "POST", &format!("/admin/messages/{}/star", id), Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, read) =
        call(&app, "POST", &format!("/messages/{}/read", id), Some(&investor), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(read["read"], true);
    let (_, inbox) = call(&app, "GET", "/messages", Some(&investor), None).await;
    assert_eq!(inbox["unread"], 0);
}
