/// Integration tests for the TaskVault API
///
/// These tests drive the full router (middleware included) over an
/// in-memory store:
/// - Registration and login
/// - Bearer token enforcement
/// - Task lifecycle and owner scoping
/// - Error shapes and status codes

mod common;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use common::{TestContext, TEST_PASSWORD};
use serde_json::json;

#[tokio::test]
async fn test_end_to_end_flow() {
    let ctx = TestContext::new();

    let registered = ctx.register("tester", "tester@example.com").await;
    assert_eq!(registered["username"], "tester");
    assert_eq!(registered["email"], "tester@example.com");
    assert!(registered["user_id"].is_i64());
    assert!(registered.get("password_hash").is_none());

    let token = ctx.login("tester").await;

    let created = ctx
        .send("POST", "/api/tasks", Some(&token), Some(json!({ "title": "Buy milk" })))
        .await;
    assert_eq!(created.status, StatusCode::CREATED);
    assert_eq!(created.body["title"], "Buy milk");
    assert_eq!(created.body["status"], "pending");
    assert_eq!(created.body["priority"], "medium");
    assert_eq!(created.body["description"], serde_json::Value::Null);
    let task_id = created.body["id"].as_i64().unwrap();

    let listed = ctx
        .send("GET", "/api/tasks?priority=medium", Some(&token), None)
        .await;
    assert_eq!(listed.status, StatusCode::OK);
    assert_eq!(listed.body["tasks"].as_array().unwrap().len(), 1);
    assert_eq!(listed.body["pagination"]["total"], 1);
    assert_eq!(listed.body["pagination"]["total_pages"], 1);

    let updated = ctx
        .send(
            "PUT",
            &format!("/api/tasks/{}", task_id),
            Some(&token),
            Some(json!({ "status": "completed", "description": "semi-skimmed" })),
        )
        .await;
    assert_eq!(updated.status, StatusCode::OK);
    assert_eq!(updated.body["status"], "completed");
    assert_eq!(updated.body["description"], "semi-skimmed");
    assert_eq!(updated.body["title"], "Buy milk");

    let deleted = ctx
        .send("DELETE", &format!("/api/tasks/{}", task_id), Some(&token), None)
        .await;
    assert_eq!(deleted.status, StatusCode::OK);
    assert_eq!(deleted.body["id"], task_id);

    let listed = ctx.send("GET", "/api/tasks", Some(&token), None).await;
    assert_eq!(listed.body["pagination"]["total"], 0);
}

#[tokio::test]
async fn test_login_response_shape() {
    let ctx = TestContext::with_vars(&[("JWT_EXP_MIN", "45")]);
    ctx.register("tester", "tester@example.com").await;

    let response = ctx
        .send(
            "POST",
            "/login",
            None,
            Some(json!({ "identity": "TESTER@EXAMPLE.com", "password": TEST_PASSWORD })),
        )
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["token_type"], "Bearer");
    assert_eq!(response.body["expires_in"], ctx.config.jwt.expiry_minutes * 60);
    assert_eq!(response.body["expires_in"], 2700);
    assert_eq!(response.body["user"]["username"], "tester");
    assert_eq!(response.body["user"]["email"], "tester@example.com");
    assert!(response.body["token"].as_str().unwrap().len() > 20);
}

#[tokio::test]
async fn test_bad_credentials_rejected() {
    let ctx = TestContext::new();
    ctx.register("tester", "tester@example.com").await;

    for (identity, password) in [("tester", "wrong-password"), ("nobody", TEST_PASSWORD)] {
        let response = ctx
            .send(
                "POST",
                "/login",
                None,
                Some(json!({ "identity": identity, "password": password })),
            )
            .await;
        assert_eq!(response.status, StatusCode::UNAUTHORIZED);
        assert_eq!(response.body["error"], "unauthorized");
        assert_eq!(response.body["message"], "Invalid credentials");
    }

    let empty = ctx
        .send("POST", "/login", None, Some(json!({ "identity": "", "password": "" })))
        .await;
    assert_eq!(empty.status, StatusCode::BAD_REQUEST);
    assert_eq!(empty.body["error"], "validation_error");
}

#[tokio::test]
async fn test_duplicate_registration_conflicts() {
    let ctx = TestContext::new();
    ctx.register("tester", "tester@example.com").await;

    let same_username = ctx
        .send(
            "POST",
            "/register",
            None,
            Some(json!({ "username": "tester", "email": "other@example.com", "password": TEST_PASSWORD })),
        )
        .await;
    assert_eq!(same_username.status, StatusCode::CONFLICT);

    let same_email = ctx
        .send(
            "POST",
            "/register",
            None,
            Some(json!({ "username": "other", "email": "Tester@Example.COM", "password": TEST_PASSWORD })),
        )
        .await;
    assert_eq!(same_email.status, StatusCode::CONFLICT);
    assert_eq!(same_email.body["error"], "conflict");
}

#[tokio::test]
async fn test_registration_validation_details() {
    let ctx = TestContext::new();

    let response = ctx
        .send(
            "POST",
            "/register",
            None,
            Some(json!({ "username": "x", "email": "nope", "password": "short" })),
        )
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["error"], "validation_error");
    let fields: Vec<&str> = response.body["details"]
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["field"].as_str().unwrap())
        .collect();
    assert_eq!(fields, vec!["email", "password", "username"]);
}

#[tokio::test]
async fn test_task_routes_require_token() {
    let ctx = TestContext::new();

    let missing = ctx.send("GET", "/api/tasks", None, None).await;
    assert_eq!(missing.status, StatusCode::UNAUTHORIZED);
    assert_eq!(missing.body["error"], "unauthorized");

    let garbage = ctx.send("GET", "/api/tasks", Some("not-a-jwt"), None).await;
    assert_eq!(garbage.status, StatusCode::UNAUTHORIZED);
    assert_eq!(garbage.body, missing.body);

    let basic = ctx
        .send_request(
            Request::builder()
                .uri("/api/tasks")
                .header(header::AUTHORIZATION, "Basic dGVzdGVyOnB3")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(basic.status, StatusCode::UNAUTHORIZED);

    let foreign = TestContext::with_vars(&[("JWT_SECRET", "some-other-secret-at-least-32-bytes-long")]);
    let foreign_token = foreign.user_token("stranger").await;
    let forged = ctx.send("GET", "/api/tasks", Some(&foreign_token), None).await;
    assert_eq!(forged.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_tasks_are_owner_scoped() {
    let ctx = TestContext::new();
    let alice = ctx.user_token("alice").await;
    let bob = ctx.user_token("bob").await;

    let created = ctx
        .send("POST", "/api/tasks", Some(&alice), Some(json!({ "title": "secret plan" })))
        .await;
    let task_uri = format!("/api/tasks/{}", created.body["id"]);

    let listed = ctx.send("GET", "/api/tasks", Some(&bob), None).await;
    assert_eq!(listed.body["pagination"]["total"], 0);

    let update = ctx
        .send("PUT", &task_uri, Some(&bob), Some(json!({ "title": "stolen" })))
        .await;
    assert_eq!(update.status, StatusCode::NOT_FOUND);
    assert_eq!(update.body["error"], "not_found");

    let delete = ctx.send("DELETE", &task_uri, Some(&bob), None).await;
    assert_eq!(delete.status, StatusCode::NOT_FOUND);

    let still_there = ctx.send("GET", "/api/tasks", Some(&alice), None).await;
    assert_eq!(still_there.body["tasks"][0]["title"], "secret plan");
}

#[tokio::test]
async fn test_pagination_over_http() {
    let ctx = TestContext::new();
    let token = ctx.user_token("tester").await;

    for i in 0..25 {
        ctx.send(
            "POST",
            "/api/tasks",
            Some(&token),
            Some(json!({ "title": format!("task {}", i) })),
        )
        .await;
    }

    let page = ctx
        .send("GET", "/api/tasks?page=2&page_size=20", Some(&token), None)
        .await;
    assert_eq!(page.status, StatusCode::OK);
    assert_eq!(page.body["tasks"].as_array().unwrap().len(), 5);
    assert_eq!(
        page.body["pagination"],
        json!({ "page": 2, "page_size": 20, "total": 25, "total_pages": 2 })
    );

    let blank = ctx
        .send(
            "GET",
            "/api/tasks?status=&priority=&page=&page_size=",
            Some(&token),
            None,
        )
        .await;
    assert_eq!(blank.status, StatusCode::OK);
    assert_eq!(
        blank.body["pagination"],
        json!({ "page": 1, "page_size": 20, "total": 25, "total_pages": 2 })
    );

    let garbled = ctx
        .send("GET", "/api/tasks?page=abc&page_size=xyz", Some(&token), None)
        .await;
    assert_eq!(garbled.status, StatusCode::OK);
    assert_eq!(garbled.body["pagination"]["page"], 1);
    assert_eq!(garbled.body["pagination"]["page_size"], 20);
    assert_eq!(garbled.body["tasks"].as_array().unwrap().len(), 20);
}

#[tokio::test]
async fn test_bad_task_input_is_400() {
    let ctx = TestContext::new();
    let token = ctx.user_token("tester").await;

    let urgent = ctx
        .send(
            "POST",
            "/api/tasks",
            Some(&token),
            Some(json!({ "title": "x", "priority": "URGENT" })),
        )
        .await;
    assert_eq!(urgent.status, StatusCode::BAD_REQUEST);
    assert_eq!(urgent.body["details"][0]["field"], "priority");

    let bad_filter = ctx
        .send("GET", "/api/tasks?status=done", Some(&token), None)
        .await;
    assert_eq!(bad_filter.status, StatusCode::BAD_REQUEST);

    let bad_id = ctx
        .send("DELETE", "/api/tasks/abc", Some(&token), None)
        .await;
    assert_eq!(bad_id.status, StatusCode::BAD_REQUEST);
    assert_eq!(bad_id.body["error"], "bad_request");

    let malformed = ctx
        .send_request(
            Request::builder()
                .method("POST")
                .uri("/api/tasks")
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await;
    assert_eq!(malformed.status, StatusCode::BAD_REQUEST);

    let missing_title = ctx
        .send("POST", "/api/tasks", Some(&token), Some(json!({ "priority": "low" })))
        .await;
    assert_eq!(missing_title.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_health_and_headers() {
    let ctx = TestContext::new();

    let response = ctx.send("GET", "/health", None, None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "healthy");
    assert_eq!(response.body["database"], "connected");

    assert_eq!(response.headers["x-content-type-options"], "nosniff");
    assert_eq!(response.headers["x-frame-options"], "DENY");
    assert!(response.headers.get("strict-transport-security").is_none());
    assert!(response.headers.get("x-request-id").is_some());

    let supplied = ctx
        .send_request(
            Request::builder()
                .uri("/health")
                .header("x-request-id", "trace-me")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(supplied.headers["x-request-id"], "trace-me");
}
