use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use deepguard::config::Config;
use deepguard::db::UserStore;
use deepguard::state::SharedState;
use http_body_util::BodyExt;
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;

const JWT_SECRET: &str = "integration-test-secret";

fn test_config() -> Config {
    let mut config = Config::default();
    config.storage.database_path = "sqlite::memory:".to_string();
    // A single pooled connection keeps every query on the same in-memory db.
    config.storage.max_db_connections = 1;
    config.storage.min_db_connections = 1;
    config.auth.jwt_secret = Some(JWT_SECRET.to_string());
    config.security.argon2_memory_cost_kib = 1024;
    config.security.argon2_time_cost = 1;
    config.observability.metrics_enabled = false;
    config
}

async fn spawn_app() -> (Router, Arc<SharedState>) {
    spawn_app_with(test_config()).await
}

async fn spawn_app_with(config: Config) -> (Router, Arc<SharedState>) {
    let shared = Arc::new(
        SharedState::new(config)
            .await
            .expect("Failed to create shared state"),
    );
    shared.initialize().await;

    let state = deepguard::api::create_app_state(shared.clone(), None);
    (deepguard::api::router(state), shared)
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

fn post_json(uri: &str, body: &Value, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("Content-Type", "application/json");
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {token}"));
    }
    builder.body(Body::empty()).unwrap()
}

async fn register(app: &Router, username: &str) -> Value {
    let (status, body) = send(
        app,
        post_json(
            "/api/register",
            &json!({
                "username": username,
                "email": format!("{username}@example.com"),
                "password": "password123",
            }),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body
}

#[tokio::test]
async fn test_register_returns_user_and_token() {
    let (app, _) = spawn_app().await;

    let body = register(&app, "alice").await;
    assert_eq!(body["user"]["username"], "alice");
    assert_eq!(body["user"]["email"], "alice@example.com");
    assert_eq!(body["user"]["login_streak"], 0);
    assert!(body["user"]["id"].is_number());
    assert!(body["token"].as_str().is_some_and(|t| !t.is_empty()));

    let achievements = body["user"]["achievements"].as_array().unwrap();
    assert_eq!(achievements.len(), 1);
    assert_eq!(achievements[0]["achievement_id"], "first-login");
    assert_eq!(achievements[0]["completed"], true);
    assert!(achievements[0]["unlocked_at"].is_string());
}

#[tokio::test]
async fn test_register_duplicate_username_conflicts() {
    let (app, _) = spawn_app().await;
    register(&app, "bob").await;

    let (status, body) = send(
        &app,
        post_json(
            "/api/register",
            &json!({"username": "bob", "email": "other@example.com", "password": "password123"}),
            None,
        ),
    )
    .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_register_injection_is_rejected_before_store() {
    let (app, shared) = spawn_app().await;

    let (status, body) = send(
        &app,
        post_json(
            "/api/register",
            &json!({
                "username": "admin' OR '1'='1",
                "email": "x@example.com",
                "password": "password123",
            }),
            None,
        ),
    )
    .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body["error"].as_str().is_some_and(|m| !m.is_empty()));
    assert!(!shared.store.has_users().await.unwrap());
}

#[tokio::test]
async fn test_login_injection_is_rejected() {
    let (app, _) = spawn_app().await;

    let (status, _) = send(
        &app,
        post_json(
            "/api/login",
            &json!({"username": "admin'--", "password": "whatever1"}),
            None,
        ),
    )
    .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_register_missing_fields() {
    let (app, _) = spawn_app().await;

    let (status, body) = send(
        &app,
        post_json("/api/register", &json!({"username": "carol"}), None),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_register_null_or_mistyped_fields_are_bad_requests() {
    let (app, shared) = spawn_app().await;

    for payload in [
        json!({"username": "carol", "email": null, "password": "password123"}),
        json!({"username": 42, "email": "carol@example.com", "password": "password123"}),
    ] {
        let (status, body) = send(&app, post_json("/api/register", &payload, None)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{payload}");
        assert_eq!(body["success"], false);
    }

    let (status, _) = send(
        &app,
        post_json("/api/login", &json!({"username": null, "password": null}), None),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, post_json("/api/analyze", &json!({"image": null}), None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert!(!shared.store.has_users().await.unwrap());
}

#[tokio::test]
async fn test_register_only_requires_fields_to_be_present() {
    let (app, _) = spawn_app().await;

    let (status, body) = send(
        &app,
        post_json(
            "/api/register",
            &json!({"username": "fred", "email": "fred", "password": "abc"}),
            None,
        ),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["user"]["email"], "fred");
}

#[tokio::test]
async fn test_login_then_current_user() {
    let (app, _) = spawn_app().await;
    let registered = register(&app, "dave").await;
    let before = registered["user"]["achievements"].as_array().unwrap().len();

    let (status, login) = send(
        &app,
        post_json(
            "/api/login",
            &json!({"username": "dave", "password": "password123"}),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(login["user"]["login_streak"], 1);
    assert!(login["user"]["last_login"].is_string());

    let token = login["token"].as_str().unwrap();
    let (status, me) = send(&app, get("/api/user", Some(token))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["id"], registered["user"]["id"]);
    assert_eq!(me["username"], "dave");
    assert!(me["achievements"].as_array().unwrap().len() >= before);
}

#[tokio::test]
async fn test_login_with_wrong_password() {
    let (app, _) = spawn_app().await;
    register(&app, "erin").await;

    let (status, body) = send(
        &app,
        post_json(
            "/api/login",
            &json!({"username": "erin", "password": "not-her-password"}),
            None,
        ),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_protected_routes_require_valid_token() {
    let (app, _) = spawn_app().await;

    let (status, _) = send(&app, get("/api/user", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, get("/api/user", Some("garbage.token.value"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, post_json("/api/detection/record", &json!({}), None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_detection_master_completes_on_tenth_record() {
    let (app, _) = spawn_app().await;
    let body = register(&app, "frank").await;
    let token = body["token"].as_str().unwrap();

    for expected in 1..=9 {
        let (status, record) = send(
            &app,
            post_json("/api/detection/record", &json!({}), Some(token)),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(record["success"], true);
        assert_eq!(record["progress"], expected);
        assert_eq!(record["completed"], false);
    }

    let (_, tenth) = send(
        &app,
        post_json("/api/detection/record", &json!({}), Some(token)),
    )
    .await;
    assert_eq!(tenth["progress"], 10);
    assert_eq!(tenth["completed"], true);

    let (_, eleventh) = send(
        &app,
        post_json("/api/detection/record", &json!({}), Some(token)),
    )
    .await;
    assert_eq!(eleventh["progress"], 10);
    assert_eq!(eleventh["completed"], true);

    let user_id = body["user"]["id"].as_i64().unwrap();
    let (status, rows) = send(
        &app,
        get(&format!("/api/user/{user_id}/achievements"), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // Completed rows first, higher progress ahead.
    let ids: Vec<&str> = rows
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["achievement_id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["detection-master", "first-login"]);
}

#[tokio::test]
async fn test_user_achievements_rejects_bad_id() {
    let (app, _) = spawn_app().await;

    let (status, _) = send(&app, get("/api/user/abc/achievements", None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_catalog_lists_five_achievements() {
    let (app, _) = spawn_app().await;

    let (status, body) = send(&app, get("/api/achievements", None)).await;
    assert_eq!(status, StatusCode::OK);

    let catalog = body.as_array().unwrap();
    assert_eq!(catalog.len(), 5);
    assert!(catalog.iter().any(|a| a["id"] == "detection-master" && a["icon"] == "fas fa-medal"));
}

#[tokio::test]
async fn test_change_password_grants_security_aware() {
    let (app, _) = spawn_app().await;
    let body = register(&app, "grace").await;
    let token = body["token"].as_str().unwrap();

    let request = Request::builder()
        .method("PUT")
        .uri("/api/user/password")
        .header("Content-Type", "application/json")
        .header("Authorization", format!("Bearer {token}"))
        .body(Body::from(
            json!({"current_password": "password123", "new_password": "betterpass456"}).to_string(),
        ))
        .unwrap();
    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(
        &app,
        post_json(
            "/api/login",
            &json!({"username": "grace", "password": "betterpass456"}),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, me) = send(&app, get("/api/user", Some(token))).await;
    assert!(me["achievements"]
        .as_array()
        .unwrap()
        .iter()
        .any(|a| a["achievement_id"] == "security-aware" && a["completed"] == true));
}

#[tokio::test]
async fn test_analyze_image() {
    let (app, _) = spawn_app().await;

    let (status, _) = send(&app, post_json("/api/analyze", &json!({}), None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &app,
        post_json(
            "/api/analyze",
            &json!({"image": "data:image/png;base64,iVBORw0KGgo="}),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["isDeepfake"].is_boolean());
    assert!(body["confidence"].is_number());
    assert_eq!(body["analysis"]["faceDetected"], true);
    assert_eq!(body["analysis"]["metadata"]["format"], "png");
}

#[tokio::test]
async fn test_health_and_diagnose() {
    let (app, _) = spawn_app().await;

    let (status, body) = send(&app, get("/api/health", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, body) = send(&app, get("/api/diagnose", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["backend"], "sqlite");
    assert_eq!(body["connection"]["ok"], true);
    assert_eq!(body["env"]["supabaseUrl"], "no-value");
    assert_eq!(body["env"]["jwtSecret"], "inte...cret");
}

#[tokio::test]
async fn test_demo_user_is_seeded_once() {
    let mut config = test_config();
    config.demo.seed_user = true;
    let (app, shared) = spawn_app_with(config).await;

    // A second startup pass must not try to create the user again.
    shared.initialize().await;

    let (status, body) = send(
        &app,
        post_json(
            "/api/login",
            &json!({"username": "demo", "password": "password123"}),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["email"], "demo@example.com");
    assert!(body["user"]["achievements"]
        .as_array()
        .unwrap()
        .iter()
        .any(|a| a["achievement_id"] == "first-login"));
}
