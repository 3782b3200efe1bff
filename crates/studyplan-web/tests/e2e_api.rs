//! End-to-end tests for the study planner HTTP API.
//!
//! These tests spin up the **real** Axum router on an OS-assigned ephemeral
//! port, make actual HTTP requests via `reqwest`, and verify status codes
//! and JSON bodies.

use std::net::SocketAddr;
use std::sync::Arc;

use reqwest::{Client, Method, StatusCode};
use serde_json::{Value, json};
use tempfile::TempDir;
use tokio::net::TcpListener;

use studyplan_store::{Database, Document, MemoryBackend, PasswordHasher};
use studyplan_web::{AppState, WebConfig, router};

// ── helpers ──────────────────────────────────────────────────────────────────

struct TestServer {
    base: String,
    client: Client,
    _dir: TempDir,
    _handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn post(&self, path: &str, body: Value) -> (StatusCode, Value) {
        let resp = self
            .client
            .post(format!("{}{path}", self.base))
            .json(&body)
            .send()
            .await
            .expect("request failed");
        let status = resp.status();
        (status, resp.json().await.expect("invalid JSON"))
    }

    async fn register(&self, username: &str, password: &str) -> (StatusCode, Value) {
        self.post(
            "/register",
            json!({"username": username, "password": password}),
        )
        .await
    }
}

/// Bind to 127.0.0.1:0 with a file-backed store in a temp dir.
async fn start_test_server() -> TestServer {
    let dir = tempfile::tempdir().expect("tempdir");
    let db = Database::open(dir.path().join("students.json"));
    start_with_database(db, dir).await
}

/// Bind to 127.0.0.1:0 over an arbitrary store.
async fn start_with_database(db: Database, dir: TempDir) -> TestServer {
    let state = AppState::new(
        db,
        PasswordHasher::with_iterations(1_000),
        WebConfig::default(),
    );
    let app = router(Arc::new(state));

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind to port 0");
    let addr: SocketAddr = listener.local_addr().expect("get local addr");
    let base = format!("http://127.0.0.1:{}", addr.port());

    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });

    // Small yield so the listener is ready.
    tokio::time::sleep(std::time::Duration::from_millis(10)).await;

    TestServer {
        base,
        client: Client::new(),
        _dir: dir,
        _handle: handle,
    }
}

fn assert_no_secrets(body: &Value, password: &str) {
    let text = body.to_string();
    assert!(!text.contains(password), "password leaked: {text}");
    assert!(!text.contains("password_hash"), "hash leaked: {text}");
}

// ── POST /register ───────────────────────────────────────────────────────────

#[tokio::test]
async fn register_returns_created_student() {
    let srv = start_test_server().await;

    let (status, body) = srv
        .post(
            "/register",
            json!({
                "username": "alice",
                "password": "s3cret-pass",
                "email": "alice@example.com",
                "full_name": "Alice Smith"
            }),
        )
        .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], true);
    assert_eq!(body["student"]["username"], "alice");
    assert_eq!(body["student"]["email"], "alice@example.com");
    assert_eq!(body["student"]["full_name"], "Alice Smith");
    assert!(body["student"]["id"].is_string());
    assert!(body["student"]["created_at"].is_string());
    assert_no_secrets(&body, "s3cret-pass");
}

#[tokio::test]
async fn register_same_username_twice() {
    let srv = start_test_server().await;

    let (first, _) = srv.register("bob", "password1").await;
    assert_eq!(first, StatusCode::CREATED);

    let (second, body) = srv.register("bob", "password2").await;
    assert_eq!(second, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "A user with this username already exists");
}

#[tokio::test]
async fn register_password_length_boundary() {
    let srv = start_test_server().await;

    let (short, body) = srv.register("carol", "12345").await;
    assert_eq!(short, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Password must be at least 6 characters long");

    let (exact, _) = srv.register("carol", "123456").await;
    assert_eq!(exact, StatusCode::CREATED);
}

#[tokio::test]
async fn register_password_length_counts_utf16_units() {
    let srv = start_test_server().await;

    // Each emoji is two UTF-16 code units.
    let (short, _) = srv.register("emoji1", "😀😀").await;
    assert_eq!(short, StatusCode::BAD_REQUEST);

    let (exact, body) = srv.register("emoji2", "😀😀😀").await;
    assert_eq!(exact, StatusCode::CREATED);
    assert_no_secrets(&body, "😀😀😀");

    let (login, _) = srv
        .post("/login", json!({"username": "emoji2", "password": "😀😀😀"}))
        .await;
    assert_eq!(login, StatusCode::OK);
}

#[tokio::test]
async fn register_requires_username_and_password() {
    let srv = start_test_server().await;

    for body in [
        json!({"password": "123456"}),
        json!({"username": "dave"}),
        json!({"username": "", "password": "123456"}),
    ] {
        let (status, resp) = srv.post("/register", body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(resp["error"], "Username and password are required");
    }
}

#[tokio::test]
async fn malformed_json_is_bad_request() {
    let srv = start_test_server().await;

    let resp = srv
        .client
        .post(format!("{}/register", srv.base))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Invalid JSON in request body");
}

#[tokio::test]
async fn body_without_content_type_is_accepted() {
    let srv = start_test_server().await;

    let resp = srv
        .client
        .post(format!("{}/register", srv.base))
        .body(r#"{"username":"plain","password":"123456"}"#)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
}

// ── POST /login ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn login_returns_student_and_empty_progress() {
    let srv = start_test_server().await;
    srv.register("erin", "hunter22").await;

    let (status, body) = srv
        .post("/login", json!({"username": "erin", "password": "hunter22"}))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["student"]["username"], "erin");
    assert_eq!(body["progress"], json!({}));
    assert_eq!(body["studyPlan"], json!([]));
    assert!(body["lastUpdated"].is_null());
    assert_no_secrets(&body, "hunter22");
}

#[tokio::test]
async fn login_failures_do_not_reveal_username_existence() {
    let srv = start_test_server().await;
    srv.register("frank", "right-password").await;

    let (wrong_pw, wrong_body) = srv
        .post("/login", json!({"username": "frank", "password": "wrong-password"}))
        .await;
    let (unknown, unknown_body) = srv
        .post("/login", json!({"username": "ghost", "password": "wrong-password"}))
        .await;

    assert_eq!(wrong_pw, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_body, unknown_body);
    assert_eq!(wrong_body["error"], "Invalid username or password");
}

#[tokio::test]
async fn login_accepts_bcrypt_accounts_from_earlier_deployments() {
    let legacy_hash = bcrypt::hash("old-password", 4).unwrap();
    let seed: Document = serde_json::from_value(json!({
        "students": [
            {
                "id": "1700000000000",
                "username": "legacy",
                "password_hash": legacy_hash,
                "email": null,
                "full_name": null,
                "created_at": "2023-11-14T22:13:20.000Z"
            },
            {
                "id": "1700000000001",
                "username": "damaged",
                "password_hash": "$2a$10$CwTycUXWue0Thq9StjUM0u",
                "email": null,
                "full_name": null,
                "created_at": "2023-11-14T22:13:20.001Z"
            }
        ],
        "studentData": []
    }))
    .unwrap();
    let db = Database::with_backend(MemoryBackend::with_document(seed));
    let srv = start_with_database(db, tempfile::tempdir().unwrap()).await;

    let (ok, body) = srv
        .post("/login", json!({"username": "legacy", "password": "old-password"}))
        .await;
    assert_eq!(ok, StatusCode::OK);
    assert_eq!(body["student"]["id"], "1700000000000");
    assert_no_secrets(&body, "old-password");

    let (_, unknown_body) = srv
        .post("/login", json!({"username": "ghost", "password": "wrong-password"}))
        .await;
    for username in ["legacy", "damaged"] {
        let (status, body) = srv
            .post("/login", json!({"username": username, "password": "wrong-password"}))
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{username}");
        assert_eq!(body, unknown_body, "{username}");
    }
}

#[tokio::test]
async fn login_requires_fields() {
    let srv = start_test_server().await;
    let (status, body) = srv.post("/login", json!({"username": "x"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

// ── POST /save-data ──────────────────────────────────────────────────────────

#[tokio::test]
async fn save_data_then_login_round_trip() {
    let srv = start_test_server().await;
    let (_, reg) = srv.register("gina", "pass1234").await;
    let id = reg["student"]["id"].as_str().unwrap().to_string();

    let (status, first) = srv
        .post(
            "/save-data",
            json!({"studentId": id, "progress": {"math": 0}, "studyPlan": []}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["success"], true);
    assert_eq!(first["message"], "Data saved successfully");

    let (_, second) = srv
        .post(
            "/save-data",
            json!({"studentId": id, "progress": {"math": 1}, "studyPlan": ["algebra"]}),
        )
        .await;
    assert!(
        second["lastUpdated"].as_str().unwrap() > first["lastUpdated"].as_str().unwrap(),
        "lastUpdated must advance"
    );

    let (_, login) = srv
        .post("/login", json!({"username": "gina", "password": "pass1234"}))
        .await;
    assert_eq!(login["progress"], json!({"math": 1}));
    assert_eq!(login["studyPlan"], json!(["algebra"]));
    assert_eq!(login["lastUpdated"], second["lastUpdated"]);
}

#[tokio::test]
async fn save_data_validates_student() {
    let srv = start_test_server().await;

    let (missing, body) = srv.post("/save-data", json!({"progress": {}})).await;
    assert_eq!(missing, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Student ID is required");

    let (unknown, body) = srv
        .post("/save-data", json!({"studentId": "does-not-exist"}))
        .await;
    assert_eq!(unknown, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Student not found");
}

// ── GET /status ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn status_reports_stats() {
    let srv = start_test_server().await;
    let (_, reg) = srv.register("hank", "pass1234").await;
    srv.register("ivy", "pass1234").await;
    srv.post(
        "/save-data",
        json!({"studentId": reg["student"]["id"], "progress": {"a": 1}}),
    )
    .await;

    let resp = srv
        .client
        .get(format!("{}/status", srv.base))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["stats"]["totalStudents"], 2);
    assert_eq!(body["stats"]["totalStudentData"], 1);
    assert!(body["timestamp"].is_string());
    assert_eq!(body["message"], "LDC Study Planner Backend is running");
}

// ── methods, CORS, routing ───────────────────────────────────────────────────

#[tokio::test]
async fn wrong_method_is_405_with_json_body() {
    let srv = start_test_server().await;

    for (method, path) in [
        (Method::GET, "/register"),
        (Method::GET, "/login"),
        (Method::PUT, "/save-data"),
        (Method::POST, "/status"),
    ] {
        let resp = srv
            .client
            .request(method.clone(), format!("{}{path}", srv.base))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED, "{method} {path}");
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["success"], false);
        assert!(body["error"].as_str().unwrap().starts_with("Method not allowed"));
    }
}

#[tokio::test]
async fn options_returns_ok_with_cors_headers() {
    let srv = start_test_server().await;

    for path in ["/register", "/login", "/save-data", "/status"] {
        let plain = srv
            .client
            .request(Method::OPTIONS, format!("{}{path}", srv.base))
            .header("origin", "http://example.com")
            .send()
            .await
            .unwrap();
        assert_eq!(plain.status(), StatusCode::OK, "{path}");
        assert_eq!(
            plain.headers().get("access-control-allow-origin").unwrap(),
            "*"
        );

        let preflight = srv
            .client
            .request(Method::OPTIONS, format!("{}{path}", srv.base))
            .header("origin", "http://example.com")
            .header("access-control-request-method", "POST")
            .header("access-control-request-headers", "content-type")
            .send()
            .await
            .unwrap();
        assert_eq!(preflight.status(), StatusCode::OK, "{path}");
        assert!(
            preflight
                .headers()
                .get("access-control-allow-methods")
                .is_some()
        );
    }
}

#[tokio::test]
async fn routes_are_mounted_under_api_prefix() {
    let srv = start_test_server().await;

    let (status, _) = srv
        .post(
            "/api/register",
            json!({"username": "june", "password": "pass1234"}),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = srv
        .post("/login", json!({"username": "june", "password": "pass1234"}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["student"]["username"], "june");
}

#[tokio::test]
async fn unknown_path_is_json_404() {
    let srv = start_test_server().await;
    let resp = srv
        .client
        .get(format!("{}/nope", srv.base))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn concurrent_registrations_of_same_name_admit_one() {
    let srv = Arc::new(start_test_server().await);

    let mut handles = Vec::new();
    for _ in 0..6 {
        let srv = Arc::clone(&srv);
        handles.push(tokio::spawn(async move { srv.register("kim", "pass1234").await.0 }));
    }

    let mut created = 0;
    for handle in handles {
        match handle.await.unwrap() {
            StatusCode::CREATED => created += 1,
            StatusCode::BAD_REQUEST => {}
            other => panic!("unexpected status {other}"),
        }
    }
    assert_eq!(created, 1);
}
