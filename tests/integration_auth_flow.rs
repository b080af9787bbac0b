use std::path::PathBuf;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    response::Response,
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use certadmin::{
    build_router,
    config::{Config, SeedUser, SessionBackend},
    models::user::Role,
    services::credentials::BackendKind,
    state::AppState,
};

// The database is deliberately unreachable: logins must still work through
// the seed backend, and the database backend must be skipped.
const UNREACHABLE_DB: &str = "postgres://certadmin@127.0.0.1:1/certadmin";

const SUPER_ADMIN_ID: &str = "00000000-0000-0000-0000-000000000001";

struct TestContext {
    app: Router,
}

fn seed(email: &str, role: Role, name: &str) -> SeedUser {
    SeedUser {
        email: email.to_string(),
        password: "admin123".to_string(),
        role,
        name: name.to_string(),
    }
}

impl TestContext {
    async fn new() -> Self {
        let config = Config {
            database_url: UNREACHABLE_DB.to_string(),
            session_backend: SessionBackend::Memory,
            redis_url: "redis://127.0.0.1:1".to_string(),
            session_duration_days: 7,
            production: false,
            app_url: "http://localhost:3000".to_string(),
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            public_dir: PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("public"),
            user_store_path: std::env::temp_dir().join(format!("certadmin-{}.json", Uuid::new_v4())),
            user_write_backend: BackendKind::Seed,
            email_case_insensitive: true,
            accept_legacy_secrets: true,
            seed_users: vec![
                seed("superadmin@example.com", Role::SuperAdmin, "Super Admin"),
                seed("admin@example.com", Role::Admin, "Admin"),
                seed("viewer@example.com", Role::Viewer, "Viewer"),
            ],
            max_document_bytes: 10 * 1024 * 1024,
        };

        let state = AppState::new(&config).await.unwrap();
        Self {
            app: build_router(state),
        }
    }

    async fn send(&self, request: Request<Body>) -> Response {
        self.app.clone().oneshot(request).await.unwrap()
    }

    async fn post_json(&self, uri: &str, body: Value, token: Option<&str>) -> Response {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(header::COOKIE, format!("admin-token={}", token));
        }
        self.send(builder.body(Body::from(body.to_string())).unwrap()).await
    }

    async fn get(&self, uri: &str, cookie: Option<String>) -> Response {
        let mut builder = Request::builder().method("GET").uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    /// Logs in and returns the session token.
    async fn login(&self, email: &str, password: &str) -> String {
        let response = self
            .post_json("/api/auth/login", json!({ "email": email, "password": password }), None)
            .await;
        assert_eq!(response.status(), StatusCode::OK, "login failed for {}", email);
        cookie_value(&response, "admin-token").expect("no admin-token cookie")
    }
}

fn set_cookies(response: &Response) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect()
}

fn cookie_value(response: &Response, name: &str) -> Option<String> {
    let prefix = format!("{}=", name);
    set_cookies(response).into_iter().find_map(|c| {
        c.strip_prefix(&prefix)
            .map(|rest| rest.split(';').next().unwrap_or_default().to_string())
    })
}

async fn json_body(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn location(response: &Response) -> &str {
    response.headers()[header::LOCATION].to_str().unwrap()
}

#[tokio::test]
async fn admin_login_issues_session_and_four_cookies() {
    let ctx = TestContext::new().await;

    let response = ctx
        .post_json(
            "/api/auth/login",
            json!({ "email": "admin@example.com", "password": "admin123" }),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let cookies = set_cookies(&response);
    for name in ["admin-token", "user-role", "user-id", "admin-user"] {
        let cookie = cookies
            .iter()
            .find(|c| c.starts_with(&format!("{}=", name)))
            .unwrap_or_else(|| panic!("missing cookie {}", name));
        assert!(cookie.contains("SameSite=Lax"), "{}", cookie);
        assert!(cookie.contains("Path=/"), "{}", cookie);
        assert!(cookie.contains("Max-Age=604800"), "{}", cookie);
        assert_eq!(cookie.contains("HttpOnly"), name == "admin-token", "{}", cookie);
    }
    assert_eq!(cookie_value(&response, "user-role").as_deref(), Some("admin"));

    let body = json_body(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["user"]["role"], "admin");
    assert_eq!(body["user"]["email"], "admin@example.com");
}

#[tokio::test]
async fn failed_logins_share_one_generic_message() {
    let ctx = TestContext::new().await;

    for (email, password) in [
        ("nobody@example.com", "admin123"),
        ("admin@example.com", "wrong-password"),
    ] {
        let response = ctx
            .post_json("/api/auth/login", json!({ "email": email, "password": password }), None)
            .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(set_cookies(&response).is_empty());
        let body = json_body(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "Email atau password salah");
    }
}

#[tokio::test]
async fn login_without_fields_is_a_bad_request() {
    let ctx = TestContext::new().await;

    let response = ctx
        .post_json("/api/auth/login", json!({ "email": "admin@example.com" }), None)
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn email_matching_ignores_case() {
    let ctx = TestContext::new().await;
    ctx.login("  Admin@Example.COM ", "admin123").await;
}

#[tokio::test]
async fn guard_redirects_pages_by_session() {
    let ctx = TestContext::new().await;

    // Step 1: no session
    let response = ctx.get("/", None).await;
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location(&response), "/login");

    let response = ctx.get("/dashboard/certificates", None).await;
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location(&response), "/login");

    let response = ctx.get("/login", None).await;
    assert_eq!(response.status(), StatusCode::OK);

    // Step 2: a garbage token counts as logged out
    let response = ctx.get("/dashboard", Some("admin-token=garbage".into())).await;
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);

    // Step 3: logged in
    let token = ctx.login("admin@example.com", "admin123").await;
    let cookie = Some(format!("admin-token={}", token));

    let response = ctx.get("/login", cookie.clone()).await;
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location(&response), "/dashboard");

    let response = ctx.get("/dashboard/certificates", cookie.clone()).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = ctx.get("/", cookie.clone()).await;
    assert_eq!(location(&response), "/login");

    // The guard authenticates; the users section still needs its capability.
    let response = ctx.get("/dashboard/users", cookie).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn api_requires_a_session() {
    let ctx = TestContext::new().await;

    let response = ctx.get("/api/users", None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = ctx.get("/api/auth/session", None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn capabilities_follow_the_session_role() {
    let ctx = TestContext::new().await;

    let admin = ctx.login("admin@example.com", "admin123").await;
    let response = ctx.get("/api/users", Some(format!("admin-token={}", admin))).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let root = ctx.login("superadmin@example.com", "admin123").await;
    let response = ctx.get("/api/users", Some(format!("admin-token={}", root))).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["users"].as_array().unwrap().len(), 3);
    assert!(body["users"][0].get("secret").is_none());

    let response = ctx.get("/api/auth/session", Some(format!("admin-token={}", admin))).await;
    let body = json_body(response).await;
    assert_eq!(body["user"]["role"], "admin");
    assert_eq!(body["capabilities"], json!(["dashboard", "brands", "certificates"]));
}

#[tokio::test]
async fn editing_the_role_cookie_does_not_escalate() {
    let ctx = TestContext::new().await;
    let admin = ctx.login("admin@example.com", "admin123").await;

    let forged = format!(
        "admin-token={}; user-role=super_admin; user-id={}",
        admin, SUPER_ADMIN_ID
    );
    let response = ctx.get("/api/users", Some(forged.clone())).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = ctx.get("/api/auth/session", Some(forged)).await;
    let body = json_body(response).await;
    assert_eq!(body["user"]["role"], "admin");
}

#[tokio::test]
async fn user_management_rules() {
    let ctx = TestContext::new().await;
    let root = ctx.login("superadmin@example.com", "admin123").await;

    // Step 1: duplicate email
    let response = ctx
        .post_json(
            "/api/users",
            json!({
                "email": "ADMIN@example.com",
                "name": "Duplicate",
                "password": "password123",
                "role": "viewer"
            }),
            Some(&root),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"], "Email already exists");

    // Step 2: unknown role
    let response = ctx
        .post_json(
            "/api/users",
            json!({
                "email": "ops@example.com",
                "name": "Ops",
                "password": "password123",
                "role": "owner"
            }),
            Some(&root),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Step 3: with the database down, uniqueness cannot be checked
    let response = ctx
        .post_json(
            "/api/users",
            json!({
                "email": "ops@example.com",
                "name": "Ops",
                "password": "password123",
                "role": "viewer"
            }),
            Some(&root),
        )
        .await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let response = ctx
        .post_json(
            "/api/auth/login",
            json!({ "email": "ops@example.com", "password": "password123" }),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // Step 4: a viewer sees only the dashboard
    let viewer = ctx.login("viewer@example.com", "admin123").await;
    let response = ctx.get("/api/brands", Some(format!("admin-token={}", viewer))).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // Step 5: super admins cannot be demoted
    let response = ctx
        .send(
            Request::builder()
                .method("PATCH")
                .uri(format!("/api/users/{}", SUPER_ADMIN_ID))
                .header(header::COOKIE, format!("admin-token={}", root))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json!({ "role": "admin" }).to_string()))
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"], "Cannot change super admin role");

    // Step 6: super admins cannot be deleted
    let response = ctx
        .send(
            Request::builder()
                .method("DELETE")
                .uri(format!("/api/users/{}", SUPER_ADMIN_ID))
                .header(header::COOKIE, format!("admin-token={}", root))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"], "Cannot delete super admin");
}

#[tokio::test]
async fn logout_is_idempotent() {
    let ctx = TestContext::new().await;

    let response = ctx.post_json("/api/auth/logout", json!({}), None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let token = ctx.login("admin@example.com", "admin123").await;
    for _ in 0..2 {
        let response = ctx.post_json("/api/auth/logout", json!({}), Some(&token)).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = ctx.get("/api/auth/session", Some(format!("admin-token={}", token))).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn validate_endpoints_report_status_codes() {
    let ctx = TestContext::new().await;

    let response = ctx
        .post_json(
            "/api/auth/validate",
            json!({ "email": "admin@example.com", "password": "admin123" }),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(set_cookies(&response).is_empty());

    let response = ctx
        .post_json("/api/auth/validate", json!({ "email": "", "password": "" }), None)
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = ctx
        .post_json(
            "/api/auth/validate",
            json!({ "email": "admin@example.com", "password": "nope" }),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // Only the database is consulted, and it is down.
    let response = ctx
        .post_json(
            "/api/auth/validate-db",
            json!({ "email": "admin@example.com", "password": "admin123" }),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json_body(response).await["error"], "Terjadi kesalahan sistem");
}

#[tokio::test]
async fn brand_slugs_cannot_take_console_routes() {
    let ctx = TestContext::new().await;
    let admin = ctx.login("admin@example.com", "admin123").await;

    let response = ctx
        .post_json("/api/brands", json!({ "name": "Dashboard" }), Some(&admin))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"], "Brand slug 'dashboard' is reserved");

    let response = ctx
        .send(
            Request::builder()
                .method("PATCH")
                .uri(format!("/api/brands/{}", Uuid::new_v4()))
                .header(header::COOKIE, format!("admin-token={}", admin))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json!({ "slug": "api" }).to_string()))
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
