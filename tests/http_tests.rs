//! End-to-end tests through the full router, middleware stack included.

use axum::{
    body::Body,
    http::{header, Method, Request, Response, StatusCode},
    Router,
};
use launchpad::app::{self, SESSION_COOKIE_NAME};
use launchpad::auth::mailer::RecordingMailer;
use launchpad::config::Config;
use launchpad::db;
use launchpad::state::AppState;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt; // for oneshot

const PASSWORD: &str = "password123";

/// Router over a fresh in-memory database. `overrides` are extra
/// environment variables such as `FEATURE_SIGNUP`.
async fn create_test_app(overrides: &[(&str, &str)]) -> (Router, Arc<RecordingMailer>) {
    let mut vars = vec![
        ("DATABASE_URL", "sqlite::memory:"),
        ("AUTH_SECRET", "test-secret-key-that-is-at-least-32-characters-long"),
        ("APP_ENV", "test"),
    ];
    vars.extend_from_slice(overrides);
    let config = Config::from_vars(vars).expect("valid test config");

    let pool = db::connect(&config.database_url, 1).await.unwrap();
    db::migrate(&pool).await.unwrap();
    let store = app::session_store(pool.clone()).await.unwrap();

    let mailer = Arc::new(RecordingMailer::new());
    let state = AppState::with_pool(pool, config, mailer.clone());
    (app::build(state, store), mailer)
}

fn json_request(method: Method, uri: &str, body: Value, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn form_request(uri: &str, body: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(Method::GET).uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

async fn send(router: &Router, request: Request<Body>) -> Response<Body> {
    router.clone().oneshot(request).await.unwrap()
}

async fn body_text(response: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn body_json(response: Response<Body>) -> Value {
    serde_json::from_str(&body_text(response).await).unwrap()
}

/// `name=value` of the session cookie set by `response`, if any.
fn session_cookie(response: &Response<Body>) -> Option<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with(&format!("{}=", SESSION_COOKIE_NAME)))
        .and_then(|v| v.split(';').next())
        .map(str::to_string)
}

fn location(response: &Response<Body>) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

/// Sign up through the JSON API and return the response body and cookie.
async fn sign_up(router: &Router, email: &str) -> (Value, Option<String>) {
    let response = send(
        router,
        json_request(
            Method::POST,
            "/api/auth/sign-up/email",
            json!({ "name": "Ada Lovelace", "email": email, "password": PASSWORD }),
            None,
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let cookie = session_cookie(&response);
    (body_json(response).await, cookie)
}

async fn sign_in(router: &Router, email: &str, password: &str) -> Response<Body> {
    send(
        router,
        json_request(
            Method::POST,
            "/api/auth/sign-in/email",
            json!({ "email": email, "password": password }),
            None,
        ),
    )
    .await
}

#[tokio::test]
async fn test_health_check() {
    let (router, _) = create_test_app(&[]).await;

    let response = send(&router, get("/health", None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await,
        json!({ "status": "healthy", "service": "launchpad" })
    );
}

#[tokio::test]
async fn test_security_headers_on_every_response() {
    let (router, _) = create_test_app(&[]).await;

    for uri in ["/health", "/", "/no-such-page"] {
        let response = send(&router, get(uri, None)).await;
        let headers = response.headers();
        assert_eq!(headers["x-frame-options"], "DENY");
        assert_eq!(headers["x-content-type-options"], "nosniff");
        assert_eq!(headers["referrer-policy"], "origin-when-cross-origin");
        assert_eq!(headers["x-dns-prefetch-control"], "on");
        assert_eq!(
            headers["permissions-policy"],
            "camera=(), microphone=(), geolocation=()"
        );
        assert!(headers.get(header::STRICT_TRANSPORT_SECURITY).is_none());
    }
}

#[tokio::test]
async fn test_hsts_in_production() {
    let (router, _) = create_test_app(&[("APP_ENV", "production")]).await;

    let response = send(&router, get("/health", None)).await;
    assert_eq!(
        response.headers()[header::STRICT_TRANSPORT_SECURITY],
        "max-age=63072000; includeSubDomains; preload"
    );
}

#[tokio::test]
async fn test_unknown_page_is_404() {
    let (router, _) = create_test_app(&[]).await;

    let response = send(&router, get("/no-such-page", None)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(body_text(response).await.contains("Page not found"));
}

#[tokio::test]
async fn test_dashboard_redirects_without_session() {
    let (router, _) = create_test_app(&[]).await;

    let response = send(&router, get("/dashboard", None)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/auth/signin");
}

#[tokio::test]
async fn test_api_requires_session() {
    let (router, _) = create_test_app(&[]).await;

    let response = send(&router, get("/api/users/me", None)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        body_json(response).await,
        json!({ "error": "Unauthorized: Not authenticated" })
    );
}

#[tokio::test]
async fn test_sign_up_starts_a_session() {
    let (router, _) = create_test_app(&[]).await;

    let (body, cookie) = sign_up(&router, "Ada@Example.com").await;
    assert!(body["token"].is_string());
    assert_eq!(body["user"]["email"], "ada@example.com");
    assert!(body["user"].get("password").is_none());
    let cookie = cookie.expect("session cookie");

    let response = send(&router, get("/api/auth/get-session", Some(&cookie))).await;
    let session = body_json(response).await;
    assert_eq!(session["user"]["email"], "ada@example.com");
    assert_eq!(session["session"]["token"], body["token"]);

    let response = send(&router, get("/api/users/me", Some(&cookie))).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["name"], "Ada Lovelace");

    let response = send(&router, get("/dashboard", Some(&cookie))).await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("Ada Lovelace"));
    assert!(html.contains("(this browser)"));
}

#[tokio::test]
async fn test_duplicate_sign_up_conflicts() {
    let (router, _) = create_test_app(&[]).await;
    sign_up(&router, "ada@example.com").await;

    let response = send(
        &router,
        json_request(
            Method::POST,
            "/api/auth/sign-up/email",
            json!({ "name": "Again", "email": "ADA@example.com", "password": PASSWORD }),
            None,
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_sign_in_failures_are_uniform() {
    let (router, _) = create_test_app(&[]).await;
    sign_up(&router, "ada@example.com").await;

    let wrong_password = sign_in(&router, "ada@example.com", "wrong-password").await;
    assert_eq!(wrong_password.status(), StatusCode::UNAUTHORIZED);
    let unknown_user = sign_in(&router, "nobody@example.com", PASSWORD).await;
    assert_eq!(unknown_user.status(), StatusCode::UNAUTHORIZED);

    assert_eq!(
        body_json(wrong_password).await,
        body_json(unknown_user).await
    );
}

#[tokio::test]
async fn test_sign_out_ends_the_session() {
    let (router, _) = create_test_app(&[]).await;
    let (_, cookie) = sign_up(&router, "ada@example.com").await;
    let cookie = cookie.unwrap();

    let response = send(
        &router,
        json_request(Method::POST, "/api/auth/sign-out", json!({}), Some(&cookie)),
    )
    .await;
    assert_eq!(body_json(response).await, json!({ "success": true }));

    let response = send(&router, get("/api/auth/get-session", Some(&cookie))).await;
    assert_eq!(body_json(response).await, Value::Null);
}

#[tokio::test]
async fn test_action_reports_failure_in_body() {
    let (router, _) = create_test_app(&[]).await;
    sign_up(&router, "ada@example.com").await;

    let response = send(
        &router,
        json_request(
            Method::POST,
            "/actions/sign-in",
            json!({ "email": "ada@example.com", "password": "wrong-password" }),
            None,
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await,
        json!({ "success": false, "error": "Invalid email or password" })
    );

    let response = send(
        &router,
        json_request(
            Method::POST,
            "/actions/sign-up",
            json!({ "name": "Bob", "email": "bob@example.com", "password": "short" }),
            None,
        ),
    )
    .await;
    let body = body_json(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Password must be between 8 and 128 characters");
}

#[tokio::test]
async fn test_action_sign_in_succeeds() {
    let (router, _) = create_test_app(&[]).await;
    sign_up(&router, "ada@example.com").await;

    let response = send(
        &router,
        json_request(
            Method::POST,
            "/actions/sign-in",
            json!({ "email": "ada@example.com", "password": PASSWORD }),
            None,
        ),
    )
    .await;
    let cookie = session_cookie(&response).expect("session cookie");
    let body = body_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["email"], "ada@example.com");

    let response = send(
        &router,
        json_request(
            Method::POST,
            "/actions/update-profile",
            json!({ "name": "  Countess  " }),
            Some(&cookie),
        ),
    )
    .await;
    let body = body_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["name"], "Countess");
}

#[tokio::test]
async fn test_page_sign_in_flow() {
    let (router, _) = create_test_app(&[]).await;
    sign_up(&router, "ada@example.com").await;

    let response = send(
        &router,
        form_request(
            "/auth/signin",
            "email=ada%40example.com&password=wrong-password",
            None,
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("Invalid email or password"));
    assert!(html.contains(r#"value="ada@example.com""#));

    let response = send(
        &router,
        form_request(
            "/auth/signin",
            "email=ada%40example.com&password=password123",
            None,
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/dashboard");
    let cookie = session_cookie(&response).unwrap();

    // Signed-in visitors skip the auth pages
    let response = send(&router, get("/auth/signin", Some(&cookie))).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/dashboard");

    let response = send(&router, form_request("/dashboard/sign-out", "", Some(&cookie))).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/auth/signin?notice=signed-out");

    let response = send(&router, get("/dashboard", Some(&cookie))).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn test_password_reset_flow() {
    let (router, mailer) = create_test_app(&[]).await;
    let (_, cookie) = sign_up(&router, "ada@example.com").await;
    let old_cookie = cookie.unwrap();

    // Unknown addresses look the same from outside
    let response = send(
        &router,
        json_request(
            Method::POST,
            "/api/auth/forget-password",
            json!({ "email": "nobody@example.com" }),
            None,
        ),
    )
    .await;
    assert_eq!(body_json(response).await, json!({ "status": true }));
    assert!(mailer.sent().is_empty());

    let response = send(
        &router,
        json_request(
            Method::POST,
            "/api/auth/forget-password",
            json!({ "email": "ada@example.com" }),
            None,
        ),
    )
    .await;
    assert_eq!(body_json(response).await, json!({ "status": true }));

    let email = mailer.last_to("ada@example.com").expect("reset email");
    assert!(email.text.contains("http://localhost:3000/auth/reset-password?token="));
    let token = email.link_token().unwrap().to_string();

    let reset = json!({ "token": token, "newPassword": "new-password-456" });
    let response = send(
        &router,
        json_request(Method::POST, "/api/auth/reset-password", reset.clone(), None),
    )
    .await;
    assert_eq!(body_json(response).await, json!({ "status": true }));

    // Tokens are single use
    let response = send(
        &router,
        json_request(Method::POST, "/api/auth/reset-password", reset, None),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Existing sessions were revoked
    let response = send(&router, get("/api/auth/get-session", Some(&old_cookie))).await;
    assert_eq!(body_json(response).await, Value::Null);

    assert_eq!(
        sign_in(&router, "ada@example.com", PASSWORD).await.status(),
        StatusCode::UNAUTHORIZED
    );
    assert_eq!(
        sign_in(&router, "ada@example.com", "new-password-456")
            .await
            .status(),
        StatusCode::OK
    );
}

#[tokio::test]
async fn test_email_verification_flow() {
    let (router, mailer) = create_test_app(&[("FEATURE_EMAIL_VERIFICATION", "true")]).await;

    let (body, cookie) = sign_up(&router, "ada@example.com").await;
    assert_eq!(body["token"], Value::Null);
    assert!(cookie.is_none());

    let response = sign_in(&router, "ada@example.com", PASSWORD).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let token = mailer
        .last_to("ada@example.com")
        .and_then(|email| email.link_token().map(str::to_string))
        .expect("verification email");

    let response = send(
        &router,
        get(&format!("/api/auth/verify-email?token={}", token), None),
    )
    .await;
    assert_eq!(body_json(response).await, json!({ "status": true }));

    let response = sign_in(&router, "ada@example.com", PASSWORD).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["user"]["emailVerified"], true);
}

#[tokio::test]
async fn test_flags_endpoint_and_disabled_sign_up() {
    let (router, _) = create_test_app(&[("FEATURE_SIGNUP", "off")]).await;

    let response = send(&router, get("/api/flags", None)).await;
    let flags = body_json(response).await;
    assert_eq!(flags["signup"], false);
    assert_eq!(flags["password_reset"], true);
    assert_eq!(flags["email_verification"], false);

    let response = send(
        &router,
        json_request(
            Method::POST,
            "/api/auth/sign-up/email",
            json!({ "name": "Ada", "email": "ada@example.com", "password": PASSWORD }),
            None,
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = send(&router, get("/auth/signup", None)).await;
    assert!(body_text(response).await.contains("registrations are closed"));
}

#[tokio::test]
async fn test_theme_toggle_persists_in_session() {
    let (router, _) = create_test_app(&[]).await;

    let response = send(&router, get("/api/theme", None)).await;
    assert_eq!(body_json(response).await, json!({ "theme": "light" }));

    let response = send(
        &router,
        json_request(Method::POST, "/api/theme/toggle", json!({}), None),
    )
    .await;
    let cookie = session_cookie(&response).expect("session cookie");
    assert_eq!(body_json(response).await, json!({ "theme": "dark" }));

    let response = send(&router, get("/", Some(&cookie))).await;
    assert!(body_text(response).await.contains(r#"class="dark""#));

    let response = send(
        &router,
        json_request(Method::PUT, "/api/theme", json!({ "theme": "light" }), Some(&cookie)),
    )
    .await;
    assert_eq!(body_json(response).await, json!({ "theme": "light" }));
}

#[tokio::test]
async fn test_theme_form_redirects_back() {
    let (router, _) = create_test_app(&[]).await;

    let request = Request::builder()
        .method(Method::POST)
        .uri("/theme")
        .header(header::REFERER, "http://localhost:3000/auth/signin")
        .body(Body::empty())
        .unwrap();
    let response = send(&router, request).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/auth/signin");

    let request = Request::builder()
        .method(Method::POST)
        .uri("/theme")
        .header(header::REFERER, "https://elsewhere.example/phish")
        .body(Body::empty())
        .unwrap();
    let response = send(&router, request).await;
    assert_eq!(location(&response), "/");

    let request = Request::builder()
        .method(Method::POST)
        .uri("/theme")
        .header(header::REFERER, "http://localhost:3000//evil.example/x")
        .body(Body::empty())
        .unwrap();
    let response = send(&router, request).await;
    assert_eq!(location(&response), "/");
}

#[tokio::test]
async fn test_theme_writes_respect_flag() {
    let (router, _) = create_test_app(&[("FEATURE_THEME_TOGGLE", "false")]).await;

    let response = send(
        &router,
        json_request(Method::POST, "/api/theme/toggle", json!({}), None),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = send(&router, get("/api/theme", None)).await;
    assert_eq!(body_json(response).await, json!({ "theme": "light" }));
}

#[tokio::test]
async fn test_list_sessions_and_revoke_others() {
    let (router, _) = create_test_app(&[]).await;
    let (_, cookie) = sign_up(&router, "ada@example.com").await;
    let cookie = cookie.unwrap();
    let other = session_cookie(&sign_in(&router, "ada@example.com", PASSWORD).await).unwrap();

    let response = send(&router, get("/api/auth/list-sessions", Some(&cookie))).await;
    assert_eq!(body_json(response).await.as_array().map(Vec::len), Some(2));

    let response = send(
        &router,
        form_request("/dashboard/sessions/revoke-others", "", Some(&cookie)),
    )
    .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/dashboard?notice=sessions-revoked");

    let response = send(&router, get("/api/auth/list-sessions", Some(&cookie))).await;
    assert_eq!(body_json(response).await.as_array().map(Vec::len), Some(1));

    let response = send(&router, get("/api/users/me", Some(&other))).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_session_list_flag() {
    let (router, _) = create_test_app(&[("FEATURE_SESSION_LIST", "0")]).await;
    let (_, cookie) = sign_up(&router, "ada@example.com").await;
    let cookie = cookie.unwrap();

    let response = send(&router, get("/api/auth/list-sessions", Some(&cookie))).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = send(&router, get("/dashboard", Some(&cookie))).await;
    assert!(!body_text(response).await.contains("Active sessions"));
}

#[tokio::test]
async fn test_delete_user() {
    let (router, _) = create_test_app(&[]).await;
    let (_, cookie) = sign_up(&router, "ada@example.com").await;
    let cookie = cookie.unwrap();

    let response = send(
        &router,
        json_request(
            Method::POST,
            "/api/auth/delete-user",
            json!({ "password": "wrong-password" }),
            Some(&cookie),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = send(
        &router,
        json_request(
            Method::POST,
            "/api/auth/delete-user",
            json!({ "password": PASSWORD }),
            Some(&cookie),
        ),
    )
    .await;
    assert_eq!(body_json(response).await, json!({ "success": true }));

    let response = send(&router, get("/api/users/me", Some(&cookie))).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        sign_in(&router, "ada@example.com", PASSWORD).await.status(),
        StatusCode::UNAUTHORIZED
    );
}

#[tokio::test]
async fn test_malformed_action_body_is_a_failed_result() {
    let (router, _) = create_test_app(&[]).await;

    let request = Request::builder()
        .method(Method::POST)
        .uri("/actions/sign-in")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = send(&router, request).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await,
        json!({ "success": false, "error": "Invalid request body" })
    );
}

#[tokio::test]
async fn test_cors_allows_auth_origin() {
    let (router, _) = create_test_app(&[("AUTH_URL", "http://auth.localhost:4000")]).await;

    for origin in ["http://localhost:3000", "http://auth.localhost:4000"] {
        let request = Request::builder()
            .uri("/health")
            .header(header::ORIGIN, origin)
            .body(Body::empty())
            .unwrap();
        let response = send(&router, request).await;
        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            origin
        );
    }

    let request = Request::builder()
        .uri("/health")
        .header(header::ORIGIN, "https://elsewhere.example")
        .body(Body::empty())
        .unwrap();
    let response = send(&router, request).await;
    assert!(response
        .headers()
        .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
        .is_none());
}

#[tokio::test]
async fn test_deployment_variable_names() {
    let (router, _) = create_test_app(&[
        ("NEXT_PUBLIC_APP_URL", "http://app.localhost:3000"),
        ("BETTER_AUTH_SECRET", "deployment-secret-that-is-at-least-32-characters"),
        ("NEXT_PUBLIC_FEATURE_SIGNUP", "false"),
    ])
    .await;

    let response = send(&router, get("/api/flags", None)).await;
    assert_eq!(body_json(response).await["signup"], json!(false));

    let request = Request::builder()
        .method(Method::POST)
        .uri("/theme")
        .header(header::REFERER, "http://app.localhost:3000/auth/signin")
        .body(Body::empty())
        .unwrap();
    let response = send(&router, request).await;
    assert_eq!(location(&response), "/auth/signin");
}
