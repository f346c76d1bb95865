use axum::body::Body;
use axum::http::{header, Method, Request};
use domains::UserRepository;
use integration_tests::web::TestApp;
use integration_tests::{ADMIN_EMAIL, ADMIN_TOKEN, PASSWORD, RESET_CODE};
use serde_json::json;

#[tokio::test]
async fn health_is_public() {
    let app = TestApp::new().await;
    let (status, body) = app.get("/health", None).await;
    assert_eq!(status, 200);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn register_then_me_with_the_issued_token() {
    let app = TestApp::new().await;

    let (status, body) = app
        .json(
            Method::POST,
            "/api/auth/register",
            None,
            json!({ "email": "carol@gmail.com", "password": PASSWORD, "confirm_password": PASSWORD }),
        )
        .await;
    assert_eq!(status, 200, "{body}");
    assert_eq!(body["message"], "Account created!");
    assert!(body["user"].get("password_hash").is_none());

    let bearer = format!("Bearer {}", body["token"].as_str().unwrap());
    let (status, me) = app.get("/api/auth/me", Some(&bearer)).await;
    assert_eq!(status, 200);
    assert_eq!(me["user"]["email"], "carol@gmail.com");
}

#[tokio::test]
async fn invalid_input_is_a_bad_request() {
    let app = TestApp::new().await;

    let (status, body) = app
        .json(
            Method::POST,
            "/api/auth/register",
            None,
            json!({ "email": "carol@yahoo.com", "password": PASSWORD, "confirm_password": PASSWORD }),
        )
        .await;
    assert_eq!(status, 400);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Email must be a Gmail address.");
}

#[tokio::test]
async fn login_rejects_wrong_password_and_signed_in_callers() {
    let app = TestApp::new().await;
    let alice = app.harness.user("alice").await;

    let (status, _) = app
        .json(Method::POST, "/api/auth/login", None, json!({ "email": "alice@gmail.com", "password": "wrong-password" }))
        .await;
    assert_eq!(status, 403);

    let (status, body) = app
        .json(Method::POST, "/api/auth/login", None, json!({ "email": "alice@gmail.com", "password": PASSWORD }))
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["message"], "Welcome back, alice!");

    let (status, body) = app
        .json(
            Method::POST,
            "/api/auth/login",
            Some(&app.bearer(&alice)),
            json!({ "email": "alice@gmail.com", "password": PASSWORD }),
        )
        .await;
    assert_eq!(status, 403);
    assert_eq!(body["message"], "You are already logged in.");
}

#[tokio::test]
async fn protected_routes_need_a_valid_session() {
    let app = TestApp::new().await;

    let (status, body) = app.get("/api/saved", None).await;
    assert_eq!(status, 401);
    assert_eq!(body["message"], "Please log in to access this page.");

    let (status, _) = app.get("/api/saved", Some("Bearer not-a-jwt")).await;
    assert_eq!(status, 401);
}

#[tokio::test]
async fn admin_routes_need_role_and_token() {
    let app = TestApp::new().await;
    let admin = app.harness.admin().await;
    let alice = app.harness.user("alice").await;
    let tables = format!("/api/admin/tables?token={ADMIN_TOKEN}");

    let (status, _) = app.get(&tables, Some(&app.bearer(&alice))).await;
    assert_eq!(status, 403);

    let (status, _) = app.get("/api/admin/tables?token=guess", Some(&app.bearer(&admin))).await;
    assert_eq!(status, 403);

    let (status, body) = app.get(&tables, Some(&app.bearer(&admin))).await;
    assert_eq!(status, 200, "{body}");
    assert_eq!(body["tables"].as_array().map(Vec::len), Some(7));

    let (status, body) =
        app.get(&format!("/api/admin/tables/nope?token={ADMIN_TOKEN}"), Some(&app.bearer(&admin))).await;
    assert_eq!(status, 404);
    assert_eq!(body["message"], "Table 'nope' not found.");
}

#[tokio::test]
async fn admin_login_only_for_the_configured_admin() {
    let app = TestApp::new().await;
    app.harness.admin().await;
    app.harness.user("alice").await;

    let (status, _) = app
        .json(Method::POST, "/api/auth/admin/login", None, json!({ "email": "alice@gmail.com", "password": PASSWORD }))
        .await;
    assert_eq!(status, 403);

    let (status, body) = app
        .json(Method::POST, "/api/auth/admin/login", None, json!({ "email": ADMIN_EMAIL, "password": PASSWORD }))
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["message"], "Welcome back, boss!");
}

#[tokio::test]
async fn password_reset_over_http() {
    let app = TestApp::new().await;
    app.harness.user("alice").await;

    let (status, body) = app
        .json(Method::POST, "/api/auth/forgot-password", None, json!({ "email": "alice@gmail.com" }))
        .await;
    assert_eq!(status, 200);
    let token = body["token"].as_str().unwrap().to_string();

    let (status, _) = app
        .json(Method::POST, "/api/auth/verify-code", None, json!({ "token": token, "code": RESET_CODE }))
        .await;
    assert_eq!(status, 200);

    let (status, body) = app
        .json(Method::POST, "/api/auth/verify-code", None, json!({ "token": token, "code": RESET_CODE }))
        .await;
    assert_eq!(status, 400);
    assert_eq!(body["success"], false);

    let (status, _) = app
        .json(
            Method::POST,
            "/api/auth/reset-password",
            None,
            json!({ "token": token, "password": "brandnewpass", "confirm_password": "brandnewpass" }),
        )
        .await;
    assert_eq!(status, 200);
}

#[tokio::test]
async fn google_sign_in_is_off_without_a_provider() {
    let app = TestApp::new().await;
    let (status, body) = app.get("/api/auth/google", None).await;
    assert_eq!(status, 404);
    assert_eq!(body["message"], "Google sign-in is not configured.");
}

/// Starts a Google sign-in and returns the `state` sent to the provider
/// together with the nonce cookie handed to the browser.
async fn start_google_sign_in(app: &TestApp) -> (String, String) {
    let response = app.raw(Request::get("/api/auth/google").body(Body::empty()).unwrap()).await;
    assert_eq!(response.status(), 303);

    let location = response.headers()[header::LOCATION].to_str().unwrap();
    let state = location.split_once("state=").unwrap().1.to_string();
    let cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
    assert!(cookie.contains("HttpOnly"));
    let nonce_cookie = cookie.split(';').next().unwrap().to_string();
    (state, nonce_cookie)
}

async fn google_callback(app: &TestApp, code: &str, state: &str, cookie: Option<&str>) -> (u16, String) {
    let mut request = Request::get(format!("/api/auth/google/callback?code={code}&state={state}"));
    if let Some(cookie) = cookie {
        request = request.header(header::COOKIE, cookie);
    }
    let response = app.raw(request.body(Body::empty()).unwrap()).await;
    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .map(|v| v.to_str().unwrap().to_string())
        .unwrap_or_default();
    (response.status().as_u16(), set_cookie)
}

#[tokio::test]
async fn google_callback_is_bound_to_the_starting_browser() {
    let app = TestApp::with_google().await;
    let (state, cookie) = start_google_sign_in(&app).await;

    let (status, _) = google_callback(&app, "mallory", &state, None).await;
    assert_eq!(status, 403);

    let (_, victim_cookie) = start_google_sign_in(&app).await;
    let (status, _) = google_callback(&app, "mallory", &state, Some(&victim_cookie)).await;
    assert_eq!(status, 403);
    assert!(app.harness.store.find_by_email("mallory@gmail.com").await.unwrap().is_none());

    let (status, cleared) = google_callback(&app, "carol", &state, Some(&cookie)).await;
    assert_eq!(status, 200);
    assert!(cleared.contains("Max-Age=0"));
    assert!(app.harness.store.find_by_email("carol@gmail.com").await.unwrap().is_some());
}

#[tokio::test]
async fn auth_endpoints_are_rate_limited_per_client() {
    let app = TestApp::with_rate_limit(1).await;
    app.harness.user("alice").await;
    let credentials = json!({ "email": "alice@gmail.com", "password": PASSWORD });

    let (status, _) = app.json(Method::POST, "/api/auth/login", None, credentials.clone()).await;
    assert_eq!(status, 200);

    let (status, body) = app.json(Method::POST, "/api/auth/login", None, credentials).await;
    assert_eq!(status, 429);
    assert_eq!(body["success"], false);

    // Session introspection sits outside the limiter.
    let alice = app.harness.store.find_by_email("alice@gmail.com").await.unwrap().unwrap();
    let (status, _) = app.get("/api/auth/me", Some(&app.bearer(&alice))).await;
    assert_eq!(status, 200);
}
