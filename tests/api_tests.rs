use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use http_body_util::BodyExt;
use tower::ServiceExt;
use vouchr::config::Config;

/// Bootstrap credentials seeded by the initial migration.
const ADMIN_USER: &str = "admin";
const ADMIN_PASSWORD: &str = "password";

async fn spawn_app() -> Router {
    let mut config = Config::default();
    config.general.database_path = "sqlite::memory:".to_string();
    config.general.max_db_connections = 1;
    config.general.min_db_connections = 1;

    let state = vouchr::api::create_app_state_from_config(config)
        .await
        .expect("Failed to create app state");
    vouchr::api::router(state).await
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap()
}

/// Logs in and returns the session cookie plus the response body.
async fn login(app: &Router, username: &str, password: &str) -> (StatusCode, Option<String>, serde_json::Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/auth/login")
                .header("Content-Type", "application/json")
                .body(Body::from(
                    serde_json::json!({"username": username, "password": password}).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.split(';').next().unwrap_or(v).to_string());
    let json = body_json(response).await;

    (status, cookie, json)
}

async fn get_with_cookie(app: &Router, uri: &str, cookie: &str) -> axum::response::Response {
    app.clone()
        .oneshot(
            Request::builder()
                .uri(uri)
                .header(header::COOKIE, cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap()
}

#[tokio::test]
async fn login_rejects_bad_credentials() {
    let app = spawn_app().await;

    let (status, _, json) = login(&app, ADMIN_USER, "wrong-password").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["code"], "INVALID_CREDENTIALS");

    // Unknown usernames get the same code; no enumeration signal.
    let (status, _, json) = login(&app, "nobody", "whatever").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["code"], "INVALID_CREDENTIALS");
}

#[tokio::test]
async fn protected_routes_require_session() {
    let app = spawn_app().await;

    for uri in [
        "/api/auth/me",
        "/api/approvals/mine",
        "/api/approvals/actionable",
        "/api/members/pending",
        "/api/system/status",
    ] {
        let response = app
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{uri}");
    }
}

#[tokio::test]
async fn admin_can_login_and_fetch_identity() {
    let app = spawn_app().await;

    let (status, cookie, json) = login(&app, ADMIN_USER, ADMIN_PASSWORD).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["must_change_password"], true);
    assert_eq!(json["data"]["access_state"]["state"], "active");
    let cookie = cookie.expect("login should set a session cookie");

    let response = get_with_cookie(&app, "/api/auth/me", &cookie).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["data"]["user"]["username"], ADMIN_USER);
    assert_eq!(json["data"]["access_state"]["state"], "active");
}

#[tokio::test]
async fn password_change_invalidates_every_other_session() {
    let app = spawn_app().await;

    let (_, cookie_a, _) = login(&app, ADMIN_USER, ADMIN_PASSWORD).await;
    let (_, cookie_b, _) = login(&app, ADMIN_USER, ADMIN_PASSWORD).await;
    let cookie_a = cookie_a.unwrap();
    let cookie_b = cookie_b.unwrap();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri("/api/auth/password")
                .header("Content-Type", "application/json")
                .header(header::COOKIE, &cookie_a)
                .body(Body::from(
                    serde_json::json!({
                        "current_password": ADMIN_PASSWORD,
                        "new_password": "a-much-better-one",
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // The second session dies on its very next use.
    let response = get_with_cookie(&app, "/api/auth/me", &cookie_b).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = body_json(response).await;
    assert_eq!(json["code"], "TOKEN_INVALIDATED");

    // Old password no longer works; new one does.
    let (status, _, json) = login(&app, ADMIN_USER, ADMIN_PASSWORD).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["code"], "INVALID_CREDENTIALS");

    let (status, _, _) = login(&app, ADMIN_USER, "a-much-better-one").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn password_change_validates_input() {
    let app = spawn_app().await;

    let (_, cookie, _) = login(&app, ADMIN_USER, ADMIN_PASSWORD).await;
    let cookie = cookie.unwrap();

    for new_password in ["short", ADMIN_PASSWORD] {
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("PUT")
                    .uri("/api/auth/password")
                    .header("Content-Type", "application/json")
                    .header(header::COOKIE, &cookie)
                    .body(Body::from(
                        serde_json::json!({
                            "current_password": ADMIN_PASSWORD,
                            "new_password": new_password,
                        })
                        .to_string(),
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}

#[tokio::test]
async fn approval_votes_are_scoped_to_the_project() {
    let store = vouchr::db::Store::with_pool_options("sqlite::memory:", 1, 1)
        .await
        .expect("Failed to open in-memory store");
    let state = vouchr::state::SharedState::with_store(Config::default(), store);
    let app_state = vouchr::api::create_app_state(std::sync::Arc::new(state.clone()));
    let app = vouchr::api::router(app_state).await;

    // Two disjoint projects; "outsider" is active but in the wrong one.
    let store = &state.store;
    let affected = store.create_user("affected", "password123").await.unwrap();
    let insider = store.create_user("insider", "password123").await.unwrap();
    let outsider = store.create_user("outsider", "password123").await.unwrap();

    let atlas = store.create_project("atlas").await.unwrap();
    store
        .add_project_member(atlas.id, affected.id, vouchr::domain::Role::Editor)
        .await
        .unwrap();
    store
        .add_project_member(atlas.id, insider.id, vouchr::domain::Role::Editor)
        .await
        .unwrap();
    let borealis = store.create_project("borealis").await.unwrap();
    store
        .add_project_member(borealis.id, outsider.id, vouchr::domain::Role::Editor)
        .await
        .unwrap();

    let approvals = state
        .approval_service
        .open_for_event(
            affected.id,
            vouchr::services::SecurityEvent::PasswordChange,
            "corr-scope",
        )
        .await
        .unwrap();
    let uri = format!("/api/approvals/{}/votes", approvals[0].id);

    let (_, outsider_cookie, _) = login(&app, "outsider", "password123").await;
    let response = get_with_cookie(&app, &uri, &outsider_cookie.unwrap()).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let json = body_json(response).await;
    assert_eq!(json["code"], "NOT_ELIGIBLE_VOTER");

    let (_, insider_cookie, _) = login(&app, "insider", "password123").await;
    let response = get_with_cookie(&app, &uri, &insider_cookie.unwrap()).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn recovery_endpoints_are_public() {
    let app = spawn_app().await;

    // Unknown usernames get a plausible intent back.
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/recovery")
                .header("Content-Type", "application/json")
                .body(Body::from(
                    serde_json::json!({"username": "ghost"}).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["data"]["status"], "pending");
    assert_eq!(json["data"]["username"], "ghost");
    let token = json["data"]["token"].as_str().unwrap().to_string();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/api/recovery/{token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["data"]["status"], "pending");
}

#[tokio::test]
async fn unknown_recovery_token_is_not_found() {
    let app = spawn_app().await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/recovery/not-a-real-token")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn system_status_reports_database_health() {
    let app = spawn_app().await;

    let (_, cookie, _) = login(&app, ADMIN_USER, ADMIN_PASSWORD).await;
    let cookie = cookie.unwrap();

    let response = get_with_cookie(&app, "/api/system/status", &cookie).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["data"]["database_ok"], true);
    assert!(json["data"]["version"].is_string());
}
