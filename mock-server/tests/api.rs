use std::sync::Arc;

use axum::http::{self, Request, StatusCode};
use axum::Router;
use base64::{engine::general_purpose::STANDARD, Engine};
use http_body_util::BodyExt;
use mock_server::{app, app_with_state, MockState, DEFAULT_PASSWORD, DEFAULT_USERNAME, STATUS_PAUSED};
use serde_json::Value;
use tower::ServiceExt;

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn basic(username: &str, password: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{username}:{password}")))
}

fn signin_request(authorization: &str) -> Request<String> {
    Request::builder()
        .uri("/users/signin")
        .header(http::header::AUTHORIZATION, authorization)
        .header("Partner", "wallbox")
        .body(String::new())
        .unwrap()
}

fn authed(method: &str, uri: &str, token: &str, body: &str) -> Request<String> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(http::header::AUTHORIZATION, format!("Bearer {token}"))
        .header(http::header::CONTENT_TYPE, "application/json;charset=UTF-8")
        .body(body.to_string())
        .unwrap()
}

/// Sign in against `app` and return the (access, refresh) pair.
async fn sign_in(app: &Router) -> (String, String) {
    let resp = app
        .clone()
        .oneshot(signin_request(&basic(DEFAULT_USERNAME, DEFAULT_PASSWORD)))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    let attrs = &body["data"]["attributes"];
    (
        attrs["token"].as_str().unwrap().to_string(),
        attrs["refresh_token"].as_str().unwrap().to_string(),
    )
}

// --- auth ---

#[tokio::test]
async fn signin_returns_token_attributes() {
    let state = Arc::new(MockState::default());
    let app = app_with_state(state.clone());
    let resp = app
        .oneshot(signin_request(&basic(DEFAULT_USERNAME, DEFAULT_PASSWORD)))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    let attrs = &body["data"]["attributes"];
    assert!(attrs["token"].as_str().unwrap().starts_with("access-"));
    assert!(attrs["refresh_token"].as_str().unwrap().starts_with("refresh-"));
    assert!(attrs["refresh_token_ttl"].as_i64().unwrap() > attrs["ttl"].as_i64().unwrap());
    assert_eq!(state.signin_count(), 1);
}

#[tokio::test]
async fn signin_wrong_password_returns_401() {
    let resp = app()
        .oneshot(signin_request(&basic(DEFAULT_USERNAME, "wrong")))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn signin_without_partner_returns_400() {
    let resp = app()
        .oneshot(
            Request::builder()
                .uri("/users/signin")
                .header(http::header::AUTHORIZATION, basic(DEFAULT_USERNAME, DEFAULT_PASSWORD))
                .body(String::new())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn refresh_rotates_tokens() {
    let state = Arc::new(MockState::default());
    let app = app_with_state(state.clone());
    let (access, refresh) = sign_in(&app).await;

    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/users/refresh-token")
                .header(http::header::AUTHORIZATION, format!("Bearer {refresh}"))
                .header("Partner", "wallbox")
                .body(String::new())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    let new_access = body["data"]["attributes"]["token"].as_str().unwrap().to_string();
    assert_ne!(new_access, access);
    assert_eq!(state.refresh_count(), 1);

    // the old access token is no longer accepted
    let resp = app
        .oneshot(authed("GET", "/v3/chargers/groups", &access, ""))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn refresh_with_access_token_returns_401() {
    let app = app();
    let (access, _) = sign_in(&app).await;

    let resp = app
        .oneshot(
            Request::builder()
                .uri("/users/refresh-token")
                .header(http::header::AUTHORIZATION, format!("Bearer {access}"))
                .header("Partner", "wallbox")
                .body(String::new())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn refresh_without_token_before_signin_returns_401() {
    let resp = app()
        .oneshot(
            Request::builder()
                .uri("/users/refresh-token")
                .header("Partner", "wallbox")
                .body(String::new())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

// --- chargers ---

#[tokio::test]
async fn groups_require_bearer_token() {
    let resp = app()
        .oneshot(Request::builder().uri("/v3/chargers/groups").body(String::new()).unwrap())
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert!(body_bytes(resp).await.is_empty());
}

#[tokio::test]
async fn groups_list_nested_chargers() {
    let app = app();
    let (access, _) = sign_in(&app).await;

    let resp = app
        .oneshot(authed("GET", "/v3/chargers/groups", &access, ""))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    let groups = body["result"]["groups"].as_array().unwrap();
    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0]["chargers"][0]["id"], 101);
    assert_eq!(groups[1]["chargers"][1]["id"], 101);
}

#[tokio::test]
async fn status_unknown_charger_returns_404() {
    let app = app();
    let (access, _) = sign_in(&app).await;

    let resp = app
        .oneshot(authed("GET", "/chargers/status/999", &access, ""))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn lock_then_status() {
    let app = app();
    let (access, _) = sign_in(&app).await;

    let resp = app
        .clone()
        .oneshot(authed("PUT", "/v2/charger/102", &access, r#"{"locked":1}"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await["data"]["chargerData"]["locked"], 1);

    let resp = app
        .oneshot(authed("GET", "/chargers/status/102", &access, ""))
        .await
        .unwrap();
    let body = body_json(resp).await;
    assert_eq!(body["config_data"]["locked"], 1);
    assert_eq!(body["name"], "Driveway");
}

#[tokio::test]
async fn invalid_lock_value_returns_422() {
    let app = app();
    let (access, _) = sign_in(&app).await;

    let resp = app
        .oneshot(authed("PUT", "/v2/charger/102", &access, r#"{"locked":"yes"}"#))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn pause_sets_status() {
    let app = app();
    let (access, _) = sign_in(&app).await;

    let resp = app
        .oneshot(authed("POST", "/v3/chargers/101/remote-action", &access, r#"{"action":2}"#))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await["status_id"], STATUS_PAUSED);
}

#[tokio::test]
async fn unknown_remote_action_returns_400() {
    let app = app();
    let (access, _) = sign_in(&app).await;

    let resp = app
        .oneshot(authed("POST", "/v3/chargers/101/remote-action", &access, r#"{"action":9}"#))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

// --- sessions ---

#[tokio::test]
async fn session_stats_filter_by_charger_and_range() {
    let app = app();
    let (access, _) = sign_in(&app).await;

    let resp = app
        .oneshot(authed(
            "GET",
            "/v4/sessions/stats?charger=101&start_date=1704067200&end_date=1706745600",
            &access,
            "",
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    let sessions = body["data"].as_array().unwrap();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0]["id"], 1);
}

// --- schedules ---

#[tokio::test]
async fn schedules_reject_mismatched_charger_id() {
    let app = app();
    let (access, _) = sign_in(&app).await;

    let resp = app
        .oneshot(authed(
            "POST",
            "/chargers/101/schedules",
            &access,
            r#"{"schedules":[{"id":0,"chargerId":5,"start":"2100","stop":"0500"}]}"#,
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn schedules_replace_by_position() {
    let app = app();
    let (access, _) = sign_in(&app).await;

    let resp = app
        .clone()
        .oneshot(authed(
            "POST",
            "/chargers/101/schedules",
            &access,
            r#"{"schedules":[{"id":0,"chargerId":101,"start":"2100","stop":"0500"}]}"#,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = app
        .clone()
        .oneshot(authed(
            "POST",
            "/chargers/101/schedules",
            &access,
            r#"{"schedules":[{"id":0,"chargerId":101,"start":"2200","stop":"0600"}]}"#,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = app
        .oneshot(authed("GET", "/chargers/101/schedules", &access, ""))
        .await
        .unwrap();
    let body = body_json(resp).await;
    let schedules = body["schedules"].as_array().unwrap();
    assert_eq!(schedules.len(), 1);
    assert_eq!(schedules[0]["start"], "2200");
}

#[tokio::test]
async fn energy_cost_is_stored() {
    let app = app();
    let (access, _) = sign_in(&app).await;

    let resp = app
        .clone()
        .oneshot(authed("POST", "/chargers/config/201", &access, r#"{"energyCost":0.31}"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = app
        .oneshot(authed("GET", "/chargers/status/201", &access, ""))
        .await
        .unwrap();
    assert_eq!(body_json(resp).await["config_data"]["energyCost"]["value"], 0.31);
}
