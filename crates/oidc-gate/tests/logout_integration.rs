//! Logout, revocation and health endpoint behavior

mod common;

use axum::http::StatusCode;
use common::*;
use oidc_gate::{GateError, ProviderMetadataHandle};
use pretty_assertions::assert_eq;

#[tokio::test]
async fn test_logout_revokes_both_tokens_and_destroys_session() {
    // GIVEN: an authenticated session holding access and refresh tokens
    let provider = MockProvider::start().await;
    provider.mock_code_exchange("access-1", Some("refresh-1"), 3600).await;
    provider.mock_revoke(200, 2).await;
    let app = app(settings(&provider), &provider);
    let cookie = login(&app, "/").await;

    // WHEN: the user logs out
    let response = get(&app, "/logout", Some(&cookie)).await;

    // THEN: a confirmation is returned
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "Logged out");

    // AND: the access token was revoked before the refresh token
    let bodies = provider.request_bodies("/revoke").await;
    assert_eq!(bodies.len(), 2);
    assert!(bodies[0].contains("token=access-1"));
    assert!(bodies[1].contains("token=refresh-1"));
    assert!(bodies.iter().all(|b| b.contains("client_id=test-client")));
    assert!(bodies.iter().all(|b| b.contains("client_secret=test-secret")));

    // AND: the old session no longer grants access
    let response = get(&app, "/", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::FOUND);
}

#[tokio::test]
async fn test_logout_succeeds_when_revocation_fails() {
    let provider = MockProvider::start().await;
    provider.mock_code_exchange("access-1", Some("refresh-1"), 3600).await;
    // Both attempts are made even though the first one fails
    provider.mock_revoke(500, 2).await;
    let app = app(settings(&provider), &provider);
    let cookie = login(&app, "/").await;

    let response = get(&app, "/logout", Some(&cookie)).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "Logged out");

    // The session is destroyed regardless of the revocation outcome
    let response = get(&app, "/", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(provider.request_bodies("/revoke").await.len(), 2);
}

#[tokio::test]
async fn test_logout_without_refresh_token_revokes_once() {
    let provider = MockProvider::start().await;
    provider.mock_code_exchange("access-1", None, 3600).await;
    provider.mock_revoke(200, 1).await;
    let app = app(settings(&provider), &provider);
    let cookie = login(&app, "/").await;

    let response = get(&app, "/logout", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_single_logout_redirects_to_provider() {
    let provider = MockProvider::start().await;
    provider.mock_code_exchange("access-1", None, 3600).await;
    provider.mock_revoke(200, 1).await;
    let app = app(settings(&provider), &provider);
    let cookie = login(&app, "/").await;

    let response = get(&app, "/logout?slo=1", Some(&cookie)).await;

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), LOGOUT_URL);
}

#[tokio::test]
async fn test_logout_without_session() {
    let provider = MockProvider::start().await;
    provider.mock_revoke(200, 0).await;
    let app = app(settings(&provider), &provider);

    let response = get(&app, "/logout", None).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "Logged out");
}

#[tokio::test]
async fn test_logout_clears_pending_flow() {
    // GIVEN: a flow started but never completed
    let provider = MockProvider::start().await;
    provider.forbid_token_requests().await;
    let app = app(settings(&provider), &provider);
    let response = get(&app, "/", None).await;
    let cookie = session_cookie(&response).unwrap();
    let state = query_param(&location(&response), "state").unwrap();

    // WHEN: the user logs out and the provider later calls back
    get(&app, "/logout", Some(&cookie)).await;
    let response = get(
        &app,
        &format!("/auth/callback?code=late&state={state}"),
        Some(&cookie),
    )
    .await;

    // THEN: the stale flow is gone
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_health_reports_metadata_status() {
    let provider = MockProvider::start().await;

    let ready = app(settings(&provider), &provider);
    let response = get(&ready, "/health", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(json["metadata"], "ready");
    assert_eq!(json["status"], "healthy");

    let failed = app_with_metadata(
        settings(&provider),
        ProviderMetadataHandle::failed(GateError::metadata_fetch("down")),
    );
    let response = get(&failed, "/health", None).await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let json: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(json["metadata"], "failed");
}
