//! Common test utilities for integration tests
//!
//! A wiremock-backed identity provider plus helpers for driving the gate
//! router with a browser-like cookie jar of one.

#![allow(dead_code)]

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, Response, header};
use oidc_gate::{
    ClientConfig, GateSettings, GateState, ProviderMetadata, ProviderMetadataHandle, gate_router,
};
use serde_json::json;
use std::time::Duration;
use tower::ServiceExt;
use wiremock::matchers::{body_string_contains, header as header_matcher, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const APP_URL: &str = "http://app.test";
pub const LOGOUT_URL: &str = "https://idp.test/logout";

/// Identity provider mock
pub struct MockProvider {
    pub server: MockServer,
}

impl MockProvider {
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    pub fn discovery_url(&self) -> String {
        format!("{}/.well-known/openid-configuration", self.server.uri())
    }

    pub fn metadata(&self) -> ProviderMetadata {
        let base = self.server.uri();
        ProviderMetadata {
            issuer: Some(base.clone()),
            authorization_endpoint: format!("{base}/authorize"),
            token_endpoint: format!("{base}/token"),
            userinfo_endpoint: format!("{base}/userinfo"),
            revocation_endpoint: format!("{base}/revoke"),
            end_session_endpoint: None,
        }
    }

    /// Discovery document, served after `delay`
    pub async fn mock_discovery(&self, delay: Duration) {
        Mock::given(method("GET"))
            .and(path("/.well-known/openid-configuration"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::to_value(self.metadata()).unwrap())
                    .set_delay(delay),
            )
            .expect(1)
            .mount(&self.server)
            .await;
    }

    /// Successful authorization code exchange
    pub async fn mock_code_exchange(&self, access_token: &str, refresh_token: Option<&str>, expires_in: u64) {
        let mut body = json!({
            "access_token": access_token,
            "token_type": "Bearer",
            "expires_in": expires_in,
            "id_token": "header.payload.signature",
        });
        if let Some(refresh) = refresh_token {
            body["refresh_token"] = json!(refresh);
        }

        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("grant_type=authorization_code"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&self.server)
            .await;
    }

    /// Token endpoint error response
    pub async fn mock_token_error(&self, error: &str, description: &str) {
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": error,
                "error_description": description,
            })))
            .mount(&self.server)
            .await;
    }

    /// Token endpoint that must never be reached
    pub async fn forbid_token_requests(&self) {
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&self.server)
            .await;
    }

    /// Successful refresh token grant
    pub async fn mock_refresh(&self, access_token: &str, expected_calls: u64) {
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("grant_type=refresh_token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": access_token,
                "token_type": "Bearer",
                "expires_in": 3600,
            })))
            .expect(expected_calls)
            .mount(&self.server)
            .await;
    }

    /// Userinfo endpoint for `access_token`
    pub async fn mock_userinfo(&self, access_token: &str, name: &str) {
        Mock::given(method("GET"))
            .and(path("/userinfo"))
            .and(header_matcher("authorization", format!("Bearer {access_token}").as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "sub": "user-1",
                "name": name,
                "nickname": "ada",
                "picture": "https://img.test/ada.png",
            })))
            .mount(&self.server)
            .await;
    }

    pub async fn mock_userinfo_failure(&self, status: u16) {
        Mock::given(method("GET"))
            .and(path("/userinfo"))
            .respond_with(ResponseTemplate::new(status))
            .mount(&self.server)
            .await;
    }

    /// Revocation endpoint answering `status`, expected `calls` times
    pub async fn mock_revoke(&self, status: u16, calls: u64) {
        Mock::given(method("POST"))
            .and(path("/revoke"))
            .respond_with(ResponseTemplate::new(status))
            .expect(calls)
            .mount(&self.server)
            .await;
    }

    /// Bodies of every request received on `request_path`
    pub async fn request_bodies(&self, request_path: &str) -> Vec<String> {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .into_iter()
            .filter(|r| r.url.path() == request_path)
            .map(|r| String::from_utf8(r.body).unwrap())
            .collect()
    }
}

pub fn settings(provider: &MockProvider) -> GateSettings {
    GateSettings {
        discovery_url: provider.discovery_url(),
        logout_url: LOGOUT_URL.into(),
        client_id: "test-client".into(),
        client_secret: Some("test-secret".into()),
        app_url: APP_URL.into(),
        session_secret: "integration-test-session-secret-0123456789".into(),
        ..GateSettings::default()
    }
}

/// Router whose metadata is already resolved
pub fn app(settings: GateSettings, provider: &MockProvider) -> Router {
    app_with_metadata(settings, ProviderMetadataHandle::ready(provider.metadata()))
}

pub fn app_with_metadata(settings: GateSettings, metadata: ProviderMetadataHandle) -> Router {
    let config = ClientConfig::from_settings(settings).unwrap();
    gate_router(GateState::with_metadata(config, metadata).unwrap())
}

/// Send a GET, optionally with a session cookie
pub async fn get(app: &Router, uri: &str, cookie: Option<&str>) -> Response<Body> {
    let mut request = Request::builder().uri(uri);
    if let Some(cookie) = cookie {
        request = request.header(header::COOKIE, cookie);
    }
    app.clone()
        .oneshot(request.body(Body::empty()).unwrap())
        .await
        .unwrap()
}

/// `name=value` of the session cookie set by `response`
pub fn session_cookie(response: &Response<Body>) -> Option<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with(oidc_gate::SESSION_COOKIE_NAME))
        .and_then(|v| v.split(';').next())
        .map(str::to_string)
}

pub fn location(response: &Response<Body>) -> String {
    response
        .headers()
        .get(header::LOCATION)
        .expect("response has no Location header")
        .to_str()
        .unwrap()
        .to_string()
}

pub fn query_param(url: &str, name: &str) -> Option<String> {
    url::Url::parse(url)
        .unwrap()
        .query_pairs()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.into_owned())
}

pub async fn body_string(response: Response<Body>) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// Run the full login flow and return the authenticated session cookie
pub async fn login(app: &Router, target: &str) -> String {
    let response = get(app, target, None).await;
    assert_eq!(response.status(), 302);
    let cookie = session_cookie(&response).expect("gate did not set a session cookie");
    let state = query_param(&location(&response), "state").unwrap();

    let callback = format!("/auth/callback?code=auth-code&state={state}");
    let response = get(app, &callback, Some(&cookie)).await;
    assert_eq!(response.status(), 302, "callback failed");
    session_cookie(&response).unwrap_or(cookie)
}
