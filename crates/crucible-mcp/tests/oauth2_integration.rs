//! OAuth2 end-to-end flow tests: dynamic registration, PKCE authorization,
//! token issuance, refresh rotation, and bearer enforcement on the MCP
//! endpoints.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use crucible_mcp::authserver::{AuthServerConfig, AuthServerState};
use crucible_mcp::oauth2::{BearerValidator, OAuth2Config, ValidationKey};
use crucible_mcp::server::McpServerBuilder;
use crucible_mcp::transport::{HttpTransport, HttpTransportConfig};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tower::ServiceExt;
use url::Url;

const SECRET: &str = "aW50ZWdyYXRpb24tdGVzdC1zaWduaW5nLXNlY3JldA";
const ISSUER: &str = "https://mcp.example";
const RESOURCE: &str = "https://mcp.example/mcp";

fn secured_router() -> axum::Router {
    let server = McpServerBuilder::new().name("secured-server").build();
    let validator = Arc::new(
        BearerValidator::new(
            OAuth2Config::new(RESOURCE, ValidationKey::new("demo-hs256", SECRET))
                .with_issuer(ISSUER)
                .with_resource_indicator_enforcement(),
        )
        .unwrap(),
    );
    let auth_server = Arc::new(AuthServerState::new(AuthServerConfig::new(
        ISSUER, RESOURCE, SECRET,
    )));

    HttpTransport::new(server, HttpTransportConfig::default())
        .with_bearer_validator(validator)
        .with_authorization_server(auth_server)
        .router()
}

async fn body_json(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn register_client(router: &axum::Router) -> String {
    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/oauth/register")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    json!({
                        "redirect_uris": ["https://app.local/cb"],
                        "client_name": "integration-test"
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(body["token_endpoint_auth_method"], "none");
    body["client_id"].as_str().unwrap().to_string()
}

fn challenge(verifier: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
}

async fn authorize_code(router: &axum::Router, client_id: &str, verifier: &str) -> String {
    let uri = format!(
        "/oauth/authorize?response_type=code&client_id={client_id}\
         &redirect_uri=https%3A%2F%2Fapp.local%2Fcb\
         &code_challenge={}&code_challenge_method=S256\
         &state=opaque-state&resource={}",
        challenge(verifier),
        urlencode(RESOURCE),
    );
    let response = router
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FOUND);

    let location = response
        .headers()
        .get(header::LOCATION)
        .unwrap()
        .to_str()
        .unwrap();
    let url = Url::parse(location).unwrap();
    assert_eq!(url.host_str(), Some("app.local"));

    let pairs: std::collections::HashMap<_, _> = url.query_pairs().into_owned().collect();
    assert_eq!(pairs.get("state").map(String::as_str), Some("opaque-state"));
    pairs["code"].clone()
}

fn urlencode(value: &str) -> String {
    value
        .replace(':', "%3A")
        .replace('/', "%2F")
}

async fn token_request(router: &axum::Router, form: &str) -> Response {
    router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/oauth/token")
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(form.to_string()))
                .unwrap(),
        )
        .await
        .unwrap()
}

fn code_redemption_form(client_id: &str, code: &str, verifier: &str, resource: &str) -> String {
    format!(
        "grant_type=authorization_code&code={code}&client_id={client_id}\
         &redirect_uri={}&code_verifier={verifier}&resource={}",
        urlencode("https://app.local/cb"),
        urlencode(resource),
    )
}

#[tokio::test]
async fn scenario_pkce_flow_succeeds() {
    let router = secured_router();
    let client_id = register_client(&router).await;
    let code = authorize_code(&router, &client_id, "v").await;

    let response = token_request(
        &router,
        &code_redemption_form(&client_id, &code, "v", RESOURCE),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["token_type"], "Bearer");
    assert!(body["refresh_token"].is_string());

    // The minted JWT names the resource as its audience
    let token = body["access_token"].as_str().unwrap();
    let payload = token.split('.').nth(1).unwrap();
    let claims: Value =
        serde_json::from_slice(&URL_SAFE_NO_PAD.decode(payload).unwrap()).unwrap();
    assert_eq!(claims["aud"], RESOURCE);
    assert_eq!(claims["iss"], ISSUER);
    assert_eq!(claims["sub"], client_id);
}

#[tokio::test]
async fn scenario_pkce_mismatch_is_invalid_grant() {
    let router = secured_router();
    let client_id = register_client(&router).await;
    let code = authorize_code(&router, &client_id, "v").await;

    let response = token_request(
        &router,
        &code_redemption_form(&client_id, &code, "v2", RESOURCE),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "invalid_grant");
}

#[tokio::test]
async fn code_redemption_is_at_most_once() {
    let router = secured_router();
    let client_id = register_client(&router).await;
    let code = authorize_code(&router, &client_id, "v").await;

    let form = code_redemption_form(&client_id, &code, "v", RESOURCE);
    let first = token_request(&router, &form).await;
    assert_eq!(first.status(), StatusCode::OK);

    let second = token_request(&router, &form).await;
    assert_eq!(second.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(second).await["error"], "invalid_grant");
}

#[tokio::test]
async fn resource_mismatch_at_redemption_is_invalid_grant() {
    let router = secured_router();
    let client_id = register_client(&router).await;
    let code = authorize_code(&router, &client_id, "v").await;

    let response = token_request(
        &router,
        &code_redemption_form(&client_id, &code, "v", "https://other.example/mcp"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "invalid_grant");
}

#[tokio::test]
async fn refresh_token_flow_rotates_and_spends() {
    let router = secured_router();
    let client_id = register_client(&router).await;
    let code = authorize_code(&router, &client_id, "v").await;

    let body = body_json(
        token_request(
            &router,
            &code_redemption_form(&client_id, &code, "v", RESOURCE),
        )
        .await,
    )
    .await;
    let refresh = body["refresh_token"].as_str().unwrap().to_string();

    let form = format!(
        "grant_type=refresh_token&refresh_token={refresh}&client_id={client_id}"
    );
    let first = token_request(&router, &form).await;
    assert_eq!(first.status(), StatusCode::OK);
    let rotated = body_json(first).await["refresh_token"]
        .as_str()
        .unwrap()
        .to_string();
    assert_ne!(rotated, refresh);

    // The original refresh token is spent
    let second = token_request(&router, &form).await;
    assert_eq!(second.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_grant_type_is_rejected() {
    let router = secured_router();
    let response = token_request(&router, "grant_type=password&username=x&password=y").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await["error"],
        "unsupported_grant_type"
    );
}

#[tokio::test]
async fn client_credentials_grant_issues_token_without_refresh() {
    let router = secured_router();
    let response = token_request(
        &router,
        "grant_type=client_credentials&client_id=demo-service&client_secret=demo-secret",
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert!(body["access_token"].is_string());
    assert!(body["refresh_token"].is_null());
}

#[tokio::test]
async fn mcp_endpoints_require_bearer() {
    let router = secured_router();

    let response = router
        .clone()
        .oneshot(Request::builder().uri("/mcp").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert!(body["error"].is_string());
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn issued_token_opens_an_mcp_session() {
    let router = secured_router();
    let client_id = register_client(&router).await;
    let code = authorize_code(&router, &client_id, "v").await;
    let body = body_json(
        token_request(
            &router,
            &code_redemption_form(&client_id, &code, "v", RESOURCE),
        )
        .await,
    )
    .await;
    let access_token = body["access_token"].as_str().unwrap();

    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/mcp")
                .header(header::AUTHORIZATION, format!("Bearer {access_token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get("Mcp-Session-Id").is_some());
}

#[tokio::test]
async fn garbage_bearer_is_401() {
    let router = secured_router();
    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/mcp")
                .header(header::AUTHORIZATION, "Bearer not.a.jwt")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn metadata_endpoints_are_unauthenticated() {
    let router = secured_router();

    for path in [
        "/.well-known/oauth-protected-resource",
        "/.well-known/oauth-authorization-server",
        "/.well-known/jwks.json",
    ] {
        let response = router
            .clone()
            .oneshot(Request::builder().uri(path).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK, "path {path}");
    }

    let resource_metadata = body_json(
        router
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/.well-known/oauth-protected-resource")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(resource_metadata["resource"], RESOURCE);
    assert_eq!(resource_metadata["authorization_servers"][0], ISSUER);
}
