//! HTTP API exercised in-process with `tower::ServiceExt::oneshot`.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use smarter_cli::api::{AppState, router};
use smarter_cli::application::services::KindRegistry;
use smarter_cli::infra::{DeployRunner, HostProvisioner, InlineTaskQueue};
use smarter_common::Kind;
use tower::ServiceExt;

use crate::helpers::{ACCOUNT, Fixture};

const SECRET_YAML: &str = "\
apiVersion: smarter.sh/v1
kind: Secret
metadata:
  name: openai-key
  description: OpenAI key
spec:
  value: sk-123
";

fn state(fx: &Fixture) -> AppState {
    AppState {
        registry: Arc::new(KindRegistry::new().unwrap()),
        store: fx.store.clone(),
        tasks: Arc::new(InlineTaskQueue::new(DeployRunner {
            store: fx.store.clone(),
            provisioner: Arc::new(HostProvisioner::new(fx.config.platform.environment)),
            config: fx.config.clone(),
        })),
        config: fx.config.clone(),
    }
}

fn request(method: Method, uri: &str, token: Option<&str>, body: Option<(&str, &str)>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Token {token}"));
    }
    match body {
        Some((content_type, text)) => builder
            .header(header::CONTENT_TYPE, content_type)
            .body(Body::from(text.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(fx: &Fixture, req: Request<Body>) -> (StatusCode, Option<String>, String) {
    let resp = router(state(fx)).oneshot(req).await.unwrap();
    let status = resp.status();
    let content_type = resp
        .headers()
        .get(header::CONTENT_TYPE)
        .map(|v| v.to_str().unwrap().to_string());
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    (status, content_type, String::from_utf8(bytes.to_vec()).unwrap())
}

async fn send_json(fx: &Fixture, req: Request<Body>) -> (StatusCode, Value) {
    let (status, _, body) = send(fx, req).await;
    (status, serde_json::from_str(&body).unwrap())
}

#[tokio::test]
async fn test_health() {
    let fx = Fixture::new();
    let (status, _, _) = send(&fx, request(Method::GET, "/health", None, None)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_missing_token_is_unauthorized() {
    let fx = Fixture::new();
    let (status, body) = send_json(&fx, request(Method::POST, "/api/v1/cli/get/chatbot", None, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], true);
    assert_eq!(body["code"], "UnauthenticatedError");
}

#[tokio::test]
async fn test_apply_yaml_then_describe_as_yaml() {
    let fx = Fixture::new();
    let token = fx.token.clone();

    let (status, body) = send_json(
        &fx,
        request(
            Method::POST,
            "/api/v1/cli/apply",
            Some(&token),
            Some(("application/yaml", SECRET_YAML)),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"], "created");
    assert_eq!(body["kind"], "Secret");

    let (status, content_type, text) = send(
        &fx,
        request(
            Method::POST,
            "/api/v1/cli/describe/secret/openai-key?output_format=yaml",
            Some(&token),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type.as_deref(), Some("application/yaml"));
    assert!(text.contains("kind: Secret"));
    assert!(!text.contains("sk-123"));
}

#[tokio::test]
async fn test_validation_failure_is_422_with_fields() {
    let fx = Fixture::new();
    let token = fx.token.clone();
    let bad = SECRET_YAML.replace("value: sk-123", "value: sk-123\n  colour: blue");
    let (status, body) = send_json(
        &fx,
        request(Method::POST, "/api/v1/cli/apply", Some(&token), Some(("text/plain", &bad))),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "ManifestValidationError");
    assert!(!body["fields"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_bad_verb_and_kind_are_400() {
    let fx = Fixture::new();
    let token = fx.token.clone();
    for uri in [
        "/api/v1/cli/apply/secret",
        "/api/v1/cli/patch/secret",
        "/api/v1/cli/get/widget",
    ] {
        let (status, body) = send_json(&fx, request(Method::POST, uri, Some(&token), None)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}: {body}");
    }
}

#[tokio::test]
async fn test_get_with_name_query() {
    let fx = Fixture::new();
    fx.apply_value(&fx.admin(), &fx.example(Kind::Secret)).unwrap();
    let token = fx.token.clone();
    let (status, body) = send_json(
        &fx,
        request(
            Method::POST,
            "/api/v1/cli/get/secrets?name=stackademy-db-password",
            Some(&token),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "stackademy-db-password");
}

#[tokio::test]
async fn test_resolve_platform_and_custom_hosts() {
    let fx = Fixture::new();
    let admin = fx.admin();
    fx.apply_stackademy(&admin);
    let mut chatbot = fx.example(Kind::ChatBot);
    chatbot["spec"]["config"]["customDomain"] = json!("chat.stackademy.com");
    fx.apply_value(&admin, &chatbot).unwrap();
    let token = fx.token.clone();

    let (status, body) = send_json(
        &fx,
        request(Method::POST, "/api/v1/cli/deploy/chatbot/stackademy-sql", Some(&token), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"], "deploying");

    let host = format!("stackademy-sql.{ACCOUNT}.local.api.smarter.sh");
    let (status, body) = send_json(
        &fx,
        request(Method::GET, &format!("/api/v1/chatbots/resolve?host={host}"), Some(&token), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "stackademy-sql");
    assert_eq!(body["account"], ACCOUNT);
    assert_eq!(body["deployState"], "deployed");

    let (status, body) = send_json(
        &fx,
        request(Method::GET, "/api/v1/chatbots/resolve?host=Chat.Stackademy.com", Some(&token), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "stackademy-sql");

    let foreign = "stackademy-sql.2718-2818-2845.local.api.smarter.sh";
    let (status, _) = send_json(
        &fx,
        request(Method::GET, &format!("/api/v1/chatbots/resolve?host={foreign}"), Some(&token), None),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send_json(&fx, request(Method::GET, "/api/v1/chatbots/resolve", Some(&token), None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
