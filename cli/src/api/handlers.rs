//! Route handlers.

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::Response;
use serde::Deserialize;
use serde_json::Value;
use smarter_common::{BrokerResponse, Verb};

use crate::api::AppState;
use crate::api::response::{OutputFormat, encode, error_response};
use crate::application::services::identity::authenticate;
use crate::application::services::resolve::resolve_host;
use crate::application::services::{BrokerContext, KindRegistry};
use crate::domain::BrokerError;
use crate::domain::manifest::{ManifestFormat, load};

#[derive(Debug, Default, Deserialize)]
pub struct VerbQuery {
    #[serde(default)]
    pub output_format: OutputFormat,
    pub name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ResolveQuery {
    #[serde(default)]
    pub output_format: OutputFormat,
    pub host: Option<String>,
}

/// Liveness check.
pub async fn health() -> StatusCode {
    StatusCode::OK
}

/// `POST /api/v1/cli/apply`: body is a YAML or JSON manifest.
pub async fn apply(
    State(state): State<AppState>,
    Query(query): Query<VerbQuery>,
    headers: HeaderMap,
    body: String,
) -> Response {
    let format = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(ManifestFormat::from_content_type);
    let result = run_verb(state, &headers, move |ctx, registry| {
        let raw = load(&body, format)?;
        registry.apply(ctx, &raw)
    })
    .await;
    respond(query.output_format, result)
}

/// `POST /api/v1/cli/{verb}/{kind}`: `get`, `schema` and `example`.
pub async fn kind_verb(
    State(state): State<AppState>,
    Path((verb, kind)): Path<(String, String)>,
    Query(query): Query<VerbQuery>,
    headers: HeaderMap,
) -> Response {
    let format = query.output_format;
    let verb = match parse_verb(&verb) {
        Ok(verb) => verb,
        Err(e) => return error_response(format, &e),
    };
    let name = query.name;
    let result = run_verb(state, &headers, move |ctx, registry| {
        registry.run(ctx, verb, &kind, name.as_deref())
    })
    .await;
    respond(format, result)
}

/// `POST /api/v1/cli/{verb}/{kind}/{name}`.
pub async fn named_verb(
    State(state): State<AppState>,
    Path((verb, kind, name)): Path<(String, String, String)>,
    Query(query): Query<VerbQuery>,
    headers: HeaderMap,
) -> Response {
    let format = query.output_format;
    let verb = match parse_verb(&verb) {
        Ok(verb) => verb,
        Err(e) => return error_response(format, &e),
    };
    let result = run_verb(state, &headers, move |ctx, registry| {
        registry.run(ctx, verb, &kind, Some(name.as_str()))
    })
    .await;
    respond(format, result)
}

/// `GET /api/v1/chatbots/resolve?host=`.
pub async fn resolve(
    State(state): State<AppState>,
    Query(query): Query<ResolveQuery>,
    headers: HeaderMap,
) -> Response {
    let format = query.output_format;
    let Some(host) = query.host.filter(|h| !h.trim().is_empty()) else {
        return error_response(
            format,
            &BrokerError::BadRequest("missing 'host' query parameter".to_string()),
        );
    };
    let auth = authorization(&headers);
    let result = blocking(move || {
        let caller = authenticate(state.store.as_ref(), auth.as_deref())?;
        let ctx = BrokerContext {
            caller: &caller,
            store: state.store.as_ref(),
            tasks: state.tasks.as_ref(),
            config: &state.config,
        };
        resolve_host(&ctx, &host)
    })
    .await;
    match result {
        Ok(value) => encode::<Value>(format, StatusCode::OK, &value),
        Err(e) => error_response(format, &e),
    }
}

fn parse_verb(verb: &str) -> Result<Verb, BrokerError> {
    let parsed: Verb = verb.parse().map_err(BrokerError::BadRequest)?;
    if parsed == Verb::Apply {
        return Err(BrokerError::BadRequest(
            "apply is served at /api/v1/cli/apply".to_string(),
        ));
    }
    Ok(parsed)
}

fn authorization(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

/// Authenticate, then run `verb` against the registry on the blocking pool.
async fn run_verb<F>(state: AppState, headers: &HeaderMap, verb: F) -> Result<BrokerResponse, BrokerError>
where
    F: FnOnce(&BrokerContext<'_>, &KindRegistry) -> Result<BrokerResponse, BrokerError> + Send + 'static,
{
    let auth = authorization(headers);
    blocking(move || {
        let caller = authenticate(state.store.as_ref(), auth.as_deref())?;
        let ctx = BrokerContext {
            caller: &caller,
            store: state.store.as_ref(),
            tasks: state.tasks.as_ref(),
            config: &state.config,
        };
        verb(&ctx, &state.registry)
    })
    .await
}

async fn blocking<T, F>(f: F) -> Result<T, BrokerError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, BrokerError> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| BrokerError::Internal(format!("request task failed: {e}")))?
}

fn respond(format: OutputFormat, result: Result<BrokerResponse, BrokerError>) -> Response {
    match result {
        Ok(response) => encode(format, StatusCode::OK, &response),
        Err(e) => error_response(format, &e),
    }
}
