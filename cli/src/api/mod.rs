//! HTTP API served by `smarter serve`.
//!
//! Handlers authenticate the `Authorization: Token <key>` header, then run
//! the synchronous broker verb on the blocking pool. Imports from
//! `crate::domain`, `crate::application` and `crate::output` only.

pub mod handlers;
pub mod response;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;

use crate::application::ports::{ResourceStore, TaskQueue};
use crate::application::services::KindRegistry;
use crate::domain::SmarterConfig;

/// Shared, read-only state of every request.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<KindRegistry>,
    pub store: Arc<dyn ResourceStore>,
    pub tasks: Arc<dyn TaskQueue>,
    pub config: Arc<SmarterConfig>,
}

/// Build the API router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/cli/apply", post(handlers::apply))
        .route("/api/v1/cli/{verb}/{kind}", post(handlers::kind_verb))
        .route("/api/v1/cli/{verb}/{kind}/{name}", post(handlers::named_verb))
        .route("/api/v1/chatbots/resolve", get(handlers::resolve))
        .route("/health", get(handlers::health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
