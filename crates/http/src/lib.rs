//! HTTP API server for pipeline-crm.
//!
//! Thin axum handlers over the service layer. Identity arrives on the
//! `X-User-Id` header (authentication itself is an external collaborator);
//! per-session list state is keyed by `X-Session-Id`.

#![allow(missing_docs, reason = "Internal crate with self-explanatory API")]
#![allow(unreachable_pub, reason = "pub items are re-exported")]
#![allow(clippy::missing_docs_in_private_items, reason = "Internal crate")]
#![allow(clippy::implicit_return, reason = "Implicit return is idiomatic Rust")]
#![allow(clippy::question_mark_used, reason = "? operator is idiomatic Rust")]
#![allow(clippy::min_ident_chars, reason = "Short closure params are idiomatic")]

pub mod api_error;
mod blocking;
mod handlers;
mod query_types;
mod response_types;
mod session;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Json, Router,
};
use tower_http::cors::CorsLayer;

use pipeline_service::{OpportunityService, PreferenceService};
use pipeline_storage::Storage;

pub use api_error::ApiError;
pub use response_types::VersionResponse;
pub use session::SessionStore;

/// Shared application state for all HTTP handlers.
pub struct AppState {
    pub storage: Arc<Storage>,
    pub opportunities: Arc<OpportunityService>,
    pub preferences: Arc<PreferenceService>,
    pub sessions: SessionStore,
}

impl AppState {
    pub fn new(storage: Arc<Storage>, opportunities: Arc<OpportunityService>) -> Self {
        let preferences = Arc::new(PreferenceService::new(Arc::clone(&storage)));
        Self { storage, opportunities, preferences, sessions: SessionStore::default() }
    }
}

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/version", get(version))
        .route(
            "/opportunities",
            get(handlers::opportunities::index).post(handlers::opportunities::create),
        )
        .route("/opportunities/new", get(handlers::opportunities::new))
        .route("/opportunities/search/{query}", get(handlers::opportunities::search))
        .route("/opportunities/options", get(handlers::opportunities::options))
        .route("/opportunities/redraw", post(handlers::opportunities::redraw))
        .route("/opportunities/filter", post(handlers::opportunities::filter))
        .route(
            "/opportunities/{id}",
            get(handlers::opportunities::show)
                .put(handlers::opportunities::update)
                .delete(handlers::opportunities::destroy),
        )
        .route("/opportunities/{id}/edit", get(handlers::opportunities::edit))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

async fn version() -> Json<VersionResponse> {
    Json(VersionResponse { version: env!("CARGO_PKG_VERSION") })
}
