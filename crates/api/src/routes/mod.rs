pub mod health;
pub mod pages;
pub mod sites;

use axum::extract::DefaultBodyLimit;
use axum::Router;
use pagestack_core::document::{validate, DocumentKey, ValidationError};
use serde::Deserialize;

use crate::middleware;
use crate::state::AppState;

const MAX_BODY_BYTES: usize = 1024 * 1024;

/// `?version=` half of a document key.
#[derive(Debug, Default, Deserialize)]
pub struct VersionQuery {
    version: Option<String>,
}

impl VersionQuery {
    pub fn key(self, id: String) -> Result<DocumentKey, ValidationError> {
        let version = validate::require_parameter("version", self.version.as_deref())?;
        Ok(DocumentKey::new(id, version))
    }
}

/// Assemble the full router with all route groups.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(health::routes())
        .merge(sites::routes())
        .merge(pages::routes())
        .with_state(state)
}

/// Router wrapped in the middleware stack every response goes through.
pub fn app(state: AppState) -> Router {
    build_router(state)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(middleware::cors::cors_layer())
        .layer(middleware::cors::allow_credentials_header())
        .layer(middleware::cors::allow_origin_header())
        .layer(middleware::request_tracing::trace_layer())
}
