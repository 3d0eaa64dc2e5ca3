use std::sync::Arc;

use pagestack_core::document::{PageAttributes, SiteAttributes};
use pagestack_core::store::DocumentStore;
use pagestack_core::{DocumentResource, ResourceSettings};

use crate::config::AppConfig;

/// Shared application state, passed to all handlers via Axum's `State` extractor.
/// Wrapped in `Arc` so cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<InnerState>,
}

struct InnerState {
    store: Arc<dyn DocumentStore>,
    sites: DocumentResource<SiteAttributes>,
    pages: DocumentResource<PageAttributes>,
}

impl AppState {
    pub fn new(store: Arc<dyn DocumentStore>, config: &AppConfig) -> Self {
        let settings = ResourceSettings {
            index_name: config.type_path_index.clone(),
            version_policy: config.version_policy,
        };

        Self {
            inner: Arc::new(InnerState {
                sites: DocumentResource::new(Arc::clone(&store), settings.clone()),
                pages: DocumentResource::new(Arc::clone(&store), settings),
                store,
            }),
        }
    }

    pub fn store(&self) -> &dyn DocumentStore {
        self.inner.store.as_ref()
    }

    pub fn sites(&self) -> &DocumentResource<SiteAttributes> {
        &self.inner.sites
    }

    pub fn pages(&self) -> &DocumentResource<PageAttributes> {
        &self.inner.pages
    }
}
