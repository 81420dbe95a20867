//! Shared application state for the REST API.

use std::sync::Arc;

use skillquest_db::{MemoryStore, Store};

/// Shared state for the Axum application.
///
/// Wrapped in [`Arc`] and injected via Axum's `State` extractor. The store
/// is a trait object so the same router serves `PostgreSQL` in production
/// and [`MemoryStore`] in tests.
#[derive(Clone)]
pub struct AppState {
    /// Storage backend.
    pub store: Arc<dyn Store>,
}

impl AppState {
    /// Wrap a store.
    pub const fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// State backed by a fresh [`MemoryStore`].
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }
}

impl core::fmt::Debug for AppState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AppState").finish_non_exhaustive()
    }
}
