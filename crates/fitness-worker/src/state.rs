//! Shared application state.

use std::collections::BTreeMap;
use std::sync::Arc;

use fitness_core::outbox::OutboxStore;

/// Application state shared across all request handlers.
#[derive(Clone, Default)]
pub struct AppState {
    outboxes: Arc<BTreeMap<String, Arc<dyn OutboxStore>>>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("backends", &self.outboxes.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl AppState {
    /// Create new application state over the named outbox stores.
    #[must_use]
    pub fn new(outboxes: BTreeMap<String, Arc<dyn OutboxStore>>) -> Self {
        Self {
            outboxes: Arc::new(outboxes),
        }
    }

    /// The outbox store of `backend`, if one is configured.
    #[must_use]
    pub fn outbox(&self, backend: &str) -> Option<&Arc<dyn OutboxStore>> {
        self.outboxes.get(backend)
    }

    /// Configured backend names, sorted.
    #[must_use]
    pub fn backends(&self) -> Vec<&str> {
        self.outboxes.keys().map(String::as_str).collect()
    }
}
