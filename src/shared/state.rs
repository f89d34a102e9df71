use std::sync::Arc;

use crate::config::AppConfig;
use crate::goals::TrackingEngine;
use crate::storage::GoalStore;

/// Process-wide state assembled once at startup. The store is chosen by the
/// caller (Postgres in production, in-memory in tests) and injected; the
/// engine holds the same store behind its trait object.
pub struct AppState {
    pub config: Option<AppConfig>,
    pub store: Arc<dyn GoalStore>,
    pub engine: Arc<TrackingEngine>,
}

impl AppState {
    pub fn new(config: Option<AppConfig>, store: Arc<dyn GoalStore>) -> Self {
        let engine = Arc::new(TrackingEngine::new(store.clone()));
        Self {
            config,
            store,
            engine,
        }
    }
}

impl Clone for AppState {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            store: Arc::clone(&self.store),
            engine: Arc::clone(&self.engine),
        }
    }
}
