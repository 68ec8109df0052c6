use std::sync::Arc;

use signalfold_core::engine::EngagementEngine;
use signalfold_core::store::MemoryProfileStore;

#[derive(Clone)]
pub struct AppState {
    pub engine: EngagementEngine,
}

impl AppState {
    /// State over the built-in in-memory store. Deployments that bring
    /// their own backend construct the engine themselves.
    pub fn in_memory() -> Self {
        Self {
            engine: EngagementEngine::new(Arc::new(MemoryProfileStore::new())),
        }
    }
}
