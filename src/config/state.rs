// Application state module
// Shared by every connection task

use std::sync::Arc;

use super::types::Config;
use crate::routing::RouteRegistry;

/// Application state
pub struct AppState {
    pub config: Config,
    /// Live route table, rebuilt on source changes
    pub registry: Arc<RouteRegistry>,
}

impl AppState {
    pub fn new(config: Config, registry: Arc<RouteRegistry>) -> Self {
        Self { config, registry }
    }
}
