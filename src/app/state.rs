//! Application state shared across routes

use std::sync::Arc;

use crate::config::Config;
use crate::matchmaking::MatchManager;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub matches: Arc<MatchManager>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let config = Arc::new(config);
        let matches = Arc::new(MatchManager::new(Arc::new(config.game.clone())));

        Self { config, matches }
    }
}
