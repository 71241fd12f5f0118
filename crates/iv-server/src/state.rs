//! Shared application state

use crate::config::ServerConfig;

/// Read-only state handed to every handler. Searches keep nothing between requests.
#[derive(Debug, Clone)]
pub struct AppState {
    pub config: ServerConfig,
    pub started_at: chrono::DateTime<chrono::Utc>,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            started_at: chrono::Utc::now(),
        }
    }
}
