pub mod achievements;
pub mod auth;
pub mod config;
pub mod error;
pub mod rest;
pub mod sessions;
pub mod storage;
pub mod streaks;
pub mod tasks;
pub mod users;

use std::sync::Arc;

use config::DaemonConfig;
use storage::Storage;

/// Shared application state passed to every REST handler and background task.
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<DaemonConfig>,
    pub storage: Arc<Storage>,
    pub started_at: std::time::Instant,
}
