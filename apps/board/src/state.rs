use std::sync::Arc;

use crate::config::Config;
use crate::sync::Workspace;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub workspace: Arc<Workspace>,
    pub config: Config,
}
