use crate::access::AccessChecker;
use portico_core::config::AppConfig;
use portico_repo::Repository;
use std::sync::Arc;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub repo: Arc<dyn Repository>,
    pub checker: Arc<AccessChecker>,
    /// Client for datastreams stored outside the repository.
    pub http: reqwest::Client,
}

impl AppState {
    pub fn new(
        config: Arc<AppConfig>,
        repo: Arc<dyn Repository>,
        checker: Arc<AccessChecker>,
    ) -> Self {
        Self {
            config,
            repo,
            checker,
            http: reqwest::Client::new(),
        }
    }
}
