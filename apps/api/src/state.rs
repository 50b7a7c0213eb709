use std::sync::Arc;

use crate::config::Config;
use crate::llm_client::AdviceClient;
use crate::session::registry::SessionRegistry;
use crate::store::ProfileStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ProfileStore>,
    pub advisor: AdviceClient,
    pub sessions: Arc<SessionRegistry>,
    pub config: Config,
    /// Result of the store capability check made once at startup; `None` when it passed.
    pub store_check_error: Option<String>,
}
