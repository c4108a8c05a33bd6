use crate::catalog::CatalogClient;
use crate::config::Config;
use crate::llm_client::LlmClient;

/// Shared application state injected into all route handlers via Axum extractors.
/// Everything here is request-scope safe: clients are cheap clones over shared
/// connection pools, and the catalog cache is the only cross-request state.
#[derive(Clone)]
pub struct AppState {
    pub catalog: CatalogClient,
    pub llm: LlmClient,
    pub config: Config,
}
