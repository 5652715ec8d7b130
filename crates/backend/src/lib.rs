use std::sync::Arc;

mod flavor;
mod http;
mod provider;

pub use flavor::{
    BackendCapabilities, BackendConfig, BackendFlavor, DEFAULT_DJANGO_BASE_URL,
    DEFAULT_FLASK_BASE_URL,
};
pub use http::HttpBackend;
pub use provider::{
    BackendError, BackendResult, ChatBackend, ChatReply, ChatRequest, HistoryEntry,
};

pub fn create_backend(config: BackendConfig) -> BackendResult<Arc<dyn ChatBackend>> {
    tracing::info!(
        flavor = %config.flavor,
        base_url = %config.base_url,
        "creating chat backend"
    );
    Ok(Arc::new(HttpBackend::new(config)?))
}
