use std::sync::Arc;

use crate::config::Config;
use crate::llm_client::StructuredCompletion;
use crate::pdf::TextExtractor;
use crate::storage::CvStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Structured-completion backend. Production: `LlmClient`.
    pub llm: Arc<dyn StructuredCompletion>,
    /// Raw PDF and parsed CV storage. Production: `S3CvStore`.
    pub store: Arc<dyn CvStore>,
    pub extractor: Arc<TextExtractor>,
    pub config: Config,
}
