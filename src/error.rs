use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store backend failure: {0}")]
    Backend(String),
}

#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("completion request failed: {0}")]
    Request(String),
    #[error("completion service returned status {0}")]
    Status(u16),
    #[error("completion response was malformed: {0}")]
    Malformed(String),
    #[error("completion response contained no choices")]
    Empty,
}

/// Failures surfaced from `ChatEngine::handle_turn`. Extraction ambiguity,
/// duplicates and conflicts are not errors; they travel as fact blocks.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Completion(#[from] CompletionError),
}
