//! Error types for HTML rewriting.

use thiserror::Error;

/// Rewriting error type.
#[derive(Debug, Error)]
pub enum TransformError {
    /// The parser gave up on the document (memory limit, internal handler failure).
    #[error("Rewriting error: {0}")]
    Rewriting(#[from] lol_html::errors::RewritingError),

    /// Input after `end` or a failure.
    #[error("Rewriter already finished")]
    Ended,
}

/// Result type for rewriting operations.
pub type TransformResult<T> = Result<T, TransformError>;
