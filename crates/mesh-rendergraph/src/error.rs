//! Error types for the render graph

/// Errors raised by a GPU backend
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BackendError {
    #[error("GPU context is not available")]
    ContextUnavailable,

    #[error("GPU context is already current")]
    ContextAlreadyCurrent,

    #[error("Out of GPU memory allocating {label} ({requested} vertices)")]
    OutOfMemory { label: String, requested: usize },
}

/// Errors raised by a renderer during initialization
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RenderError {
    #[error("GPU backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("Unsupported renderer configuration: {0}")]
    Unsupported(String),
}
