/// Convenience result type used across Cutline.
pub type CutResult<T> = Result<T, CutError>;

/// Top-level error taxonomy used by engine APIs.
#[derive(thiserror::Error, Debug)]
pub enum CutError {
    /// Invalid user-provided or timeline data.
    #[error("validation error: {0}")]
    Validation(String),

    /// Errors while resolving or evaluating timeline state.
    #[error("evaluation error: {0}")]
    Evaluation(String),

    /// Errors while probing or decoding source media.
    #[error("decode error: {0}")]
    Decode(String),

    /// Errors while encoding or muxing output containers.
    #[error("encode error: {0}")]
    Encode(String),

    /// Errors reported by a remote render job, diagnostics aggregated verbatim.
    #[error("remote render failed: {0}")]
    Remote(String),

    /// Export was cancelled through its [`crate::export::CancelToken`].
    ///
    /// Cancellation is a clean termination, not a failure: callers must not
    /// surface it as a user-facing error.
    #[error("export cancelled")]
    Cancelled,

    /// Errors when serializing or deserializing data structures.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CutError {
    /// Build a [`CutError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`CutError::Evaluation`] value.
    pub fn evaluation(msg: impl Into<String>) -> Self {
        Self::Evaluation(msg.into())
    }

    /// Build a [`CutError::Decode`] value.
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// Build a [`CutError::Encode`] value.
    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode(msg.into())
    }

    /// Build a [`CutError::Remote`] value.
    pub fn remote(msg: impl Into<String>) -> Self {
        Self::Remote(msg.into())
    }

    /// Build a [`CutError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }

    /// Return `true` when this error is a cancellation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}
