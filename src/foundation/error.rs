/// Convenience result type used across storyreel.
pub type StoryreelResult<T> = Result<T, StoryreelError>;

/// Top-level error taxonomy used by engine APIs.
///
/// Recoverable conditions (alignment failure, a missing clip, an unusable font, a failed banner
/// render) are handled where they occur and only logged; the variants below are what is left
/// when recovery is impossible.
#[derive(thiserror::Error, Debug)]
pub enum StoryreelError {
    /// Invalid user-provided data (alignment, config, options).
    #[error("validation error: {0}")]
    Validation(String),

    /// The alignment collaborator failed or returned unusable output.
    #[error("alignment error: {0}")]
    Alignment(String),

    /// Asset resolution failed with no fallback left (empty clip pool, no usable font).
    #[error("asset error: {0}")]
    Asset(String),

    /// A schedule invariant does not hold; raised before a plan is emitted.
    #[error("schedule error: {0}")]
    Schedule(String),

    /// Errors while evaluating timeline state at a frame or instant.
    #[error("evaluation error: {0}")]
    Evaluation(String),

    /// A subprocess exited unsuccessfully.
    #[error("encoding error: {step} exited with status {status}: {stderr}")]
    Encoding {
        /// Pipeline step or program that failed.
        step: String,
        /// Exit status as reported by the OS.
        status: String,
        /// Captured diagnostic output (trimmed).
        stderr: String,
    },

    /// A subprocess exceeded its hard timeout and was killed.
    #[error("timeout error: {program} did not finish within {after:?}: {stderr}")]
    Timeout {
        /// Program that was killed.
        program: String,
        /// Configured timeout.
        after: std::time::Duration,
        /// Diagnostic output captured before the kill (trimmed).
        stderr: String,
    },

    /// A subprocess was killed because the caller cancelled the job.
    #[error("cancelled: {program} was terminated on request")]
    Cancelled {
        /// Program that was killed.
        program: String,
    },

    /// Errors when serializing or deserializing data structures.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl StoryreelError {
    /// Build a [`StoryreelError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`StoryreelError::Alignment`] value.
    pub fn alignment(msg: impl Into<String>) -> Self {
        Self::Alignment(msg.into())
    }

    /// Build a [`StoryreelError::Asset`] value.
    pub fn asset(msg: impl Into<String>) -> Self {
        Self::Asset(msg.into())
    }

    /// Build a [`StoryreelError::Schedule`] value.
    pub fn schedule(msg: impl Into<String>) -> Self {
        Self::Schedule(msg.into())
    }

    /// Build a [`StoryreelError::Evaluation`] value.
    pub fn evaluation(msg: impl Into<String>) -> Self {
        Self::Evaluation(msg.into())
    }

    /// Build a [`StoryreelError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }

    /// `true` for errors produced by a subprocess (exit failure, timeout, cancellation).
    pub fn is_subprocess(&self) -> bool {
        matches!(
            self,
            Self::Encoding { .. } | Self::Timeout { .. } | Self::Cancelled { .. }
        )
    }
}

impl From<serde_json::Error> for StoryreelError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serde(e.to_string())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
