//! Error types shared by every game engine.
//!
//! Engine operations never panic on bad input. A rejected call leaves the
//! session exactly as it was and returns one of these variants so the bridge
//! can surface a blocking message to the moderator.

use thiserror::Error;

/// Unified error type for engine operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// Bad roster or role configuration (empty/duplicate names, remainder < 1, ...).
    #[error("Validation failed: {0}")]
    Validation(String),

    /// The call is not allowed in the current phase (or was already handled).
    #[error("Illegal transition: {0}")]
    IllegalTransition(String),

    /// A persisted or broadcast snapshot could not be decoded or does not fit.
    #[error("Snapshot error: {0}")]
    Snapshot(String),
}

impl EngineError {
    /// Creates a validation error for roster or configuration problems.
    ///
    /// # Example
    /// ```ignore
    /// if name.is_empty() {
    ///     return Err(EngineError::validation("Player names must not be empty"));
    /// }
    /// ```
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create an illegal transition error
    pub fn illegal(msg: impl Into<String>) -> Self {
        Self::IllegalTransition(msg.into())
    }

    /// Create a snapshot decode error
    pub fn snapshot(msg: impl Into<String>) -> Self {
        Self::Snapshot(msg.into())
    }

    /// Short machine-readable tag, used by the bridge in JSON error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::IllegalTransition(_) => "illegal_transition",
            Self::Snapshot(_) => "snapshot",
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    pub fn is_illegal_transition(&self) -> bool {
        matches!(self, Self::IllegalTransition(_))
    }
}

/// Result alias used across the engine.
pub type EngineResult<T> = Result<T, EngineError>;

/// Failure of the external key-value store. Never aborts an engine call.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    #[error("Storage quota exceeded for key {0}")]
    QuotaExceeded(String),
}
