//! Common result and error types for the silica core.

/// The standard result type for fallible internal operations.
///
/// `Err` indicates an unrecoverable internal inconsistency (a bug in
/// silica), not a user-facing error. User-triggerable failures have their
/// own typed error enums in the crate that detects them.
pub type SilicaResult<T> = Result<T, InternalError>;

/// An internal compiler error indicating a bug in silica, not a problem
/// with the design being compiled.
///
/// These errors should never occur during normal operation. If one does
/// occur, it means there is a logic error in the compiler that should be
/// fixed.
#[derive(Debug, thiserror::Error)]
#[error("internal error: {message}")]
pub struct InternalError {
    /// Description of the internal error.
    pub message: String,
}

impl InternalError {
    /// Creates a new internal error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<String> for InternalError {
    fn from(message: String) -> Self {
        Self { message }
    }
}
