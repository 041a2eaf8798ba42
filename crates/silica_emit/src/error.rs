//! Error types for code generation.

use silica_common::InternalError;
use silica_ir::SpecialKind;
use silica_lower::LowerError;

/// Errors raised while converting a fragment to RTL text.
///
/// Any of these aborts the conversion; no partial output is returned.
#[derive(Debug, thiserror::Error)]
pub enum EmitError {
    /// A lowering pass failed.
    #[error(transparent)]
    Lower(#[from] LowerError),

    /// A special survived lowering but the selected backend has no native
    /// emitter for its kind.
    #[error("no native emitter for special kind '{}'", .0.name())]
    UnresolvableSpecial(SpecialKind),

    /// An internal inconsistency, such as a construct that should have
    /// been eliminated by lowering reaching the renderer.
    #[error(transparent)]
    Internal(#[from] InternalError),
}
