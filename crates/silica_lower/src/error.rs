//! Error types for the lowering pipeline.

use silica_common::InternalError;
use silica_ir::SpecialKind;

/// Errors raised by the lowering passes.
///
/// All of these abort the compilation; no partial output is produced.
#[derive(Debug, thiserror::Error)]
pub enum LowerError {
    /// A synchronous statement group or memory port references a clock
    /// domain that is not declared, and implicit creation is disabled.
    #[error("unresolved clock domain: '{0}'")]
    UnresolvedClockDomain(String),

    /// A domain flagged reset-less also declares a reset signal.
    #[error("clock domain '{0}' is reset-less but declares a reset signal")]
    ResetOnResetlessDomain(String),

    /// A domain that is not reset-less has no reset signal.
    #[error("clock domain '{0}' has no reset signal and is not flagged reset-less")]
    MissingReset(String),

    /// Special lowering failed to reach a fixpoint.
    #[error("special lowering did not converge after {iterations} iterations ({kind} remains)")]
    SpecialFixpoint {
        /// The iteration bound that was exhausted.
        iterations: u32,
        /// The kind name of a special still awaiting lowering.
        kind: &'static str,
    },

    /// A special kind has neither an override nor a native emitter.
    #[error("no override or native emitter for special kind '{}'", .0.name())]
    UnresolvableSpecial(SpecialKind),

    /// An internal inconsistency, such as a non-addressable assignment target.
    #[error(transparent)]
    Internal(#[from] InternalError),
}
