//! Shared foundational types for the silica RTL generator.
//!
//! This crate provides interned identifiers, bit-arithmetic helpers used by
//! width inference and memory sizing, and the common internal-error type.

#![warn(missing_docs)]

pub mod bits;
pub mod ident;
pub mod result;

pub use bits::{bits_for, log2_int, BitsError};
pub use ident::{Ident, Interner};
pub use result::{InternalError, SilicaResult};
