//! Conformance test helpers for the silica RTL generators.
//!
//! Provides a shared driver that builds a design in a fresh compilation
//! context and runs the full pipeline plus one backend, returning the
//! rendered output for assertion in integration tests.

#![warn(missing_docs)]

use silica_emit::{convert, ConvOutput, ConvertOptions, Dialect};
use silica_ir::{Context, Fragment, SignalId};
use std::collections::BTreeSet;

/// Builds a design with `build` in a fresh context and converts it with
/// the given dialect under the default options (implicit clock-domain
/// creation enabled, no special overrides).
///
/// # Panics
///
/// Panics if the conversion fails; conformance tests treat that as a
/// test failure.
pub fn convert_design<F>(dialect: Dialect, name: &str, build: F) -> ConvOutput
where
    F: FnOnce(&mut Context) -> (Fragment, BTreeSet<SignalId>),
{
    let mut ctx = Context::new();
    let (fragment, ios) = build(&mut ctx);
    let options = ConvertOptions::new(dialect).name(name).ios(ios);
    match convert(&mut ctx, fragment, options) {
        Ok(output) => output,
        Err(err) => panic!("conversion failed: {err}"),
    }
}

/// Asserts that `haystack` contains `needle`, printing the full text on
/// failure so the emitted RTL can be inspected.
pub fn assert_contains(haystack: &str, needle: &str) {
    assert!(
        haystack.contains(needle),
        "expected to find {needle:?} in emitted source:\n{haystack}"
    );
}

/// Asserts that `haystack` does not contain `needle`.
pub fn assert_not_contains(haystack: &str, needle: &str) {
    assert!(
        !haystack.contains(needle),
        "did not expect {needle:?} in emitted source:\n{haystack}"
    );
}
