//! Special lowering against a pluggable override table.
//!
//! Each special kind may be registered with a provider. A provider either
//! returns a replacement [`Fragment`], which is merged into the design and
//! itself re-examined since providers may introduce new specials, or
//! `None` to declare the special terminal (natively emitted). Specials without an
//! override survive unchanged for the backend's native renderers. The
//! rewrite runs to a fixpoint, bounded to catch providers that endlessly
//! introduce overridable specials.

use crate::error::LowerError;
use silica_ir::{Context, Fragment, SpecialId, SpecialKind};
use std::collections::{BTreeMap, BTreeSet};

/// The iteration bound for the lowering fixpoint.
const MAX_ITERATIONS: u32 = 100;

/// A replacement provider: returns the fragment that implements the given
/// special, or `None` to declare the special terminal.
///
/// Providers are `Send + Sync` so whole conversions can run in parallel
/// across independent compilations.
pub type SpecialProvider = Box<dyn Fn(&mut Context, SpecialId) -> Option<Fragment> + Send + Sync>;

/// Maps special kinds to replacement providers.
///
/// Dispatch is by exact [`SpecialKind`] tag; the kind set is closed, so
/// there is no ancestor chain to walk.
#[derive(Default)]
pub struct OverrideTable {
    providers: BTreeMap<SpecialKind, SpecialProvider>,
}

impl OverrideTable {
    /// Creates an empty table; every special will be emitted natively.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a provider for a special kind, replacing any previous one.
    pub fn register(&mut self, kind: SpecialKind, provider: SpecialProvider) -> &mut Self {
        self.providers.insert(kind, provider);
        self
    }

    /// Looks up the provider for a kind.
    pub fn get(&self, kind: SpecialKind) -> Option<&SpecialProvider> {
        self.providers.get(&kind)
    }
}

/// Rewrites overridable specials until none remain, merging each
/// replacement fragment into the design.
pub fn lower_specials(
    ctx: &mut Context,
    fragment: Fragment,
    overrides: &OverrideTable,
) -> Result<Fragment, LowerError> {
    let mut fragment = fragment;
    let mut terminal: BTreeSet<SpecialId> = BTreeSet::new();
    for _ in 0..MAX_ITERATIONS {
        let pending: Vec<SpecialId> = fragment
            .specials
            .iter()
            .copied()
            .filter(|id| {
                !terminal.contains(id) && overrides.get(ctx.specials[*id].kind()).is_some()
            })
            .collect();
        if pending.is_empty() {
            return Ok(fragment);
        }
        for id in pending {
            let kind = ctx.specials[id].kind();
            let replacement = match overrides.get(kind) {
                Some(provider) => provider(ctx, id),
                None => continue,
            };
            match replacement {
                Some(replacement) => {
                    fragment.specials.remove(&id);
                    fragment = Fragment::merge(fragment, replacement);
                }
                None => {
                    terminal.insert(id);
                }
            }
        }
    }
    let stuck = fragment
        .specials
        .iter()
        .copied()
        .find(|id| !terminal.contains(id) && overrides.get(ctx.specials[*id].kind()).is_some());
    Err(LowerError::SpecialFixpoint {
        iterations: MAX_ITERATIONS,
        kind: stuck.map_or("unknown", |id| ctx.specials[id].kind().name()),
    })
}
