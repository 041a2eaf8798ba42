//! The fragment-lowering pipeline.
//!
//! Lowering runs once per compilation, in a fixed order; each pass
//! consumes and produces a [`Fragment`] and assumes the invariants
//! established by the passes before it:
//!
//! 1. clock-domain resolution (implicit creation or a fatal error),
//! 2. slice normalization,
//! 3. reset insertion,
//! 4. basic-operator lowering,
//! 5. special lowering to a fixpoint against the override table,
//!
//! followed by a re-run of slice normalization and basic lowering over
//! the statements merged in by special providers. Both re-run passes are
//! idempotent, so already-lowered statements pass through unchanged.

#![warn(missing_docs)]

pub mod basics;
pub mod error;
pub mod resets;
pub mod slices;
pub mod specials;

pub use basics::lower_basics;
pub use error::LowerError;
pub use resets::insert_resets;
pub use slices::lower_slices;
pub use specials::{lower_specials, OverrideTable, SpecialProvider};

use silica_ir::{ClockDomain, Context, Fragment, SignalId};
use std::collections::BTreeSet;

/// The result of running the full pipeline.
#[derive(Debug)]
pub struct Lowered {
    /// The lowered fragment, containing only emittable primitives.
    pub fragment: Fragment,
    /// Clock/reset signals created by implicit clock-domain resolution;
    /// callers add these to the exposed IO set.
    pub added_ios: BTreeSet<SignalId>,
}

/// Resolves every referenced clock-domain name against the fragment's
/// declarations, creating missing domains when `create_missing` is set.
pub fn resolve_clock_domains(
    ctx: &mut Context,
    fragment: &mut Fragment,
    create_missing: bool,
) -> Result<BTreeSet<SignalId>, LowerError> {
    let mut referenced: BTreeSet<_> = fragment.sync.keys().copied().collect();
    for &id in &fragment.specials {
        referenced.extend(ctx.specials[id].clock_domains());
    }

    let mut added_ios = BTreeSet::new();
    for name in referenced {
        if fragment.domain(name).is_some() {
            continue;
        }
        if !create_missing {
            return Err(LowerError::UnresolvedClockDomain(
                ctx.resolve(name).to_string(),
            ));
        }
        let name_str = ctx.resolve(name).to_string();
        let cd = ClockDomain::create(ctx, &name_str);
        added_ios.insert(cd.clk);
        if let Some(rst) = cd.rst {
            added_ios.insert(rst);
        }
        fragment.clock_domains.push(cd);
    }

    for cd in &fragment.clock_domains {
        if cd.reset_less && cd.rst.is_some() {
            return Err(LowerError::ResetOnResetlessDomain(
                ctx.resolve(cd.name).to_string(),
            ));
        }
        if !cd.reset_less && cd.rst.is_none() {
            return Err(LowerError::MissingReset(ctx.resolve(cd.name).to_string()));
        }
    }
    Ok(added_ios)
}

/// Runs the full lowering pipeline.
pub fn lower(
    ctx: &mut Context,
    mut fragment: Fragment,
    overrides: &OverrideTable,
    create_clock_domains: bool,
) -> Result<Lowered, LowerError> {
    let added_ios = resolve_clock_domains(ctx, &mut fragment, create_clock_domains)?;
    let fragment = lower_slices(ctx, fragment)?;
    let fragment = insert_resets(ctx, fragment);
    let fragment = lower_basics(ctx, fragment);
    let fragment = lower_specials(ctx, fragment, overrides)?;
    // Statements merged in by special providers get the same treatment.
    let fragment = lower_slices(ctx, fragment)?;
    let fragment = lower_basics(ctx, fragment);
    Ok(Lowered {
        fragment,
        added_ios,
    })
}
