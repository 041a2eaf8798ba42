//! The backend interface and the fragment analyses both backends share.
//!
//! Everything direction- and storage-related is computed here, once, from
//! the lowered fragment; the dialect renderers only decide how to spell
//! the result.

use crate::error::EmitError;
use crate::output::ConvOutput;
use silica_common::Ident;
use silica_ir::analysis::{list_targets, special_ios};
use silica_ir::{Context, Fragment, IoDir, SignalId, SpecialKind};
use std::collections::{BTreeMap, BTreeSet};

/// The direction of a module/entity port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortDir {
    /// Read by the design.
    Input,
    /// Driven by the design.
    Output,
    /// Bidirectional (tri-state pads).
    InOut,
}

/// A rendering backend for one RTL dialect.
pub trait Backend {
    /// The dialect's reserved words, which the namespace must avoid.
    fn reserved_keywords(&self) -> &'static [&'static str];

    /// Whether identifiers differing only in case are distinct.
    fn case_sensitive(&self) -> bool;

    /// Whether the backend can natively emit the given special kind.
    fn supports_special(&self, kind: SpecialKind) -> bool;

    /// Renders the lowered fragment into `out.main_source`.
    fn render(
        &self,
        ctx: &Context,
        fragment: &Fragment,
        ios: &BTreeSet<SignalId>,
        name: &str,
        out: &mut ConvOutput,
    ) -> Result<(), EmitError>;
}

/// Direction- and storage-classification shared by both backends.
pub struct Layout {
    /// Exposed ports with their derived directions, in creation order.
    pub ports: Vec<(SignalId, PortDir)>,
    /// Signals driven by synchronous statements, per clock domain.
    pub registers: BTreeMap<Ident, BTreeSet<SignalId>>,
    /// All register signals, across domains.
    pub all_registers: BTreeSet<SignalId>,
    /// Signals driven by combinational statements.
    pub comb_targets: BTreeSet<SignalId>,
    /// Signals driven by specials.
    pub special_outputs: BTreeSet<SignalId>,
}

impl Layout {
    /// Computes the layout of a lowered fragment for the given IO set.
    ///
    /// A port is an output iff it is ever a statement target or a
    /// special's declared output, an inout iff a special declares it
    /// inout, and an input otherwise.
    pub fn of(ctx: &Context, fragment: &Fragment, ios: &BTreeSet<SignalId>) -> Layout {
        let comb_targets = list_targets(&fragment.comb);
        let mut registers = BTreeMap::new();
        let mut all_registers = BTreeSet::new();
        for (&domain, stmts) in &fragment.sync {
            let targets = list_targets(stmts);
            all_registers.extend(targets.iter().copied());
            registers.insert(domain, targets);
        }
        let special_outputs = special_ios(ctx, fragment, false, true, false);
        let special_inouts = special_ios(ctx, fragment, false, false, true);

        let ports = ios
            .iter()
            .map(|&id| {
                let dir = if special_inouts.contains(&id) {
                    PortDir::InOut
                } else if comb_targets.contains(&id)
                    || all_registers.contains(&id)
                    || special_outputs.contains(&id)
                {
                    PortDir::Output
                } else {
                    PortDir::Input
                };
                (id, dir)
            })
            .collect();

        Layout {
            ports,
            registers,
            all_registers,
            comb_targets,
            special_outputs,
        }
    }

    /// Returns the clock domain owning a register signal, if any.
    pub fn domain_of(&self, id: SignalId) -> Option<Ident> {
        self.registers
            .iter()
            .find(|(_, regs)| regs.contains(&id))
            .map(|(&domain, _)| domain)
    }
}

/// Lists every special connection point with the [`IoDir`] flattened to
/// signal granularity, for declaration purposes.
pub fn special_io_signals(ctx: &Context, fragment: &Fragment) -> BTreeSet<SignalId> {
    let mut out = BTreeSet::new();
    for dir in [IoDir::Input, IoDir::Output, IoDir::InOut] {
        let (ins, outs, inouts) = match dir {
            IoDir::Input => (true, false, false),
            IoDir::Output => (false, true, false),
            IoDir::InOut => (false, false, true),
        };
        out.extend(special_ios(ctx, fragment, ins, outs, inouts));
    }
    out
}
