//! The conversion entry point.
//!
//! [`convert`] is the single driver both dialects share: it runs the
//! lowering pipeline, verifies every surviving special has a native
//! emitter, builds the namespace, and hands the lowered fragment to the
//! selected backend. Any error discards all in-progress output.

use crate::backend::Backend;
use crate::error::EmitError;
use crate::namespace::Namespace;
use crate::output::ConvOutput;
use crate::verilog::VerilogBackend;
use crate::vhdl::VhdlBackend;
use silica_ir::{Context, Fragment, SignalId};
use silica_lower::{lower, OverrideTable};
use std::collections::BTreeSet;

/// The output dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// Flat always/assign style Verilog.
    Verilog,
    /// Two-process architecture VHDL.
    Vhdl,
}

/// Caller-supplied conversion parameters.
pub struct ConvertOptions {
    /// The module/entity name.
    pub name: String,
    /// Signals exposed as ports.
    pub ios: BTreeSet<SignalId>,
    /// The output dialect.
    pub dialect: Dialect,
    /// Whether referencing an undeclared clock domain implicitly creates
    /// one (adding its clock/reset to the IO set) or raises.
    pub create_clock_domains: bool,
    /// Special replacement providers.
    pub overrides: OverrideTable,
}

impl ConvertOptions {
    /// Default options for the given dialect: entity name `top`, empty IO
    /// set, implicit clock-domain creation enabled, no overrides.
    pub fn new(dialect: Dialect) -> Self {
        Self {
            name: "top".to_string(),
            ios: BTreeSet::new(),
            dialect,
            create_clock_domains: true,
            overrides: OverrideTable::new(),
        }
    }

    /// Sets the module/entity name.
    pub fn name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    /// Adds a signal to the exposed IO set.
    pub fn io(mut self, id: SignalId) -> Self {
        self.ios.insert(id);
        self
    }

    /// Adds several signals to the exposed IO set.
    pub fn ios(mut self, ids: impl IntoIterator<Item = SignalId>) -> Self {
        self.ios.extend(ids);
        self
    }
}

fn backend_for(dialect: Dialect) -> &'static dyn Backend {
    match dialect {
        Dialect::Verilog => &VerilogBackend,
        Dialect::Vhdl => &VhdlBackend,
    }
}

/// Compiles a fragment to RTL source text in the selected dialect.
pub fn convert(
    ctx: &mut Context,
    fragment: Fragment,
    options: ConvertOptions,
) -> Result<ConvOutput, EmitError> {
    let backend = backend_for(options.dialect);

    let lowered = lower(
        ctx,
        fragment,
        &options.overrides,
        options.create_clock_domains,
    )?;
    let mut ios = options.ios;
    ios.extend(lowered.added_ios.iter().copied());

    for &id in &lowered.fragment.specials {
        let kind = ctx.specials[id].kind();
        if !backend.supports_special(kind) {
            return Err(EmitError::UnresolvableSpecial(kind));
        }
    }

    let namespace = Namespace::build(
        ctx,
        &lowered.fragment,
        &ios,
        backend.reserved_keywords(),
        backend.case_sensitive(),
    );
    let mut out = ConvOutput::new(namespace);
    backend.render(ctx, &lowered.fragment, &ios, &options.name, &mut out)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use silica_ir::stmt::assign;
    use silica_ir::Expr;
    use silica_lower::LowerError;

    #[test]
    fn missing_domain_aborts_with_no_output() {
        let mut ctx = Context::new();
        let q = ctx.signal("q", 1);
        let d = ctx.signal("d", 1);
        let sys = ctx.intern("sys");
        let mut f = Fragment::new();
        f.add_sync(sys, assign(q, Expr::from(d)));
        let mut options = ConvertOptions::new(Dialect::Verilog).ios([q, d]);
        options.create_clock_domains = false;
        let err = convert(&mut ctx, f, options).unwrap_err();
        assert!(matches!(
            err,
            EmitError::Lower(LowerError::UnresolvedClockDomain(_))
        ));
    }

    #[test]
    fn implicit_domain_signals_become_ports() {
        let mut ctx = Context::new();
        let q = ctx.signal("q", 1);
        let d = ctx.signal("d", 1);
        let sys = ctx.intern("sys");
        let mut f = Fragment::new();
        f.add_sync(sys, assign(q, Expr::from(d)));
        let options = ConvertOptions::new(Dialect::Verilog).ios([q, d]);
        let out = convert(&mut ctx, f, options).unwrap();
        assert!(out.main_source.contains("input sys_clk"));
        assert!(out.main_source.contains("input sys_rst"));
    }

    #[test]
    fn options_builder_accumulates() {
        let mut ctx = Context::new();
        let a = ctx.signal("a", 1);
        let b = ctx.signal("b", 1);
        let options = ConvertOptions::new(Dialect::Vhdl).name("core").io(a).io(b);
        assert_eq!(options.name, "core");
        assert_eq!(options.ios.len(), 2);
        assert!(options.create_clock_domains);
    }
}
