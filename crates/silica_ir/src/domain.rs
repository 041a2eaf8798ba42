//! Clock domains.
//!
//! A [`ClockDomain`] names a clock/reset signal pair. Synchronous statement
//! groups and memory ports reference domains by name; the lowering pipeline
//! resolves those names against the fragment's clock-domain list.

use crate::context::Context;
use crate::ids::SignalId;
use serde::{Deserialize, Serialize};
use silica_common::Ident;

/// A named clock + reset pair governing a group of synchronous statements.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClockDomain {
    /// The domain name.
    pub name: Ident,
    /// The clock signal.
    pub clk: SignalId,
    /// The reset signal; `None` for reset-less domains.
    pub rst: Option<SignalId>,
    /// When set, no reset logic is ever generated for this domain and
    /// referencing a reset for it is a usage error.
    pub reset_less: bool,
}

impl ClockDomain {
    /// Creates a domain named `name` with fresh `<name>_clk` / `<name>_rst`
    /// signals.
    pub fn create(ctx: &mut Context, name: &str) -> Self {
        let clk = ctx.signal(&format!("{name}_clk"), 1);
        let rst = ctx.signal(&format!("{name}_rst"), 1);
        Self {
            name: ctx.intern(name),
            clk,
            rst: Some(rst),
            reset_less: false,
        }
    }

    /// Creates a reset-less domain named `name` with a fresh `<name>_clk`
    /// signal.
    pub fn create_reset_less(ctx: &mut Context, name: &str) -> Self {
        let clk = ctx.signal(&format!("{name}_clk"), 1);
        Self {
            name: ctx.intern(name),
            clk,
            rst: None,
            reset_less: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_names_signals_after_domain() {
        let mut ctx = Context::new();
        let cd = ClockDomain::create(&mut ctx, "sys");
        assert_eq!(ctx.signal_name(cd.clk), "sys_clk");
        assert_eq!(ctx.signal_name(cd.rst.unwrap()), "sys_rst");
        assert!(!cd.reset_less);
    }

    #[test]
    fn reset_less_has_no_reset() {
        let mut ctx = Context::new();
        let cd = ClockDomain::create_reset_less(&mut ctx, "pix");
        assert!(cd.rst.is_none());
        assert!(cd.reset_less);
    }
}
