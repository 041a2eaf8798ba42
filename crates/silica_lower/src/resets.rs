//! Reset insertion.
//!
//! For every clock domain that is not flagged reset-less, the domain's
//! synchronous statements are wrapped so that asserting the domain's reset
//! forces every targeted signal with a declared reset value back to it.
//! Statements whose targets carry no reset value are left outside the
//! wrapper, unchanged.

use silica_ir::analysis::statement_targets;
use silica_ir::stmt::assign;
use silica_ir::{Constant, Context, Expr, Fragment, SignalId, Statement};
use std::collections::BTreeSet;

/// Runs reset insertion over every synchronous statement group.
pub fn insert_resets(ctx: &Context, fragment: Fragment) -> Fragment {
    let mut out = Fragment {
        comb: fragment.comb,
        sync: Default::default(),
        specials: fragment.specials,
        clock_domains: fragment.clock_domains,
    };
    for (domain, stmts) in fragment.sync {
        let rst = out
            .domain(domain)
            .filter(|cd| !cd.reset_less)
            .and_then(|cd| cd.rst);
        let rst = match rst {
            Some(rst) => rst,
            None => {
                out.sync.insert(domain, stmts);
                continue;
            }
        };

        let mut kept = Vec::new();
        let mut wrapped = Vec::new();
        let mut reset_targets: BTreeSet<SignalId> = BTreeSet::new();
        for stmt in stmts {
            let mut targets = BTreeSet::new();
            statement_targets(&stmt, &mut targets);
            let with_reset: Vec<SignalId> = targets
                .into_iter()
                .filter(|id| ctx.signals[*id].reset.is_some())
                .collect();
            if with_reset.is_empty() {
                kept.push(stmt);
            } else {
                reset_targets.extend(with_reset);
                wrapped.push(stmt);
            }
        }

        if wrapped.is_empty() {
            out.sync.insert(domain, kept);
            continue;
        }

        let forced: Vec<Statement> = reset_targets
            .iter()
            .map(|&id| {
                let sig = &ctx.signals[id];
                let value = sig.reset.unwrap_or(0);
                assign(id, Constant::new(value, sig.width, sig.signed))
            })
            .collect();
        kept.push(Statement::If {
            cond: Expr::Signal(rst),
            then_body: forced,
            else_body: wrapped,
        });
        out.sync.insert(domain, kept);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use silica_ir::{ClockDomain, SignalOpts};

    fn domain_fragment(ctx: &mut Context) -> (Fragment, silica_common::Ident) {
        let cd = ClockDomain::create(ctx, "sys");
        let name = cd.name;
        let mut f = Fragment::new();
        f.clock_domains.push(cd);
        (f, name)
    }

    #[test]
    fn no_reset_value_is_a_noop() {
        let mut ctx = Context::new();
        let (mut f, sys) = domain_fragment(&mut ctx);
        let a = ctx.signal("a", 8);
        let d = ctx.signal("d", 8);
        f.add_sync(sys, assign(a, d));
        let before = f.sync[&sys].clone();
        let inserted = insert_resets(&ctx, f);
        assert_eq!(inserted.sync[&sys], before);
    }

    #[test]
    fn reset_value_forces_target() {
        let mut ctx = Context::new();
        let (mut f, sys) = domain_fragment(&mut ctx);
        let rst = f.clock_domains[0].rst.unwrap();
        let counter = ctx.signal_opts(
            "counter",
            8,
            SignalOpts {
                reset: Some(5),
                ..Default::default()
            },
        );
        let d = ctx.signal("d", 8);
        let body = assign(counter, d);
        f.add_sync(sys, body.clone());
        let inserted = insert_resets(&ctx, f);
        let stmts = &inserted.sync[&sys];
        assert_eq!(stmts.len(), 1);
        match &stmts[0] {
            Statement::If {
                cond,
                then_body,
                else_body,
            } => {
                assert_eq!(*cond, Expr::Signal(rst));
                assert_eq!(then_body.len(), 1);
                // The target is driven to its reset value regardless of d.
                assert_eq!(then_body[0], assign(counter, Constant::new(5, 8, false)));
                assert_eq!(else_body.as_slice(), &[body]);
            }
            other => panic!("expected If, got {other:?}"),
        }
    }

    #[test]
    fn reset_less_domain_passes_through() {
        let mut ctx = Context::new();
        let cd = ClockDomain::create_reset_less(&mut ctx, "pix");
        let pix = cd.name;
        let mut f = Fragment::new();
        f.clock_domains.push(cd);
        let counter = ctx.signal_opts(
            "counter",
            2,
            SignalOpts {
                reset: Some(0),
                ..Default::default()
            },
        );
        f.add_sync(pix, assign(counter, Expr::from(counter) + 1));
        let before = f.sync[&pix].clone();
        let inserted = insert_resets(&ctx, f);
        assert_eq!(inserted.sync[&pix], before);
    }

    #[test]
    fn untouched_statements_stay_outside_wrapper() {
        let mut ctx = Context::new();
        let (mut f, sys) = domain_fragment(&mut ctx);
        let plain = ctx.signal("plain", 1);
        let held = ctx.signal_opts(
            "held",
            1,
            SignalOpts {
                reset: Some(0),
                ..Default::default()
            },
        );
        f.add_sync(sys, assign(plain, 1));
        f.add_sync(sys, assign(held, 1));
        let inserted = insert_resets(&ctx, f);
        let stmts = &inserted.sync[&sys];
        assert_eq!(stmts.len(), 2);
        assert_eq!(stmts[0], assign(plain, 1));
        assert!(matches!(stmts[1], Statement::If { .. }));
    }

    #[test]
    fn shared_target_resets_once() {
        let mut ctx = Context::new();
        let (mut f, sys) = domain_fragment(&mut ctx);
        let r = ctx.signal_opts(
            "r",
            4,
            SignalOpts {
                reset: Some(3),
                ..Default::default()
            },
        );
        f.add_sync(sys, assign(r, 1));
        f.add_sync(sys, assign(r, 2));
        let inserted = insert_resets(&ctx, f);
        match &inserted.sync[&sys][0] {
            Statement::If {
                then_body,
                else_body,
                ..
            } => {
                assert_eq!(then_body.len(), 1);
                assert_eq!(else_body.len(), 2);
            }
            other => panic!("expected If, got {other:?}"),
        }
    }
}
