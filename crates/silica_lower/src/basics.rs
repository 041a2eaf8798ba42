//! Basic-operator lowering.
//!
//! Rewrites constructs neither backend emits directly into the primitive
//! operator set: array multiplexers in value position become a fresh
//! signal driven by a `Case` over the selector (the last choice doubles as
//! the default, so out-of-range selectors clamp identically in both
//! backends), array multiplexers in target position become a `Case` of
//! per-choice assignments, and replication expands to a concatenation of
//! copies. The pass is idempotent.

use silica_ir::stmt::assign;
use silica_ir::{shape, CaseArm, Constant, Context, Expr, Fragment, SignalOpts, Statement};

/// Runs basic-operator lowering over every statement of a fragment.
pub fn lower_basics(ctx: &mut Context, fragment: Fragment) -> Fragment {
    let mut out = Fragment {
        comb: Vec::new(),
        sync: Default::default(),
        specials: fragment.specials,
        clock_domains: fragment.clock_domains,
    };
    let mut extra = Vec::new();
    for stmt in &fragment.comb {
        let rewritten = rewrite_stmt(ctx, stmt, &mut extra);
        // Mux cases driving fresh signals must precede their use in
        // program order.
        out.comb.append(&mut extra);
        out.comb.extend(rewritten);
    }
    for (domain, stmts) in &fragment.sync {
        for stmt in stmts {
            for rewritten in rewrite_stmt(ctx, stmt, &mut extra) {
                out.add_sync(*domain, rewritten);
            }
        }
    }
    out.comb.append(&mut extra);
    out
}

fn rewrite_stmt(ctx: &mut Context, stmt: &Statement, extra: &mut Vec<Statement>) -> Vec<Statement> {
    match stmt {
        Statement::Assign { target, value } => {
            let value = rewrite_expr(ctx, value, extra);
            rewrite_assign(ctx, target, value, extra)
        }
        Statement::If {
            cond,
            then_body,
            else_body,
        } => vec![Statement::If {
            cond: rewrite_expr(ctx, cond, extra),
            then_body: rewrite_body(ctx, then_body, extra),
            else_body: rewrite_body(ctx, else_body, extra),
        }],
        Statement::Case {
            subject,
            arms,
            default,
        } => {
            let arms = arms
                .iter()
                .map(|arm| CaseArm {
                    patterns: arm.patterns.clone(),
                    body: rewrite_body(ctx, &arm.body, extra),
                })
                .collect();
            vec![Statement::Case {
                subject: rewrite_expr(ctx, subject, extra),
                arms,
                default: rewrite_body(ctx, default, extra),
            }]
        }
    }
}

fn rewrite_body(ctx: &mut Context, body: &[Statement], extra: &mut Vec<Statement>) -> Vec<Statement> {
    body.iter()
        .flat_map(|s| rewrite_stmt(ctx, s, extra))
        .collect()
}

/// Expands an assignment whose target is an array multiplexer into a
/// `Case` of assignments, one per choice; other targets pass through.
fn rewrite_assign(
    ctx: &mut Context,
    target: &Expr,
    value: Expr,
    extra: &mut Vec<Statement>,
) -> Vec<Statement> {
    if let Expr::ArrayMux { select, choices } = target {
        let select = rewrite_expr(ctx, select, extra);
        let sel_width = shape(ctx, &select).width;
        let mut arms = Vec::new();
        let mut default = Vec::new();
        let last = choices.len().saturating_sub(1);
        for (index, choice) in choices.iter().enumerate() {
            let body = rewrite_assign(ctx, choice, value.clone(), extra);
            if index == last {
                default = body;
            } else {
                arms.push(CaseArm {
                    patterns: vec![Constant::new(index as i64, sel_width, false)],
                    body,
                });
            }
        }
        return vec![Statement::Case {
            subject: select,
            arms,
            default,
        }];
    }
    vec![Statement::Assign {
        target: target.clone(),
        value,
    }]
}

fn rewrite_expr(ctx: &mut Context, expr: &Expr, extra: &mut Vec<Statement>) -> Expr {
    match expr {
        Expr::Signal(_) | Expr::Const(_) => expr.clone(),
        Expr::Unary { op, operand } => Expr::Unary {
            op: *op,
            operand: Box::new(rewrite_expr(ctx, operand, extra)),
        },
        Expr::Binary { op, lhs, rhs } => Expr::Binary {
            op: *op,
            lhs: Box::new(rewrite_expr(ctx, lhs, extra)),
            rhs: Box::new(rewrite_expr(ctx, rhs, extra)),
        },
        Expr::Slice { base, start, stop } => Expr::Slice {
            base: Box::new(rewrite_expr(ctx, base, extra)),
            start: *start,
            stop: *stop,
        },
        Expr::Cat(parts) => {
            Expr::Cat(parts.iter().map(|p| rewrite_expr(ctx, p, extra)).collect())
        }
        Expr::Replicate { expr, count } => {
            let part = rewrite_expr(ctx, expr, extra);
            Expr::Cat(vec![part; *count as usize])
        }
        Expr::ArrayMux { select, choices } => {
            let select = rewrite_expr(ctx, select, extra);
            let choices: Vec<Expr> = choices
                .iter()
                .map(|c| rewrite_expr(ctx, c, extra))
                .collect();
            let result = shape(ctx, &Expr::ArrayMux {
                select: Box::new(select.clone()),
                choices: choices.clone(),
            });
            let muxed = ctx.signal_opts(
                "array_muxed",
                result.width,
                SignalOpts {
                    signed: result.signed,
                    ..Default::default()
                },
            );
            let sel_width = shape(ctx, &select).width;
            let mut arms = Vec::new();
            let mut default = Vec::new();
            let last = choices.len().saturating_sub(1);
            for (index, choice) in choices.into_iter().enumerate() {
                let body = vec![assign(muxed, choice)];
                if index == last {
                    default = body;
                } else {
                    arms.push(CaseArm {
                        patterns: vec![Constant::new(index as i64, sel_width, false)],
                        body,
                    });
                }
            }
            extra.push(Statement::Case {
                subject: select,
                arms,
                default,
            });
            Expr::Signal(muxed)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replicate_expands_to_cat() {
        let mut ctx = Context::new();
        let a = ctx.signal("a", 2);
        let out = ctx.signal("out", 6);
        let mut f = Fragment::new();
        f.comb.push(assign(out, Expr::from(a).repeat(3)));
        let lowered = lower_basics(&mut ctx, f);
        let expected = assign(
            out,
            Expr::Cat(vec![Expr::from(a), Expr::from(a), Expr::from(a)]),
        );
        assert_eq!(lowered.comb, vec![expected]);
    }

    #[test]
    fn value_mux_becomes_case_over_fresh_signal() {
        let mut ctx = Context::new();
        let sel = ctx.signal("sel", 2);
        let a = ctx.signal("a", 8);
        let b = ctx.signal("b", 8);
        let c = ctx.signal("c", 8);
        let out = ctx.signal("out", 8);
        let mut f = Fragment::new();
        let mux = Expr::array(sel, vec![Expr::from(a), Expr::from(b), Expr::from(c)]);
        f.comb.push(assign(out, mux));
        let lowered = lower_basics(&mut ctx, f);
        assert_eq!(lowered.comb.len(), 2);
        // The Case drives the fresh signal first, last choice as default.
        match &lowered.comb[0] {
            Statement::Case { arms, default, .. } => {
                assert_eq!(arms.len(), 2);
                assert_eq!(arms[0].patterns, vec![Constant::new(0, 2, false)]);
                assert_eq!(default.len(), 1);
            }
            other => panic!("expected Case, got {other:?}"),
        }
        // The assignment then reads the fresh muxed signal.
        match &lowered.comb[1] {
            Statement::Assign { value, .. } => assert!(matches!(value, Expr::Signal(_))),
            other => panic!("expected Assign, got {other:?}"),
        }
    }

    #[test]
    fn target_mux_becomes_case_of_assignments() {
        let mut ctx = Context::new();
        let sel = ctx.signal("sel", 1);
        let a = ctx.signal("a", 8);
        let b = ctx.signal("b", 8);
        let d = ctx.signal("d", 8);
        let mut f = Fragment::new();
        let target = Expr::array(sel, vec![Expr::from(a), Expr::from(b)]);
        f.comb.push(assign(target, d));
        let lowered = lower_basics(&mut ctx, f);
        assert_eq!(lowered.comb.len(), 1);
        match &lowered.comb[0] {
            Statement::Case { arms, default, .. } => {
                assert_eq!(arms.len(), 1);
                assert_eq!(arms[0].body, vec![assign(a, d)]);
                assert_eq!(default.as_slice(), &[assign(b, d)]);
            }
            other => panic!("expected Case, got {other:?}"),
        }
    }

    #[test]
    fn idempotent_on_lowered_output() {
        let mut ctx = Context::new();
        let sel = ctx.signal("sel", 1);
        let a = ctx.signal("a", 4);
        let b = ctx.signal("b", 4);
        let out = ctx.signal("out", 4);
        let mut f = Fragment::new();
        f.comb.push(assign(
            out,
            Expr::array(sel, vec![Expr::from(a), Expr::from(b)]),
        ));
        let once = lower_basics(&mut ctx, f);
        let twice = lower_basics(&mut ctx, once.clone());
        assert_eq!(once.comb, twice.comb);
    }

    #[test]
    fn sync_mux_case_lands_in_comb() {
        let mut ctx = Context::new();
        let sys = ctx.intern("sys");
        let sel = ctx.signal("sel", 1);
        let a = ctx.signal("a", 4);
        let b = ctx.signal("b", 4);
        let r = ctx.signal("r", 4);
        let mut f = Fragment::new();
        f.add_sync(
            sys,
            assign(r, Expr::array(sel, vec![Expr::from(a), Expr::from(b)])),
        );
        let lowered = lower_basics(&mut ctx, f);
        // The register update stays synchronous; the mux itself is comb.
        assert_eq!(lowered.sync[&sys].len(), 1);
        assert_eq!(lowered.comb.len(), 1);
        assert!(matches!(lowered.comb[0], Statement::Case { .. }));
    }
}
