//! Slice normalization.
//!
//! Backends only emit single-level `[start, stop)` ranges over signals, so
//! this pass collapses compound slices by arithmetic composition:
//! slice-of-slice adds offsets, slice-of-concatenation resolves into
//! slices of the parts, and a slice over any other compound expression
//! materializes a fresh combinationally-driven signal and slices that.
//! Normalizing an already-simple slice returns it unchanged.

use crate::error::LowerError;
use silica_common::InternalError;
use silica_ir::stmt::assign;
use silica_ir::{shape, CaseArm, Context, Expr, Fragment, SignalOpts, Statement};

/// Runs slice normalization over every statement of a fragment.
///
/// Intermediate signals materialized for compound slice bases are driven
/// by statements appended to the fragment's combinational list.
pub fn lower_slices(ctx: &mut Context, fragment: Fragment) -> Result<Fragment, LowerError> {
    let mut out = Fragment {
        comb: Vec::new(),
        sync: Default::default(),
        specials: fragment.specials,
        clock_domains: fragment.clock_domains,
    };
    let mut extra = Vec::new();
    for stmt in &fragment.comb {
        let rewritten = rewrite_stmt(ctx, stmt, &mut extra)?;
        // Drivers of materialized intermediates must precede their use in
        // program order.
        out.comb.append(&mut extra);
        out.comb.push(rewritten);
    }
    for (domain, stmts) in &fragment.sync {
        for stmt in stmts {
            let rewritten = rewrite_stmt(ctx, stmt, &mut extra)?;
            out.add_sync(*domain, rewritten);
        }
    }
    out.comb.append(&mut extra);
    Ok(out)
}

fn rewrite_stmt(
    ctx: &mut Context,
    stmt: &Statement,
    extra: &mut Vec<Statement>,
) -> Result<Statement, LowerError> {
    match stmt {
        Statement::Assign { target, value } => Ok(Statement::Assign {
            target: normalize(ctx, target, extra, true)?,
            value: normalize(ctx, value, extra, false)?,
        }),
        Statement::If {
            cond,
            then_body,
            else_body,
        } => Ok(Statement::If {
            cond: normalize(ctx, cond, extra, false)?,
            then_body: rewrite_body(ctx, then_body, extra)?,
            else_body: rewrite_body(ctx, else_body, extra)?,
        }),
        Statement::Case {
            subject,
            arms,
            default,
        } => {
            let mut new_arms = Vec::with_capacity(arms.len());
            for arm in arms {
                new_arms.push(CaseArm {
                    patterns: arm.patterns.clone(),
                    body: rewrite_body(ctx, &arm.body, extra)?,
                });
            }
            Ok(Statement::Case {
                subject: normalize(ctx, subject, extra, false)?,
                arms: new_arms,
                default: rewrite_body(ctx, default, extra)?,
            })
        }
    }
}

fn rewrite_body(
    ctx: &mut Context,
    body: &[Statement],
    extra: &mut Vec<Statement>,
) -> Result<Vec<Statement>, LowerError> {
    body.iter().map(|s| rewrite_stmt(ctx, s, extra)).collect()
}

/// Normalizes one expression. In target position (`is_target`) the
/// materialization fallback is forbidden: a slice there must resolve to
/// slices of addressable bases or the target was malformed.
fn normalize(
    ctx: &mut Context,
    expr: &Expr,
    extra: &mut Vec<Statement>,
    is_target: bool,
) -> Result<Expr, LowerError> {
    match expr {
        Expr::Signal(_) | Expr::Const(_) => Ok(expr.clone()),
        Expr::Unary { op, operand } => Ok(Expr::Unary {
            op: *op,
            operand: Box::new(normalize(ctx, operand, extra, false)?),
        }),
        Expr::Binary { op, lhs, rhs } => Ok(Expr::Binary {
            op: *op,
            lhs: Box::new(normalize(ctx, lhs, extra, false)?),
            rhs: Box::new(normalize(ctx, rhs, extra, false)?),
        }),
        Expr::Slice { base, start, stop } => {
            let base = normalize(ctx, base, extra, is_target)?;
            apply_slice(ctx, base, *start, *stop, extra, is_target)
        }
        Expr::Cat(parts) => {
            let parts = parts
                .iter()
                .map(|p| normalize(ctx, p, extra, is_target))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Expr::Cat(parts))
        }
        Expr::Replicate { expr, count } => Ok(Expr::Replicate {
            expr: Box::new(normalize(ctx, expr, extra, false)?),
            count: *count,
        }),
        Expr::ArrayMux { select, choices } => {
            let select = normalize(ctx, select, extra, false)?;
            let choices = choices
                .iter()
                .map(|c| normalize(ctx, c, extra, is_target))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Expr::ArrayMux {
                select: Box::new(select),
                choices,
            })
        }
    }
}

/// Applies `[start, stop)` to an already-normalized base.
fn apply_slice(
    ctx: &mut Context,
    base: Expr,
    start: u32,
    stop: u32,
    extra: &mut Vec<Statement>,
    is_target: bool,
) -> Result<Expr, LowerError> {
    match base {
        Expr::Signal(id) => {
            // A full-width slice collapses to the signal itself.
            if start == 0 && stop == ctx.signals[id].width {
                Ok(Expr::Signal(id))
            } else {
                Ok(Expr::Slice {
                    base: Box::new(Expr::Signal(id)),
                    start,
                    stop,
                })
            }
        }
        Expr::Slice {
            base: inner,
            start: inner_start,
            ..
        } => {
            // Compose offsets; the inner base is already primitive.
            Ok(Expr::Slice {
                base: inner,
                start: inner_start + start,
                stop: inner_start + stop,
            })
        }
        Expr::Cat(parts) => {
            // Select the parts overlapping [start, stop), slicing the
            // boundary parts. Least-significant part first.
            let mut picked = Vec::new();
            let mut offset = 0u32;
            for part in parts {
                let width = shape(ctx, &part).width;
                let lo = offset;
                let hi = offset + width;
                offset = hi;
                if hi <= start || lo >= stop {
                    continue;
                }
                let take_start = start.max(lo) - lo;
                let take_stop = stop.min(hi) - lo;
                picked.push(apply_slice(ctx, part, take_start, take_stop, extra, is_target)?);
            }
            match picked.len() {
                1 => Ok(picked.into_iter().next().unwrap_or(Expr::Cat(Vec::new()))),
                _ => Ok(Expr::Cat(picked)),
            }
        }
        other => {
            if is_target {
                return Err(LowerError::Internal(InternalError::new(
                    "assignment target slices a non-addressable expression",
                )));
            }
            let s = shape(ctx, &other);
            let tmp = ctx.signal_opts(
                "sliced",
                s.width,
                SignalOpts {
                    signed: s.signed,
                    ..Default::default()
                },
            );
            extra.push(assign(tmp, other));
            Ok(Expr::Slice {
                base: Box::new(Expr::Signal(tmp)),
                start,
                stop,
            })
        }
    }
}
