//! IR analysis utilities: signal listing, target collection, and
//! target-overlap grouping.
//!
//! All collectors return `BTreeSet`s keyed by creation-order IDs, so every
//! consumer iterates deterministically.

use crate::context::Context;
use crate::expr::Expr;
use crate::fragment::Fragment;
use crate::ids::SignalId;
use crate::special::IoDir;
use crate::stmt::Statement;
use std::collections::BTreeSet;

/// Collects every signal referenced by `expr` into `out`.
pub fn expr_signals(expr: &Expr, out: &mut BTreeSet<SignalId>) {
    match expr {
        Expr::Signal(id) => {
            out.insert(*id);
        }
        Expr::Const(_) => {}
        Expr::Unary { operand, .. } => expr_signals(operand, out),
        Expr::Binary { lhs, rhs, .. } => {
            expr_signals(lhs, out);
            expr_signals(rhs, out);
        }
        Expr::Slice { base, .. } => expr_signals(base, out),
        Expr::Cat(parts) => {
            for part in parts {
                expr_signals(part, out);
            }
        }
        Expr::Replicate { expr, .. } => expr_signals(expr, out),
        Expr::ArrayMux { select, choices } => {
            expr_signals(select, out);
            for choice in choices {
                expr_signals(choice, out);
            }
        }
    }
}

/// Collects the signals written through an assignment target.
///
/// Selector expressions of target-position array multiplexers are reads,
/// not writes; they are reported by [`target_reads`] instead.
pub fn target_writes(target: &Expr, out: &mut BTreeSet<SignalId>) {
    match target {
        Expr::Signal(id) => {
            out.insert(*id);
        }
        Expr::Slice { base, .. } => target_writes(base, out),
        Expr::Cat(parts) => {
            for part in parts {
                target_writes(part, out);
            }
        }
        Expr::ArrayMux { choices, .. } => {
            for choice in choices {
                target_writes(choice, out);
            }
        }
        // Other node kinds are not addressable; nothing is written.
        _ => {}
    }
}

/// Collects the signals read by an assignment target (mux selectors).
pub fn target_reads(target: &Expr, out: &mut BTreeSet<SignalId>) {
    match target {
        Expr::Slice { base, .. } => target_reads(base, out),
        Expr::Cat(parts) => {
            for part in parts {
                target_reads(part, out);
            }
        }
        Expr::ArrayMux { select, choices } => {
            expr_signals(select, out);
            for choice in choices {
                target_reads(choice, out);
            }
        }
        _ => {}
    }
}

/// Collects the signals written by a statement.
pub fn statement_targets(stmt: &Statement, out: &mut BTreeSet<SignalId>) {
    match stmt {
        Statement::Assign { target, .. } => target_writes(target, out),
        Statement::If {
            then_body,
            else_body,
            ..
        } => {
            for s in then_body.iter().chain(else_body) {
                statement_targets(s, out);
            }
        }
        Statement::Case { arms, default, .. } => {
            for arm in arms {
                for s in &arm.body {
                    statement_targets(s, out);
                }
            }
            for s in default {
                statement_targets(s, out);
            }
        }
    }
}

/// Collects the signals read by a statement.
pub fn statement_reads(stmt: &Statement, out: &mut BTreeSet<SignalId>) {
    match stmt {
        Statement::Assign { target, value } => {
            target_reads(target, out);
            expr_signals(value, out);
        }
        Statement::If {
            cond,
            then_body,
            else_body,
        } => {
            expr_signals(cond, out);
            for s in then_body.iter().chain(else_body) {
                statement_reads(s, out);
            }
        }
        Statement::Case {
            subject,
            arms,
            default,
        } => {
            expr_signals(subject, out);
            for arm in arms {
                for s in &arm.body {
                    statement_reads(s, out);
                }
            }
            for s in default {
                statement_reads(s, out);
            }
        }
    }
}

/// The set of signals written by a statement list.
pub fn list_targets(stmts: &[Statement]) -> BTreeSet<SignalId> {
    let mut out = BTreeSet::new();
    for stmt in stmts {
        statement_targets(stmt, &mut out);
    }
    out
}

/// The set of signals read by a statement list.
pub fn list_reads(stmts: &[Statement]) -> BTreeSet<SignalId> {
    let mut out = BTreeSet::new();
    for stmt in stmts {
        statement_reads(stmt, &mut out);
    }
    out
}

/// Partitions a combinational statement list into groups of statements
/// whose target sets overlap, preserving first-occurrence order.
///
/// Each group is rendered as one combinational block with shared default
/// assignments; independent targets stay in independent groups.
pub fn group_by_targets(stmts: &[Statement]) -> Vec<(BTreeSet<SignalId>, Vec<Statement>)> {
    let mut groups: Vec<(BTreeSet<SignalId>, Vec<Statement>)> = Vec::new();
    for stmt in stmts {
        let mut targets = BTreeSet::new();
        statement_targets(stmt, &mut targets);
        let overlapping: Vec<usize> = groups
            .iter()
            .enumerate()
            .filter(|(_, (g, _))| !g.is_disjoint(&targets))
            .map(|(i, _)| i)
            .collect();
        match overlapping.split_first() {
            None => groups.push((targets, vec![stmt.clone()])),
            Some((&first, rest)) => {
                // Merge all overlapping groups into the earliest one,
                // keeping statement order.
                for &i in rest.iter().rev() {
                    let (g, s) = groups.remove(i);
                    groups[first].0.extend(g);
                    groups[first].1.extend(s);
                }
                groups[first].0.extend(targets);
                groups[first].1.push(stmt.clone());
            }
        }
    }
    groups
}

/// The signals exposed by a fragment's specials, filtered by direction.
pub fn special_ios(
    ctx: &Context,
    fragment: &Fragment,
    ins: bool,
    outs: bool,
    inouts: bool,
) -> BTreeSet<SignalId> {
    let mut out = BTreeSet::new();
    for &id in &fragment.specials {
        for (dir, expr) in ctx.specials[id].io() {
            let wanted = match dir {
                IoDir::Input => ins,
                IoDir::Output => outs,
                IoDir::InOut => inouts,
            };
            if wanted {
                expr_signals(&expr, &mut out);
            }
        }
    }
    out
}

/// Every signal reachable from a fragment: statement reads and writes,
/// special connection points, and clock-domain clock/reset signals.
pub fn fragment_signals(ctx: &Context, fragment: &Fragment) -> BTreeSet<SignalId> {
    let mut out = BTreeSet::new();
    for stmt in &fragment.comb {
        statement_reads(stmt, &mut out);
        statement_targets(stmt, &mut out);
    }
    for stmts in fragment.sync.values() {
        for stmt in stmts {
            statement_reads(stmt, &mut out);
            statement_targets(stmt, &mut out);
        }
    }
    out.extend(special_ios(ctx, fragment, true, true, true));
    for cd in &fragment.clock_domains {
        out.insert(cd.clk);
        if let Some(rst) = cd.rst {
            out.insert(rst);
        }
    }
    out
}
