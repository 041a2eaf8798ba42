//! Behavioral statements.
//!
//! Statement order within a list is significant: combinational lists use
//! last-write-wins default/override chains, and both backends preserve
//! program order when rendering.

use crate::expr::Expr;
use crate::signal::Constant;
use serde::{Deserialize, Serialize};

/// One arm of a [`Statement::Case`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseArm {
    /// The constant values matched by this arm.
    pub patterns: Vec<Constant>,
    /// The statements executed when matched.
    pub body: Vec<Statement>,
}

/// A behavioral statement.
///
/// Assignment targets must be addressable: a signal, a simple slice of an
/// addressable target, a concatenation of addressable targets, or an array
/// multiplexer over addressable targets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Statement {
    /// Drives `target` with `value`.
    Assign {
        /// The addressable target expression.
        target: Expr,
        /// The driven value.
        value: Expr,
    },
    /// Branches on a one-bit condition.
    If {
        /// The condition expression.
        cond: Expr,
        /// Statements executed when the condition holds.
        then_body: Vec<Statement>,
        /// Statements executed otherwise; may be empty.
        else_body: Vec<Statement>,
    },
    /// Branches on the value of a subject expression.
    Case {
        /// The subject being matched.
        subject: Expr,
        /// The match arms, in declaration order.
        arms: Vec<CaseArm>,
        /// Statements executed when no arm matches; may be empty.
        default: Vec<Statement>,
    },
}

/// Builds an assignment statement.
pub fn assign(target: impl Into<Expr>, value: impl Into<Expr>) -> Statement {
    Statement::Assign {
        target: target.into(),
        value: value.into(),
    }
}
