//! Expression trees for the value model.
//!
//! [`Expr`] is a closed sum over the fixed node-kind set: signals,
//! constants, unary/binary operators, slices, concatenations, replication,
//! and array multiplexers. Expressions are plain `Clone` values; passes
//! that need to reuse a sub-expression duplicate it explicitly and never
//! mutate a node in place.

use crate::ids::SignalId;
use crate::signal::Constant;
use serde::{Deserialize, Serialize};

/// A unary operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnaryOp {
    /// Bitwise NOT (`~`).
    Not,
    /// Arithmetic negation (`-`).
    Neg,
}

/// A binary operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    /// Addition (`+`).
    Add,
    /// Subtraction (`-`).
    Sub,
    /// Multiplication (`*`).
    Mul,
    /// Bitwise AND (`&`).
    And,
    /// Bitwise OR (`|`).
    Or,
    /// Bitwise XOR (`^`).
    Xor,
    /// Equality (`==`).
    Eq,
    /// Inequality (`!=`).
    Ne,
    /// Less than (`<`).
    Lt,
    /// Less than or equal (`<=`).
    Le,
    /// Greater than (`>`).
    Gt,
    /// Greater than or equal (`>=`).
    Ge,
    /// Left shift (`<<<`).
    Shl,
    /// Right shift (`>>>`).
    Shr,
}

impl BinaryOp {
    /// Returns `true` for the six comparison operators.
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge
        )
    }
}

/// An expression in the value model.
///
/// Width and signedness are never stored on nodes; they are derived on
/// demand by [`shape`](crate::width::shape), so an expression can never
/// disagree with its inferred type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    /// A reference to a signal.
    Signal(SignalId),
    /// A literal constant.
    Const(Constant),
    /// A unary operation.
    Unary {
        /// The operator.
        op: UnaryOp,
        /// The operand expression.
        operand: Box<Expr>,
    },
    /// A binary operation.
    Binary {
        /// The operator.
        op: BinaryOp,
        /// The left-hand side.
        lhs: Box<Expr>,
        /// The right-hand side.
        rhs: Box<Expr>,
    },
    /// A half-open bit range `[start, stop)` over a base expression.
    Slice {
        /// The expression being sliced.
        base: Box<Expr>,
        /// The first bit index included.
        start: u32,
        /// One past the last bit index included; always greater than `start`.
        stop: u32,
    },
    /// A concatenation, least-significant part first.
    Cat(Vec<Expr>),
    /// One expression repeated `count` times, concatenated.
    Replicate {
        /// The expression to repeat.
        expr: Box<Expr>,
        /// The number of repetitions.
        count: u32,
    },
    /// A multiplexer over an ordered list of choices.
    ArrayMux {
        /// The selector expression.
        select: Box<Expr>,
        /// The candidate expressions, indexed by selector value.
        choices: Vec<Expr>,
    },
}

impl Expr {
    /// Builds a concatenation, least-significant part first.
    pub fn cat(parts: Vec<Expr>) -> Expr {
        Expr::Cat(parts)
    }

    /// Builds an array multiplexer over `choices` indexed by `select`.
    pub fn array(select: impl Into<Expr>, choices: Vec<Expr>) -> Expr {
        Expr::ArrayMux {
            select: Box::new(select.into()),
            choices,
        }
    }

    /// Takes the half-open bit range `[start, stop)` of this expression.
    ///
    /// # Panics
    ///
    /// Panics if `stop <= start`.
    pub fn slice(self, start: u32, stop: u32) -> Expr {
        assert!(stop > start, "slice stop must exceed start");
        Expr::Slice {
            base: Box::new(self),
            start,
            stop,
        }
    }

    /// Takes a single bit of this expression.
    pub fn bit(self, index: u32) -> Expr {
        self.slice(index, index + 1)
    }

    /// Repeats this expression `count` times, concatenated.
    pub fn repeat(self, count: u32) -> Expr {
        Expr::Replicate {
            expr: Box::new(self),
            count,
        }
    }

    fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Expr {
        Expr::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    /// Equality comparison, one bit wide.
    pub fn cmp_eq(self, rhs: impl Into<Expr>) -> Expr {
        Expr::binary(BinaryOp::Eq, self, rhs.into())
    }

    /// Inequality comparison, one bit wide.
    pub fn cmp_ne(self, rhs: impl Into<Expr>) -> Expr {
        Expr::binary(BinaryOp::Ne, self, rhs.into())
    }

    /// Less-than comparison, one bit wide.
    pub fn cmp_lt(self, rhs: impl Into<Expr>) -> Expr {
        Expr::binary(BinaryOp::Lt, self, rhs.into())
    }

    /// Less-or-equal comparison, one bit wide.
    pub fn cmp_le(self, rhs: impl Into<Expr>) -> Expr {
        Expr::binary(BinaryOp::Le, self, rhs.into())
    }

    /// Greater-than comparison, one bit wide.
    pub fn cmp_gt(self, rhs: impl Into<Expr>) -> Expr {
        Expr::binary(BinaryOp::Gt, self, rhs.into())
    }

    /// Greater-or-equal comparison, one bit wide.
    pub fn cmp_ge(self, rhs: impl Into<Expr>) -> Expr {
        Expr::binary(BinaryOp::Ge, self, rhs.into())
    }
}

impl From<SignalId> for Expr {
    fn from(id: SignalId) -> Expr {
        Expr::Signal(id)
    }
}

impl From<Constant> for Expr {
    fn from(c: Constant) -> Expr {
        Expr::Const(c)
    }
}

impl From<i64> for Expr {
    fn from(value: i64) -> Expr {
        Expr::Const(Constant::from_value(value))
    }
}

macro_rules! impl_binary_op {
    ($trait:ident, $method:ident, $op:expr) => {
        impl<R: Into<Expr>> std::ops::$trait<R> for Expr {
            type Output = Expr;

            fn $method(self, rhs: R) -> Expr {
                Expr::binary($op, self, rhs.into())
            }
        }
    };
}

impl_binary_op!(Add, add, BinaryOp::Add);
impl_binary_op!(Sub, sub, BinaryOp::Sub);
impl_binary_op!(Mul, mul, BinaryOp::Mul);
impl_binary_op!(BitAnd, bitand, BinaryOp::And);
impl_binary_op!(BitOr, bitor, BinaryOp::Or);
impl_binary_op!(BitXor, bitxor, BinaryOp::Xor);
impl_binary_op!(Shl, shl, BinaryOp::Shl);
impl_binary_op!(Shr, shr, BinaryOp::Shr);

impl std::ops::Not for Expr {
    type Output = Expr;

    fn not(self) -> Expr {
        Expr::Unary {
            op: UnaryOp::Not,
            operand: Box::new(self),
        }
    }
}

impl std::ops::Neg for Expr {
    type Output = Expr;

    fn neg(self) -> Expr {
        Expr::Unary {
            op: UnaryOp::Neg,
            operand: Box::new(self),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operator_sugar_builds_binary_nodes() {
        let e = Expr::from(3) + 4;
        if let Expr::Binary { op, lhs, rhs } = e {
            assert_eq!(op, BinaryOp::Add);
            assert_eq!(*lhs, Expr::Const(Constant::from_value(3)));
            assert_eq!(*rhs, Expr::Const(Constant::from_value(4)));
        } else {
            panic!("expected Binary");
        }
    }

    #[test]
    fn signal_into_expr() {
        let id = SignalId::from_raw(5);
        assert_eq!(Expr::from(id), Expr::Signal(id));
    }

    #[test]
    fn bit_is_one_wide_slice() {
        let e = Expr::from(SignalId::from_raw(0)).bit(3);
        assert_eq!(
            e,
            Expr::Slice {
                base: Box::new(Expr::Signal(SignalId::from_raw(0))),
                start: 3,
                stop: 4,
            }
        );
    }

    #[test]
    #[should_panic(expected = "stop must exceed start")]
    fn empty_slice_rejected() {
        let _ = Expr::from(SignalId::from_raw(0)).slice(2, 2);
    }

    #[test]
    fn comparison_helpers() {
        let e = Expr::from(SignalId::from_raw(0)).cmp_lt(7);
        if let Expr::Binary { op, .. } = e {
            assert!(op.is_comparison());
            assert_eq!(op, BinaryOp::Lt);
        } else {
            panic!("expected Binary");
        }
    }

    #[test]
    fn structural_equality_uses_signal_identity() {
        let a = Expr::from(SignalId::from_raw(1)).bit(0);
        let b = Expr::from(SignalId::from_raw(1)).bit(0);
        let c = Expr::from(SignalId::from_raw(2)).bit(0);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
