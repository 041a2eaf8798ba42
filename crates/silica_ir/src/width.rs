//! Static bit-width and signedness inference.
//!
//! [`shape`] is a pure, total function over well-formed expression trees.
//! Both code-generation backends re-derive shapes through this single
//! function, which is what guarantees their cast and extension behavior
//! agrees bit-for-bit.

use crate::context::Context;
use crate::expr::{BinaryOp, Expr, UnaryOp};
use serde::{Deserialize, Serialize};

/// The inferred width and signedness of an expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shape {
    /// Number of bits.
    pub width: u32,
    /// Whether the value is two's-complement signed.
    pub signed: bool,
}

impl Shape {
    /// Creates a shape.
    pub fn new(width: u32, signed: bool) -> Self {
        Self { width, signed }
    }
}

/// Promotes a mixed-sign operand pair: the unsigned side gains one bit so
/// its values remain representable in the signed result.
fn promote(a: Shape, b: Shape) -> (u32, u32, bool) {
    match (a.signed, b.signed) {
        (false, false) => (a.width, b.width, false),
        (true, true) => (a.width, b.width, true),
        (false, true) => (a.width + 1, b.width, true),
        (true, false) => (a.width, b.width + 1, true),
    }
}

fn pow2_bits(exp: u32) -> u32 {
    // Shift-amount widths above 31 would overflow the width bookkeeping;
    // saturate instead.
    1u32.checked_shl(exp).unwrap_or(u32::MAX)
}

/// Returns the width and signedness of `expr`.
pub fn shape(ctx: &Context, expr: &Expr) -> Shape {
    match expr {
        Expr::Signal(id) => {
            let sig = &ctx.signals[*id];
            Shape::new(sig.width, sig.signed)
        }
        Expr::Const(c) => Shape::new(c.width, c.signed),
        Expr::Unary { op, operand } => {
            let inner = shape(ctx, operand);
            match op {
                UnaryOp::Not => inner,
                UnaryOp::Neg => Shape::new(inner.width + 1, true),
            }
        }
        Expr::Binary { op, lhs, rhs } => {
            let l = shape(ctx, lhs);
            let r = shape(ctx, rhs);
            match op {
                BinaryOp::Add | BinaryOp::Sub => {
                    let (wl, wr, signed) = promote(l, r);
                    Shape::new(wl.max(wr) + 1, signed)
                }
                BinaryOp::Mul => {
                    let width = if l.signed && r.signed {
                        l.width + r.width - 1
                    } else {
                        l.width + r.width
                    };
                    Shape::new(width, l.signed || r.signed)
                }
                BinaryOp::And | BinaryOp::Or | BinaryOp::Xor => {
                    let (wl, wr, signed) = promote(l, r);
                    Shape::new(wl.max(wr), signed)
                }
                BinaryOp::Eq
                | BinaryOp::Ne
                | BinaryOp::Lt
                | BinaryOp::Le
                | BinaryOp::Gt
                | BinaryOp::Ge => Shape::new(1, false),
                BinaryOp::Shl => {
                    let extra = if r.signed {
                        pow2_bits(r.width - 1) - 1
                    } else {
                        pow2_bits(r.width) - 1
                    };
                    Shape::new(l.width.saturating_add(extra), l.signed)
                }
                BinaryOp::Shr => {
                    let extra = if r.signed {
                        pow2_bits(r.width - 1)
                    } else {
                        pow2_bits(r.width)
                    };
                    Shape::new(l.width.saturating_add(extra), l.signed)
                }
            }
        }
        Expr::Slice { base, start, stop } => {
            let inner = shape(ctx, base);
            Shape::new(stop - start, inner.signed)
        }
        Expr::Cat(parts) => {
            let width = parts.iter().map(|p| shape(ctx, p).width).sum();
            Shape::new(width, false)
        }
        Expr::Replicate { expr, count } => {
            let inner = shape(ctx, expr);
            Shape::new(inner.width * count, false)
        }
        Expr::ArrayMux { choices, .. } => {
            let mut width = 0;
            let mut signed = false;
            for choice in choices {
                let s = shape(ctx, choice);
                width = width.max(s.width);
                signed |= s.signed;
            }
            Shape::new(width, signed)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::SignalOpts;
    use crate::signal::Constant;

    fn sig(ctx: &mut Context, width: u32, signed: bool) -> Expr {
        Expr::Signal(ctx.signal_opts(
            "s",
            width,
            SignalOpts {
                signed,
                ..Default::default()
            },
        ))
    }

    #[test]
    fn add_unsigned_grows_one_bit() {
        let mut ctx = Context::new();
        let a = sig(&mut ctx, 8, false);
        let b = sig(&mut ctx, 4, false);
        assert_eq!(shape(&ctx, &(a + b)), Shape::new(9, false));
    }

    #[test]
    fn add_mixed_sign_promotes_unsigned_side() {
        let mut ctx = Context::new();
        // Unsigned 8 + signed 4: the unsigned side needs 9 bits as signed.
        let a = sig(&mut ctx, 8, false);
        let b = sig(&mut ctx, 4, true);
        assert_eq!(shape(&ctx, &(a + b)), Shape::new(10, true));
        // Symmetric case.
        let c = sig(&mut ctx, 4, true);
        let d = sig(&mut ctx, 8, false);
        assert_eq!(shape(&ctx, &(c + d)), Shape::new(10, true));
    }

    #[test]
    fn mul_widths_sum() {
        let mut ctx = Context::new();
        let a = sig(&mut ctx, 8, false);
        let b = sig(&mut ctx, 4, false);
        assert_eq!(shape(&ctx, &(a * b)), Shape::new(12, false));
    }

    #[test]
    fn mul_both_signed_drops_duplicate_sign_bit() {
        let mut ctx = Context::new();
        let a = sig(&mut ctx, 8, true);
        let b = sig(&mut ctx, 4, true);
        assert_eq!(shape(&ctx, &(a * b)), Shape::new(11, true));
    }

    #[test]
    fn mul_mixed_sign() {
        let mut ctx = Context::new();
        let a = sig(&mut ctx, 8, true);
        let b = sig(&mut ctx, 4, false);
        assert_eq!(shape(&ctx, &(a * b)), Shape::new(12, true));
    }

    #[test]
    fn bitwise_takes_max_without_growth() {
        let mut ctx = Context::new();
        let a = sig(&mut ctx, 8, false);
        let b = sig(&mut ctx, 4, false);
        assert_eq!(shape(&ctx, &(a & b)), Shape::new(8, false));
    }

    #[test]
    fn bitwise_mixed_sign_promotes() {
        let mut ctx = Context::new();
        let a = sig(&mut ctx, 8, false);
        let b = sig(&mut ctx, 4, true);
        assert_eq!(shape(&ctx, &(a ^ b)), Shape::new(9, true));
    }

    #[test]
    fn comparisons_are_one_bit_unsigned() {
        let mut ctx = Context::new();
        let a = sig(&mut ctx, 8, true);
        let b = sig(&mut ctx, 4, false);
        assert_eq!(shape(&ctx, &a.cmp_lt(b)), Shape::new(1, false));
    }

    #[test]
    fn not_inherits_shape() {
        let mut ctx = Context::new();
        let a = sig(&mut ctx, 8, true);
        assert_eq!(shape(&ctx, &!a), Shape::new(8, true));
    }

    #[test]
    fn neg_grows_and_signs() {
        let mut ctx = Context::new();
        let a = sig(&mut ctx, 8, false);
        assert_eq!(shape(&ctx, &-a), Shape::new(9, true));
    }

    #[test]
    fn shl_growth_from_amount_width() {
        let mut ctx = Context::new();
        let a = sig(&mut ctx, 8, false);
        let k = sig(&mut ctx, 3, false);
        // 2^3 - 1 = 7 extra bits.
        assert_eq!(shape(&ctx, &(a << k)), Shape::new(15, false));
    }

    #[test]
    fn shl_signed_amount_grows_less() {
        let mut ctx = Context::new();
        let a = sig(&mut ctx, 8, true);
        let k = sig(&mut ctx, 3, true);
        // 2^(3-1) - 1 = 3 extra bits; base sign preserved.
        assert_eq!(shape(&ctx, &(a << k)), Shape::new(11, true));
    }

    #[test]
    fn shr_growth_from_amount_width() {
        let mut ctx = Context::new();
        let a = sig(&mut ctx, 8, false);
        let k = sig(&mut ctx, 2, false);
        assert_eq!(shape(&ctx, &(a >> k)), Shape::new(12, false));
    }

    #[test]
    fn slice_inherits_sign() {
        let mut ctx = Context::new();
        let a = sig(&mut ctx, 8, true);
        assert_eq!(shape(&ctx, &a.slice(0, 3)), Shape::new(3, true));
    }

    #[test]
    fn cat_is_unsigned_sum() {
        let mut ctx = Context::new();
        let a = sig(&mut ctx, 8, true);
        let b = sig(&mut ctx, 4, false);
        assert_eq!(shape(&ctx, &Expr::cat(vec![a, b])), Shape::new(12, false));
    }

    #[test]
    fn replicate_is_unsigned_product() {
        let mut ctx = Context::new();
        let a = sig(&mut ctx, 3, true);
        assert_eq!(shape(&ctx, &a.repeat(4)), Shape::new(12, false));
    }

    #[test]
    fn array_mux_takes_max_and_any_sign() {
        let mut ctx = Context::new();
        let sel = sig(&mut ctx, 2, false);
        let a = sig(&mut ctx, 8, false);
        let b = sig(&mut ctx, 4, true);
        let mux = Expr::array(sel, vec![a, b]);
        assert_eq!(shape(&ctx, &mux), Shape::new(8, true));
    }

    #[test]
    fn oversized_constant_keeps_width() {
        let ctx = Context::new();
        let c = Expr::Const(Constant::new(1, 32, false));
        assert_eq!(shape(&ctx, &c), Shape::new(32, false));
    }

    #[test]
    fn exhaustive_add_matrix() {
        // Widths 1..=4 across all four sign combinations.
        let mut ctx = Context::new();
        for wa in 1..=4u32 {
            for wb in 1..=4u32 {
                for (sa, sb) in [(false, false), (false, true), (true, false), (true, true)] {
                    let a = sig(&mut ctx, wa, sa);
                    let b = sig(&mut ctx, wb, sb);
                    let got = shape(&ctx, &(a + b));
                    let ea = if !sa && sb { wa + 1 } else { wa };
                    let eb = if sa && !sb { wb + 1 } else { wb };
                    assert_eq!(got.width, ea.max(eb) + 1);
                    assert_eq!(got.signed, sa || sb);
                }
            }
        }
    }
}
