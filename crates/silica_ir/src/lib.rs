//! SilicaIR — the value model for the silica RTL generator.
//!
//! This crate defines the expression/statement intermediate representation
//! ([`Expr`], [`Statement`]), the compilation unit ([`Fragment`]), the
//! non-expression hardware primitives ([`Special`]), static width/sign
//! inference ([`shape`]), and the per-compilation [`Context`] that owns all
//! [`Signal`]s and [`Special`]s and assigns their creation-order identities.

#![warn(missing_docs)]

pub mod analysis;
pub mod arena;
pub mod context;
pub mod domain;
pub mod expr;
pub mod fragment;
pub mod ids;
pub mod signal;
pub mod special;
pub mod stmt;
pub mod width;

pub use arena::{Arena, ArenaId};
pub use context::{Context, SignalOpts};
pub use domain::ClockDomain;
pub use expr::{BinaryOp, Expr, UnaryOp};
pub use fragment::{Fragment, FragmentBuilder};
pub use ids::{SignalId, SpecialId};
pub use signal::{Constant, Signal};
pub use special::{
    Directive, Instance, InstanceParameter, InstancePort, IoDir, Memory, MemoryPort,
    MemoryPortConfig, MemoryPortMode, ParamValue, Special, SpecialKind, Tristate,
};
pub use stmt::{assign, CaseArm, Statement};
pub use width::{shape, Shape};
