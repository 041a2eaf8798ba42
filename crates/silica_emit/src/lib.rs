//! RTL code generation for silica.
//!
//! This crate turns a lowered [`Fragment`](silica_ir::Fragment) into
//! synthesizable source text in one of two dialects, flat always/assign
//! Verilog or two-process VHDL, behind a single [`Backend`] interface.
//! Both backends derive every cast, extension, and literal width from
//! [`silica_ir::shape`], so their outputs are semantically equivalent by
//! construction.

#![warn(missing_docs)]

pub mod backend;
pub mod batch;
pub mod convert;
pub mod error;
pub mod namespace;
pub mod output;
pub mod verilog;
pub mod vhdl;

pub use backend::{Backend, Layout, PortDir};
pub use batch::{convert_batch, ConvertJob};
pub use convert::{convert, ConvertOptions, Dialect};
pub use error::EmitError;
pub use namespace::Namespace;
pub use output::ConvOutput;
pub use verilog::VerilogBackend;
pub use vhdl::VhdlBackend;
