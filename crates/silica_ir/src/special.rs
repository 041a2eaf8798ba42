//! Specials — non-expression hardware primitives.
//!
//! A [`Special`] declares its external connection points (tagged
//! input/output/inout) without participating in the expression algebra.
//! During lowering a special is either replaced by a provider fragment or
//! survives untouched for native emission by the backend.

use crate::context::Context;
use crate::expr::Expr;
use crate::ids::SignalId;
use crate::signal::Constant;
use serde::{Deserialize, Serialize};
use silica_common::{bits_for, Ident};

/// The variant kind of a special; the override-table dispatch key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SpecialKind {
    /// An opaque vendor instance.
    Instance,
    /// A width × depth storage block.
    Memory,
    /// A tri-state pad driver.
    Tristate,
    /// A synthesis directive.
    Directive,
}

impl SpecialKind {
    /// Returns the kind name, used in error messages.
    pub fn name(self) -> &'static str {
        match self {
            SpecialKind::Instance => "instance",
            SpecialKind::Memory => "memory",
            SpecialKind::Tristate => "tristate",
            SpecialKind::Directive => "directive",
        }
    }
}

/// The direction of a connection point, from the special's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IoDir {
    /// Driven by the surrounding design.
    Input,
    /// Driven by the special.
    Output,
    /// Bidirectional.
    InOut,
}

/// A port binding on an opaque instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstancePort {
    /// The port name on the instantiated primitive.
    pub name: String,
    /// The port direction.
    pub dir: IoDir,
    /// The design expression bound to the port.
    pub expr: Expr,
}

/// A parameter value on an opaque instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ParamValue {
    /// An integer constant.
    Const(Constant),
    /// A floating-point value.
    Real(f64),
    /// A quoted string.
    Str(String),
    /// Pre-formatted text emitted verbatim.
    Preformatted(String),
}

/// A named parameter on an opaque instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceParameter {
    /// The parameter name on the instantiated primitive.
    pub name: String,
    /// The parameter value.
    pub value: ParamValue,
}

/// An opaque vendor primitive, instantiated without internal semantics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Instance {
    /// The primitive type being instantiated.
    pub of: String,
    /// The instance-name hint; defaults to `of`.
    pub name: String,
    /// Port bindings, in declaration order.
    pub ports: Vec<InstancePort>,
    /// Named parameters, in declaration order.
    pub params: Vec<InstanceParameter>,
    /// An optional synthesis directive appended to the instantiation.
    pub synthesis_directive: Option<String>,
}

impl Instance {
    /// Creates an instance of primitive `of` with no connections yet.
    pub fn new(of: &str) -> Self {
        Self {
            of: of.to_string(),
            name: of.to_string(),
            ports: Vec::new(),
            params: Vec::new(),
            synthesis_directive: None,
        }
    }

    /// Binds a port.
    pub fn port(&mut self, name: &str, dir: IoDir, expr: impl Into<Expr>) -> &mut Self {
        self.ports.push(InstancePort {
            name: name.to_string(),
            dir,
            expr: expr.into(),
        });
        self
    }

    /// Sets a parameter.
    pub fn param(&mut self, name: &str, value: ParamValue) -> &mut Self {
        self.params.push(InstanceParameter {
            name: name.to_string(),
            value,
        });
        self
    }
}

/// Same-cycle read/write collision policy for a memory port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MemoryPortMode {
    /// The read output reflects the just-written data on the same port.
    WriteFirst,
    /// The read output shows pre-write contents, one cycle delayed.
    ReadFirst,
    /// The read output holds steady during a write cycle.
    NoChange,
}

/// One read/write port on a [`Memory`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryPort {
    /// The address signal.
    pub adr: SignalId,
    /// The data-out signal.
    pub dat_r: SignalId,
    /// Write enable; whole-word or per-granule depending on granularity.
    pub we: Option<SignalId>,
    /// The data-in signal for write-capable ports.
    pub dat_w: Option<SignalId>,
    /// When set, the read path is combinational (no clocking).
    pub async_read: bool,
    /// Optional synchronous read enable.
    pub re: Option<SignalId>,
    /// Write granularity in bits; 0 means whole-word.
    pub we_granularity: u32,
    /// Collision policy for same-cycle read and write.
    pub mode: MemoryPortMode,
    /// The clock domain driving this port.
    pub clock_domain: Ident,
}

/// Configuration for [`Memory::add_port`].
#[derive(Debug, Clone)]
pub struct MemoryPortConfig {
    /// Generate `we` and `dat_w` signals.
    pub write_capable: bool,
    /// Combinational read path.
    pub async_read: bool,
    /// Generate a synchronous read-enable signal.
    pub has_re: bool,
    /// Write granularity in bits; 0 means whole-word. Values that are at
    /// least the memory width are clamped to 0.
    pub we_granularity: u32,
    /// Collision policy.
    pub mode: MemoryPortMode,
    /// The clock domain driving this port.
    pub clock_domain: Ident,
}

impl MemoryPortConfig {
    /// A synchronous, read-only, whole-word WRITE_FIRST port on `clock_domain`.
    pub fn new(clock_domain: Ident) -> Self {
        Self {
            write_capable: false,
            async_read: false,
            has_re: false,
            we_granularity: 0,
            mode: MemoryPortMode::WriteFirst,
            clock_domain,
        }
    }

    /// Enables the write path.
    pub fn write_capable(mut self) -> Self {
        self.write_capable = true;
        self
    }

    /// Makes the read path combinational.
    pub fn async_read(mut self) -> Self {
        self.async_read = true;
        self
    }

    /// Adds a synchronous read enable.
    pub fn with_re(mut self) -> Self {
        self.has_re = true;
        self
    }

    /// Sets the write granularity in bits.
    pub fn granularity(mut self, bits: u32) -> Self {
        self.we_granularity = bits;
        self
    }

    /// Sets the collision policy.
    pub fn mode(mut self, mode: MemoryPortMode) -> Self {
        self.mode = mode;
        self
    }
}

/// A width × depth storage block with zero or more ports.
///
/// Ports to the same memory are never arbitrated here; the surrounding
/// design is responsible for conflict avoidance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Memory {
    /// Word width in bits.
    pub width: u32,
    /// Number of words.
    pub depth: u32,
    /// Optional preload contents, one word per element.
    pub init: Option<Vec<u64>>,
    /// The memory-name hint.
    pub name: String,
    /// The declared ports, in declaration order.
    pub ports: Vec<MemoryPort>,
}

impl Memory {
    /// Creates a memory with no ports yet.
    pub fn new(width: u32, depth: u32, name: &str) -> Self {
        Self {
            width,
            depth,
            init: None,
            name: name.to_string(),
            ports: Vec::new(),
        }
    }

    /// Declares a port, creating its address/data signals in `ctx`.
    ///
    /// Returns a copy of the created port so callers can wire its signals.
    pub fn add_port(&mut self, ctx: &mut Context, cfg: MemoryPortConfig) -> MemoryPort {
        let mut we_granularity = cfg.we_granularity;
        if we_granularity >= self.width {
            we_granularity = 0;
        }
        let adr_width = bits_for(i64::from(self.depth) - 1, false);
        let adr = ctx.signal(&format!("{}_adr", self.name), adr_width);
        let dat_r = ctx.signal(&format!("{}_dat_r", self.name), self.width);
        let (we, dat_w) = if cfg.write_capable {
            let we_width = if we_granularity > 0 {
                self.width / we_granularity
            } else {
                1
            };
            let we = ctx.signal(&format!("{}_we", self.name), we_width);
            let dat_w = ctx.signal(&format!("{}_dat_w", self.name), self.width);
            (Some(we), Some(dat_w))
        } else {
            (None, None)
        };
        let re = if cfg.has_re {
            Some(ctx.signal(&format!("{}_re", self.name), 1))
        } else {
            None
        };
        let port = MemoryPort {
            adr,
            dat_r,
            we,
            dat_w,
            async_read: cfg.async_read,
            re,
            we_granularity,
            mode: cfg.mode,
            clock_domain: cfg.clock_domain,
        };
        self.ports.push(port.clone());
        port
    }
}

/// A tri-state pad driver.
///
/// When `oe` is low the pad floats (undriven, not zero) and the optional
/// sensed input `i` reflects the pad's external state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tristate {
    /// The bidirectional pad.
    pub target: SignalId,
    /// The driven value.
    pub o: Expr,
    /// The output enable.
    pub oe: Expr,
    /// The optional sensed input.
    pub i: Option<SignalId>,
}

/// A synthesis directive: a template with `{name}` placeholders replaced
/// by the final namespace identifiers of the bound signals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Directive {
    /// The directive template.
    pub template: String,
    /// Named signal bindings substituted into the template.
    pub signals: Vec<(String, SignalId)>,
}

/// A non-expression hardware primitive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Special {
    /// An opaque vendor instance.
    Instance(Instance),
    /// A storage block.
    Memory(Memory),
    /// A tri-state pad driver.
    Tristate(Tristate),
    /// A synthesis directive.
    Directive(Directive),
}

impl Special {
    /// Returns the variant kind tag.
    pub fn kind(&self) -> SpecialKind {
        match self {
            Special::Instance(_) => SpecialKind::Instance,
            Special::Memory(_) => SpecialKind::Memory,
            Special::Tristate(_) => SpecialKind::Tristate,
            Special::Directive(_) => SpecialKind::Directive,
        }
    }

    /// Returns the name hint used by the namespace allocator.
    pub fn name_hint(&self) -> &str {
        match self {
            Special::Instance(inst) => &inst.name,
            Special::Memory(mem) => &mem.name,
            Special::Tristate(_) => "tristate",
            Special::Directive(_) => "directive",
        }
    }

    /// Lists the special's external connection points with their tags.
    pub fn io(&self) -> Vec<(IoDir, Expr)> {
        let mut out = Vec::new();
        match self {
            Special::Instance(inst) => {
                for port in &inst.ports {
                    out.push((port.dir, port.expr.clone()));
                }
            }
            Special::Memory(mem) => {
                for port in &mem.ports {
                    out.push((IoDir::Input, Expr::Signal(port.adr)));
                    if let Some(we) = port.we {
                        out.push((IoDir::Input, Expr::Signal(we)));
                    }
                    if let Some(dat_w) = port.dat_w {
                        out.push((IoDir::Input, Expr::Signal(dat_w)));
                    }
                    if let Some(re) = port.re {
                        out.push((IoDir::Input, Expr::Signal(re)));
                    }
                    out.push((IoDir::Output, Expr::Signal(port.dat_r)));
                }
            }
            Special::Tristate(ts) => {
                out.push((IoDir::InOut, Expr::Signal(ts.target)));
                out.push((IoDir::Input, ts.o.clone()));
                out.push((IoDir::Input, ts.oe.clone()));
                if let Some(i) = ts.i {
                    out.push((IoDir::Output, Expr::Signal(i)));
                }
            }
            Special::Directive(dir) => {
                for (_, sig) in &dir.signals {
                    out.push((IoDir::Input, Expr::Signal(*sig)));
                }
            }
        }
        out
    }

    /// Lists the clock-domain names this special is bound to.
    pub fn clock_domains(&self) -> Vec<Ident> {
        match self {
            Special::Memory(mem) => mem.ports.iter().map(|p| p.clock_domain).collect(),
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn granularity_clamped_to_whole_word() {
        let mut ctx = Context::new();
        let sys = ctx.intern("sys");
        let mut mem = Memory::new(8, 16, "buf");
        let port = mem.add_port(
            &mut ctx,
            MemoryPortConfig::new(sys).write_capable().granularity(8),
        );
        // Granularity equal to the width means whole-word.
        assert_eq!(port.we_granularity, 0);
        assert_eq!(ctx.signals[port.we.unwrap()].width, 1);
    }

    #[test]
    fn granular_we_is_one_bit_per_granule() {
        let mut ctx = Context::new();
        let sys = ctx.intern("sys");
        let mut mem = Memory::new(32, 64, "buf");
        let port = mem.add_port(
            &mut ctx,
            MemoryPortConfig::new(sys).write_capable().granularity(8),
        );
        assert_eq!(port.we_granularity, 8);
        assert_eq!(ctx.signals[port.we.unwrap()].width, 4);
    }

    #[test]
    fn address_width_covers_depth() {
        let mut ctx = Context::new();
        let sys = ctx.intern("sys");
        let mut mem = Memory::new(8, 1024, "buf");
        let port = mem.add_port(&mut ctx, MemoryPortConfig::new(sys));
        assert_eq!(ctx.signals[port.adr].width, 10);
    }

    #[test]
    fn read_only_port_has_no_write_signals() {
        let mut ctx = Context::new();
        let sys = ctx.intern("sys");
        let mut mem = Memory::new(8, 4, "rom");
        let port = mem.add_port(&mut ctx, MemoryPortConfig::new(sys));
        assert!(port.we.is_none());
        assert!(port.dat_w.is_none());
    }

    #[test]
    fn memory_io_tags_directions() {
        let mut ctx = Context::new();
        let sys = ctx.intern("sys");
        let mut mem = Memory::new(8, 4, "buf");
        let port = mem.add_port(&mut ctx, MemoryPortConfig::new(sys).write_capable());
        let special = Special::Memory(mem);
        let io = special.io();
        assert!(io.contains(&(IoDir::Output, Expr::Signal(port.dat_r))));
        assert!(io.contains(&(IoDir::Input, Expr::Signal(port.adr))));
    }

    #[test]
    fn tristate_target_is_inout() {
        let mut ctx = Context::new();
        let pad = ctx.signal("pad", 1);
        let o = ctx.signal("o", 1);
        let oe = ctx.signal("oe", 1);
        let ts = Special::Tristate(Tristate {
            target: pad,
            o: Expr::Signal(o),
            oe: Expr::Signal(oe),
            i: None,
        });
        assert!(ts.io().contains(&(IoDir::InOut, Expr::Signal(pad))));
        assert_eq!(ts.kind(), SpecialKind::Tristate);
    }

    #[test]
    fn instance_builder() {
        let mut ctx = Context::new();
        let q = ctx.signal("q", 1);
        let mut inst = Instance::new("SB_DFF");
        inst.port("Q", IoDir::Output, q)
            .param("INIT", ParamValue::Const(Constant::new(0, 1, false)));
        assert_eq!(inst.ports.len(), 1);
        assert_eq!(inst.params.len(), 1);
        assert_eq!(inst.name, "SB_DFF");
    }
}
