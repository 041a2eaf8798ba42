//! The VHDL backend: a two-process architecture per compilation unit.
//!
//! Registers are grouped into one record type per clock domain. A single
//! unclocked process computes every register's next value into `<cd>_v`
//! record variables (starting from the "hold" default `<cd>_v := <cd>_r`)
//! and every combinational target into a `<name>_v` variable seeded with
//! its default, applying combinational and synchronous statements in
//! program order. One clocked process per domain commits `<cd>_rin` into
//! `<cd>_r` on the rising edge.
//!
//! Width discipline: every operand is resized to the operator's inferred
//! width before the operation and every right-hand side is resized to the
//! target's width at the assignment, so numeric_std arithmetic agrees
//! bit-for-bit with the inference rules the Verilog backend uses.

use crate::backend::{Backend, Layout, PortDir};
use crate::error::EmitError;
use crate::namespace::Namespace;
use crate::output::ConvOutput;
use silica_common::{Ident, InternalError};
use silica_ir::analysis::{fragment_signals, list_reads};
use silica_ir::{
    shape, BinaryOp, Constant, Context, Expr, Fragment, Instance, IoDir, Memory, MemoryPortMode,
    ParamValue, SignalId, Special, SpecialId, SpecialKind, Statement, Tristate, UnaryOp,
};
use std::collections::BTreeSet;

/// VHDL-2008 reserved words.
const RESERVED_KEYWORDS: &[&str] = &[
    "abs", "access", "after", "alias", "all", "and", "architecture", "array", "assert", "assume",
    "assume_guarantee", "attribute", "begin", "block", "body", "buffer", "bus", "case",
    "component", "configuration", "constant", "context", "cover", "default", "disconnect",
    "downto", "else", "elsif", "end", "entity", "exit", "fairness", "file", "for", "force",
    "function", "generate", "generic", "group", "guarded", "if", "impure", "in", "inertial",
    "inout", "is", "label", "library", "linkage", "literal", "loop", "map", "mod", "nand", "new",
    "next", "nor", "not", "null", "of", "on", "open", "or", "others", "out", "package",
    "parameter", "port", "postponed", "procedure", "process", "property", "protected", "pure",
    "range", "record", "register", "reject", "release", "rem", "report", "restrict",
    "restrict_guarantee", "return", "rol", "ror", "select", "sequence", "severity", "shared",
    "signal", "sla", "sll", "sra", "srl", "strong", "subtype", "then", "to", "transport", "type",
    "unaffected", "units", "until", "use", "variable", "vmode", "vprop", "vunit", "wait", "when",
    "while", "with", "xnor", "xor",
];

const IND: &str = "    ";

/// The VHDL rendering backend.
pub struct VhdlBackend;

impl Backend for VhdlBackend {
    fn reserved_keywords(&self) -> &'static [&'static str] {
        RESERVED_KEYWORDS
    }

    fn case_sensitive(&self) -> bool {
        false
    }

    fn supports_special(&self, _kind: SpecialKind) -> bool {
        true
    }

    fn render(
        &self,
        ctx: &Context,
        fragment: &Fragment,
        ios: &BTreeSet<SignalId>,
        name: &str,
        out: &mut ConvOutput,
    ) -> Result<(), EmitError> {
        let ns = out.namespace.clone();
        let layout = Layout::of(ctx, fragment, ios);
        let emitter = Emitter {
            ctx,
            ns: &ns,
            fragment,
            layout: &layout,
        };
        out.main_source = emitter.render(name)?;
        Ok(())
    }
}

struct Emitter<'a> {
    ctx: &'a Context,
    ns: &'a Namespace,
    fragment: &'a Fragment,
    layout: &'a Layout,
}

impl Emitter<'_> {
    fn render(&self, name: &str) -> Result<String, EmitError> {
        let mut s = String::new();
        s.push_str("-- Machine-generated using silica\n");
        s.push_str("library ieee;\n");
        s.push_str("use ieee.std_logic_1164.all;\n");
        s.push_str("use ieee.numeric_std.all;\n\n");

        // Entity.
        s.push_str(&format!("entity {name} is\n"));
        if !self.layout.ports.is_empty() {
            s.push_str(&format!("{IND}port(\n"));
            let lines: Vec<String> = self
                .layout
                .ports
                .iter()
                .map(|&(id, dir)| {
                    let dir_kw = match dir {
                        PortDir::Input => "in",
                        PortDir::Output => "out",
                        PortDir::InOut => "inout",
                    };
                    format!(
                        "{IND}{IND}{} : {} {}",
                        self.ns.signal(id),
                        dir_kw,
                        self.sig_type(self.ctx.signals[id].width)
                    )
                })
                .collect();
            s.push_str(&lines.join(";\n"));
            s.push_str(&format!("\n{IND});\n"));
        }
        s.push_str(&format!("end entity {name};\n\n"));

        // Architecture declarative region.
        s.push_str(&format!("architecture two_process_{name} of {name} is\n"));
        let domains = self.domains_with_registers();
        for &domain in &domains {
            let dname = self.ctx.resolve(domain);
            s.push_str(&format!("{IND}type {dname}_reg_t is record\n"));
            for &reg in &self.layout.registers[&domain] {
                s.push_str(&format!(
                    "{IND}{IND}{} : {};\n",
                    self.ns.signal(reg),
                    self.sig_type(self.ctx.signals[reg].width)
                ));
            }
            s.push_str(&format!("{IND}end record;\n"));
            s.push_str(&format!(
                "{IND}signal {dname}_r, {dname}_rin : {dname}_reg_t;\n"
            ));
        }

        let mut internal = fragment_signals(self.ctx, self.fragment);
        for &(id, _) in &self.layout.ports {
            internal.remove(&id);
        }
        for &reg in &self.layout.all_registers {
            internal.remove(&reg);
        }
        for id in &internal {
            s.push_str(&format!(
                "{IND}signal {} : {};\n",
                self.ns.signal(*id),
                self.sig_type(self.ctx.signals[*id].width)
            ));
        }

        // Special declarations (components, memory arrays).
        let mut declared_components = BTreeSet::new();
        let mut special_bodies = String::new();
        for &id in &self.fragment.specials {
            match &self.ctx.specials[id] {
                Special::Instance(inst) => {
                    if declared_components.insert(inst.of.clone()) {
                        s.push_str(&self.instance_component(inst)?);
                    }
                    special_bodies.push_str(&self.instance_body(id, inst)?);
                }
                Special::Memory(mem) => {
                    let (decls, body) = self.memory(id, mem)?;
                    s.push_str(&decls);
                    special_bodies.push_str(&body);
                }
                Special::Tristate(ts) => special_bodies.push_str(&self.tristate(ts)?),
                Special::Directive(dir) => {
                    let mut formatted = dir.template.clone();
                    for (key, sig) in &dir.signals {
                        formatted =
                            formatted.replace(&format!("{{{key}}}"), self.ns.signal(*sig));
                    }
                    special_bodies.push_str(&format!("{IND}-- synthesis {formatted}\n\n"));
                }
            }
        }

        s.push_str("begin\n");

        // The unclocked process.
        let has_comb = !self.fragment.comb.is_empty() || !self.fragment.sync.is_empty();
        if has_comb {
            let sens = self.sensitivity_list(&domains);
            s.push_str(&format!("{IND}comb : process({})\n", sens.join(", ")));
            for &domain in &domains {
                let dname = self.ctx.resolve(domain);
                s.push_str(&format!(
                    "{IND}{IND}variable {dname}_v : {dname}_reg_t;\n"
                ));
            }
            for &target in &self.layout.comb_targets {
                s.push_str(&format!(
                    "{IND}{IND}variable {}_v : {};\n",
                    self.ns.signal(target),
                    self.sig_type(self.ctx.signals[target].width)
                ));
            }
            s.push_str(&format!("{IND}begin\n"));
            for &domain in &domains {
                let dname = self.ctx.resolve(domain);
                s.push_str(&format!("{IND}{IND}{dname}_v := {dname}_r;\n"));
            }
            for &target in &self.layout.comb_targets {
                let sig = &self.ctx.signals[target];
                let default = Constant::new(sig.reset.unwrap_or(0), sig.width, sig.signed);
                s.push_str(&format!(
                    "{IND}{IND}{}_v := {};\n",
                    self.ns.signal(target),
                    self.const_logic(&default)
                ));
            }
            for stmt in &self.fragment.comb {
                s.push_str(&self.stmt(stmt, 2)?);
            }
            for stmts in self.fragment.sync.values() {
                for stmt in stmts {
                    s.push_str(&self.stmt(stmt, 2)?);
                }
            }
            for &domain in &domains {
                let dname = self.ctx.resolve(domain);
                s.push_str(&format!("{IND}{IND}{dname}_rin <= {dname}_v;\n"));
            }
            for &target in &self.layout.comb_targets {
                let n = self.ns.signal(target);
                s.push_str(&format!("{IND}{IND}{n} <= {n}_v;\n"));
            }
            s.push_str(&format!("{IND}end process;\n\n"));
        }

        // One clocked process per domain.
        for &domain in &domains {
            let dname = self.ctx.resolve(domain);
            let cd = self.fragment.domain(domain).ok_or_else(|| {
                InternalError::new("synchronous statements on an unresolved clock domain")
            })?;
            let clk = self.ns.signal(cd.clk);
            s.push_str(&format!("{IND}{dname}_sync : process({clk})\n"));
            s.push_str(&format!("{IND}begin\n"));
            s.push_str(&format!("{IND}{IND}if rising_edge({clk}) then\n"));
            s.push_str(&format!("{IND}{IND}{IND}{dname}_r <= {dname}_rin;\n"));
            s.push_str(&format!("{IND}{IND}end if;\n"));
            s.push_str(&format!("{IND}end process;\n\n"));
        }

        // Registers exposed as output ports mirror their record field.
        for &(id, dir) in &self.layout.ports {
            if dir == PortDir::Output && self.layout.all_registers.contains(&id) {
                s.push_str(&format!(
                    "{IND}{} <= {};\n",
                    self.ns.signal(id),
                    self.identifier(id, false, false)
                ));
            }
        }

        s.push_str(&special_bodies);
        s.push_str(&format!("end architecture two_process_{name};\n"));
        Ok(s)
    }

    fn domains_with_registers(&self) -> Vec<Ident> {
        self.layout
            .registers
            .iter()
            .filter(|(_, regs)| !regs.is_empty())
            .map(|(&d, _)| d)
            .collect()
    }

    /// The unclocked process re-evaluates on any read input, any
    /// special-driven wire, and every register record.
    fn sensitivity_list(&self, domains: &[Ident]) -> Vec<String> {
        let mut reads = list_reads(&self.fragment.comb);
        for stmts in self.fragment.sync.values() {
            reads.extend(list_reads(stmts));
        }
        let mut names = Vec::new();
        for id in reads {
            if self.layout.all_registers.contains(&id) || self.layout.comb_targets.contains(&id) {
                continue;
            }
            names.push(self.ns.signal(id).to_string());
        }
        for &domain in domains {
            names.push(format!("{}_r", self.ctx.resolve(domain)));
        }
        names
    }

    fn sig_type(&self, width: u32) -> String {
        if width == 1 {
            "std_ulogic".to_string()
        } else {
            format!("std_logic_vector({} downto 0)", width - 1)
        }
    }

    /// The spelled-out reference for a signal: record fields for
    /// registers, `_v` variables for combinational targets inside the
    /// process, plain names otherwise.
    fn identifier(&self, id: SignalId, lhs: bool, in_process: bool) -> String {
        if self.layout.all_registers.contains(&id) {
            if let Some(domain) = self.layout.domain_of(id) {
                let dname = self.ctx.resolve(domain);
                let record = if lhs && in_process { "_v" } else { "_r" };
                return format!("{dname}{record}.{}", self.ns.signal(id));
            }
        }
        if in_process && self.layout.comb_targets.contains(&id) {
            return format!("{}_v", self.ns.signal(id));
        }
        self.ns.signal(id).to_string()
    }

    /// A constant in logic form: `'0'`/`'1'` or a bit-string literal.
    fn const_logic(&self, c: &Constant) -> String {
        if c.width == 1 {
            format!("'{}'", c.value & 1)
        } else {
            let mask = if c.width >= 64 {
                u64::MAX
            } else {
                (1u64 << c.width) - 1
            };
            let bits = (c.value as u64) & mask;
            format!("\"{:0>width$b}\"", bits, width = c.width as usize)
        }
    }

    /// Whether an expression's logic form is a single `std_ulogic`
    /// element rather than a vector.
    fn is_element(&self, expr: &Expr) -> bool {
        shape(self.ctx, expr).width == 1
            && matches!(expr, Expr::Signal(_) | Expr::Slice { .. } | Expr::Const(_))
    }

    /// A `[hi downto lo]` selection over a primitive base.
    fn range_text(&self, base: &Expr, start: u32, stop: u32, lhs: bool, in_process: bool)
        -> Result<String, EmitError> {
        let id = match base {
            Expr::Signal(id) => *id,
            _ => {
                return Err(EmitError::Internal(InternalError::new(
                    "compound slice base survived lowering",
                )))
            }
        };
        let ident = self.identifier(id, lhs, in_process);
        if self.ctx.signals[id].width == 1 {
            return Ok(ident);
        }
        if stop - start == 1 {
            Ok(format!("{ident}({start})"))
        } else {
            Ok(format!("{ident}({} downto {})", stop - 1, start))
        }
    }

    /// Prints an expression as a numeric_std value whose type matches its
    /// inferred signedness and whose width is exactly its inferred width.
    fn numeric(&self, expr: &Expr, in_process: bool) -> Result<String, EmitError> {
        let result = shape(self.ctx, expr);
        match expr {
            Expr::Signal(id) => {
                let ident = self.identifier(*id, false, in_process);
                Ok(self.cast_logic(&ident, result.width, result.signed))
            }
            Expr::Const(c) => Ok(if c.signed {
                format!("to_signed({}, {})", c.value, c.width)
            } else {
                format!("to_unsigned({}, {})", c.value, c.width)
            }),
            Expr::Unary { op, operand } => match op {
                UnaryOp::Not => Ok(format!("(not {})", self.numeric(operand, in_process)?)),
                UnaryOp::Neg => Ok(format!(
                    "(-{})",
                    self.numeric_as(operand, true, result.width, in_process)?
                )),
            },
            Expr::Binary { op, lhs, rhs } => {
                self.numeric_binary(*op, lhs, rhs, result.width, result.signed, in_process)
            }
            Expr::Slice { base, start, stop } => {
                let text = self.range_text(base, *start, *stop, false, in_process)?;
                Ok(self.cast_logic(&text, result.width, result.signed))
            }
            Expr::Cat(parts) => {
                let joined = self.cat_logic(parts, in_process)?;
                Ok(format!("unsigned(std_logic_vector'(\"\" & {joined}))"))
            }
            Expr::Replicate { expr, count } => {
                let parts = vec![(**expr).clone(); *count as usize];
                let joined = self.cat_logic(&parts, in_process)?;
                Ok(format!("unsigned(std_logic_vector'(\"\" & {joined}))"))
            }
            Expr::ArrayMux { .. } => Err(EmitError::Internal(InternalError::new(
                "array multiplexer survived lowering",
            ))),
        }
    }

    /// Wraps a logic-form identifier into unsigned/signed, using the
    /// concatenation trick for single-bit elements.
    fn cast_logic(&self, text: &str, width: u32, signed: bool) -> String {
        let cast = if signed { "signed" } else { "unsigned" };
        if width == 1 {
            format!("{cast}(std_logic_vector'(\"\" & {text}))")
        } else {
            format!("{cast}({text})")
        }
    }

    fn numeric_binary(
        &self,
        op: BinaryOp,
        lhs: &Expr,
        rhs: &Expr,
        width: u32,
        signed: bool,
        in_process: bool,
    ) -> Result<String, EmitError> {
        match op {
            BinaryOp::Add | BinaryOp::Sub => {
                let token = if op == BinaryOp::Add { "+" } else { "-" };
                Ok(format!(
                    "({} {} {})",
                    self.numeric_as(lhs, signed, width, in_process)?,
                    token,
                    self.numeric_as(rhs, signed, width, in_process)?
                ))
            }
            BinaryOp::And | BinaryOp::Or | BinaryOp::Xor => {
                let token = match op {
                    BinaryOp::And => "and",
                    BinaryOp::Or => "or",
                    _ => "xor",
                };
                Ok(format!(
                    "({} {} {})",
                    self.numeric_as(lhs, signed, width, in_process)?,
                    token,
                    self.numeric_as(rhs, signed, width, in_process)?
                ))
            }
            BinaryOp::Mul => {
                let l = self.promote_operand(lhs, signed, in_process)?;
                let r = self.promote_operand(rhs, signed, in_process)?;
                Ok(format!("resize(({l} * {r}), {width})"))
            }
            BinaryOp::Eq
            | BinaryOp::Ne
            | BinaryOp::Lt
            | BinaryOp::Le
            | BinaryOp::Gt
            | BinaryOp::Ge => {
                let token = match op {
                    BinaryOp::Eq => "?=",
                    BinaryOp::Ne => "?/=",
                    BinaryOp::Lt => "?<",
                    BinaryOp::Le => "?<=",
                    BinaryOp::Gt => "?>",
                    _ => "?>=",
                };
                let mixed = shape(self.ctx, lhs).signed || shape(self.ctx, rhs).signed;
                let l = self.promote_operand(lhs, mixed, in_process)?;
                let r = self.promote_operand(rhs, mixed, in_process)?;
                Ok(format!(
                    "unsigned(std_logic_vector'(\"\" & ({l} {token} {r})))"
                ))
            }
            BinaryOp::Shl | BinaryOp::Shr => {
                let func = if op == BinaryOp::Shl {
                    "shift_left"
                } else {
                    "shift_right"
                };
                let base = self.numeric_as(lhs, signed, width, in_process)?;
                let amount = self.numeric(rhs, in_process)?;
                Ok(format!("{func}({base}, to_integer({amount}))"))
            }
        }
    }

    /// Adjusts an operand to signedness without forcing a width, for
    /// operators whose natural result is resized afterwards.
    fn promote_operand(
        &self,
        expr: &Expr,
        want_signed: bool,
        in_process: bool,
    ) -> Result<String, EmitError> {
        let s = shape(self.ctx, expr);
        if s.signed == want_signed || !want_signed {
            self.numeric(expr, in_process)
        } else {
            // Zero-extend by one bit, then reinterpret as signed.
            self.numeric_as(expr, true, s.width + 1, in_process)
        }
    }

    /// Adjusts a numeric expression to an exact signedness and width.
    fn numeric_as(
        &self,
        expr: &Expr,
        want_signed: bool,
        want_width: u32,
        in_process: bool,
    ) -> Result<String, EmitError> {
        let s = shape(self.ctx, expr);
        let text = self.numeric(expr, in_process)?;
        if s.signed == want_signed {
            if s.width == want_width {
                Ok(text)
            } else {
                Ok(format!("resize({text}, {want_width})"))
            }
        } else if !s.signed && want_signed {
            Ok(format!(
                "signed(std_logic_vector(resize({text}, {want_width})))"
            ))
        } else {
            Ok(format!(
                "unsigned(std_logic_vector(resize({text}, {want_width})))"
            ))
        }
    }

    /// Joins concatenation parts MSB-first in logic form.
    fn cat_logic(&self, parts: &[Expr], in_process: bool) -> Result<String, EmitError> {
        let rendered: Result<Vec<String>, EmitError> = parts
            .iter()
            .rev()
            .map(|p| self.logic_part(p, in_process))
            .collect();
        Ok(rendered?.join(" & "))
    }

    fn logic_part(&self, expr: &Expr, in_process: bool) -> Result<String, EmitError> {
        match expr {
            Expr::Signal(id) => Ok(self.identifier(*id, false, in_process)),
            Expr::Slice { base, start, stop } => {
                self.range_text(base, *start, *stop, false, in_process)
            }
            Expr::Const(c) => Ok(self.const_logic(c)),
            _ => Ok(format!(
                "std_logic_vector({})",
                self.numeric(expr, in_process)?
            )),
        }
    }

    /// Prints an expression in boolean position (if conditions).
    fn bool_expr(&self, expr: &Expr, in_process: bool) -> Result<String, EmitError> {
        if let Expr::Binary { op, lhs, rhs } = expr {
            if op.is_comparison() {
                let token = match op {
                    BinaryOp::Eq => "=",
                    BinaryOp::Ne => "/=",
                    BinaryOp::Lt => "<",
                    BinaryOp::Le => "<=",
                    BinaryOp::Gt => ">",
                    _ => ">=",
                };
                let mixed = shape(self.ctx, lhs).signed || shape(self.ctx, rhs).signed;
                let l = self.promote_operand(lhs, mixed, in_process)?;
                let r = self.promote_operand(rhs, mixed, in_process)?;
                return Ok(format!("({l} {token} {r})"));
            }
        }
        let s = shape(self.ctx, expr);
        if s.width == 1 && self.is_element(expr) {
            let text = self.logic_part(expr, in_process)?;
            return Ok(format!("({text} = '1')"));
        }
        Ok(format!("({} /= 0)", self.numeric(expr, in_process)?))
    }

    /// The right-hand side of an assignment, sized to the target width.
    fn rhs_text(&self, value: &Expr, width: u32, in_process: bool) -> Result<String, EmitError> {
        if width == 1 {
            if let Expr::Const(c) = value {
                return Ok(format!("'{}'", c.value & 1));
            }
            if self.is_element(value) {
                return self.logic_part(value, in_process);
            }
            if let Expr::Binary { op, .. } = value {
                if op.is_comparison() {
                    return Ok(format!(
                        "'1' when {} else '0'",
                        self.bool_expr(value, in_process)?
                    ));
                }
            }
            return Ok(format!(
                "std_logic_vector({})(0)",
                self.numeric(value, in_process)?
            ));
        }
        let s = shape(self.ctx, value);
        match value {
            Expr::Signal(_) | Expr::Slice { .. } if s.width == width => {
                self.logic_part(value, in_process)
            }
            Expr::Const(c) if c.width == width => Ok(self.const_logic(c)),
            _ => Ok(format!(
                "std_logic_vector(resize({}, {width}))",
                self.numeric(value, in_process)?
            )),
        }
    }

    /// One assignment inside the unclocked process (`:=` semantics) or as
    /// a concurrent statement (`<=`).
    fn assign_text(
        &self,
        target: &Expr,
        value: &Expr,
        indent: usize,
        in_process: bool,
    ) -> Result<String, EmitError> {
        let ind = IND.repeat(indent);
        let sign = if in_process { ":=" } else { "<=" };
        match target {
            Expr::Signal(id) => {
                let width = self.ctx.signals[*id].width;
                Ok(format!(
                    "{ind}{} {sign} {};\n",
                    self.identifier(*id, true, in_process),
                    self.rhs_text(value, width, in_process)?
                ))
            }
            Expr::Slice { base, start, stop } => {
                let text = self.range_text(base, *start, *stop, true, in_process)?;
                Ok(format!(
                    "{ind}{text} {sign} {};\n",
                    self.rhs_text(value, stop - start, in_process)?
                ))
            }
            Expr::Cat(parts) => {
                // Split a concatenated target into per-part assignments of
                // the matching value bits, least-significant part first.
                let mut s = String::new();
                let mut offset = 0u32;
                let value_numeric = self.numeric(value, in_process)?;
                for part in parts {
                    let width = shape(self.ctx, part).width;
                    let sliced = format!(
                        "resize(shift_right({value_numeric}, {offset}), {width})"
                    );
                    let rhs = if width == 1 {
                        format!("std_logic_vector({sliced})(0)")
                    } else {
                        format!("std_logic_vector({sliced})")
                    };
                    let lhs = match part {
                        Expr::Signal(id) => self.identifier(*id, true, in_process),
                        Expr::Slice { base, start, stop } => {
                            self.range_text(base, *start, *stop, true, in_process)?
                        }
                        _ => {
                            return Err(EmitError::Internal(InternalError::new(
                                "assignment target is not addressable",
                            )))
                        }
                    };
                    s.push_str(&format!("{ind}{lhs} {sign} {rhs};\n"));
                    offset += width;
                }
                Ok(s)
            }
            _ => Err(EmitError::Internal(InternalError::new(
                "assignment target is not addressable",
            ))),
        }
    }

    fn stmt(&self, stmt: &Statement, indent: usize) -> Result<String, EmitError> {
        let ind = IND.repeat(indent);
        match stmt {
            Statement::Assign { target, value } => self.assign_text(target, value, indent, true),
            Statement::If {
                cond,
                then_body,
                else_body,
            } => {
                let mut s = format!("{ind}if {} then\n", self.bool_expr(cond, true)?);
                for inner in then_body {
                    s.push_str(&self.stmt(inner, indent + 1)?);
                }
                if !else_body.is_empty() {
                    s.push_str(&format!("{ind}else\n"));
                    for inner in else_body {
                        s.push_str(&self.stmt(inner, indent + 1)?);
                    }
                }
                s.push_str(&format!("{ind}end if;\n"));
                Ok(s)
            }
            Statement::Case {
                subject,
                arms,
                default,
            } => {
                let width = shape(self.ctx, subject).width;
                let element = self.is_element(subject);
                let subject_text = if element {
                    self.logic_part(subject, true)?
                } else if width == 1 {
                    format!("std_logic_vector({})", self.numeric(subject, true)?)
                } else {
                    self.logic_part(subject, true)?
                };
                let mut s = format!("{ind}case {subject_text} is\n");
                for arm in arms {
                    let patterns: Vec<String> = arm
                        .patterns
                        .iter()
                        .map(|p| {
                            if element {
                                format!("'{}'", p.value & 1)
                            } else if width == 1 {
                                format!("\"{}\"", p.value & 1)
                            } else {
                                self.const_logic(&Constant::new(p.value, width, false))
                            }
                        })
                        .collect();
                    s.push_str(&format!("{ind}{IND}when {} =>\n", patterns.join(" | ")));
                    if arm.body.is_empty() {
                        s.push_str(&format!("{ind}{IND}{IND}null;\n"));
                    }
                    for inner in &arm.body {
                        s.push_str(&self.stmt(inner, indent + 2)?);
                    }
                }
                s.push_str(&format!("{ind}{IND}when others =>\n"));
                if default.is_empty() {
                    s.push_str(&format!("{ind}{IND}{IND}null;\n"));
                }
                for inner in default {
                    s.push_str(&self.stmt(inner, indent + 2)?);
                }
                s.push_str(&format!("{ind}end case;\n"));
                Ok(s)
            }
        }
    }

    fn index_text(&self, text: &str, width: u32) -> String {
        if width == 1 {
            format!("to_integer(unsigned(std_logic_vector'(\"\" & {text})))")
        } else {
            format!("to_integer(unsigned({text}))")
        }
    }

    fn instance_component(&self, inst: &Instance) -> Result<String, EmitError> {
        let mut s = format!("{IND}component {}\n", inst.of);
        if !inst.params.is_empty() {
            s.push_str(&format!("{IND}{IND}generic(\n"));
            let lines: Vec<String> = inst
                .params
                .iter()
                .map(|p| {
                    let ty = match &p.value {
                        ParamValue::Const(_) => "integer",
                        ParamValue::Real(_) => "real",
                        ParamValue::Str(_) | ParamValue::Preformatted(_) => "string",
                    };
                    format!("{IND}{IND}{IND}{} : {}", p.name, ty)
                })
                .collect();
            s.push_str(&lines.join(";\n"));
            s.push_str(&format!("\n{IND}{IND});\n"));
        }
        if !inst.ports.is_empty() {
            s.push_str(&format!("{IND}{IND}port(\n"));
            let lines: Vec<String> = inst
                .ports
                .iter()
                .map(|p| {
                    let dir = match p.dir {
                        IoDir::Input => "in",
                        IoDir::Output => "out",
                        IoDir::InOut => "inout",
                    };
                    let width = shape(self.ctx, &p.expr).width;
                    format!("{IND}{IND}{IND}{} : {} {}", p.name, dir, self.sig_type(width))
                })
                .collect();
            s.push_str(&lines.join(";\n"));
            s.push_str(&format!("\n{IND}{IND});\n"));
        }
        s.push_str(&format!("{IND}end component;\n"));
        Ok(s)
    }

    fn instance_body(&self, id: SpecialId, inst: &Instance) -> Result<String, EmitError> {
        let mut s = format!("{IND}{} : {}\n", self.ns.special(id), inst.of);
        if !inst.params.is_empty() {
            s.push_str(&format!("{IND}{IND}generic map(\n"));
            let lines: Vec<String> = inst
                .params
                .iter()
                .map(|p| {
                    let value = match &p.value {
                        ParamValue::Const(c) => format!("{}", c.value),
                        ParamValue::Real(f) => format!("{f}"),
                        ParamValue::Str(text) => format!("\"{text}\""),
                        ParamValue::Preformatted(text) => text.clone(),
                    };
                    format!("{IND}{IND}{IND}{} => {}", p.name, value)
                })
                .collect();
            s.push_str(&lines.join(",\n"));
            s.push_str(&format!("\n{IND}{IND})\n"));
        }
        if !inst.ports.is_empty() {
            s.push_str(&format!("{IND}{IND}port map(\n"));
            let lines: Result<Vec<String>, EmitError> = inst
                .ports
                .iter()
                .map(|p| {
                    let width = shape(self.ctx, &p.expr).width;
                    let actual = self.rhs_text(&p.expr, width, false)?;
                    Ok(format!("{IND}{IND}{IND}{} => {}", p.name, actual))
                })
                .collect();
            s.push_str(&lines?.join(",\n"));
            s.push_str(&format!("\n{IND}{IND});\n\n"));
        } else {
            s.push_str(&format!("{IND}{IND};\n\n"));
        }
        Ok(s)
    }

    fn tristate(&self, ts: &Tristate) -> Result<String, EmitError> {
        let width = self.ctx.signals[ts.target].width;
        let float = if width == 1 {
            "'Z'".to_string()
        } else {
            "(others => 'Z')".to_string()
        };
        let mut s = format!(
            "{IND}{} <= {} when {} else {};\n",
            self.ns.signal(ts.target),
            self.rhs_text(&ts.o, width, false)?,
            self.bool_expr(&ts.oe, false)?,
            float
        );
        if let Some(i) = ts.i {
            s.push_str(&format!(
                "{IND}{} <= {};\n",
                self.ns.signal(i),
                self.ns.signal(ts.target)
            ));
        }
        s.push('\n');
        Ok(s)
    }

    fn memory(&self, id: SpecialId, mem: &Memory) -> Result<(String, String), EmitError> {
        let mem_name = self.ns.special(id).to_string();
        let mut decls = format!(
            "{IND}type {mem_name}_t is array(0 to {}) of std_logic_vector({} downto 0);\n",
            mem.depth - 1,
            mem.width - 1
        );
        match &mem.init {
            Some(init) => {
                let words: Vec<String> = init
                    .iter()
                    .map(|w| {
                        let c = Constant::new(*w as i64, mem.width, false);
                        self.const_logic(&c)
                    })
                    .collect();
                let aggregate = if words.len() == 1 {
                    format!("(0 => {})", words[0])
                } else {
                    format!("({})", words.join(", "))
                };
                decls.push_str(&format!(
                    "{IND}signal {mem_name} : {mem_name}_t := {aggregate};\n"
                ));
            }
            None => {
                decls.push_str(&format!("{IND}signal {mem_name} : {mem_name}_t;\n"));
            }
        }
        for (index, port) in mem.ports.iter().enumerate() {
            if port.async_read {
                continue;
            }
            let aux = self
                .ns
                .memory_port_reg(id, index as u32)
                .ok_or_else(|| InternalError::new("memory port register missing from namespace"))?;
            let width = if port.mode == MemoryPortMode::WriteFirst && port.we.is_some() {
                self.ctx.signals[port.adr].width
            } else {
                mem.width
            };
            decls.push_str(&format!("{IND}signal {aux} : {};\n", self.sig_type(width)));
        }

        let mut body = String::new();
        for (index, port) in mem.ports.iter().enumerate() {
            let cd = self.fragment.domain(port.clock_domain).ok_or_else(|| {
                InternalError::new("memory port bound to an unresolved clock domain")
            })?;
            let clk = self.ns.signal(cd.clk);
            let adr_ref = self.identifier(port.adr, false, false);
            let adr_index = self.index_text(&adr_ref, self.ctx.signals[port.adr].width);
            body.push_str(&format!(
                "{IND}{mem_name}_port_{index} : process({clk})\n{IND}begin\n"
            ));
            body.push_str(&format!("{IND}{IND}if rising_edge({clk}) then\n"));
            if let (Some(we), Some(dat_w)) = (port.we, port.dat_w) {
                let we_ref = self.identifier(we, false, false);
                let dat_w_ref = self.identifier(dat_w, false, false);
                if port.we_granularity > 0 {
                    let granules = mem.width / port.we_granularity;
                    for i in 0..granules {
                        let lo = i * port.we_granularity;
                        let hi = (i + 1) * port.we_granularity - 1;
                        body.push_str(&format!(
                            "{IND}{IND}{IND}if {we_ref}({i}) = '1' then\n"
                        ));
                        body.push_str(&format!(
                            "{IND}{IND}{IND}{IND}{mem_name}({adr_index})({hi} downto {lo}) <= {dat_w_ref}({hi} downto {lo});\n"
                        ));
                        body.push_str(&format!("{IND}{IND}{IND}end if;\n"));
                    }
                } else {
                    body.push_str(&format!("{IND}{IND}{IND}if {we_ref} = '1' then\n"));
                    body.push_str(&format!(
                        "{IND}{IND}{IND}{IND}{mem_name}({adr_index}) <= {dat_w_ref};\n"
                    ));
                    body.push_str(&format!("{IND}{IND}{IND}end if;\n"));
                }
            }
            if !port.async_read {
                let aux = self.ns.memory_port_reg(id, index as u32).ok_or_else(|| {
                    InternalError::new("memory port register missing from namespace")
                })?;
                let mut read = if port.mode == MemoryPortMode::WriteFirst && port.we.is_some() {
                    format!("{aux} <= {adr_ref};\n")
                } else {
                    format!("{aux} <= {mem_name}({adr_index});\n")
                };
                if port.mode == MemoryPortMode::NoChange {
                    if let Some(we) = port.we {
                        let we_ref = self.identifier(we, false, false);
                        let guard = if self.ctx.signals[we].width == 1 {
                            format!("{we_ref} = '0'")
                        } else {
                            format!("unsigned({we_ref}) = 0")
                        };
                        read = format!("if {guard} then\n{IND}{IND}{IND}{IND}{read}{IND}{IND}{IND}end if;\n");
                    }
                }
                match port.re {
                    None => {
                        body.push_str(&format!("{IND}{IND}{IND}{read}"));
                    }
                    Some(re) => {
                        let re_ref = self.identifier(re, false, false);
                        body.push_str(&format!("{IND}{IND}{IND}if {re_ref} = '1' then\n"));
                        body.push_str(&format!(
                            "{IND}{IND}{IND}{IND}{}",
                            read.replace(
                                &format!("\n{IND}{IND}{IND}{IND}"),
                                &format!("\n{IND}{IND}{IND}{IND}{IND}")
                            )
                        ));
                        body.push_str(&format!("{IND}{IND}{IND}end if;\n"));
                    }
                }
            }
            body.push_str(&format!("{IND}{IND}end if;\n{IND}end process;\n\n"));
        }

        for (index, port) in mem.ports.iter().enumerate() {
            let dat_r = self.ns.signal(port.dat_r);
            let adr_ref = self.identifier(port.adr, false, false);
            let adr_index = self.index_text(&adr_ref, self.ctx.signals[port.adr].width);
            if port.async_read {
                body.push_str(&format!(
                    "{IND}{dat_r} <= {mem_name}({adr_index});\n"
                ));
            } else {
                let aux = self.ns.memory_port_reg(id, index as u32).ok_or_else(|| {
                    InternalError::new("memory port register missing from namespace")
                })?;
                if port.mode == MemoryPortMode::WriteFirst && port.we.is_some() {
                    let aux_index = self.index_text(aux, self.ctx.signals[port.adr].width);
                    body.push_str(&format!(
                        "{IND}{dat_r} <= {mem_name}({aux_index});\n"
                    ));
                } else {
                    body.push_str(&format!("{IND}{dat_r} <= {aux};\n"));
                }
            }
        }
        body.push('\n');
        Ok((decls, body))
    }
}
