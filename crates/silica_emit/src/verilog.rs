//! The Verilog backend: a flat always/assign style module.
//!
//! Combinational statement groups that reduce to a single whole-signal
//! assignment become `assign` statements; every other group becomes an
//! `always @(*)` block that first drives each target to its default
//! (reset value or zero) and then applies the statements in program
//! order. Each clock domain gets one `always @(posedge clk)` block.
//!
//! Signedness discipline: signals declare `signed`, and whenever an
//! operator's inferred shape is signed, any unsigned operand is promoted
//! as `$signed({1'd0, x})`, the textual image of the one-bit promotion
//! the inference rules apply to mixed-sign operands.

use crate::backend::{Backend, Layout, PortDir};
use crate::error::EmitError;
use crate::namespace::Namespace;
use crate::output::ConvOutput;
use silica_common::InternalError;
use silica_ir::analysis::{fragment_signals, group_by_targets};
use silica_ir::{
    shape, BinaryOp, Constant, Context, Expr, Fragment, Instance, Memory, MemoryPortMode,
    ParamValue, SignalId, Special, SpecialId, SpecialKind, Statement, Tristate, UnaryOp,
};
use std::collections::BTreeSet;

/// Verilog-2005 reserved words.
const RESERVED_KEYWORDS: &[&str] = &[
    "always", "and", "assign", "automatic", "begin", "buf", "bufif0", "bufif1", "case", "casex",
    "casez", "cell", "cmos", "config", "deassign", "default", "defparam", "design", "disable",
    "edge", "else", "end", "endcase", "endconfig", "endfunction", "endgenerate", "endmodule",
    "endprimitive", "endspecify", "endtable", "endtask", "event", "for", "force", "forever",
    "fork", "function", "generate", "genvar", "highz0", "highz1", "if", "ifnone", "incdir",
    "include", "initial", "inout", "input", "instance", "integer", "join", "large", "liblist",
    "library", "localparam", "macromodule", "medium", "module", "nand", "negedge", "nmos", "nor",
    "noshowcancelled", "not", "notif0", "notif1", "or", "output", "parameter", "pmos", "posedge",
    "primitive", "pull0", "pull1", "pulldown", "pullup", "pulsestyle_onevent",
    "pulsestyle_ondetect", "rcmos", "real", "realtime", "reg", "release", "repeat", "rnmos",
    "rpmos", "rtran", "rtranif0", "rtranif1", "scalared", "showcancelled", "signed", "small",
    "specify", "specparam", "strong0", "strong1", "supply0", "supply1", "table", "task", "time",
    "tran", "tranif0", "tranif1", "tri", "tri0", "tri1", "triand", "trior", "trireg", "unsigned",
    "use", "vectored", "wait", "wand", "weak0", "weak1", "while", "wire", "wor", "xnor", "xor",
];

/// The Verilog rendering backend.
pub struct VerilogBackend;

impl Backend for VerilogBackend {
    fn reserved_keywords(&self) -> &'static [&'static str] {
        RESERVED_KEYWORDS
    }

    fn case_sensitive(&self) -> bool {
        true
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
        let groups = group_by_targets(&fragment.comb);

        // Targets of multi-statement groups are driven from always blocks
        // and must be declared reg.
        let mut always_targets: BTreeSet<SignalId> = BTreeSet::new();
        for (targets, stmts) in &groups {
            if !is_simple_assign(stmts) {
                always_targets.extend(targets.iter().copied());
            }
        }

        let mut s = String::new();
        s.push_str("/* Machine-generated using silica */\n");
        s.push_str(&format!("module {name}(\n"));
        let port_lines: Vec<String> = layout
            .ports
            .iter()
            .map(|&(id, dir)| {
                let dir_kw = match dir {
                    PortDir::Input => "input",
                    PortDir::Output => "output",
                    PortDir::InOut => "inout",
                };
                let reg = dir == PortDir::Output
                    && (layout.all_registers.contains(&id) || always_targets.contains(&id));
                format!(
                    "\t{}{} {}{}",
                    dir_kw,
                    if reg { " reg" } else { "" },
                    decl_type(ctx, id),
                    ns.signal(id)
                )
            })
            .collect();
        s.push_str(&port_lines.join(",\n"));
        s.push_str("\n);\n\n");

        // Internal declarations in creation order.
        let mut internal = fragment_signals(ctx, fragment);
        for &(id, _) in &layout.ports {
            internal.remove(&id);
        }
        for id in internal {
            if layout.all_registers.contains(&id) {
                let sig = &ctx.signals[id];
                let reset = Constant::new(sig.reset.unwrap_or(0), sig.width, sig.signed);
                s.push_str(&format!(
                    "reg {}{} = {};\n",
                    decl_type(ctx, id),
                    ns.signal(id),
                    literal(&reset)
                ));
            } else if always_targets.contains(&id) {
                s.push_str(&format!("reg {}{};\n", decl_type(ctx, id), ns.signal(id)));
            } else {
                s.push_str(&format!("wire {}{};\n", decl_type(ctx, id), ns.signal(id)));
            }
        }
        s.push('\n');

        // Combinational statements.
        for (targets, stmts) in &groups {
            if let Some((target, value)) = simple_assign(stmts) {
                s.push_str(&format!(
                    "assign {} = {};\n",
                    ns.signal(target),
                    print_expr(ctx, &ns, value)?
                ));
            } else {
                s.push_str("always @(*) begin\n");
                for &target in targets {
                    let sig = &ctx.signals[target];
                    let default = Constant::new(sig.reset.unwrap_or(0), sig.width, sig.signed);
                    s.push_str(&format!("\t{} <= {};\n", ns.signal(target), literal(&default)));
                }
                for stmt in stmts {
                    s.push_str(&print_stmt(ctx, &ns, stmt, 1)?);
                }
                s.push_str("end\n");
            }
        }
        if !groups.is_empty() {
            s.push('\n');
        }

        // Synchronous statements, one block per clock domain.
        for (&domain, stmts) in &fragment.sync {
            let cd = fragment.domain(domain).ok_or_else(|| {
                InternalError::new("synchronous statements on an unresolved clock domain")
            })?;
            s.push_str(&format!("always @(posedge {}) begin\n", ns.signal(cd.clk)));
            for stmt in stmts {
                s.push_str(&print_stmt(ctx, &ns, stmt, 1)?);
            }
            s.push_str("end\n\n");
        }

        // Specials, in creation order.
        for &id in &fragment.specials {
            match &ctx.specials[id] {
                Special::Instance(inst) => s.push_str(&emit_instance(ctx, &ns, id, inst)?),
                Special::Memory(mem) => {
                    s.push_str(&emit_memory(ctx, &ns, fragment, id, mem, out)?)
                }
                Special::Tristate(ts) => s.push_str(&emit_tristate(ctx, &ns, ts)?),
                Special::Directive(dir) => {
                    let mut formatted = dir.template.clone();
                    for (key, sig) in &dir.signals {
                        formatted = formatted.replace(&format!("{{{key}}}"), ns.signal(*sig));
                    }
                    s.push_str(&format!("// synthesis {formatted}\n\n"));
                }
            }
        }

        s.push_str("endmodule\n");
        out.main_source = s;
        Ok(())
    }
}

/// The `signed [w-1:0] ` declaration prefix for a signal, with trailing
/// space; empty range for one-bit signals.
fn decl_type(ctx: &Context, id: SignalId) -> String {
    let sig = &ctx.signals[id];
    let mut s = String::new();
    if sig.signed {
        s.push_str("signed ");
    }
    if sig.width > 1 {
        s.push_str(&format!("[{}:0] ", sig.width - 1));
    }
    s
}

fn is_simple_assign(stmts: &[Statement]) -> bool {
    simple_assign(stmts).is_some()
}

/// A group consisting of exactly one whole-signal assignment renders as
/// a continuous `assign`.
fn simple_assign(stmts: &[Statement]) -> Option<(SignalId, &Expr)> {
    match stmts {
        [Statement::Assign {
            target: Expr::Signal(id),
            value,
        }] => Some((*id, value)),
        _ => None,
    }
}

/// Formats a sized literal.
fn literal(c: &Constant) -> String {
    if c.signed {
        let v = c.value as i128;
        if v < 0 {
            format!("-{}'sd{}", c.width, -v)
        } else {
            format!("{}'sd{}", c.width, v)
        }
    } else {
        format!("{}'d{}", c.width, c.value)
    }
}

fn binary_token(op: BinaryOp) -> &'static str {
    match op {
        BinaryOp::Add => "+",
        BinaryOp::Sub => "-",
        BinaryOp::Mul => "*",
        BinaryOp::And => "&",
        BinaryOp::Or => "|",
        BinaryOp::Xor => "^",
        BinaryOp::Eq => "==",
        BinaryOp::Ne => "!=",
        BinaryOp::Lt => "<",
        BinaryOp::Le => "<=",
        BinaryOp::Gt => ">",
        BinaryOp::Ge => ">=",
        BinaryOp::Shl => "<<<",
        BinaryOp::Shr => ">>>",
    }
}

/// Prints an expression whose textual signedness matches its inferred
/// shape, wrapping sub-expressions as needed.
pub(crate) fn print_expr(ctx: &Context, ns: &Namespace, expr: &Expr) -> Result<String, EmitError> {
    match expr {
        Expr::Signal(id) => Ok(ns.signal(*id).to_string()),
        Expr::Const(c) => Ok(literal(c)),
        Expr::Unary { op, operand } => match op {
            UnaryOp::Not => Ok(format!("(~{})", print_expr(ctx, ns, operand)?)),
            UnaryOp::Neg => Ok(format!("(-{})", print_promoted(ctx, ns, operand, true)?)),
        },
        Expr::Binary { op, lhs, rhs } => {
            let token = binary_token(*op);
            match op {
                BinaryOp::Shl | BinaryOp::Shr => Ok(format!(
                    "({} {} {})",
                    print_expr(ctx, ns, lhs)?,
                    token,
                    print_expr(ctx, ns, rhs)?
                )),
                _ => {
                    let want_signed = shape(ctx, lhs).signed || shape(ctx, rhs).signed;
                    Ok(format!(
                        "({} {} {})",
                        print_promoted(ctx, ns, lhs, want_signed)?,
                        token,
                        print_promoted(ctx, ns, rhs, want_signed)?
                    ))
                }
            }
        }
        Expr::Slice { base, start, stop } => {
            let text = print_range(ctx, ns, base, *start, *stop)?;
            // Part-selects are unsigned in Verilog; restore the inherited
            // signedness by reinterpreting the bits.
            if shape(ctx, expr).signed {
                Ok(format!("$signed({text})"))
            } else {
                Ok(text)
            }
        }
        Expr::Cat(parts) => {
            let printed: Result<Vec<String>, EmitError> = parts
                .iter()
                .rev()
                .map(|p| print_expr(ctx, ns, p))
                .collect();
            Ok(format!("{{{}}}", printed?.join(", ")))
        }
        Expr::Replicate { expr, count } => Ok(format!(
            "{{{}{{{}}}}}",
            count,
            print_expr(ctx, ns, expr)?
        )),
        Expr::ArrayMux { .. } => Err(EmitError::Internal(InternalError::new(
            "array multiplexer survived lowering",
        ))),
    }
}

/// Prints an operand, zero-extending it into signed form when the
/// surrounding operator is signed and the operand is not.
fn print_promoted(
    ctx: &Context,
    ns: &Namespace,
    expr: &Expr,
    want_signed: bool,
) -> Result<String, EmitError> {
    let text = print_expr(ctx, ns, expr)?;
    if want_signed && !shape(ctx, expr).signed {
        Ok(format!("$signed({{1'd0, {text}}})"))
    } else {
        Ok(text)
    }
}

/// Prints a `[hi:lo]` or `[bit]` select over a primitive base.
fn print_range(
    ctx: &Context,
    ns: &Namespace,
    base: &Expr,
    start: u32,
    stop: u32,
) -> Result<String, EmitError> {
    let id = match base {
        Expr::Signal(id) => *id,
        _ => {
            return Err(EmitError::Internal(InternalError::new(
                "compound slice base survived lowering",
            )))
        }
    };
    let name = ns.signal(id);
    if stop - start == 1 {
        Ok(format!("{name}[{start}]"))
    } else {
        Ok(format!("{name}[{}:{}]", stop - 1, start))
    }
}

/// Prints an assignment target (never sign-wrapped).
fn print_target(ctx: &Context, ns: &Namespace, target: &Expr) -> Result<String, EmitError> {
    match target {
        Expr::Signal(id) => Ok(ns.signal(*id).to_string()),
        Expr::Slice { base, start, stop } => print_range(ctx, ns, base, *start, *stop),
        Expr::Cat(parts) => {
            let printed: Result<Vec<String>, EmitError> = parts
                .iter()
                .rev()
                .map(|p| print_target(ctx, ns, p))
                .collect();
            Ok(format!("{{{}}}", printed?.join(", ")))
        }
        _ => Err(EmitError::Internal(InternalError::new(
            "assignment target is not addressable",
        ))),
    }
}

fn print_stmt(
    ctx: &Context,
    ns: &Namespace,
    stmt: &Statement,
    indent: usize,
) -> Result<String, EmitError> {
    let ind = "\t".repeat(indent);
    match stmt {
        Statement::Assign { target, value } => Ok(format!(
            "{ind}{} <= {};\n",
            print_target(ctx, ns, target)?,
            print_expr(ctx, ns, value)?
        )),
        Statement::If {
            cond,
            then_body,
            else_body,
        } => {
            let mut s = format!("{ind}if ({}) begin\n", print_expr(ctx, ns, cond)?);
            for inner in then_body {
                s.push_str(&print_stmt(ctx, ns, inner, indent + 1)?);
            }
            if else_body.is_empty() {
                s.push_str(&format!("{ind}end\n"));
            } else {
                s.push_str(&format!("{ind}end else begin\n"));
                for inner in else_body {
                    s.push_str(&print_stmt(ctx, ns, inner, indent + 1)?);
                }
                s.push_str(&format!("{ind}end\n"));
            }
            Ok(s)
        }
        Statement::Case {
            subject,
            arms,
            default,
        } => {
            let width = shape(ctx, subject).width;
            let mut s = format!("{ind}case ({})\n", print_expr(ctx, ns, subject)?);
            for arm in arms {
                let patterns: Vec<String> = arm
                    .patterns
                    .iter()
                    .map(|p| format!("{}'d{}", width, p.value))
                    .collect();
                s.push_str(&format!("{ind}\t{}: begin\n", patterns.join(", ")));
                for inner in &arm.body {
                    s.push_str(&print_stmt(ctx, ns, inner, indent + 2)?);
                }
                s.push_str(&format!("{ind}\tend\n"));
            }
            s.push_str(&format!("{ind}\tdefault: begin\n"));
            for inner in default {
                s.push_str(&print_stmt(ctx, ns, inner, indent + 2)?);
            }
            s.push_str(&format!("{ind}\tend\n"));
            s.push_str(&format!("{ind}endcase\n"));
            Ok(s)
        }
    }
}

fn emit_instance(
    ctx: &Context,
    ns: &Namespace,
    id: SpecialId,
    inst: &Instance,
) -> Result<String, EmitError> {
    let mut s = format!("{} ", inst.of);
    if !inst.params.is_empty() {
        s.push_str("#(\n");
        let params: Vec<String> = inst
            .params
            .iter()
            .map(|p| {
                let value = match &p.value {
                    ParamValue::Const(c) => literal(c),
                    ParamValue::Real(f) => format!("{f}"),
                    ParamValue::Str(text) => format!("\"{text}\""),
                    ParamValue::Preformatted(text) => text.clone(),
                };
                format!("\t.{}({})", p.name, value)
            })
            .collect();
        s.push_str(&params.join(",\n"));
        s.push_str("\n) ");
    }
    s.push_str(ns.special(id));
    s.push_str("(\n");
    let ports: Result<Vec<String>, EmitError> = inst
        .ports
        .iter()
        .map(|p| Ok(format!("\t.{}({})", p.name, print_expr(ctx, ns, &p.expr)?)))
        .collect();
    s.push_str(&ports?.join(",\n"));
    s.push('\n');
    match &inst.synthesis_directive {
        Some(directive) => s.push_str(&format!(")/* synthesis {directive} */;\n\n")),
        None => s.push_str(");\n\n"),
    }
    Ok(s)
}

fn emit_tristate(ctx: &Context, ns: &Namespace, ts: &Tristate) -> Result<String, EmitError> {
    let width = ctx.signals[ts.target].width;
    let mut s = format!(
        "assign {} = {} ? {} : {}'bz;\n",
        ns.signal(ts.target),
        print_expr(ctx, ns, &ts.oe)?,
        print_expr(ctx, ns, &ts.o)?,
        width
    );
    if let Some(i) = ts.i {
        s.push_str(&format!(
            "assign {} = {};\n",
            ns.signal(i),
            ns.signal(ts.target)
        ));
    }
    s.push('\n');
    Ok(s)
}

fn emit_memory(
    ctx: &Context,
    ns: &Namespace,
    fragment: &Fragment,
    id: SpecialId,
    mem: &Memory,
    out: &mut ConvOutput,
) -> Result<String, EmitError> {
    let mem_name = ns.special(id).to_string();
    let mut s = format!(
        "reg [{}:0] {}[0:{}];\n",
        mem.width - 1,
        mem_name,
        mem.depth - 1
    );

    // Auxiliary registers for the synchronous read paths.
    for (index, port) in mem.ports.iter().enumerate() {
        if port.async_read {
            continue;
        }
        let aux = ns.memory_port_reg(id, index as u32).ok_or_else(|| {
            InternalError::new("memory port register missing from namespace")
        })?;
        if port.mode == MemoryPortMode::WriteFirst && port.we.is_some() {
            let adr_bits = ctx.signals[port.adr].width;
            s.push_str(&format!("reg [{}:0] {};\n", adr_bits - 1, aux));
        } else {
            s.push_str(&format!("reg [{}:0] {};\n", mem.width - 1, aux));
        }
    }

    for (index, port) in mem.ports.iter().enumerate() {
        let cd = fragment.domain(port.clock_domain).ok_or_else(|| {
            InternalError::new("memory port bound to an unresolved clock domain")
        })?;
        s.push_str(&format!("always @(posedge {}) begin\n", ns.signal(cd.clk)));
        if let (Some(we), Some(dat_w)) = (port.we, port.dat_w) {
            if port.we_granularity > 0 {
                let granules = mem.width / port.we_granularity;
                for i in 0..granules {
                    let lo = i * port.we_granularity;
                    let hi = (i + 1) * port.we_granularity - 1;
                    s.push_str(&format!("\tif ({}[{}])\n", ns.signal(we), i));
                    s.push_str(&format!(
                        "\t\t{}[{}][{}:{}] <= {}[{}:{}];\n",
                        mem_name,
                        ns.signal(port.adr),
                        hi,
                        lo,
                        ns.signal(dat_w),
                        hi,
                        lo
                    ));
                }
            } else {
                s.push_str(&format!("\tif ({})\n", ns.signal(we)));
                s.push_str(&format!(
                    "\t\t{}[{}] <= {};\n",
                    mem_name,
                    ns.signal(port.adr),
                    ns.signal(dat_w)
                ));
            }
        }
        if !port.async_read {
            let aux = ns.memory_port_reg(id, index as u32).ok_or_else(|| {
                InternalError::new("memory port register missing from namespace")
            })?;
            let read = if port.mode == MemoryPortMode::WriteFirst && port.we.is_some() {
                format!("{} <= {};\n", aux, ns.signal(port.adr))
            } else {
                let base = format!("{} <= {}[{}];\n", aux, mem_name, ns.signal(port.adr));
                match (port.mode, port.we) {
                    (MemoryPortMode::NoChange, Some(we)) => {
                        format!("if (!{})\n\t\t{}", ns.signal(we), base)
                    }
                    _ => base,
                }
            };
            match port.re {
                None => {
                    s.push('\t');
                    s.push_str(&read);
                }
                Some(re) => {
                    s.push_str(&format!("\tif ({})\n", ns.signal(re)));
                    s.push_str("\t\t");
                    s.push_str(&read.replace("\n\t\t", "\n\t\t\t"));
                }
            }
        }
        s.push_str("end\n\n");
    }

    for (index, port) in mem.ports.iter().enumerate() {
        if port.async_read {
            s.push_str(&format!(
                "assign {} = {}[{}];\n",
                ns.signal(port.dat_r),
                mem_name,
                ns.signal(port.adr)
            ));
        } else {
            let aux = ns.memory_port_reg(id, index as u32).ok_or_else(|| {
                InternalError::new("memory port register missing from namespace")
            })?;
            if port.mode == MemoryPortMode::WriteFirst && port.we.is_some() {
                s.push_str(&format!(
                    "assign {} = {}[{}];\n",
                    ns.signal(port.dat_r),
                    mem_name,
                    aux
                ));
            } else {
                s.push_str(&format!("assign {} = {};\n", ns.signal(port.dat_r), aux));
            }
        }
    }
    s.push('\n');

    if let Some(init) = &mem.init {
        let mut contents = String::new();
        for word in init {
            contents.push_str(&format!("{word:x}\n"));
        }
        let filename = out.add_data_file(&format!("{mem_name}.init"), contents);
        s.push_str("initial begin\n");
        s.push_str(&format!("\t$readmemh(\"{filename}\", {mem_name});\n"));
        s.push_str("end\n\n");
    }

    Ok(s)
}

#[cfg(test)]
mod tests {
    use super::*;
    use silica_ir::stmt::assign;
    use silica_ir::SignalOpts;

    fn ns_for(ctx: &Context, ids: &[SignalId]) -> Namespace {
        let ios: BTreeSet<SignalId> = ids.iter().copied().collect();
        Namespace::build(ctx, &Fragment::new(), &ios, RESERVED_KEYWORDS, true)
    }

    #[test]
    fn literal_forms() {
        assert_eq!(literal(&Constant::new(5, 3, false)), "3'd5");
        assert_eq!(literal(&Constant::new(3, 4, true)), "4'sd3");
        assert_eq!(literal(&Constant::new(-2, 4, true)), "-4'sd2");
    }

    #[test]
    fn mixed_sign_add_promotes_unsigned_operand() {
        let mut ctx = Context::new();
        let a = ctx.signal("a", 4);
        let b = ctx.signal_opts(
            "b",
            4,
            SignalOpts {
                signed: true,
                ..Default::default()
            },
        );
        let ns = ns_for(&ctx, &[a, b]);
        let text = print_expr(&ctx, &ns, &(Expr::from(a) + b)).unwrap();
        assert_eq!(text, "($signed({1'd0, a}) + b)");
    }

    #[test]
    fn unsigned_add_is_plain() {
        let mut ctx = Context::new();
        let a = ctx.signal("a", 4);
        let b = ctx.signal("b", 4);
        let ns = ns_for(&ctx, &[a, b]);
        let text = print_expr(&ctx, &ns, &(Expr::from(a) + b)).unwrap();
        assert_eq!(text, "(a + b)");
    }

    #[test]
    fn slice_of_signed_base_reinterprets() {
        let mut ctx = Context::new();
        let a = ctx.signal_opts(
            "a",
            8,
            SignalOpts {
                signed: true,
                ..Default::default()
            },
        );
        let ns = ns_for(&ctx, &[a]);
        let text = print_expr(&ctx, &ns, &Expr::from(a).slice(0, 3)).unwrap();
        assert_eq!(text, "$signed(a[2:0])");
    }

    #[test]
    fn cat_reverses_to_msb_first() {
        let mut ctx = Context::new();
        let lo = ctx.signal("lo", 4);
        let hi = ctx.signal("hi", 4);
        let ns = ns_for(&ctx, &[lo, hi]);
        let cat = Expr::cat(vec![Expr::from(lo), Expr::from(hi)]);
        assert_eq!(print_expr(&ctx, &ns, &cat).unwrap(), "{hi, lo}");
    }

    #[test]
    fn if_statement_rendering() {
        let mut ctx = Context::new();
        let c = ctx.signal("c", 1);
        let q = ctx.signal("q", 1);
        let ns = ns_for(&ctx, &[c, q]);
        let stmt = Statement::If {
            cond: Expr::from(c),
            then_body: vec![assign(q, 1)],
            else_body: vec![assign(q, 0)],
        };
        let text = print_stmt(&ctx, &ns, &stmt, 0).unwrap();
        assert_eq!(
            text,
            "if (c) begin\n\tq <= 1'd1;\nend else begin\n\tq <= 1'd0;\nend\n"
        );
    }
}
