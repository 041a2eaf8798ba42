//! Native emission of tri-state drivers, opaque instances, and
//! synthesis directives, plus override-table replacement end to end.

use silica_conformance::{assert_contains, convert_design};
use silica_emit::{convert, ConvertOptions, Dialect};
use silica_ir::stmt::assign;
use silica_ir::{
    Constant, Context, Directive, Expr, Fragment, Instance, IoDir, ParamValue, Special,
    SpecialKind, Tristate,
};

#[test]
fn verilog_tristate_floats_when_disabled() {
    let out = convert_design(Dialect::Verilog, "top", |ctx| {
        let pad = ctx.signal("pad", 4);
        let o = ctx.signal("o", 4);
        let oe = ctx.signal("oe", 1);
        let i = ctx.signal("i", 4);
        let id = ctx.add_special(Special::Tristate(Tristate {
            target: pad,
            o: Expr::from(o),
            oe: Expr::from(oe),
            i: Some(i),
        }));
        let mut f = Fragment::new();
        f.specials.insert(id);
        (f, [pad, o, oe, i].into_iter().collect())
    });
    let src = &out.main_source;
    assert_contains(src, "inout [3:0] pad");
    assert_contains(src, "assign pad = oe ? o : 4'bz;");
    assert_contains(src, "assign i = pad;");
}

#[test]
fn vhdl_tristate_floats_when_disabled() {
    let out = convert_design(Dialect::Vhdl, "top", |ctx| {
        let pad = ctx.signal("pad", 4);
        let o = ctx.signal("o", 4);
        let oe = ctx.signal("oe", 1);
        let id = ctx.add_special(Special::Tristate(Tristate {
            target: pad,
            o: Expr::from(o),
            oe: Expr::from(oe),
            i: None,
        }));
        let mut f = Fragment::new();
        f.specials.insert(id);
        (f, [pad, o, oe].into_iter().collect())
    });
    let src = &out.main_source;
    assert_contains(src, "pad : inout std_logic_vector(3 downto 0)");
    assert_contains(src, "pad <= o when (oe = '1') else (others => 'Z');");
}

#[test]
fn verilog_instance_with_parameters_and_ports() {
    let out = convert_design(Dialect::Verilog, "top", |ctx| {
        let clk_in = ctx.signal("clk_in", 1);
        let clk_out = ctx.signal("clk_out", 1);
        let mut inst = Instance::new("VENDOR_PLL");
        inst.port("CLKIN", IoDir::Input, clk_in)
            .port("CLKOUT", IoDir::Output, clk_out)
            .param("MUL", ParamValue::Const(Constant::new(4, 32, false)))
            .param("MODE", ParamValue::Str("FAST".to_string()));
        inst.synthesis_directive = Some("keep".to_string());
        let id = ctx.add_special(Special::Instance(inst));
        let mut f = Fragment::new();
        f.specials.insert(id);
        (f, [clk_in, clk_out].into_iter().collect())
    });
    let src = &out.main_source;
    assert_contains(src, "VENDOR_PLL #(");
    assert_contains(src, ".MUL(32'd4)");
    assert_contains(src, ".MODE(\"FAST\")");
    assert_contains(src, ".CLKIN(clk_in)");
    assert_contains(src, ".CLKOUT(clk_out)");
    assert_contains(src, ")/* synthesis keep */;");
}

#[test]
fn vhdl_instance_declares_a_component() {
    let out = convert_design(Dialect::Vhdl, "top", |ctx| {
        let clk_in = ctx.signal("clk_in", 1);
        let clk_out = ctx.signal("clk_out", 1);
        let mut inst = Instance::new("VENDOR_PLL");
        inst.port("CLKIN", IoDir::Input, clk_in)
            .port("CLKOUT", IoDir::Output, clk_out)
            .param("MUL", ParamValue::Const(Constant::new(4, 32, false)));
        let id = ctx.add_special(Special::Instance(inst));
        let mut f = Fragment::new();
        f.specials.insert(id);
        (f, [clk_in, clk_out].into_iter().collect())
    });
    let src = &out.main_source;
    assert_contains(src, "component VENDOR_PLL");
    assert_contains(src, "MUL : integer");
    assert_contains(src, "CLKIN : in std_ulogic");
    assert_contains(src, "VENDOR_PLL_1 : VENDOR_PLL");
    assert_contains(src, "MUL => 4");
    assert_contains(src, "CLKIN => clk_in");
}

#[test]
fn directive_formats_namespace_names() {
    let out = convert_design(Dialect::Verilog, "top", |ctx| {
        let sig = ctx.signal("important", 1);
        let id = ctx.add_special(Special::Directive(Directive {
            template: "attribute keep of {s} is true".to_string(),
            signals: vec![("s".to_string(), sig)],
        }));
        let mut f = Fragment::new();
        f.specials.insert(id);
        f.comb.push(assign(sig, 1));
        (f, [sig].into_iter().collect())
    });
    assert_contains(
        &out.main_source,
        "// synthesis attribute keep of important is true",
    );
}

#[test]
fn override_replaces_tristate_with_plain_logic() {
    let mut ctx = Context::new();
    let pad = ctx.signal("pad", 1);
    let o = ctx.signal("o", 1);
    let oe = ctx.signal("oe", 1);
    let id = ctx.add_special(Special::Tristate(Tristate {
        target: pad,
        o: Expr::from(o),
        oe: Expr::from(oe),
        i: None,
    }));
    let mut f = Fragment::new();
    f.specials.insert(id);

    let mut options = ConvertOptions::new(Dialect::Verilog).ios([pad, o, oe]);
    options.overrides.register(
        SpecialKind::Tristate,
        Box::new(|ctx, id| {
            // Simulation-friendly replacement: drive the pad from o & oe.
            let special = ctx.specials[id].clone();
            if let Special::Tristate(ts) = special {
                let mut r = Fragment::new();
                r.comb
                    .push(assign(Expr::Signal(ts.target), ts.o & ts.oe));
                Some(r)
            } else {
                None
            }
        }),
    );
    let out = convert(&mut ctx, f, options).unwrap();
    let src = &out.main_source;
    assert_contains(src, "assign pad = (o & oe);");
    assert!(!src.contains("'bz"));
}
