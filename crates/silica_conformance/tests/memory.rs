//! Memory-port emission: collision modes, granular write enables, read
//! enables, async reads, and preload data files.

use silica_conformance::{assert_contains, assert_not_contains, convert_design};
use silica_emit::Dialect;
use silica_ir::{
    Context, Fragment, Memory, MemoryPort, MemoryPortConfig, MemoryPortMode, SignalId, Special,
};
use std::collections::BTreeSet;

fn memory_design(
    mode: MemoryPortMode,
) -> impl FnOnce(&mut Context) -> (Fragment, BTreeSet<SignalId>) {
    move |ctx| {
        let sys = ctx.intern("sys");
        let mut mem = Memory::new(8, 16, "buf");
        let port: MemoryPort = mem.add_port(
            ctx,
            MemoryPortConfig::new(sys).write_capable().mode(mode),
        );
        let id = ctx.add_special(Special::Memory(mem));
        let mut f = Fragment::new();
        f.specials.insert(id);
        let ios = [port.adr, port.dat_r, port.we.unwrap(), port.dat_w.unwrap()]
            .into_iter()
            .collect();
        (f, ios)
    }
}

#[test]
fn write_first_registers_the_address() {
    let out = convert_design(Dialect::Verilog, "top", memory_design(MemoryPortMode::WriteFirst));
    let src = &out.main_source;
    assert_contains(src, "reg [7:0] buf[0:15];");
    // The address is registered and the data is re-read combinationally,
    // so a same-cycle write is visible on the read port.
    assert_contains(src, "memadr <= buf_adr;");
    assert_contains(src, "assign buf_dat_r = buf[memadr];");
    assert_contains(src, "if (buf_we)");
    assert_contains(src, "buf[buf_adr] <= buf_dat_w;");
    assert_not_contains(src, "memdat");
}

#[test]
fn read_first_registers_the_data() {
    let out = convert_design(Dialect::Verilog, "top", memory_design(MemoryPortMode::ReadFirst));
    let src = &out.main_source;
    // The read data is registered from the pre-write array contents.
    assert_contains(src, "memdat <= buf[buf_adr];");
    assert_contains(src, "assign buf_dat_r = memdat;");
    assert_not_contains(src, "memadr");
}

#[test]
fn no_change_holds_output_during_writes() {
    let out = convert_design(Dialect::Verilog, "top", memory_design(MemoryPortMode::NoChange));
    let src = &out.main_source;
    assert_contains(src, "if (!buf_we)");
    assert_contains(src, "memdat <= buf[buf_adr];");
}

#[test]
fn vhdl_modes_mirror_verilog() {
    let wf = convert_design(Dialect::Vhdl, "top", memory_design(MemoryPortMode::WriteFirst));
    assert_contains(&wf.main_source, "type buf_t is array(0 to 15) of std_logic_vector(7 downto 0);");
    assert_contains(&wf.main_source, "memadr <= buf_adr;");
    assert_contains(&wf.main_source, "buf_dat_r <= buf(to_integer(unsigned(memadr)));");
    let rf = convert_design(Dialect::Vhdl, "top", memory_design(MemoryPortMode::ReadFirst));
    assert_contains(&rf.main_source, "memdat <= buf(to_integer(unsigned(buf_adr)));");
    assert_contains(&rf.main_source, "buf_dat_r <= memdat;");
}

#[test]
fn granular_write_enables_split_the_word() {
    let out = convert_design(Dialect::Verilog, "top", |ctx| {
        let sys = ctx.intern("sys");
        let mut mem = Memory::new(16, 4, "buf");
        let port = mem.add_port(
            ctx,
            MemoryPortConfig::new(sys).write_capable().granularity(8),
        );
        let id = ctx.add_special(Special::Memory(mem));
        let mut f = Fragment::new();
        f.specials.insert(id);
        (
            f,
            [port.adr, port.dat_r, port.we.unwrap(), port.dat_w.unwrap()]
                .into_iter()
                .collect(),
        )
    });
    let src = &out.main_source;
    assert_contains(src, "if (buf_we[0])");
    assert_contains(src, "buf[buf_adr][7:0] <= buf_dat_w[7:0];");
    assert_contains(src, "if (buf_we[1])");
    assert_contains(src, "buf[buf_adr][15:8] <= buf_dat_w[15:8];");
}

#[test]
fn async_read_bypasses_registration() {
    let out = convert_design(Dialect::Verilog, "top", |ctx| {
        let sys = ctx.intern("sys");
        let mut mem = Memory::new(8, 4, "rom");
        let port = mem.add_port(ctx, MemoryPortConfig::new(sys).async_read());
        let id = ctx.add_special(Special::Memory(mem));
        let mut f = Fragment::new();
        f.specials.insert(id);
        (f, [port.adr, port.dat_r].into_iter().collect())
    });
    let src = &out.main_source;
    assert_contains(src, "assign rom_dat_r = rom[rom_adr];");
    assert_not_contains(src, "memdat");
    assert_not_contains(src, "memadr");
}

#[test]
fn read_enable_gates_the_synchronous_path() {
    let out = convert_design(Dialect::Verilog, "top", |ctx| {
        let sys = ctx.intern("sys");
        let mut mem = Memory::new(8, 4, "buf");
        let port = mem.add_port(ctx, MemoryPortConfig::new(sys).with_re());
        let id = ctx.add_special(Special::Memory(mem));
        let mut f = Fragment::new();
        f.specials.insert(id);
        (f, [port.adr, port.dat_r, port.re.unwrap()].into_iter().collect())
    });
    let src = &out.main_source;
    assert_contains(src, "if (buf_re)");
    assert_contains(src, "memdat <= buf[buf_adr];");
}

#[test]
fn preload_contents_become_a_data_file() {
    let out = convert_design(Dialect::Verilog, "top", |ctx| {
        let sys = ctx.intern("sys");
        let mut mem = Memory::new(8, 4, "rom");
        mem.init = Some(vec![0xde, 0xad, 0xbe, 0xef]);
        let port = mem.add_port(ctx, MemoryPortConfig::new(sys));
        let id = ctx.add_special(Special::Memory(mem));
        let mut f = Fragment::new();
        f.specials.insert(id);
        (f, [port.adr, port.dat_r].into_iter().collect())
    });
    assert_contains(&out.main_source, "$readmemh(\"rom.init\", rom);");
    assert_eq!(
        out.data_files.get("rom.init").map(String::as_str),
        Some("de\nad\nbe\nef\n")
    );
}
