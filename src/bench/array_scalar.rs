//! Array increment and output, one lane.
//!
//! Walks a -1 terminated array in `B` through the programmed-offset pointer
//! `loop_pointer`, adding one to each element, ten times over. Then it
//! streams the array to the `A` I/O port and starts again.
//!
//! ```text
//! init:    ADD loop_count, 0, loop_count_init
//! outer:   ADD BPO[0], 0, loop_pointer_init
//! inner1:  NOP
//! inner2:  ADD temp, 0, loop_pointer
//!          ADD temp, one, temp              ; JNE break    (jmp0)
//!          ADD loop_pointer, 0, temp        ; JMP inner2   (jmp1)
//! break:   ADD loop_count, minus_one, loop_count
//!          ADD BPO[0], 0, loop_pointer_init ; JNZ inner1   (jmp2)
//! output:  ADD temp, 0, loop_pointer
//! output2: ADD A_IO, 0, temp                ; JNE init     (jmp3)
//!                                           ; JPO output   (jmp0a)
//! ```

use log::info;

use crate::assembly::Assembly;
use crate::config::MemoryMap;
use crate::data::{Addr, Lane};
use crate::error::AsmResult;
use crate::image::ImageSet;
use crate::instr::{Operand, ADD};
use crate::offset::ProgrammedOffset;

pub const NAME: &str = "array_scalar";

const LOOP_COUNT: i64 = 10;
const ARRAY: [i64; 10] = [0, 1, 2, 3, 4, 5, 6, 7, 8, 9];
const POINTER_BANK: &str = "BPO";

fn label(name: &str) -> Operand {
    Operand::label(name)
}

fn zero() -> Operand {
    Operand::Imm(0)
}

fn assemble_a(asm: &mut Assembly) -> AsmResult<()> {
    let a = asm.bank_mut("A")?;
    let io_base = a.config().require_io_base()?;
    a.write_parameter("A_IO", io_base, None)?;
    a.set_cursor(Addr(0))?;
    a.write_literal(0, None)?;
    a.write_literal(1, Some("one"))?;
    a.write_literal(-1, Some("minus_one"))?;
    Ok(())
}

fn assemble_b(asm: &mut Assembly) -> AsmResult<()> {
    let pointer_write = asm.map().get("H")?.require_po_inc_base()?;
    let b = asm.bank_mut("B")?;
    let io_base = b.config().require_io_base()?;
    let pointer = b.config().require_po_inc_base()?;
    b.write_parameter("B_IO", io_base, None)?;
    b.write_parameter("loop_pointer", pointer, Some(pointer_write))?;
    b.set_cursor(Addr(0))?;

    b.write_literal(0, None)?;
    b.write_literal(LOOP_COUNT, Some("loop_count_init"))?;
    b.write_literal(0, Some("loop_count"))?;
    b.write_literal(0, Some("temp"))?;
    for (idx, value) in ARRAY.iter().enumerate() {
        b.write_literal(*value, if idx == 0 { Some("array") } else { None })?;
    }
    b.write_literal(-1, None)?;
    // overwritten with the programmed offset once the array is placed
    b.write_literal(0, Some("loop_pointer_init"))?;
    Ok(())
}

fn assemble_i(asm: &mut Assembly) -> AsmResult<()> {
    let pointer = Operand::at(POINTER_BANK, 0);
    // address 0 is the pipeline-fill no-op
    let mut i = asm.stream("I", Lane(0), Addr(1))?;
    let table = asm.branches_mut();

    i.label("init")?;
    i.emit(ADD, vec![label("loop_count"), zero(), label("loop_count_init")])?;
    i.label("outer")?;
    i.emit(ADD, vec![pointer.clone(), zero(), label("loop_pointer_init")])?;
    i.label("inner1")?;
    i.nop()?;
    i.label("inner2")?;
    i.emit(ADD, vec![label("temp"), zero(), label("loop_pointer")])?;
    i.emit(ADD, vec![label("temp"), label("one"), label("temp")])?;
    i.jne(table, Some(false), "jmp0", "break")?;
    i.emit(ADD, vec![label("loop_pointer"), zero(), label("temp")])?;
    i.jmp(table, "jmp1", "inner2")?;
    i.label("break")?;
    i.emit(ADD, vec![label("loop_count"), label("minus_one"), label("loop_count")])?;
    i.emit(ADD, vec![pointer, zero(), label("loop_pointer_init")])?;
    i.jnz(table, None, "jmp2", "inner1")?;
    i.label("output")?;
    i.emit(ADD, vec![label("temp"), zero(), label("loop_pointer")])?;
    i.label("output2")?;
    i.emit(ADD, vec![label("A_IO"), zero(), label("temp")])?;
    i.jne(table, Some(false), "jmp3", "init")?;
    i.jpo(table, None, "jmp0a", "output")?;

    i.resolve_forward_jumps(table)?;
    asm.link(i)
}

/// Points `loop_pointer` at the array: reads walk `B`, writes land in the
/// matching window of `H`.
fn program_offsets(asm: &mut Assembly) -> AsmResult<()> {
    let b = asm.bank("B")?;
    let array_read = b.resolve_read("array")?;
    let array_write = b.resolve_write("array")?;
    let init = b.resolve_read("loop_pointer_init")?;
    let po = ProgrammedOffset::for_arrays(asm.map(), "B", array_read, "H", array_write)?;
    info!("loop_pointer: {}", po);

    let b = asm.bank_mut("B")?;
    b.set_cursor(init)?;
    b.write_word(po.word(), None)?;
    Ok(())
}

pub fn assemble(map: &MemoryMap) -> AsmResult<ImageSet> {
    let mut asm = Assembly::new(map)?;
    assemble_a(&mut asm)?;
    assemble_b(&mut asm)?;
    assemble_i(&mut asm)?;
    program_offsets(&mut asm)?;
    asm.finish()
}

#[test]
fn test_assembles_with_builtin_map() {
    let images = assemble(&MemoryMap::builtin().unwrap()).unwrap();
    let b = images.get("B").unwrap();
    assert_eq!(b.get(Addr(15)).0, 0x5_4840_0014);
    assert_eq!(images.get("PC").unwrap().get(Addr(0)).0, 1);
}
