use bankasm::{
    config::MemoryMap,
    data::Addr,
    instr::{Operand, ADD},
    stream::InstructionStream,
};

/// Two lanes of four branch slots, with every companion column.
pub const SMALL_MAP: &str = r#"
PC  depth=2  width=10
A   depth=32 origin=0   io_base=24 po_inc_base=16
B   depth=32 origin=32  io_base=24 po_inc_base=16
I   depth=32 origin=64
H   depth=32 origin=96  po_inc_base=112
BPO depth=2  origin=96
BO  depth=4  lanes=2 origin=100 width=10
BD  depth=4  lanes=2 origin=108 width=10
BC  depth=4  lanes=2 origin=116 width=3
BP  depth=4  lanes=2 origin=124 width=1
BPE depth=4  lanes=2 origin=132 width=1
"#;

pub fn small_map() -> MemoryMap {
    MemoryMap::parse(SMALL_MAP).unwrap()
}

/// Emits an instruction with immediate operands only.
pub fn filler(stream: &mut InstructionStream) -> Addr {
    stream
        .emit(ADD, vec![Operand::Imm(0), Operand::Imm(0), Operand::Imm(0)])
        .unwrap()
}
