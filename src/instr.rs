use std::fmt::{Display, Formatter};

use crate::data::Word;
use crate::error::{AsmError, AsmResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Opcode {
    pub mnemonic: &'static str,
    pub code: u8,
    pub arity: usize,
}

impl Opcode {
    const fn new(mnemonic: &'static str, code: u8) -> Opcode {
        Opcode {
            mnemonic,
            code,
            arity: 3,
        }
    }

    pub fn by_mnemonic(mnemonic: &str) -> Option<Opcode> {
        OPCODES
            .iter()
            .find(|op| op.mnemonic.eq_ignore_ascii_case(mnemonic))
            .copied()
    }
}

impl Display for Opcode {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), std::fmt::Error> {
        write!(f, "{}", self.mnemonic)
    }
}

pub const XOR: Opcode = Opcode::new("XOR", 0);
pub const AND: Opcode = Opcode::new("AND", 1);
pub const OR: Opcode = Opcode::new("OR", 2);
pub const SUB: Opcode = Opcode::new("SUB", 3);
pub const ADD: Opcode = Opcode::new("ADD", 4);
pub const MLO: Opcode = Opcode::new("MLO", 5);
pub const MHI: Opcode = Opcode::new("MHI", 6);
pub const SHR: Opcode = Opcode::new("SHR", 7);

pub const OPCODES: [Opcode; 8] = [XOR, AND, OR, SUB, ADD, MLO, MHI, SHR];

/// An operand as written by the program. Only turned into a number at link
/// time, once every label is known.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Operand {
    Imm(i64),
    Bank { bank: String, offset: usize },
    Label(String),
}

impl Operand {
    pub fn at<T: Into<String>>(bank: T, offset: usize) -> Operand {
        Operand::Bank {
            bank: bank.into(),
            offset,
        }
    }

    pub fn label<T: Into<String>>(name: T) -> Operand {
        Operand::Label(name.into())
    }
}

impl From<i64> for Operand {
    fn from(value: i64) -> Self {
        Operand::Imm(value)
    }
}

impl From<&str> for Operand {
    fn from(value: &str) -> Self {
        Operand::Label(value.to_string())
    }
}

impl Display for Operand {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), std::fmt::Error> {
        match self {
            Operand::Imm(value) => write!(f, "{value}"),
            Operand::Bank { bank, offset } => write!(f, "{bank}[{offset}]"),
            Operand::Label(name) => write!(f, "{name}"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Instruction {
    pub opcode: Opcode,
    pub operands: Vec<Operand>,
}

impl Instruction {
    pub fn new(opcode: Opcode, operands: Vec<Operand>) -> AsmResult<Instruction> {
        if operands.len() != opcode.arity {
            return Err(AsmError::Arity {
                mnemonic: opcode.mnemonic,
                expected: opcode.arity,
                found: operands.len(),
            });
        }
        Ok(Instruction { opcode, operands })
    }

    /// The all-zero word. Decodes as `XOR 0, 0, 0`, which writes nothing
    /// useful and so serves as the pipeline-fill no-op.
    pub fn nop() -> Instruction {
        Instruction {
            opcode: XOR,
            operands: vec![Operand::Imm(0), Operand::Imm(0), Operand::Imm(0)],
        }
    }

    pub fn is_nop(&self) -> bool {
        *self == Self::nop()
    }
}

impl Display for Instruction {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), std::fmt::Error> {
        if self.is_nop() {
            return write!(f, "NOP");
        }
        write!(f, "{}", self.opcode)?;
        for (idx, operand) in self.operands.iter().enumerate() {
            let sep = if idx == 0 { " " } else { ", " };
            write!(f, "{sep}{operand}")?;
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Field {
    pub name: &'static str,
    pub shift: u32,
    pub width: u32,
}

impl Field {
    fn pack(&self, value: i64) -> AsmResult<u64> {
        if value < 0 || value as u64 >= 1 << self.width {
            return Err(AsmError::FieldOverflow {
                field: self.name,
                value,
                width: self.width,
            });
        }
        Ok((value as u64) << self.shift)
    }

    fn unpack(&self, word: Word) -> u64 {
        (word.0 >> self.shift) & ((1 << self.width) - 1)
    }
}

/// Bit layout of an instruction word: opcode, destination D, sources A and B.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InstructionFormat {
    pub opcode: Field,
    pub d: Field,
    pub a: Field,
    pub b: Field,
}

impl Default for InstructionFormat {
    fn default() -> Self {
        InstructionFormat {
            opcode: Field {
                name: "opcode",
                shift: 32,
                width: 4,
            },
            d: Field {
                name: "D",
                shift: 20,
                width: 12,
            },
            a: Field {
                name: "A",
                shift: 10,
                width: 10,
            },
            b: Field {
                name: "B",
                shift: 0,
                width: 10,
            },
        }
    }
}

impl InstructionFormat {
    /// Packs already resolved operand values. Missing trailing operands
    /// encode as zero.
    pub fn encode(&self, opcode: Opcode, operands: &[i64]) -> AsmResult<Word> {
        let operand = |idx: usize| operands.get(idx).copied().unwrap_or(0);
        Ok(Word(
            self.opcode.pack(opcode.code as i64)?
                | self.d.pack(operand(0))?
                | self.a.pack(operand(1))?
                | self.b.pack(operand(2))?,
        ))
    }

    /// Splits a word back into `(opcode, D, A, B)`.
    pub fn fields(&self, word: Word) -> (u64, u64, u64, u64) {
        (
            self.opcode.unpack(word),
            self.d.unpack(word),
            self.a.unpack(word),
            self.b.unpack(word),
        )
    }
}

#[test]
fn test_display() {
    let instr = Instruction::new(
        ADD,
        vec!["loop_count".into(), Operand::Imm(0), "loop_count_init".into()],
    )
    .unwrap();
    assert_eq!(instr.to_string(), "ADD loop_count, 0, loop_count_init");
    assert_eq!(Instruction::nop().to_string(), "NOP");
    assert_eq!(Operand::at("BPO", 0).to_string(), "BPO[0]");
}

#[test]
fn test_arity() {
    assert_eq!(
        Instruction::new(SUB, vec![Operand::Imm(1)]),
        Err(AsmError::Arity {
            mnemonic: "SUB",
            expected: 3,
            found: 1
        })
    );
}

#[test]
fn test_encode_layout() {
    let format = InstructionFormat::default();
    let word = format.encode(ADD, &[1027, 1, 15]).unwrap();
    assert_eq!(word, Word(0x4_4030_040f));
    assert_eq!(format.fields(word), (4, 1027, 1, 15));
    assert_eq!(format.encode(XOR, &[]).unwrap(), Word::ZERO);
}

#[test]
fn test_encode_overflow() {
    let format = InstructionFormat::default();
    assert_eq!(
        format.encode(ADD, &[0, 1024, 0]),
        Err(AsmError::FieldOverflow {
            field: "A",
            value: 1024,
            width: 10
        })
    );
    assert!(format.encode(ADD, &[-1, 0, 0]).is_err());
}

#[test]
fn test_lookup_by_mnemonic() {
    assert_eq!(Opcode::by_mnemonic("shr"), Some(SHR));
    assert_eq!(Opcode::by_mnemonic("JMP"), None);
}
