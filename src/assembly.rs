use std::collections::HashMap;

use log::{debug, info};

use crate::bank::MemoryBank;
use crate::branch::{BranchTable, COLUMNS};
use crate::config::MemoryMap;
use crate::data::{Addr, Lane, Word};
use crate::error::{AsmError, AsmResult};
use crate::image::ImageSet;
use crate::instr::{Instruction, InstructionFormat, Operand};
use crate::stream::InstructionStream;

/// Bank receiving each lane's start address, if the map has one.
pub const PROGRAM_COUNTER: &str = "PC";
/// Banks operand A and B read from, and the order D labels are searched in.
pub const READ_A: &str = "A";
pub const READ_B: &str = "B";

/// One assembly run: every bank of a memory map, freshly allocated.
///
/// Instruction banks are lent to an [InstructionStream] and come back
/// through [Assembly::link]. All other banks stay here and are written in
/// place.
#[derive(Debug)]
pub struct Assembly {
    map: MemoryMap,
    banks: HashMap<String, MemoryBank>,
    branches: BranchTable,
    format: InstructionFormat,
}

impl Assembly {
    pub fn new(map: &MemoryMap) -> AsmResult<Assembly> {
        let branches = BranchTable::new(map)?;
        let mut banks = HashMap::new();
        for config in map.iter().filter(|c| !COLUMNS.contains(&c.name.as_str())) {
            banks.insert(config.name.clone(), MemoryBank::from_config(config));
        }
        info!("allocated {} banks", map.len());
        Ok(Assembly {
            map: map.clone(),
            banks,
            branches,
            format: InstructionFormat::default(),
        })
    }

    pub fn map(&self) -> &MemoryMap {
        &self.map
    }

    pub fn format(&self) -> &InstructionFormat {
        &self.format
    }

    pub fn bank(&self, name: &str) -> AsmResult<&MemoryBank> {
        self.banks.get(name).ok_or_else(|| missing(&self.map, name))
    }

    pub fn bank_mut(&mut self, name: &str) -> AsmResult<&mut MemoryBank> {
        self.banks
            .get_mut(name)
            .ok_or_else(|| missing(&self.map, name))
    }

    pub fn branches(&self) -> &BranchTable {
        &self.branches
    }

    pub fn branches_mut(&mut self) -> &mut BranchTable {
        &mut self.branches
    }

    /// Lends `bank` to a new instruction stream for `lane`.
    pub fn stream(&mut self, bank: &str, lane: Lane, start: Addr) -> AsmResult<InstructionStream> {
        let taken = self.banks.remove(bank).ok_or_else(|| missing(&self.map, bank))?;
        InstructionStream::begin(taken, lane, start)
    }

    fn resolve_d(&self, operand: &Operand) -> AsmResult<i64> {
        match operand {
            Operand::Imm(value) => Ok(*value),
            Operand::Bank { bank, offset } => {
                let origin = self.map.get(bank)?.require_origin()?;
                Ok((origin.0 + offset) as i64)
            }
            Operand::Label(name) => {
                for bank in [READ_A, READ_B] {
                    if let Some(binding) = self.banks.get(bank).and_then(|b| b.lookup(name).binding()) {
                        return Ok(binding.write.0 as i64);
                    }
                }
                Err(AsmError::UnknownLabel {
                    bank: format!("{READ_A}/{READ_B}"),
                    label: name.clone(),
                })
            }
        }
    }

    fn resolve_read(&self, bank: &str, operand: &Operand) -> AsmResult<i64> {
        match operand {
            Operand::Imm(value) => Ok(*value),
            Operand::Bank { bank, offset } => Ok((self.bank(bank)?.base().0 + offset) as i64),
            Operand::Label(name) => Ok(self.bank(bank)?.resolve_read(name)?.0 as i64),
        }
    }

    pub fn encode(&self, instr: &Instruction) -> AsmResult<Word> {
        let mut values = Vec::with_capacity(instr.operands.len());
        for (idx, operand) in instr.operands.iter().enumerate() {
            values.push(match idx {
                0 => self.resolve_d(operand)?,
                1 => self.resolve_read(READ_A, operand)?,
                _ => self.resolve_read(READ_B, operand)?,
            });
        }
        self.format.encode(instr.opcode, &values)
    }

    /// Encodes a finalized stream into its bank and takes the bank back.
    pub fn link(&mut self, stream: InstructionStream) -> AsmResult<()> {
        if !stream.is_finalized() {
            return Err(AsmError::Unfinalized {
                bank: stream.bank().name().to_string(),
            });
        }

        let mut words = vec![];
        for (at, instr) in stream.instructions() {
            let word = self.encode(instr)?;
            debug!("{}: {} {} = {}", stream.lane(), at, instr, word);
            words.push((at, word));
        }

        let lane = stream.lane();
        let start = stream.start();
        if let Some(pc) = self.banks.get(PROGRAM_COUNTER) {
            pc.check_fits(PROGRAM_COUNTER, start)?;
        }
        let mut bank = stream.into_bank();
        for (at, word) in words {
            bank.store(at, word)?;
        }
        if let Some(pc) = self.banks.get_mut(PROGRAM_COUNTER) {
            pc.store(pc.base() + lane.0, Word::from(start))?;
        }
        info!("linked {} for {}", bank.name(), lane);
        self.banks.insert(bank.name().to_string(), bank);
        Ok(())
    }

    /// Hands every bank over for serialization.
    pub fn finish(mut self) -> AsmResult<ImageSet> {
        let mut columns = HashMap::new();
        for bank in self.branches.into_banks() {
            columns.insert(bank.name().to_string(), bank);
        }

        let mut banks = Vec::with_capacity(self.map.len());
        for config in self.map.iter() {
            let name = config.name.as_str();
            match self.banks.remove(name).or_else(|| columns.remove(name)) {
                Some(bank) => banks.push(bank),
                None => {
                    return Err(AsmError::Unlinked {
                        bank: name.to_string(),
                    })
                }
            }
        }
        info!("assembled {} banks", banks.len());
        Ok(ImageSet::new(banks))
    }
}

fn missing(map: &MemoryMap, name: &str) -> AsmError {
    let reason = if COLUMNS.contains(&name) {
        "bank belongs to the branch table"
    } else if map.contains(name) {
        return AsmError::Unlinked {
            bank: name.to_string(),
        };
    } else {
        "bank is not in the memory map"
    };
    AsmError::Config {
        bank: name.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
fn small_map() -> MemoryMap {
    MemoryMap::parse(
        "PC depth=2 width=10
A depth=16 origin=0
B depth=16 origin=16
I depth=16 origin=32
BD depth=4 lanes=2 width=10",
    )
    .unwrap()
}

#[test]
fn test_assembly_starts_empty() {
    let asm = Assembly::new(&small_map()).unwrap();
    assert!(asm.bank("A").unwrap().is_empty());
    assert_eq!(asm.branches().lanes(), 2);
    assert!(matches!(asm.bank("BD"), Err(AsmError::Config { .. })));
}

#[test]
fn test_link_resolves_operand_sides() {
    use crate::instr::ADD;
    let mut asm = Assembly::new(&small_map()).unwrap();
    asm.bank_mut("A").unwrap().write_literal(1, Some("one")).unwrap();
    let b = asm.bank_mut("B").unwrap();
    b.write_literal(0, None).unwrap();
    b.write_literal(7, Some("x")).unwrap();

    let mut stream = asm.stream("I", Lane(0), Addr(1)).unwrap();
    stream
        .emit(ADD, vec!["x".into(), "one".into(), "x".into()])
        .unwrap();
    stream.resolve_forward_jumps(asm.branches_mut()).unwrap();
    asm.link(stream).unwrap();

    let word = asm.bank("I").unwrap().get(Addr(1));
    assert_eq!(asm.format().fields(word), (4, 17, 0, 1));
    assert_eq!(asm.bank("PC").unwrap().get(Addr(0)), Word(1));
}

#[test]
fn test_link_requires_finalized_stream() {
    let mut asm = Assembly::new(&small_map()).unwrap();
    let stream = asm.stream("I", Lane(0), Addr(1)).unwrap();
    assert_eq!(
        asm.link(stream),
        Err(AsmError::Unfinalized {
            bank: "I".to_string()
        })
    );
}

#[test]
fn test_finish_needs_every_bank_back() {
    let mut asm = Assembly::new(&small_map()).unwrap();
    let _stream = asm.stream("I", Lane(0), Addr(1)).unwrap();
    assert!(matches!(asm.bank("I"), Err(AsmError::Unlinked { .. })));
    assert!(matches!(asm.finish(), Err(AsmError::Unlinked { .. })));
}

#[test]
fn test_finish_keeps_map_order() {
    let asm = Assembly::new(&small_map()).unwrap();
    let images = asm.finish().unwrap();
    let names = images.iter().map(|b| b.name()).collect::<Vec<_>>();
    assert_eq!(names, vec!["PC", "A", "B", "I", "BD"]);
}
