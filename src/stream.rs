use std::fmt::{Display, Formatter};

use log::debug;

use crate::bank::MemoryBank;
use crate::branch::{BranchTable, Condition};
use crate::data::{Addr, Lane, Word};
use crate::error::{AsmError, AsmResult};
use crate::instr::{Instruction, Opcode, Operand};
use crate::label::Lookup;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BranchRecord {
    /// Instruction the branch is attached to.
    pub origin: Addr,
    pub condition: Condition,
    pub prediction: Option<bool>,
    pub slot: String,
    pub target: String,
}

impl Display for BranchRecord {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), std::fmt::Error> {
        write!(f, "{} {} via {}", self.condition, self.target, self.slot)?;
        match self.prediction {
            Some(true) => write!(f, " (taken)"),
            Some(false) => write!(f, " (not taken)"),
            None => Ok(()),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Record {
    Instr { at: Addr, instr: Instruction },
    Branch(BranchRecord),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingPatch {
    pub slot: String,
    pub target: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StreamState {
    Building,
    Finalized,
}

/// Program of one lane, built in order into the instruction bank.
///
/// Branches do not take an instruction word: they annotate the instruction
/// emitted just before them and stage their target into the branch table.
/// Targets that are not yet labelled are staged as the zero placeholder and
/// remembered until `resolve_forward_jumps`.
#[derive(Clone, Debug)]
pub struct InstructionStream {
    bank: MemoryBank,
    lane: Lane,
    start: Addr,
    records: Vec<Record>,
    pending: Vec<PendingPatch>,
    state: StreamState,
    last: Option<Addr>,
}

impl InstructionStream {
    pub fn begin(mut bank: MemoryBank, lane: Lane, start: Addr) -> AsmResult<InstructionStream> {
        if lane.0 > 0 && start == Addr(0) {
            return Err(AsmError::Config {
                bank: bank.name().to_string(),
                reason: format!("{lane} may not start at address 0"),
            });
        }
        bank.set_cursor(start)?;
        debug!("{}: {} starts at {}", bank.name(), lane, start);
        Ok(InstructionStream {
            bank,
            lane,
            start,
            records: vec![],
            pending: vec![],
            state: StreamState::Building,
            last: None,
        })
    }

    pub fn lane(&self) -> Lane {
        self.lane
    }

    pub fn start(&self) -> Addr {
        self.start
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    pub fn is_finalized(&self) -> bool {
        self.state == StreamState::Finalized
    }

    pub fn bank(&self) -> &MemoryBank {
        &self.bank
    }

    /// Address the next instruction will take.
    pub fn next_address(&self) -> Addr {
        self.bank.cursor()
    }

    fn check_building(&self) -> AsmResult<()> {
        match self.state {
            StreamState::Building => Ok(()),
            StreamState::Finalized => Err(AsmError::Finalized {
                bank: self.bank.name().to_string(),
            }),
        }
    }

    /// Names the next instruction.
    pub fn label(&mut self, name: &str) -> AsmResult<Addr> {
        self.check_building()?;
        let at = self.bank.cursor();
        self.bank.define(name, at, None)?;
        Ok(at)
    }

    pub fn emit(&mut self, opcode: Opcode, operands: Vec<Operand>) -> AsmResult<Addr> {
        self.check_building()?;
        let instr = Instruction::new(opcode, operands)?;
        // the word is filled in at link time
        let at = self.bank.write_word(Word::ZERO, None)?;
        debug!("{}: {} {}", self.lane, at, instr);
        self.records.push(Record::Instr { at, instr });
        self.last = Some(at);
        Ok(at)
    }

    pub fn nop(&mut self) -> AsmResult<Addr> {
        let nop = Instruction::nop();
        self.emit(nop.opcode, nop.operands)
    }

    pub fn emit_branch(
        &mut self,
        table: &mut BranchTable,
        condition: Condition,
        prediction: Option<bool>,
        slot: &str,
        target: &str,
    ) -> AsmResult<()> {
        self.check_building()?;
        let origin = self.last.ok_or_else(|| AsmError::NoOrigin {
            bank: self.bank.name().to_string(),
            slot: slot.to_string(),
        })?;

        let resolved = match self.bank.lookup(target) {
            Lookup::Resolved(binding) => {
                self.check_target(slot, target, binding.read)?;
                table.check_destination(binding.read)?;
                Some(binding.read)
            }
            Lookup::Unresolved => None,
        };
        table.check_origin(origin)?;

        if table.lookup(self.lane, slot).is_none() {
            table.declare(self.lane, slot)?;
        }
        table.claim_writer(self.lane, slot, condition)?;
        table.annotate(self.lane, slot, origin, condition, prediction)?;

        // a later branch through the same slot decides its final value
        self.pending.retain(|p| p.slot != slot);
        match resolved {
            Some(address) => table.stage(self.lane, slot, address)?,
            None => {
                table.stage(self.lane, slot, Addr(0))?;
                debug!("{}: {} pending on {}", self.lane, slot, target);
                self.pending.push(PendingPatch {
                    slot: slot.to_string(),
                    target: target.to_string(),
                });
            }
        }

        self.records.push(Record::Branch(BranchRecord {
            origin,
            condition,
            prediction,
            slot: slot.to_string(),
            target: target.to_string(),
        }));
        Ok(())
    }

    pub fn jmp(&mut self, table: &mut BranchTable, slot: &str, target: &str) -> AsmResult<()> {
        self.emit_branch(table, Condition::Always, None, slot, target)
    }

    pub fn jeq(
        &mut self,
        table: &mut BranchTable,
        prediction: Option<bool>,
        slot: &str,
        target: &str,
    ) -> AsmResult<()> {
        self.emit_branch(table, Condition::Equal, prediction, slot, target)
    }

    pub fn jne(
        &mut self,
        table: &mut BranchTable,
        prediction: Option<bool>,
        slot: &str,
        target: &str,
    ) -> AsmResult<()> {
        self.emit_branch(table, Condition::NotEqual, prediction, slot, target)
    }

    pub fn jze(
        &mut self,
        table: &mut BranchTable,
        prediction: Option<bool>,
        slot: &str,
        target: &str,
    ) -> AsmResult<()> {
        self.emit_branch(table, Condition::Zero, prediction, slot, target)
    }

    pub fn jnz(
        &mut self,
        table: &mut BranchTable,
        prediction: Option<bool>,
        slot: &str,
        target: &str,
    ) -> AsmResult<()> {
        self.emit_branch(table, Condition::NotZero, prediction, slot, target)
    }

    pub fn jpe(
        &mut self,
        table: &mut BranchTable,
        prediction: Option<bool>,
        slot: &str,
        target: &str,
    ) -> AsmResult<()> {
        self.emit_branch(table, Condition::ParityEven, prediction, slot, target)
    }

    pub fn jpo(
        &mut self,
        table: &mut BranchTable,
        prediction: Option<bool>,
        slot: &str,
        target: &str,
    ) -> AsmResult<()> {
        self.emit_branch(table, Condition::ParityOdd, prediction, slot, target)
    }

    fn check_target(&self, slot: &str, target: &str, address: Addr) -> AsmResult<()> {
        if address == Addr(0) {
            return Err(AsmError::ReservedTarget {
                slot: slot.to_string(),
                label: target.to_string(),
            });
        }
        Ok(())
    }

    /// Patches every branch staged before its target was labelled and closes
    /// the stream. Nothing is patched unless every target resolves.
    pub fn resolve_forward_jumps(&mut self, table: &mut BranchTable) -> AsmResult<()> {
        let mut patches = Vec::with_capacity(self.pending.len());
        for patch in self.pending.iter() {
            let address = match self.bank.lookup(&patch.target) {
                Lookup::Resolved(binding) => binding.read,
                Lookup::Unresolved => {
                    return Err(AsmError::UnresolvedLabel {
                        bank: self.bank.name().to_string(),
                        slot: patch.slot.clone(),
                        label: patch.target.clone(),
                    })
                }
            };
            self.check_target(&patch.slot, &patch.target, address)?;
            table.check_destination(address)?;
            patches.push((patch.slot.as_str(), address));
        }

        for (slot, address) in patches {
            debug!("{}: patched {} = {}", self.lane, slot, address);
            table.stage(self.lane, slot, address)?;
        }
        self.pending.clear();
        self.state = StreamState::Finalized;
        Ok(())
    }

    pub fn pending(&self) -> &[PendingPatch] {
        &self.pending
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn instructions(&self) -> impl Iterator<Item = (Addr, &Instruction)> + '_ {
        self.records.iter().filter_map(|r| match r {
            Record::Instr { at, instr } => Some((*at, instr)),
            Record::Branch(_) => None,
        })
    }

    pub fn branches(&self) -> impl Iterator<Item = &BranchRecord> + '_ {
        self.records.iter().filter_map(|r| match r {
            Record::Branch(branch) => Some(branch),
            Record::Instr { .. } => None,
        })
    }

    pub fn into_bank(self) -> MemoryBank {
        self.bank
    }
}

impl Display for InstructionStream {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), std::fmt::Error> {
        for record in self.records.iter() {
            match record {
                Record::Instr { at, instr } => {
                    let label = self.bank.labels().name_at(*at).unwrap_or("");
                    write!(f, "\n{:04}\t{}\t{}", at.0, label, instr)?
                }
                Record::Branch(branch) => write!(f, "\t; {branch}")?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
fn fixture(lanes: usize) -> (InstructionStream, BranchTable) {
    use crate::config::{BankConfig, MemoryMap};
    let map = MemoryMap::new()
        .with(BankConfig::new("I", 32).with_origin(2048))
        .and_then(|m| m.with(BankConfig::new("BD", 4).with_lanes(lanes)))
        .unwrap();
    let bank = MemoryBank::allocate("I", &map).unwrap();
    let stream = InstructionStream::begin(bank, Lane(0), Addr(1)).unwrap();
    (stream, BranchTable::new(&map).unwrap())
}

#[cfg(test)]
fn add(stream: &mut InstructionStream) -> Addr {
    use crate::instr::ADD;
    stream
        .emit(ADD, vec![Operand::Imm(0), Operand::Imm(0), Operand::Imm(0)])
        .unwrap()
}

#[test]
fn test_backward_branch_stages_immediately() {
    let (mut stream, mut table) = fixture(1);
    stream.label("top").unwrap();
    add(&mut stream);
    stream.jmp(&mut table, "jmp0", "top").unwrap();
    assert!(stream.pending().is_empty());
    assert_eq!(table.value(Lane(0), "jmp0"), Ok(Addr(1)));
}

#[test]
fn test_forward_branch_is_patched() {
    let (mut stream, mut table) = fixture(1);
    add(&mut stream);
    stream.jnz(&mut table, None, "jmp0", "done").unwrap();
    assert_eq!(table.value(Lane(0), "jmp0"), Ok(Addr(0)));
    add(&mut stream);
    stream.label("done").unwrap();
    add(&mut stream);
    stream.resolve_forward_jumps(&mut table).unwrap();
    assert_eq!(table.value(Lane(0), "jmp0"), Ok(Addr(3)));
    assert!(stream.is_finalized());
}

#[test]
fn test_branch_without_instruction() {
    let (mut stream, mut table) = fixture(1);
    assert_eq!(
        stream.jmp(&mut table, "jmp0", "x"),
        Err(AsmError::NoOrigin {
            bank: "I".to_string(),
            slot: "jmp0".to_string()
        })
    );
}

#[test]
fn test_unresolved_leaves_stream_open() {
    let (mut stream, mut table) = fixture(1);
    add(&mut stream);
    stream.jmp(&mut table, "jmp0", "nowhere").unwrap();
    assert_eq!(
        stream.resolve_forward_jumps(&mut table),
        Err(AsmError::UnresolvedLabel {
            bank: "I".to_string(),
            slot: "jmp0".to_string(),
            label: "nowhere".to_string()
        })
    );
    assert_eq!(stream.state(), StreamState::Building);
    assert_eq!(stream.pending().len(), 1);
}

#[test]
fn test_emit_after_finalize() {
    let (mut stream, mut table) = fixture(1);
    add(&mut stream);
    stream.resolve_forward_jumps(&mut table).unwrap();
    assert!(matches!(
        stream.nop(),
        Err(AsmError::Finalized { .. })
    ));
    assert!(matches!(
        stream.label("late"),
        Err(AsmError::Finalized { .. })
    ));
}

#[test]
fn test_nonzero_lane_may_not_start_at_zero() {
    let bank = MemoryBank::from_config(&crate::config::BankConfig::new("I", 8));
    assert!(matches!(
        InstructionStream::begin(bank, Lane(1), Addr(0)),
        Err(AsmError::Config { .. })
    ));
}

#[test]
fn test_branch_to_address_zero() {
    let map_bank = MemoryBank::from_config(&crate::config::BankConfig::new("I", 8));
    let (_, mut table) = fixture(1);
    let mut stream = InstructionStream::begin(map_bank, Lane(0), Addr(0)).unwrap();
    stream.label("fill").unwrap();
    stream.nop().unwrap();
    assert_eq!(
        stream.jmp(&mut table, "jmp0", "fill"),
        Err(AsmError::ReservedTarget {
            slot: "jmp0".to_string(),
            label: "fill".to_string()
        })
    );
}

#[test]
fn test_refused_branch_keeps_earlier_patch() {
    let map_bank = MemoryBank::from_config(&crate::config::BankConfig::new("I", 8));
    let (_, mut table) = fixture(1);
    let mut stream = InstructionStream::begin(map_bank, Lane(0), Addr(0)).unwrap();
    stream.label("fill").unwrap();
    stream.nop().unwrap();
    stream.jne(&mut table, Some(true), "jmp0", "done").unwrap();
    stream.nop().unwrap();
    assert!(matches!(
        stream.jmp(&mut table, "jmp0", "fill"),
        Err(AsmError::ReservedTarget { .. })
    ));
    assert_eq!(stream.pending().len(), 1);
    assert_eq!(stream.branches().count(), 1);

    // the unconditional writer is still free
    stream.label("done").unwrap();
    stream.nop().unwrap();
    stream.jmp(&mut table, "jmp0", "done").unwrap();
    stream.resolve_forward_jumps(&mut table).unwrap();
    assert_eq!(table.value(Lane(0), "jmp0"), Ok(Addr(2)));
}
