use std::collections::HashMap;
use std::fmt::{Display, Formatter};

use log::debug;

use crate::bank::MemoryBank;
use crate::config::MemoryMap;
use crate::data::{Addr, Lane, Word};
use crate::error::{AsmError, AsmResult};

/// Bank holding the resolved jump destinations.
pub const DESTINATION: &str = "BD";
/// Optional companion columns, written at the same cell as the destination.
pub const ORIGIN: &str = "BO";
pub const CONDITION: &str = "BC";
pub const PREDICTION: &str = "BP";
pub const PREDICTION_ENABLE: &str = "BPE";

pub const COLUMNS: [&str; 5] = [DESTINATION, ORIGIN, CONDITION, PREDICTION, PREDICTION_ENABLE];

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Condition {
    Always,
    Equal,
    NotEqual,
    Zero,
    NotZero,
    ParityEven,
    ParityOdd,
}

impl Condition {
    pub const ALL: [Condition; 7] = [
        Condition::Always,
        Condition::Equal,
        Condition::NotEqual,
        Condition::Zero,
        Condition::NotZero,
        Condition::ParityEven,
        Condition::ParityOdd,
    ];

    pub fn code(self) -> u8 {
        match self {
            Condition::Always => 0,
            Condition::Equal => 1,
            Condition::NotEqual => 2,
            Condition::Zero => 3,
            Condition::NotZero => 4,
            Condition::ParityEven => 5,
            Condition::ParityOdd => 6,
        }
    }

    pub fn mnemonic(self) -> &'static str {
        match self {
            Condition::Always => "JMP",
            Condition::Equal => "JEQ",
            Condition::NotEqual => "JNE",
            Condition::Zero => "JZE",
            Condition::NotZero => "JNZ",
            Condition::ParityEven => "JPE",
            Condition::ParityOdd => "JPO",
        }
    }

    pub fn is_unconditional(self) -> bool {
        self == Condition::Always
    }
}

impl Display for Condition {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), std::fmt::Error> {
        write!(f, "{}", self.mnemonic())
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Slot {
    pub name: String,
    pub lane: Lane,
    pub index: usize,
    /// Bank-local cell in every column.
    pub cell: Addr,
    /// Where the destination column sits in the write space.
    pub address: Addr,
    unconditional: bool,
    conditional: bool,
}

/// Per-lane table of pre-resolved jump targets.
///
/// Each lane owns `slot_depth` consecutive cells, so slot `i` of lane `l` is
/// cell `l * slot_depth + i` in every column and two lanes never meet.
#[derive(Clone, Debug)]
pub struct BranchTable {
    destinations: MemoryBank,
    companions: Vec<MemoryBank>,
    slot_depth: usize,
    lanes: usize,
    slots: Vec<Slot>,
    by_name: HashMap<(Lane, String), usize>,
    used: Vec<usize>,
}

impl BranchTable {
    pub fn new(map: &MemoryMap) -> AsmResult<BranchTable> {
        let destinations = MemoryBank::allocate(DESTINATION, map)?;
        let slot_depth = destinations.config().depth;
        let lanes = destinations.config().lanes.unwrap_or(1);

        let mut companions = vec![];
        for name in [ORIGIN, CONDITION, PREDICTION, PREDICTION_ENABLE] {
            if !map.contains(name) {
                continue;
            }
            let bank = MemoryBank::allocate(name, map)?;
            if bank.depth() < destinations.depth() {
                return Err(AsmError::Config {
                    bank: name.to_string(),
                    reason: format!("shallower than {DESTINATION}"),
                });
            }
            companions.push(bank);
        }

        Ok(BranchTable {
            destinations,
            companions,
            slot_depth,
            lanes,
            slots: vec![],
            by_name: HashMap::new(),
            used: vec![0; lanes],
        })
    }

    pub fn slot_depth(&self) -> usize {
        self.slot_depth
    }

    pub fn lanes(&self) -> usize {
        self.lanes
    }

    pub fn cell(&self, lane: Lane, index: usize) -> Addr {
        self.destinations.base() + lane.0 * self.slot_depth + index
    }

    pub fn slot_address(&self, lane: Lane, index: usize) -> Addr {
        self.destinations.write_address(self.cell(lane, index))
    }

    /// Reserves the next free cell of `lane` for `name`.
    pub fn declare(&mut self, lane: Lane, name: &str) -> AsmResult<&Slot> {
        if lane.0 >= self.lanes {
            return Err(AsmError::LaneCapacity {
                bank: DESTINATION.to_string(),
                lane,
                lanes: self.lanes,
            });
        }
        if let Some(existing) = self.lookup(lane, name) {
            return Err(AsmError::DuplicateLabel {
                bank: DESTINATION.to_string(),
                label: name.to_string(),
                address: existing.cell,
            });
        }
        let index = self.used[lane.0];
        if index >= self.slot_depth {
            return Err(AsmError::Capacity {
                bank: DESTINATION.to_string(),
                address: self.cell(lane, index),
                depth: self.slot_depth,
            });
        }

        let cell = self.cell(lane, index);
        self.destinations
            .define(&format!("lane{}.{}", lane.0, name), cell, None)?;
        self.destinations.store(cell, Word::ZERO)?;
        let slot = Slot {
            name: name.to_string(),
            lane,
            index,
            cell,
            address: self.slot_address(lane, index),
            unconditional: false,
            conditional: false,
        };
        debug!("{}: declared {} at {} ({})", lane, name, cell, slot.address);

        self.used[lane.0] += 1;
        self.by_name.insert((lane, name.to_string()), self.slots.len());
        self.slots.push(slot);
        Ok(&self.slots[self.slots.len() - 1])
    }

    pub fn lookup(&self, lane: Lane, name: &str) -> Option<&Slot> {
        self.by_name
            .get(&(lane, name.to_string()))
            .map(|idx| &self.slots[*idx])
    }

    fn require(&self, lane: Lane, name: &str) -> AsmResult<usize> {
        self.by_name
            .get(&(lane, name.to_string()))
            .copied()
            .ok_or_else(|| AsmError::UnknownLabel {
                bank: DESTINATION.to_string(),
                label: name.to_string(),
            })
    }

    /// Records that a branch of kind `condition` writes this slot. A slot takes
    /// at most one unconditional and one conditional writer.
    pub fn claim_writer(&mut self, lane: Lane, name: &str, condition: Condition) -> AsmResult<()> {
        let idx = self.require(lane, name)?;
        let slot = &mut self.slots[idx];
        let taken = if condition.is_unconditional() {
            &mut slot.unconditional
        } else {
            &mut slot.conditional
        };
        if *taken {
            return Err(AsmError::SlotReuse {
                slot: name.to_string(),
                condition,
            });
        }
        *taken = true;
        Ok(())
    }

    /// Fails if `target` is wider than a destination word.
    pub fn check_destination(&self, target: Addr) -> AsmResult<()> {
        self.destinations.check_fits(DESTINATION, target)
    }

    /// Fails if `origin` is wider than an origin word. Maps without `BO`
    /// accept any origin.
    pub fn check_origin(&self, origin: Addr) -> AsmResult<()> {
        match self.column(ORIGIN) {
            Some(bank) => bank.check_fits(ORIGIN, origin),
            None => Ok(()),
        }
    }

    /// Writes the destination column. Address 0 is the unresolved placeholder.
    pub fn stage(&mut self, lane: Lane, name: &str, target: Addr) -> AsmResult<()> {
        let idx = self.require(lane, name)?;
        self.check_destination(target)?;
        let cell = self.slots[idx].cell;
        debug!("{}: staged {} = {}", lane, name, target);
        self.destinations.store(cell, Word::from(target))
    }

    /// Fills the companion columns for the branch owning the slot.
    pub fn annotate(
        &mut self,
        lane: Lane,
        name: &str,
        origin: Addr,
        condition: Condition,
        prediction: Option<bool>,
    ) -> AsmResult<()> {
        let idx = self.require(lane, name)?;
        self.check_origin(origin)?;
        let cell = self.slots[idx].cell;
        for bank in self.companions.iter_mut() {
            let word = match bank.name() {
                ORIGIN => Word::from(origin),
                CONDITION => Word(condition.code() as u64),
                PREDICTION => Word(prediction.unwrap_or(false) as u64),
                _ => Word(prediction.is_some() as u64),
            };
            bank.store(cell, word)?;
        }
        Ok(())
    }

    pub fn value(&self, lane: Lane, name: &str) -> AsmResult<Addr> {
        let idx = self.require(lane, name)?;
        Ok(Addr(self.destinations.get(self.slots[idx].cell).0 as usize))
    }

    /// Slots in declaration order.
    pub fn slots(&self) -> std::slice::Iter<'_, Slot> {
        self.slots.iter()
    }

    pub fn column(&self, name: &str) -> Option<&MemoryBank> {
        if name == DESTINATION {
            return Some(&self.destinations);
        }
        self.companions.iter().find(|b| b.name() == name)
    }

    pub fn into_banks(self) -> Vec<MemoryBank> {
        let mut banks = vec![self.destinations];
        banks.extend(self.companions);
        banks
    }
}

#[cfg(test)]
fn table(lanes: usize, depth: usize) -> BranchTable {
    use crate::config::BankConfig;
    let map = MemoryMap::new()
        .with(BankConfig::new("BD", depth).with_lanes(lanes).with_origin(100))
        .and_then(|m| m.with(BankConfig::new("BC", depth).with_lanes(lanes).with_width(3)))
        .unwrap();
    BranchTable::new(&map).unwrap()
}

#[test]
fn test_slot_addressing() {
    let table = table(4, 8);
    assert_eq!(table.cell(Lane(0), 3), Addr(3));
    assert_eq!(table.cell(Lane(2), 1), Addr(17));
    assert_eq!(table.slot_address(Lane(2), 1), Addr(117));
}

#[test]
fn test_declare_fills_lane_in_order() {
    let mut table = table(2, 2);
    assert_eq!(table.declare(Lane(1), "a").unwrap().cell, Addr(2));
    assert_eq!(table.declare(Lane(1), "b").unwrap().cell, Addr(3));
    assert!(matches!(
        table.declare(Lane(1), "c"),
        Err(AsmError::Capacity { .. })
    ));
    assert_eq!(table.declare(Lane(0), "c").unwrap().cell, Addr(0));
}

#[test]
fn test_lane_out_of_range() {
    let mut table = table(2, 2);
    assert_eq!(
        table.declare(Lane(2), "a").unwrap_err(),
        AsmError::LaneCapacity {
            bank: "BD".to_string(),
            lane: Lane(2),
            lanes: 2
        }
    );
}

#[test]
fn test_same_name_in_two_lanes() {
    let mut table = table(2, 4);
    table.declare(Lane(0), "jmp0").unwrap();
    table.declare(Lane(1), "jmp0").unwrap();
    table.stage(Lane(1), "jmp0", Addr(9)).unwrap();
    assert_eq!(table.value(Lane(0), "jmp0"), Ok(Addr(0)));
    assert_eq!(table.value(Lane(1), "jmp0"), Ok(Addr(9)));
    assert!(matches!(
        table.declare(Lane(0), "jmp0"),
        Err(AsmError::DuplicateLabel { .. })
    ));
}

#[test]
fn test_writer_kinds() {
    let mut table = table(1, 4);
    table.declare(Lane(0), "jmp1").unwrap();
    table.claim_writer(Lane(0), "jmp1", Condition::Always).unwrap();
    table.claim_writer(Lane(0), "jmp1", Condition::NotZero).unwrap();
    assert_eq!(
        table.claim_writer(Lane(0), "jmp1", Condition::ParityOdd),
        Err(AsmError::SlotReuse {
            slot: "jmp1".to_string(),
            condition: Condition::ParityOdd
        })
    );
}

#[test]
fn test_annotate_writes_present_columns_only() {
    let mut table = table(1, 4);
    table.declare(Lane(0), "jmp0").unwrap();
    table
        .annotate(Lane(0), "jmp0", Addr(5), Condition::NotEqual, Some(false))
        .unwrap();
    let conditions = table.column("BC").unwrap();
    assert_eq!(conditions.get(Addr(0)), Word(2));
    assert!(table.column("BO").is_none());
}

#[test]
fn test_target_wider_than_destination() {
    let mut table = table(1, 4);
    table.declare(Lane(0), "jmp0").unwrap();
    table.stage(Lane(0), "jmp0", Addr(7)).unwrap();
    assert_eq!(
        table.stage(Lane(0), "jmp0", Addr(1 << 36)),
        Err(AsmError::FieldOverflow {
            field: "BD",
            value: 1 << 36,
            width: 36
        })
    );
    assert_eq!(table.value(Lane(0), "jmp0"), Ok(Addr(7)));
}

#[test]
fn test_stage_undeclared() {
    let mut table = table(1, 4);
    assert!(matches!(
        table.stage(Lane(0), "nope", Addr(1)),
        Err(AsmError::UnknownLabel { .. })
    ));
}
