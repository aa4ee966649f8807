use std::fmt::Display;

use crate::branch::Condition;
use crate::data::{Addr, Lane};

/// Everything that can abort an assembly run. None of these are recoverable:
/// a run either produces every bank or fails before anything is serialized.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum AsmError {
    Config {
        bank: String,
        reason: String,
    },
    DuplicateLabel {
        bank: String,
        label: String,
        address: Addr,
    },
    UnknownLabel {
        bank: String,
        label: String,
    },
    UnresolvedLabel {
        bank: String,
        slot: String,
        label: String,
    },
    Capacity {
        bank: String,
        address: Addr,
        depth: usize,
    },
    LaneCapacity {
        bank: String,
        lane: Lane,
        lanes: usize,
    },
    SlotReuse {
        slot: String,
        condition: Condition,
    },
    ReservedTarget {
        slot: String,
        label: String,
    },
    Arity {
        mnemonic: &'static str,
        expected: usize,
        found: usize,
    },
    NoOrigin {
        bank: String,
        slot: String,
    },
    FieldOverflow {
        field: &'static str,
        value: i64,
        width: u32,
    },
    Finalized {
        bank: String,
    },
    Unfinalized {
        bank: String,
    },
    Unlinked {
        bank: String,
    },
}

impl AsmError {
    pub fn message(&self) -> &'static str {
        match self {
            Self::Config { .. } => "Memory map configuration error",
            Self::DuplicateLabel { .. } => "Label is already defined in this bank",
            Self::UnknownLabel { .. } => "Label is not defined",
            Self::UnresolvedLabel { .. } => "Branch target is still undefined after resolution",
            Self::Capacity { .. } => "Write past the end of the bank",
            Self::LaneCapacity { .. } => "Lane index exceeds the branch table lanes",
            Self::SlotReuse { .. } => "Branch table slot already has a writer of this kind",
            Self::ReservedTarget { .. } => "Address 0 is reserved and cannot be a branch target",
            Self::Arity { .. } => "Wrong number of operands",
            Self::NoOrigin { .. } => "Branch has no instruction to attach to",
            Self::FieldOverflow { .. } => "Operand does not fit its instruction field",
            Self::Finalized { .. } => "Instruction stream is already finalized",
            Self::Unfinalized { .. } => "Instruction stream was not resolved before linking",
            Self::Unlinked { .. } => "Bank is still held by an instruction stream",
        }
    }
}

impl Display for AsmError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())?;
        match self {
            Self::Config { bank, reason } => write!(f, " (bank {bank}): {reason}"),
            Self::DuplicateLabel {
                bank,
                label,
                address,
            } => write!(f, ": {bank}.{label} already at {address}"),
            Self::UnknownLabel { bank, label } => write!(f, ": {bank}.{label}"),
            Self::UnresolvedLabel { bank, slot, label } => {
                write!(f, ": {bank}.{label} (slot {slot})")
            }
            Self::Capacity {
                bank,
                address,
                depth,
            } => write!(f, ": {bank} {address}, depth {depth}"),
            Self::LaneCapacity { bank, lane, lanes } => {
                write!(f, ": {bank} {lane}, {lanes} lanes configured")
            }
            Self::SlotReuse { slot, condition } => write!(f, ": {slot} ({condition})"),
            Self::ReservedTarget { slot, label } => write!(f, ": {label} (slot {slot})"),
            Self::Arity {
                mnemonic,
                expected,
                found,
            } => write!(f, ": {mnemonic} takes {expected}, got {found}"),
            Self::NoOrigin { bank, slot } => write!(f, ": {bank} (slot {slot})"),
            Self::FieldOverflow {
                field,
                value,
                width,
            } => write!(f, ": {field}={value} in {width} bits"),
            Self::Finalized { bank } | Self::Unfinalized { bank } | Self::Unlinked { bank } => {
                write!(f, ": {bank}")
            }
        }
    }
}

impl From<AsmError> for String {
    fn from(value: AsmError) -> Self {
        format!("{value}")
    }
}

pub type AsmResult<T> = Result<T, AsmError>;

#[test]
fn test_display_names_bank_and_label() {
    let err = AsmError::DuplicateLabel {
        bank: "B".to_string(),
        label: "temp".to_string(),
        address: Addr(3),
    };
    assert_eq!(
        err.to_string(),
        "Label is already defined in this bank: B.temp already at @3"
    );
}

#[test]
fn test_into_string() {
    let err = AsmError::UnresolvedLabel {
        bank: "I".to_string(),
        slot: "jmp0".to_string(),
        label: "break".to_string(),
    };
    let text: String = err.into();
    assert!(text.contains("I.break"));
    assert!(text.contains("jmp0"));
}
