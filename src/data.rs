use std::fmt::{Display, Formatter};
use std::ops;

/// Width of a machine word unless the memory map says otherwise.
pub const DEFAULT_WORD_WIDTH: u32 = 36;

/// Address inside a bank (read side) or inside the shared write space.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct Addr(pub usize);

impl ops::Add<usize> for Addr {
    type Output = Addr;

    fn add(self, rhs: usize) -> Addr {
        Addr(self.0 + rhs)
    }
}

impl ops::AddAssign<usize> for Addr {
    fn add_assign(&mut self, rhs: usize) {
        self.0 += rhs
    }
}

impl Display for Addr {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), std::fmt::Error> {
        write!(f, "@{}", self.0)
    }
}

impl From<Addr> for usize {
    fn from(value: Addr) -> Self {
        value.0
    }
}

/// A raw memory word, already masked to the width of the bank it lives in.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct Word(pub u64);

impl Word {
    pub const ZERO: Word = Word(0);

    /// Two's complement truncation of `value` to `width` bits.
    pub fn from_value(value: i64, width: u32) -> Word {
        Word(value as u64 & mask(width))
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl Display for Word {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), std::fmt::Error> {
        write!(f, "{:09x}", self.0)
    }
}

impl From<Addr> for Word {
    fn from(value: Addr) -> Self {
        Word(value.0 as u64)
    }
}

/// Hardware thread index.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct Lane(pub usize);

impl Display for Lane {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), std::fmt::Error> {
        write!(f, "lane {}", self.0)
    }
}

pub fn mask(width: u32) -> u64 {
    if width >= 64 {
        u64::MAX
    } else {
        (1 << width) - 1
    }
}

#[test]
fn test_negative_literal_masks_to_width() {
    assert_eq!(Word::from_value(-1, 36), Word(0xf_ffff_ffff));
    assert_eq!(Word::from_value(-1, 8), Word(0xff));
}

#[test]
fn test_word_display_is_fixed_width() {
    assert_eq!(Word(0x14).to_string(), "000000014");
    assert_eq!(Word::from_value(-1, 36).to_string(), "fffffffff");
}

#[test]
fn test_mask_full_width() {
    assert_eq!(mask(64), u64::MAX);
    assert_eq!(mask(10), 0x3ff);
}
