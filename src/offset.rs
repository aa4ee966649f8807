//! Programmed offset words.
//!
//! A programmed offset configures one lane's indirect pointer so that every
//! access auto-increments and wraps inside a post-increment window. The read
//! offset is relative to the read bank, the write offset to the write space.

use std::fmt::{Display, Formatter};

use crate::config::MemoryMap;
use crate::data::{Addr, Word};
use crate::error::AsmResult;

const READ_ENABLE_BIT: u32 = 32;
const WRITE_ENABLE_BIT: u32 = 34;
const WRITE_SHIFT: u32 = 20;
const READ_WIDTH: u32 = 10;
const WRITE_WIDTH: u32 = 12;

const READ_RANGE: i64 = 1 << READ_WIDTH;
const WRITE_RANGE: i64 = 1 << WRITE_WIDTH;

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct ProgrammedOffset {
    pub read_enable: bool,
    pub write_enable: bool,
    pub write_offset: u16,
    pub read_offset: u16,
}

impl ProgrammedOffset {
    /// Both directions enabled, offsets reduced into their field ranges.
    pub fn new(read: i64, write: i64) -> ProgrammedOffset {
        ProgrammedOffset {
            read_enable: true,
            write_enable: true,
            write_offset: write.rem_euclid(WRITE_RANGE) as u16,
            read_offset: read.rem_euclid(READ_RANGE) as u16,
        }
    }

    /// Offsets for a pointer walking `array` in `read_bank` and writing back
    /// to `array_h` in `write_bank`, taking bank geometry from the map.
    pub fn for_arrays(
        map: &MemoryMap,
        read_bank: &str,
        array: Addr,
        write_bank: &str,
        array_h: Addr,
    ) -> AsmResult<ProgrammedOffset> {
        let read = map.get(read_bank)?;
        let write = map.get(write_bank)?;
        Ok(Self::decode(encode(
            read.depth,
            read.require_po_inc_base()?.0,
            array.0,
            write.require_origin()?.0,
            write.depth,
            write.require_po_inc_base()?.0,
            array_h.0,
        )))
    }

    pub fn word(&self) -> Word {
        Word(
            (self.write_enable as u64) << WRITE_ENABLE_BIT
                | (self.read_enable as u64) << READ_ENABLE_BIT
                | (self.write_offset as u64) << WRITE_SHIFT
                | self.read_offset as u64,
        )
    }

    pub fn decode(word: Word) -> ProgrammedOffset {
        ProgrammedOffset {
            read_enable: word.0 >> READ_ENABLE_BIT & 1 == 1,
            write_enable: word.0 >> WRITE_ENABLE_BIT & 1 == 1,
            write_offset: (word.0 >> WRITE_SHIFT & (WRITE_RANGE as u64 - 1)) as u16,
            read_offset: (word.0 & (READ_RANGE as u64 - 1)) as u16,
        }
    }
}

impl Display for ProgrammedOffset {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), std::fmt::Error> {
        write!(
            f,
            "read {}{} write {}{}",
            self.read_offset,
            if self.read_enable { "" } else { " (off)" },
            self.write_offset,
            if self.write_enable { "" } else { " (off)" },
        )
    }
}

/// Packs the programmed offset for an array at `array_b` in a read bank and
/// `array_h` in a write bank. The offsets count from the start of each
/// bank's post-increment window.
pub fn encode(
    depth_b: usize,
    po_inc_base_b: usize,
    array_b: usize,
    origin_h: usize,
    depth_h: usize,
    po_inc_base_h: usize,
    array_h: usize,
) -> Word {
    let read = depth_b as i64 - po_inc_base_b as i64 + array_b as i64;
    let write = origin_h as i64 + depth_h as i64 - po_inc_base_h as i64 + array_h as i64;
    ProgrammedOffset::new(read, write).word()
}

#[test]
fn test_encode_sets_both_enables() {
    let word = encode(20, 0, 4, 0, 8, 0, 0);
    assert_eq!(word.0 & 0x3ff, 24);
    assert_eq!(word.0 >> 32 & 1, 1);
    assert_eq!(word.0 >> 34 & 1, 1);
    assert_eq!(word.0 >> 20 & 0xfff, 8);
}

#[test]
fn test_offsets_wrap_euclidean() {
    let po = ProgrammedOffset::new(-1, 4096 + 5);
    assert_eq!(po.read_offset, 1023);
    assert_eq!(po.write_offset, 5);
}

#[test]
fn test_decode_inverts_word() {
    let po = ProgrammedOffset::new(20, 1156);
    assert_eq!(po.word(), Word(0x5_4840_0014));
    assert_eq!(ProgrammedOffset::decode(po.word()), po);
}

#[test]
fn test_geometry_from_map() {
    let map = MemoryMap::builtin().unwrap();
    let po = ProgrammedOffset::for_arrays(&map, "B", Addr(4), "H", Addr(1028)).unwrap();
    assert_eq!(po.read_offset, 20);
    assert_eq!(po.write_offset, 1156);
    assert!(ProgrammedOffset::for_arrays(&map, "I", Addr(4), "H", Addr(0)).is_err());
}
