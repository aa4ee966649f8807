use std::collections::BTreeMap;

use log::{trace, warn};

use crate::config::{BankConfig, MemoryMap};
use crate::data::{mask, Addr, Word};
use crate::error::{AsmError, AsmResult};
use crate::label::{Binding, LabelTable, Lookup};

/// One word of a bank as handed to serialization.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Entry<'a> {
    pub address: Addr,
    pub word: Word,
    pub label: Option<&'a str>,
}

/// A named, independently addressed store of words with its own labels.
///
/// Words are written at a cursor that starts at the bank base. The bank
/// never wraps: any write at or past `base + capacity` fails.
#[derive(Clone, Debug)]
pub struct MemoryBank {
    config: BankConfig,
    cursor: Addr,
    words: BTreeMap<Addr, Word>,
    labels: LabelTable,
}

impl MemoryBank {
    pub fn allocate(name: &str, map: &MemoryMap) -> AsmResult<MemoryBank> {
        Ok(Self::from_config(map.get(name)?))
    }

    pub fn from_config(config: &BankConfig) -> MemoryBank {
        MemoryBank {
            config: config.clone(),
            cursor: config.base,
            words: BTreeMap::new(),
            labels: LabelTable::new(config.name.as_str()),
        }
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn config(&self) -> &BankConfig {
        &self.config
    }

    pub fn base(&self) -> Addr {
        self.config.base
    }

    pub fn depth(&self) -> usize {
        self.config.capacity()
    }

    pub fn width(&self) -> u32 {
        self.config.width
    }

    pub fn cursor(&self) -> Addr {
        self.cursor
    }

    pub fn end(&self) -> Addr {
        self.base() + self.depth()
    }

    pub fn contains(&self, address: Addr) -> bool {
        address >= self.base() && address < self.end()
    }

    /// Write-space address of a bank-local address. Banks without an origin
    /// are written at their own addresses.
    pub fn write_address(&self, read: Addr) -> Addr {
        let origin = self.config.origin.unwrap_or(self.config.base);
        origin + read.0.saturating_sub(self.config.base.0)
    }

    pub fn set_cursor(&mut self, address: Addr) -> AsmResult<()> {
        if address < self.base() || address > self.end() {
            return Err(self.capacity_error(address));
        }
        self.cursor = address;
        Ok(())
    }

    pub fn write_literal(&mut self, value: i64, label: Option<&str>) -> AsmResult<Addr> {
        let word = Word::from_value(value, self.width());
        self.write_word(word, label)
    }

    pub fn write_word(&mut self, word: Word, label: Option<&str>) -> AsmResult<Addr> {
        let address = self.cursor;
        if !self.contains(address) {
            return Err(self.capacity_error(address));
        }
        if let Some(name) = label {
            self.define(name, address, None)?;
        }
        self.put(address, word);
        self.cursor += 1;
        trace!("{}: {} = {} {}", self.name(), address, word, label.unwrap_or(""));
        Ok(address)
    }

    /// Names an I/O port or pointer register at `address` without moving the
    /// cursor. With `write` given, the label resolves to that write-space
    /// address instead of the one the bank origin implies.
    pub fn write_parameter(
        &mut self,
        name: &str,
        address: Addr,
        write: Option<Addr>,
    ) -> AsmResult<()> {
        if !self.contains(address) {
            return Err(self.capacity_error(address));
        }
        self.define(name, address, write)?;
        self.words.entry(address).or_insert(Word::ZERO);
        Ok(())
    }

    /// Overwrites a word in place. Used for patching staged values.
    pub fn store(&mut self, address: Addr, word: Word) -> AsmResult<()> {
        if !self.contains(address) {
            return Err(self.capacity_error(address));
        }
        self.put(address, word);
        Ok(())
    }

    /// Fails unless `value` fits one word of this bank.
    pub fn check_fits(&self, field: &'static str, value: Addr) -> AsmResult<()> {
        if value.0 as u64 > mask(self.width()) {
            return Err(AsmError::FieldOverflow {
                field,
                value: value.0 as i64,
                width: self.width(),
            });
        }
        Ok(())
    }

    /// Binds `name` without writing anything.
    pub fn define(&mut self, name: &str, read: Addr, write: Option<Addr>) -> AsmResult<()> {
        if read < self.base() {
            return Err(self.capacity_error(read));
        }
        let binding = Binding {
            read,
            write: write.unwrap_or_else(|| self.write_address(read)),
        };
        self.labels.define(name, binding)
    }

    pub fn lookup(&self, name: &str) -> Lookup {
        self.labels.lookup(name)
    }

    pub fn resolve_read(&self, name: &str) -> AsmResult<Addr> {
        self.resolve(name).map(|binding| binding.read)
    }

    pub fn resolve_write(&self, name: &str) -> AsmResult<Addr> {
        self.resolve(name).map(|binding| binding.write)
    }

    fn resolve(&self, name: &str) -> AsmResult<Binding> {
        self.lookup(name)
            .binding()
            .ok_or_else(|| AsmError::UnknownLabel {
                bank: self.name().to_string(),
                label: name.to_string(),
            })
    }

    pub fn labels(&self) -> &LabelTable {
        &self.labels
    }

    pub fn get(&self, address: Addr) -> Word {
        self.words.get(&address).copied().unwrap_or(Word::ZERO)
    }

    pub fn is_written(&self, address: Addr) -> bool {
        self.words.contains_key(&address)
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Written words in address order.
    pub fn entries(&self) -> impl Iterator<Item = Entry<'_>> + '_ {
        self.words.iter().map(move |(address, word)| Entry {
            address: *address,
            word: *word,
            label: self.labels.name_at(*address),
        })
    }

    /// Every word of the bank, unwritten ones as zero.
    pub fn cells(&self) -> impl Iterator<Item = Entry<'_>> + '_ {
        (self.base().0..self.end().0).map(move |a| Entry {
            address: Addr(a),
            word: self.get(Addr(a)),
            label: self.labels.name_at(Addr(a)),
        })
    }

    fn put(&mut self, address: Addr, word: Word) {
        let word = Word(word.0 & mask(self.width()));
        if let Some(old) = self.words.insert(address, word) {
            if old != word && !old.is_zero() {
                warn!("{}: {} overwritten, {} -> {}", self.name(), address, old, word);
            }
        }
    }

    fn capacity_error(&self, address: Addr) -> AsmError {
        AsmError::Capacity {
            bank: self.name().to_string(),
            address,
            depth: self.depth(),
        }
    }
}

#[cfg(test)]
fn small_bank(depth: usize) -> MemoryBank {
    MemoryBank::from_config(&BankConfig::new("B", depth).with_origin(1024))
}

#[test]
fn test_literals_advance_cursor() {
    let mut bank = small_bank(8);
    assert_eq!(bank.write_literal(0, None), Ok(Addr(0)));
    assert_eq!(bank.write_literal(10, Some("count")), Ok(Addr(1)));
    assert_eq!(bank.cursor(), Addr(2));
    assert_eq!(bank.get(Addr(1)), Word(10));
    assert_eq!(bank.resolve_read("count"), Ok(Addr(1)));
    assert_eq!(bank.resolve_write("count"), Ok(Addr(1025)));
}

#[test]
fn test_write_past_depth_fails() {
    let mut bank = small_bank(2);
    bank.write_literal(1, None).unwrap();
    bank.write_literal(2, None).unwrap();
    assert_eq!(
        bank.write_literal(3, None),
        Err(AsmError::Capacity {
            bank: "B".to_string(),
            address: Addr(2),
            depth: 2
        })
    );
    assert_eq!(bank.get(Addr(0)), Word(1));
    assert_eq!(bank.len(), 2);
}

#[test]
fn test_cursor_bounds() {
    let mut bank = small_bank(4);
    assert!(bank.set_cursor(Addr(4)).is_ok());
    assert!(matches!(
        bank.set_cursor(Addr(5)),
        Err(AsmError::Capacity { .. })
    ));
}

#[test]
fn test_parameter_write_override() {
    let mut bank = small_bank(16);
    bank.write_parameter("io", Addr(12), None).unwrap();
    bank.write_parameter("pointer", Addr(8), Some(Addr(3968)))
        .unwrap();
    assert_eq!(bank.resolve_read("io"), Ok(Addr(12)));
    assert_eq!(bank.resolve_write("io"), Ok(Addr(1036)));
    assert_eq!(bank.resolve_read("pointer"), Ok(Addr(8)));
    assert_eq!(bank.resolve_write("pointer"), Ok(Addr(3968)));
    assert_eq!(bank.cursor(), Addr(0));
    assert!(bank.is_written(Addr(8)));
}

#[test]
fn test_unknown_label() {
    let bank = small_bank(4);
    assert_eq!(
        bank.resolve_read("nope"),
        Err(AsmError::UnknownLabel {
            bank: "B".to_string(),
            label: "nope".to_string()
        })
    );
}

#[test]
fn test_duplicate_label_leaves_bank_untouched() {
    let mut bank = small_bank(4);
    bank.write_literal(1, Some("one")).unwrap();
    assert!(matches!(
        bank.write_literal(2, Some("one")),
        Err(AsmError::DuplicateLabel { .. })
    ));
    assert_eq!(bank.cursor(), Addr(1));
    assert_eq!(bank.len(), 1);
}

#[test]
fn test_seek_back_and_overwrite() {
    let mut bank = small_bank(4);
    bank.write_literal(0, None).unwrap();
    bank.write_literal(0, Some("init")).unwrap();
    let init = bank.resolve_read("init").unwrap();
    bank.set_cursor(init).unwrap();
    bank.write_literal(0x55, None).unwrap();
    assert_eq!(bank.get(Addr(1)), Word(0x55));
    assert_eq!(bank.labels().name_at(Addr(1)), Some("init"));
}

#[test]
fn test_define_below_base() {
    let mut config = BankConfig::new("B", 4);
    config.base = Addr(8);
    let mut bank = MemoryBank::from_config(&config);
    assert_eq!(
        bank.define("low", Addr(3), None),
        Err(AsmError::Capacity {
            bank: "B".to_string(),
            address: Addr(3),
            depth: 4
        })
    );
    assert_eq!(bank.lookup("low"), Lookup::Unresolved);
}

#[test]
fn test_address_wider_than_word() {
    let bank = MemoryBank::from_config(&BankConfig::new("PC", 2).with_width(10));
    assert!(bank.check_fits("PC", Addr(1023)).is_ok());
    assert_eq!(
        bank.check_fits("PC", Addr(1024)),
        Err(AsmError::FieldOverflow {
            field: "PC",
            value: 1024,
            width: 10
        })
    );
}

#[test]
fn test_cells_cover_full_depth() {
    let mut bank = small_bank(3);
    bank.set_cursor(Addr(1)).unwrap();
    bank.write_literal(-1, Some("minus_one")).unwrap();
    let cells = bank.cells().collect::<Vec<_>>();
    assert_eq!(cells.len(), 3);
    assert_eq!(cells[0].word, Word::ZERO);
    assert_eq!(cells[1].word, Word(0xf_ffff_ffff));
    assert_eq!(cells[1].label, Some("minus_one"));
}
