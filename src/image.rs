use std::fmt::{Error, Write};
use std::fs;
use std::path::Path;

use crate::bank::MemoryBank;

/// Finished memory images of one assembly run, in memory map order.
#[derive(Clone, Debug, Default)]
pub struct ImageSet {
    banks: Vec<MemoryBank>,
}

impl ImageSet {
    pub fn new(banks: Vec<MemoryBank>) -> ImageSet {
        ImageSet { banks }
    }

    pub fn get(&self, name: &str) -> Option<&MemoryBank> {
        self.banks.iter().find(|b| b.name() == name)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, MemoryBank> {
        self.banks.iter()
    }

    pub fn len(&self) -> usize {
        self.banks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.banks.is_empty()
    }

    /// Writes one `<bank>.mem` file per bank into `dir`.
    pub fn write_to(&self, dir: &Path) -> std::io::Result<usize> {
        fs::create_dir_all(dir)?;
        for bank in self.banks.iter() {
            fs::write(dir.join(format!("{}.mem", bank.name())), mem_dump(bank))?;
        }
        Ok(self.banks.len())
    }
}

impl<'a> IntoIterator for &'a ImageSet {
    type Item = &'a MemoryBank;
    type IntoIter = std::slice::Iter<'a, MemoryBank>;

    fn into_iter(self) -> Self::IntoIter {
        self.banks.iter()
    }
}

/// One hex word per line over the whole depth, readable by `$readmemh`.
pub fn mem_dump(bank: &MemoryBank) -> String {
    fn writeout_impl(bank: &MemoryBank) -> Result<String, Error> {
        let digits = (bank.width() as usize + 3) / 4;
        let mut out = String::new();
        for cell in bank.cells() {
            writeln!(out, "{:0digits$x}", cell.word.0)?;
        }
        Ok(out)
    }

    writeout_impl(bank).unwrap_or_else(|e| format!("{e}"))
}

#[cfg(test)]
use crate::config::BankConfig;

#[test]
fn test_dump_pads_to_width() {
    let mut bank = MemoryBank::from_config(&BankConfig::new("BC", 3).with_width(3));
    bank.write_literal(6, None).unwrap();
    assert_eq!(mem_dump(&bank), "6\n0\n0\n");

    let mut bank = MemoryBank::from_config(&BankConfig::new("A", 2));
    bank.write_literal(-1, None).unwrap();
    assert_eq!(mem_dump(&bank), "fffffffff\n000000000\n");
}

#[test]
fn test_lookup_by_name() {
    let images = ImageSet::new(vec![
        MemoryBank::from_config(&BankConfig::new("A", 1)),
        MemoryBank::from_config(&BankConfig::new("B", 1)),
    ]);
    assert_eq!(images.len(), 2);
    assert_eq!(images.get("B").map(|b| b.name()), Some("B"));
    assert!(images.get("C").is_none());
}
