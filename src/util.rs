use std::fmt::{Display, Error, Write};

use crate::bank::MemoryBank;
use crate::branch::COLUMNS;
use crate::image::ImageSet;

pub fn writeout<T: Display, I: Iterator<Item = T>>(items: I) -> String {
    fn writeout_impl<T: Display, I: Iterator<Item = T>>(items: I) -> Result<String, Error> {
        let mut out = String::new();
        for (idx, item) in items.enumerate() {
            writeln!(out, "{idx:#03}\t{item}")?;
        }
        Ok(out)
    }

    writeout_impl(items).unwrap_or_else(|e| format!("{e}"))
}

/// Written words of a bank with their labels, one per line.
pub fn writeout_bank(bank: &MemoryBank) -> String {
    fn writeout_impl(bank: &MemoryBank) -> Result<String, Error> {
        let mut out = String::new();
        for entry in bank.entries() {
            write!(out, "{:04}\t{}", entry.address.0, entry.word)?;
            match entry.label {
                Some(label) => writeln!(out, "\t{label}")?,
                None => writeln!(out)?,
            }
        }
        Ok(out)
    }

    writeout_impl(bank).unwrap_or_else(|e| format!("{e}"))
}

/// Branch table columns side by side, one line per written slot.
pub fn writeout_branches(images: &ImageSet) -> String {
    fn writeout_impl(images: &ImageSet) -> Result<String, Error> {
        let mut out = String::new();
        let columns = COLUMNS
            .iter()
            .filter_map(|name| images.get(name))
            .collect::<Vec<_>>();
        write!(out, "cell")?;
        for column in columns.iter() {
            write!(out, "\t{}", column.name())?;
        }
        writeln!(out)?;

        if let Some(destinations) = columns.first() {
            for entry in destinations.entries() {
                write!(out, "{:04}", entry.address.0)?;
                for column in columns.iter() {
                    write!(out, "\t{}", column.get(entry.address).0)?;
                }
                writeln!(out, "\t{}", entry.label.unwrap_or(""))?;
            }
        }
        Ok(out)
    }

    writeout_impl(images).unwrap_or_else(|e| format!("{e}"))
}

#[test]
fn test_writeout_numbers_lines() {
    assert_eq!(writeout(["a", "b"].iter()), "000\ta\n001\tb\n");
}
