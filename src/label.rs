use std::collections::{BTreeMap, HashMap};

use crate::data::Addr;
use crate::error::{AsmError, AsmResult};
use crate::symbol::{LabelId, SymbolTable};

/// Where a label points. Reads are bank-local, writes go through the shared
/// write space, and the two may disagree for ports and pointer registers.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct Binding {
    pub read: Addr,
    pub write: Addr,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Lookup {
    Resolved(Binding),
    Unresolved,
}

impl Lookup {
    pub fn binding(self) -> Option<Binding> {
        match self {
            Lookup::Resolved(binding) => Some(binding),
            Lookup::Unresolved => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Lookup::Resolved(_))
    }
}

#[derive(Clone, Debug)]
pub struct LabelTable {
    bank: String,
    symbols: SymbolTable,
    bindings: HashMap<LabelId, Binding>,
    order: Vec<LabelId>,
    // first label defined at a read address, used to annotate dumps
    by_address: BTreeMap<Addr, LabelId>,
}

impl LabelTable {
    pub fn new<T: Into<String>>(bank: T) -> LabelTable {
        LabelTable {
            bank: bank.into(),
            symbols: SymbolTable::new(),
            bindings: HashMap::new(),
            order: vec![],
            by_address: BTreeMap::new(),
        }
    }

    pub fn define(&mut self, name: &str, binding: Binding) -> AsmResult<()> {
        if let Lookup::Resolved(existing) = self.lookup(name) {
            return Err(AsmError::DuplicateLabel {
                bank: self.bank.clone(),
                label: name.to_string(),
                address: existing.read,
            });
        }

        let id = self.symbols.intern(name);
        self.bindings.insert(id, binding);
        self.order.push(id);
        self.by_address.entry(binding.read).or_insert(id);
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Lookup {
        match self
            .symbols
            .get(name)
            .and_then(|id| self.bindings.get(&id))
        {
            Some(binding) => Lookup::Resolved(*binding),
            None => Lookup::Unresolved,
        }
    }

    pub fn name_at(&self, address: Addr) -> Option<&str> {
        self.by_address
            .get(&address)
            .and_then(|id| self.symbols.resolve(*id))
    }

    /// Labels in definition order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Binding)> + '_ {
        self.order.iter().filter_map(move |id| {
            let name = self.symbols.resolve(*id)?;
            Some((name, self.bindings[id]))
        })
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

#[cfg(test)]
fn at(read: usize) -> Binding {
    Binding {
        read: Addr(read),
        write: Addr(read),
    }
}

#[test]
fn test_define_and_lookup() {
    let mut table = LabelTable::new("A");
    table.define("one", at(1)).unwrap();
    assert_eq!(table.lookup("one"), Lookup::Resolved(at(1)));
    assert_eq!(table.lookup("two"), Lookup::Unresolved);
}

#[test]
fn test_duplicate_reports_first_address() {
    let mut table = LabelTable::new("A");
    table.define("one", at(1)).unwrap();
    assert_eq!(
        table.define("one", at(7)),
        Err(AsmError::DuplicateLabel {
            bank: "A".to_string(),
            label: "one".to_string(),
            address: Addr(1),
        })
    );
    assert_eq!(table.lookup("one"), Lookup::Resolved(at(1)));
}

#[test]
fn test_name_at_keeps_first_label() {
    let mut table = LabelTable::new("I");
    table.define("output", at(9)).unwrap();
    table.define("output_again", at(9)).unwrap();
    assert_eq!(table.name_at(Addr(9)), Some("output"));
    assert_eq!(table.name_at(Addr(8)), None);
}

#[test]
fn test_iter_in_definition_order() {
    let mut table = LabelTable::new("B");
    table.define("temp", at(3)).unwrap();
    table.define("array", at(4)).unwrap();
    table.define("count", at(2)).unwrap();
    let names = table.iter().map(|(n, _)| n).collect::<Vec<_>>();
    assert_eq!(names, vec!["temp", "array", "count"]);
}
