use std::fmt::{Display, Formatter};

use crate::data::{Addr, DEFAULT_WORD_WIDTH};
use crate::error::{AsmError, AsmResult};

/// Built-in memory map: four 1024-word data/code banks sharing a 4096-word
/// write space, eight lanes, and the memory-mapped configuration banks
/// living inside `H`.
pub const DEFAULT_MAP: &str = include_str!("../maps/default.map");

/// Static description of one bank.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BankConfig {
    pub name: String,
    pub base: Addr,
    pub depth: usize,
    pub width: u32,
    pub origin: Option<Addr>,
    pub io_base: Option<Addr>,
    pub po_inc_base: Option<Addr>,
    pub lanes: Option<usize>,
}

impl BankConfig {
    pub fn new<T: Into<String>>(name: T, depth: usize) -> BankConfig {
        BankConfig {
            name: name.into(),
            base: Addr(0),
            depth,
            width: DEFAULT_WORD_WIDTH,
            origin: None,
            io_base: None,
            po_inc_base: None,
            lanes: None,
        }
    }

    pub fn with_origin(mut self, origin: usize) -> Self {
        self.origin = Some(Addr(origin));
        self
    }

    pub fn with_io_base(mut self, io_base: usize) -> Self {
        self.io_base = Some(Addr(io_base));
        self
    }

    pub fn with_po_inc_base(mut self, po_inc_base: usize) -> Self {
        self.po_inc_base = Some(Addr(po_inc_base));
        self
    }

    pub fn with_lanes(mut self, lanes: usize) -> Self {
        self.lanes = Some(lanes);
        self
    }

    pub fn with_width(mut self, width: u32) -> Self {
        self.width = width;
        self
    }

    /// Number of words the bank physically holds. Banks split into lanes
    /// hold `depth` words per lane.
    pub fn capacity(&self) -> usize {
        self.depth * self.lanes.unwrap_or(1)
    }

    pub fn require_origin(&self) -> AsmResult<Addr> {
        self.origin.ok_or_else(|| self.missing("origin"))
    }

    pub fn require_io_base(&self) -> AsmResult<Addr> {
        self.io_base.ok_or_else(|| self.missing("io_base"))
    }

    pub fn require_po_inc_base(&self) -> AsmResult<Addr> {
        self.po_inc_base.ok_or_else(|| self.missing("po_inc_base"))
    }

    fn missing(&self, key: &str) -> AsmError {
        AsmError::Config {
            bank: self.name.clone(),
            reason: format!("no {key} configured"),
        }
    }

    fn set(&mut self, key: &str, value: usize) -> AsmResult<()> {
        match key {
            "base" => self.base = Addr(value),
            "depth" => self.depth = value,
            "width" => {
                self.width = u32::try_from(value)
                    .ok()
                    .filter(|w| (1..=64).contains(w))
                    .ok_or_else(|| AsmError::Config {
                        bank: self.name.clone(),
                        reason: format!("word width {value} out of range"),
                    })?
            }
            "origin" => self.origin = Some(Addr(value)),
            "io_base" => self.io_base = Some(Addr(value)),
            "po_inc_base" => self.po_inc_base = Some(Addr(value)),
            "lanes" => self.lanes = Some(value),
            other => {
                return Err(AsmError::Config {
                    bank: self.name.clone(),
                    reason: format!("unknown key {other}"),
                })
            }
        }
        Ok(())
    }
}

impl Display for BankConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), std::fmt::Error> {
        write!(f, "{} base={} depth={}", self.name, self.base.0, self.depth)?;
        if self.width != DEFAULT_WORD_WIDTH {
            write!(f, " width={}", self.width)?;
        }
        let optional = [
            ("origin", self.origin.map(usize::from)),
            ("io_base", self.io_base.map(usize::from)),
            ("po_inc_base", self.po_inc_base.map(usize::from)),
            ("lanes", self.lanes),
        ];
        for (key, value) in optional {
            if let Some(value) = value {
                write!(f, " {key}={value}")?;
            }
        }
        Ok(())
    }
}

type Field = (String, usize);
type Entry = (String, Vec<Field>);

peg::parser!(
    grammar map_parser() for str {
        rule hex() -> usize
            = "0x" n:$(['0'..='9' | 'a'..='f' | 'A'..='F']+) {? usize::from_str_radix(n, 16).or(Err("hex number")) }

        rule decimal() -> usize
            = n:$(['0'..='9']+) {? n.parse().or(Err("number")) }

        rule number() -> usize
            = hex() / decimal()

        rule whitespace()
            = [' ' | '\t' | '\r']

        rule comment()
            = "#" [^'\n']*

        rule _()
            = whitespace()* comment()?

        rule identifier() -> String
            = s:$(['a'..='z' | 'A'..='Z' | '_'] ['a'..='z' | 'A'..='Z' | '0'..='9' | '_']*) { s.to_string() }

        rule field() -> Field
            = k:identifier() "=" v:number() { (k, v) }

        rule entry() -> Entry
            = name:identifier() fields:(whitespace()+ f:field() { f })* { (name, fields) }

        rule line() -> Option<Entry>
            = whitespace()* e:entry()? _ { e }

        pub rule lines() -> Vec<Option<Entry>>
            = line() ** "\n"
    }
);

/// Table of every bank the target machine has, in declaration order.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct MemoryMap {
    banks: Vec<BankConfig>,
}

impl MemoryMap {
    pub fn new() -> MemoryMap {
        Default::default()
    }

    pub fn builtin() -> AsmResult<MemoryMap> {
        Self::parse(DEFAULT_MAP)
    }

    pub fn parse(text: &str) -> AsmResult<MemoryMap> {
        let entries = map_parser::lines(text).map_err(|e| AsmError::Config {
            bank: "<map>".to_string(),
            reason: format!("{e}"),
        })?;

        let mut map = MemoryMap::new();
        for (name, fields) in entries.into_iter().flatten() {
            let mut config = BankConfig::new(name, 0);
            let mut has_depth = false;
            for (key, value) in fields {
                has_depth |= key == "depth";
                config.set(&key, value)?;
            }
            if !has_depth {
                return Err(config.missing("depth"));
            }
            map.insert(config)?;
        }
        Ok(map)
    }

    pub fn insert(&mut self, config: BankConfig) -> AsmResult<()> {
        if self.contains(&config.name) {
            return Err(AsmError::Config {
                bank: config.name,
                reason: "bank declared twice".to_string(),
            });
        }
        self.banks.push(config);
        Ok(())
    }

    pub fn with(mut self, config: BankConfig) -> AsmResult<Self> {
        self.insert(config)?;
        Ok(self)
    }

    pub fn get(&self, name: &str) -> AsmResult<&BankConfig> {
        self.banks
            .iter()
            .find(|b| b.name == name)
            .ok_or_else(|| AsmError::Config {
                bank: name.to_string(),
                reason: "bank is not in the memory map".to_string(),
            })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.banks.iter().any(|b| b.name == name)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, BankConfig> {
        self.banks.iter()
    }

    pub fn len(&self) -> usize {
        self.banks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.banks.is_empty()
    }
}

impl Display for MemoryMap {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), std::fmt::Error> {
        for bank in self.banks.iter() {
            writeln!(f, "{bank}")?;
        }
        Ok(())
    }
}

#[test]
fn test_parse_fields_and_comments() {
    const MAP: &str = r#"
# data banks
A   depth=1024 origin=0 io_base=0x3f8   # trailing comment
B   depth=16 base=2 width=18 lanes=4
"#;
    let map = MemoryMap::parse(MAP).unwrap();
    assert_eq!(map.len(), 2);

    let a = map.get("A").unwrap();
    assert_eq!(a.depth, 1024);
    assert_eq!(a.origin, Some(Addr(0)));
    assert_eq!(a.io_base, Some(Addr(0x3f8)));
    assert_eq!(a.po_inc_base, None);

    let b = map.get("B").unwrap();
    assert_eq!(b.base, Addr(2));
    assert_eq!(b.width, 18);
    assert_eq!(b.capacity(), 64);
}

#[test]
fn test_unknown_key_is_config_error() {
    let err = MemoryMap::parse("A depth=4 colour=3").unwrap_err();
    assert!(matches!(err, AsmError::Config { ref bank, .. } if bank == "A"));
}

#[test]
fn test_missing_depth_is_config_error() {
    assert!(matches!(
        MemoryMap::parse("A origin=4"),
        Err(AsmError::Config { .. })
    ));
}

#[test]
fn test_duplicate_bank_is_config_error() {
    assert!(matches!(
        MemoryMap::parse("A depth=4\nA depth=8"),
        Err(AsmError::Config { .. })
    ));
}

#[test]
fn test_unknown_bank_lookup() {
    let map = MemoryMap::new();
    assert!(matches!(map.get("Q"), Err(AsmError::Config { .. })));
}

#[test]
fn test_builtin_map_parses() {
    let map = MemoryMap::builtin().unwrap();
    for name in ["PC", "A", "B", "I", "H", "BPO", "BO", "BD", "BC", "BP", "BPE"] {
        assert!(map.contains(name), "{name} missing from the built-in map");
    }
}

#[test]
fn test_display_roundtrips() {
    let map = MemoryMap::builtin().unwrap();
    assert_eq!(MemoryMap::parse(&map.to_string()).unwrap(), map);
}
