use string_interner::{DefaultBackend, StringInterner};

// label ids are plain indices, the top bit is kept free so that an id
// can never be confused with a packed machine word in debug dumps
const MAX_LABEL_ID: u32 = (1 << 31) - 1;

/// Interned label name. Only meaningful together with the [SymbolTable]
/// that produced it.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LabelId(u32);

impl string_interner::Symbol for LabelId {
    fn try_from_usize(index: usize) -> Option<Self> {
        let index = u32::try_from(index).ok()?;
        if index <= MAX_LABEL_ID {
            Some(Self(index))
        } else {
            None
        }
    }

    fn to_usize(self) -> usize {
        self.0 as usize
    }
}

type LabelInterner = StringInterner<DefaultBackend<LabelId>>;

/// Opaque wrapper over the library string interner.
#[derive(Debug, Clone)]
pub struct SymbolTable(LabelInterner);

impl Default for SymbolTable {
    fn default() -> Self {
        Self(LabelInterner::new())
    }
}

impl SymbolTable {
    pub fn new() -> SymbolTable {
        Default::default()
    }

    pub fn intern<T: AsRef<str>>(&mut self, name: T) -> LabelId {
        self.0.get_or_intern(name)
    }

    /// Looks a name up without interning it.
    pub fn get<T: AsRef<str>>(&self, name: T) -> Option<LabelId> {
        self.0.get(name)
    }

    pub fn resolve(&self, id: LabelId) -> Option<&str> {
        self.0.resolve(id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[test]
fn test_roundtrip() {
    let mut table = SymbolTable::new();
    let sym = table.intern("loop_pointer_init");
    assert_eq!(table.resolve(sym), Some("loop_pointer_init"))
}

#[test]
fn test_intern_is_stable() {
    let mut table = SymbolTable::new();
    let first = table.intern("jmp0");
    let second = table.intern("jmp0");
    assert_eq!(first, second);
    assert_eq!(table.len(), 1);
}

#[test]
fn test_get_does_not_intern() {
    let mut table = SymbolTable::new();
    assert_eq!(table.get("temp"), None);
    assert!(table.is_empty());
    let temp = table.intern("temp");
    assert_eq!(table.get("temp"), Some(temp));
}
