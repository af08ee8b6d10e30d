use std::fmt;

/// Unique identifier for an interned symbol.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct SymbolId(pub u32);

/// Index into the cell arena. This is the GC handle.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellId(pub u32);

/// A reference as stored in cell fields and scope chains.
/// Copy semantics; the cell data lives in the heap.
///
/// Symbols carry no arena payload, so they are referenced directly by their
/// symbol table entry. Identity comparison is plain `==`.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub enum Value {
    Nil,
    Symbol(SymbolId),
    Cell(CellId),
}

/// The observable tag of a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tag {
    Nil,
    Symbol,
    Cons,
    Number,
    Builtin,
    Lambda,
    Quote,
    Free,
}

impl Value {
    pub fn is_nil(self) -> bool {
        matches!(self, Value::Nil)
    }

    pub fn as_symbol(self) -> Option<SymbolId> {
        match self {
            Value::Symbol(id) => Some(id),
            _ => None,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "Nil"),
            Value::Symbol(id) => write!(f, "Sym({})", id.0),
            Value::Cell(id) => write!(f, "Cell({})", id.0),
        }
    }
}

impl fmt::Debug for SymbolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SymbolId({})", self.0)
    }
}

impl fmt::Debug for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CellId({})", self.0)
    }
}
