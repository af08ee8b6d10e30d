use std::collections::HashMap;

use crate::value::SymbolId;

/// Interned symbol table. Each unique name maps to exactly one SymbolId,
/// so symbol identity is an integer comparison, never a string comparison.
/// Entries are append-only.
pub struct SymbolTable {
    name_to_id: HashMap<String, SymbolId>,
    id_to_name: Vec<String>,
}

/// Well-known symbol IDs, pre-interned at startup.
/// These must match the order of interning in SymbolTable::new().
pub mod sym {
    use crate::value::SymbolId;

    pub const NIL: SymbolId = SymbolId(0);
    pub const T: SymbolId = SymbolId(1);
    pub const DEFUN: SymbolId = SymbolId(2);
    pub const SETQ: SymbolId = SymbolId(3);
    pub const LAMBDA: SymbolId = SymbolId(4);
    pub const MINUS: SymbolId = SymbolId(5);
}

impl SymbolTable {
    /// Create a new symbol table with the well-known symbols pre-interned.
    pub fn new() -> Self {
        let mut table = SymbolTable {
            name_to_id: HashMap::new(),
            id_to_name: Vec::new(),
        };
        for name in ["NIL", "T", "DEFUN", "SETQ", "LAMBDA", "-"] {
            table.intern(name);
        }
        table
    }

    /// Intern a symbol name. Returns the existing ID if already interned,
    /// or appends a new entry.
    pub fn intern(&mut self, name: &str) -> SymbolId {
        if let Some(&id) = self.name_to_id.get(name) {
            return id;
        }
        let id = SymbolId(self.id_to_name.len() as u32);
        self.name_to_id.insert(name.to_string(), id);
        self.id_to_name.push(name.to_string());
        id
    }

    /// Look up a symbol name by its ID.
    pub fn name(&self, id: SymbolId) -> &str {
        &self.id_to_name[id.0 as usize]
    }

    /// Look up a symbol ID by name, without interning.
    pub fn lookup(&self, name: &str) -> Option<SymbolId> {
        self.name_to_id.get(name).copied()
    }

    /// Total number of interned symbols.
    pub fn count(&self) -> usize {
        self.id_to_name.len()
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}
