use std::collections::HashMap;

use crate::value::AtomId;

/// Interned atom table. Names, quoted symbols and string literals all keep
/// their text here; values carry only the `AtomId`.
pub struct SymbolTable {
    name_to_id: HashMap<String, AtomId>,
    id_to_name: Vec<String>,
}

/// Well-known atom IDs, pre-interned at startup.
/// These must match the order of interning in SymbolTable::new().
pub mod sym {
    use crate::value::AtomId;

    pub const SET: AtomId = AtomId(0);
    pub const DEFINE: AtomId = AtomId(1);
    pub const IF: AtomId = AtomId(2);
    pub const LAMBDA: AtomId = AtomId(3);
    pub const BEGIN: AtomId = AtomId(4);
    pub const COND: AtomId = AtomId(5);
    pub const ELSE: AtomId = AtomId(6);
    pub const LET: AtomId = AtomId(7);
    pub const PRIMITIVE: AtomId = AtomId(8);
    pub const PROCEDURE: AtomId = AtomId(9);
    pub const TRUE: AtomId = AtomId(10);
    pub const FALSE: AtomId = AtomId(11);
    pub const OK: AtomId = AtomId(12);
    pub const UNKNOWN_EXPRESSION: AtomId = AtomId(13);
    pub const UNKNOWN_PROCEDURE: AtomId = AtomId(14);
}

impl SymbolTable {
    /// Create a new table with all well-known atoms pre-interned.
    /// The order MUST match the constants in the `sym` module above.
    pub fn new() -> Self {
        let names = [
            "set!", "define", "if", "lambda", "begin", "cond", "else", "let",
            "primitive", "procedure", "true", "false", "ok",
            "unknown expression type error", "unknown procedure type error",
        ];

        let mut name_to_id = HashMap::new();
        let mut id_to_name = Vec::new();

        for (i, name) in names.iter().enumerate() {
            let id = AtomId(i as u32);
            name_to_id.insert(name.to_string(), id);
            id_to_name.push(name.to_string());
        }

        SymbolTable {
            name_to_id,
            id_to_name,
        }
    }

    /// Intern an atom. Returns the existing ID if already interned,
    /// or creates a new one.
    pub fn intern(&mut self, name: &str) -> AtomId {
        if let Some(&id) = self.name_to_id.get(name) {
            return id;
        }
        let id = AtomId(self.id_to_name.len() as u32);
        self.name_to_id.insert(name.to_string(), id);
        self.id_to_name.push(name.to_string());
        id
    }

    /// Text of an interned atom.
    pub fn name(&self, id: AtomId) -> &str {
        &self.id_to_name[id.0 as usize]
    }

    /// Look up an atom by text, without interning.
    pub fn lookup(&self, name: &str) -> Option<AtomId> {
        self.name_to_id.get(name).copied()
    }

    /// Total number of interned atoms.
    pub fn count(&self) -> usize {
        self.id_to_name.len()
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}
