//! Per-version name interner.
//!
//! Maps every canonical type name to a dense `TypeId` and stores the reverse
//! lookup. Cross-version identity is by name, never by id.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct TypeId(pub u32);

impl TypeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct NameTable {
    names: Vec<String>,
    #[serde(skip)]
    ids: HashMap<String, TypeId>,
}

impl NameTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the id for `name`, interning it if unseen. The bool is true
    /// when the name was newly interned.
    pub fn intern(&mut self, name: &str) -> (TypeId, bool) {
        if let Some(&id) = self.ids.get(name) {
            return (id, false);
        }
        let id = TypeId(self.names.len() as u32);
        self.names.push(name.to_string());
        self.ids.insert(name.to_string(), id);
        (id, true)
    }

    pub fn id_of(&self, name: &str) -> Option<TypeId> {
        self.ids.get(name).copied()
    }

    pub fn name(&self, id: TypeId) -> &str {
        &self.names[id.index()]
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (TypeId, &str)> {
        self.names
            .iter()
            .enumerate()
            .map(|(i, n)| (TypeId(i as u32), n.as_str()))
    }
}

impl From<Vec<String>> for NameTable {
    fn from(names: Vec<String>) -> Self {
        let ids = names
            .iter()
            .enumerate()
            .map(|(i, n)| (n.clone(), TypeId(i as u32)))
            .collect();
        Self { names, ids }
    }
}

impl From<NameTable> for Vec<String> {
    fn from(table: NameTable) -> Self {
        table.names
    }
}
