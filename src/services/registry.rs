use indexmap::IndexMap;

use crate::models::FileRecord;

/// Ordered mapping from file name to its extraction record.
///
/// Listing follows insertion order. The pipeline is the only writer; front
/// ends receive `&FileRegistry` and read from it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FileRegistry {
    records: IndexMap<String, FileRecord>,
}

impl FileRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a record under its name. Returns `false`, leaving the existing
    /// record untouched, when the name is already taken.
    pub fn insert(&mut self, record: FileRecord) -> bool {
        if self.records.contains_key(record.name()) {
            return false;
        }
        self.records.insert(record.name().to_string(), record);
        true
    }

    pub fn get(&self, name: &str) -> Option<&FileRecord> {
        self.records.get(name)
    }

    pub(crate) fn get_mut(&mut self, name: &str) -> Option<&mut FileRecord> {
        self.records.get_mut(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.records.contains_key(name)
    }

    /// Removes a record, keeping the order of the others.
    pub fn delete(&mut self, name: &str) -> Option<FileRecord> {
        self.records.shift_remove(name)
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// `(name, record)` pairs in insertion order. Each call starts over.
    pub fn entries_in_order(&self) -> impl Iterator<Item = (&str, &FileRecord)> + '_ {
        self.records.iter().map(|(name, record)| (name.as_str(), record))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.records.keys().map(String::as_str)
    }
}
