//! The kernel registry: name to record, iterated in name order.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{RegistryError, Result};
use crate::record::KernelRecord;

/// Registered kernels, keyed by name.
///
/// Backed by a `BTreeMap`, so [`all`](Self::all) is lexicographic by name
/// no matter the order kernels were registered in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KernelRegistry {
    records: BTreeMap<String, KernelRecord>,
}

impl KernelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `record`; a name may be registered only once.
    pub fn register(&mut self, record: KernelRecord) -> Result<()> {
        if self.records.contains_key(&record.name) {
            return Err(RegistryError::DuplicateKernel(record.name));
        }
        self.records.insert(record.name.clone(), record);
        Ok(())
    }

    /// Insert every record or none of them.
    pub fn register_all(&mut self, records: Vec<KernelRecord>) -> Result<()> {
        let mut staged: BTreeMap<String, KernelRecord> = BTreeMap::new();
        for record in records {
            if self.records.contains_key(&record.name) || staged.contains_key(&record.name) {
                return Err(RegistryError::DuplicateKernel(record.name));
            }
            staged.insert(record.name.clone(), record);
        }
        self.records.append(&mut staged);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&KernelRecord> {
        self.records.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.records.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Every record, ordered by name.
    pub fn all(&self) -> Vec<&KernelRecord> {
        self.records.values().collect()
    }

    pub fn names(&self) -> Vec<&str> {
        self.records.keys().map(String::as_str).collect()
    }

    /// Records whose grouping key is `subdirectory`, ordered by name.
    pub fn group(&self, subdirectory: &str) -> Vec<&KernelRecord> {
        self.records
            .values()
            .filter(|r| r.subdirectory == subdirectory)
            .collect()
    }

    /// Distinct grouping keys, sorted.
    pub fn groups(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.records.values().map(|r| r.subdirectory.as_str()).collect();
        keys.sort_unstable();
        keys.dedup();
        keys
    }

    /// Drop every record.
    pub fn reset(&mut self) {
        self.records.clear();
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
