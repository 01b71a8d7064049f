use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};

use smartdocs_core::types::{ObjectRecord, ViewSnapshot};

/// Turn a raw listing into snapshot order.
///
/// Duplicate keys collapse to the most recently modified record. The result is
/// sorted by `last_modified` descending, ties broken by key.
pub fn reconcile(records: Vec<ObjectRecord>) -> Vec<ObjectRecord> {
    let mut newest: HashMap<String, ObjectRecord> = HashMap::with_capacity(records.len());
    for record in records {
        match newest.entry(record.key.clone()) {
            Entry::Occupied(mut existing) => {
                if record.last_modified > existing.get().last_modified {
                    existing.insert(record);
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(record);
            }
        }
    }

    let mut records: Vec<ObjectRecord> = newest.into_values().collect();
    records.sort_by(|a, b| {
        b.last_modified
            .cmp(&a.last_modified)
            .then_with(|| a.key.cmp(&b.key))
    });
    records
}

/// Record-level difference between two snapshots.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnapshotDiff {
    pub added: Vec<ObjectRecord>,
    pub removed: Vec<ObjectRecord>,
    /// Same key, new `last_modified` or size.
    pub changed: Vec<ObjectRecord>,
}

impl SnapshotDiff {
    pub fn between(old: &ViewSnapshot, new: &ViewSnapshot) -> Self {
        let previous: HashMap<&str, &ObjectRecord> =
            old.records.iter().map(|r| (r.key.as_str(), r)).collect();
        let current: HashSet<&str> = new.records.iter().map(|r| r.key.as_str()).collect();

        let mut diff = SnapshotDiff::default();
        for record in &new.records {
            match previous.get(record.key.as_str()) {
                None => diff.added.push(record.clone()),
                Some(before)
                    if before.last_modified != record.last_modified
                        || before.size_bytes != record.size_bytes =>
                {
                    diff.changed.push(record.clone())
                }
                Some(_) => {}
            }
        }
        diff.removed = old
            .records
            .iter()
            .filter(|r| !current.contains(r.key.as_str()))
            .cloned()
            .collect();
        diff
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.changed.is_empty()
    }
}
