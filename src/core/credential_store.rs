//! Credential lookup by decrypted value.
//!
//! One [`CredentialRecord`] registers one entry per revision value, all of
//! them pointing at the same shared record. Rotations are applied as a sorted
//! merge of old and new revision lists so that revisions present in both are
//! never absent, even momentarily, for a concurrent reader.
use std::{cmp::Ordering, collections::HashMap, sync::Arc};

use parking_lot::RwLock;

use crate::{
    config::CredentialRecord,
    core::error::{StoreError, StoreResult},
};

/// Concurrent credential store keyed by revision value.
#[derive(Debug, Default)]
pub struct CredentialStore {
    by_value: RwLock<HashMap<String, Arc<CredentialRecord>>>,
}

impl CredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register every revision of `record`.
    pub fn set(&self, record: CredentialRecord) {
        tracing::debug!(
            namespace = %record.namespace,
            name = %record.name,
            revisions = record.revisions.len(),
            "setting credential"
        );
        let record = Arc::new(record);
        let mut by_value = self.by_value.write();
        for value in &record.revisions {
            by_value.insert(value.clone(), Arc::clone(&record));
        }
    }

    /// Apply a revision rotation from `old` to `new`.
    ///
    /// Values in both lists are refreshed to point at `new`, values only in
    /// `old` are removed and values only in `new` are added.
    pub fn update(&self, old: &CredentialRecord, new: CredentialRecord) {
        let mut old_values: Vec<&str> = old.revisions.iter().map(String::as_str).collect();
        old_values.sort();

        let new = Arc::new(new);
        let mut new_values: Vec<&str> = new.revisions.iter().map(String::as_str).collect();
        new_values.sort();

        let mut by_value = self.by_value.write();
        let (mut i, mut j) = (0, 0);
        while i < old_values.len() || j < new_values.len() {
            let order = match (old_values.get(i), new_values.get(j)) {
                (Some(o), Some(n)) => o.cmp(n),
                (Some(_), None) => Ordering::Less,
                (None, _) => Ordering::Greater,
            };
            match order {
                Ordering::Equal => {
                    by_value.insert(new_values[j].to_string(), Arc::clone(&new));
                    i += 1;
                    j += 1;
                }
                Ordering::Less => {
                    by_value.remove(old_values[i]);
                    i += 1;
                }
                Ordering::Greater => {
                    by_value.insert(new_values[j].to_string(), Arc::clone(&new));
                    j += 1;
                }
            }
        }

        tracing::debug!(
            namespace = %new.namespace,
            name = %new.name,
            revisions = new.revisions.len(),
            "rotated credential"
        );
    }

    /// Owning record of a decrypted credential value.
    pub fn get(&self, value: &str) -> Option<Arc<CredentialRecord>> {
        self.by_value.read().get(value).cloned()
    }

    /// Remove every revision of `record` and return the record previously
    /// stored for them.
    pub fn delete(&self, record: &CredentialRecord) -> StoreResult<Option<Arc<CredentialRecord>>> {
        if record.revisions.is_empty() {
            return Err(StoreError::NoRevisions {
                namespace: record.namespace.clone(),
                name: record.name.clone(),
            });
        }

        let mut by_value = self.by_value.write();
        let mut previous = None;
        for value in &record.revisions {
            if let Some(stored) = by_value.remove(value) {
                previous.get_or_insert(stored);
            }
        }
        Ok(previous)
    }

    /// Number of registered revision values.
    pub fn len(&self) -> usize {
        self.by_value.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
