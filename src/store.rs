use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};

use crate::error::CoreError;
use crate::models::{Record, RecordUpdate};

/// Keyed collection of student records. Identifiers are unique at all times;
/// every mutation checks and writes under one lock.
pub trait RecordStore: Send + Sync {
    fn insert_if_absent(&self, record: Record) -> Result<(), CoreError>;
    fn contains(&self, identifier: &str) -> bool;
    fn get(&self, identifier: &str) -> Option<Record>;
    fn list(&self) -> Vec<Record>;
    fn update(
        &self,
        identifier: &str,
        update: &RecordUpdate,
        now: DateTime<Utc>,
    ) -> Result<Record, CoreError>;
    fn delete(&self, identifier: &str) -> Option<Record>;
    fn len(&self) -> usize;
}

/// Volatile store living as long as the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<String, Record>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Record>> {
        self.records.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Record>> {
        self.records.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl RecordStore for MemoryStore {
    fn insert_if_absent(&self, record: Record) -> Result<(), CoreError> {
        let mut records = self.write();
        if records.contains_key(record.identifier()) {
            return Err(CoreError::conflict(record.identifier()));
        }
        records.insert(record.identifier().to_string(), record);
        Ok(())
    }

    fn contains(&self, identifier: &str) -> bool {
        self.read().contains_key(identifier)
    }

    fn get(&self, identifier: &str) -> Option<Record> {
        self.read().get(identifier).cloned()
    }

    fn list(&self) -> Vec<Record> {
        let mut values: Vec<Record> = self.read().values().cloned().collect();
        values.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.identifier().cmp(b.identifier()))
        });
        values
    }

    fn update(
        &self,
        identifier: &str,
        update: &RecordUpdate,
        now: DateTime<Utc>,
    ) -> Result<Record, CoreError> {
        let mut records = self.write();
        let current = records
            .get(identifier)
            .ok_or_else(|| CoreError::not_found(identifier))?;

        let fields = update.apply_to(&current.fields);
        fields.validate().map_err(CoreError::Validation)?;
        if fields.identifier != identifier && records.contains_key(&fields.identifier) {
            return Err(CoreError::conflict(fields.identifier));
        }

        let mut record = records
            .remove(identifier)
            .ok_or_else(|| CoreError::not_found(identifier))?;
        record.fields = fields;
        record.updated_at = Some(now);
        records.insert(record.identifier().to_string(), record.clone());
        Ok(record)
    }

    fn delete(&self, identifier: &str) -> Option<Record> {
        self.write().remove(identifier)
    }

    fn len(&self) -> usize {
        self.read().len()
    }
}
