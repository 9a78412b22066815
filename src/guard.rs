use std::collections::HashMap;

use crate::ingest::RowRejection;
use crate::store::RecordStore;

pub fn exists<S: RecordStore + ?Sized>(store: &S, identifier: &str) -> bool {
    store.contains(identifier)
}

/// Tracks identifiers accepted so far in one batch so a repeated row is
/// rejected even before anything is committed.
#[derive(Debug, Default)]
pub struct DuplicateGuard {
    seen: HashMap<String, usize>,
}

impl DuplicateGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn admit<S: RecordStore + ?Sized>(
        &mut self,
        store: &S,
        identifier: &str,
        row: usize,
    ) -> Result<(), RowRejection> {
        if exists(store, identifier) {
            return Err(RowRejection::DuplicateInStore {
                identifier: identifier.to_string(),
            });
        }
        if let Some(first_row) = self.seen.get(identifier) {
            return Err(RowRejection::DuplicateInBatch {
                identifier: identifier.to_string(),
                first_row: *first_row,
            });
        }
        self.seen.insert(identifier.to_string(), row);
        Ok(())
    }
}
