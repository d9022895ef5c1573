use std::{
    collections::HashMap,
    sync::{RwLock, RwLockWriteGuard},
};

use tracing::trace;

use crate::{
    expr::Value,
    mapper::{EntityRecord, EntityResolver},
};

/// Per-session identity map of entity records, keyed by entity name and id.
///
/// The first record read for an identity is the one every later read
/// returns, so rows changed by a bulk update stay stale until [`clear`].
/// Associations loaded by a later fetch join are merged into the cached
/// record.
///
/// [`clear`]: PersistenceContext::clear
#[derive(Debug, Default)]
pub struct PersistenceContext {
    entries: RwLock<HashMap<(String, Value), EntityRecord>>,
}

impl PersistenceContext {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> RwLockWriteGuard<'_, HashMap<(String, Value), EntityRecord>> {
        // cached records stay consistent even if a panicking reader poisoned the lock
        self.entries.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    pub fn get(&self, entity: &str, id: &Value) -> Option<EntityRecord> {
        self.entries().get(&(entity.to_string(), id.clone())).cloned()
    }

    pub fn contains(&self, entity: &str, id: &Value) -> bool {
        self.entries().contains_key(&(entity.to_string(), id.clone()))
    }

    pub fn clear(&self) {
        let mut entries = self.entries();
        trace!(records = entries.len(), "persistence context cleared");
        entries.clear();
    }
}

impl EntityResolver for PersistenceContext {
    fn resolve(&self, record: EntityRecord) -> EntityRecord {
        let mut entries = self.entries();
        let key = (record.name().to_string(), record.id().clone());
        match entries.get_mut(&key) {
            Some(cached) => {
                for (name, association) in record.associations() {
                    if !cached.is_loaded(name) {
                        cached.attach(name, association.clone());
                    }
                }
                trace!(entity = %key.0, id = %key.1, "persistence context hit");
                cached.clone()
            }
            None => {
                entries.insert(key, record.clone());
                record
            }
        }
    }
}
