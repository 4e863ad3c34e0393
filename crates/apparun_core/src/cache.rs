//! Explicit, thread-safe cache of loaded models

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use rustc_hash::FxHashMap;

use crate::model::Model;

type Slot = Arc<Mutex<Option<Arc<Model>>>>;

/// Loaded models keyed by an identity chosen by the caller (typically a
/// model name or path).
///
/// Each key has its own slot lock, so concurrent requests for the same key
/// load it once while different keys load in parallel. A failed load leaves
/// no entry and the next request tries again.
#[derive(Debug, Default)]
pub struct ModelCache {
    slots: Mutex<FxHashMap<String, Slot>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // A panicking loader cannot leave a slot half written
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ModelCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, key: &str) -> Slot {
        let mut slots = lock(&self.slots);
        Arc::clone(slots.entry(key.to_string()).or_default())
    }

    /// Return the cached model for `key`, loading it with `load` on a miss
    pub fn get_or_load<E, F>(&self, key: &str, load: F) -> Result<Arc<Model>, E>
    where
        F: FnOnce() -> Result<Model, E>,
    {
        let slot = self.slot(key);
        let mut guard = lock(&slot);
        if let Some(model) = guard.as_ref() {
            return Ok(Arc::clone(model));
        }
        tracing::debug!(key, "model cache miss");
        let model = match load() {
            Ok(model) => Arc::new(model),
            Err(e) => {
                drop(guard);
                self.discard_empty(key, &slot);
                return Err(e);
            }
        };
        *guard = Some(Arc::clone(&model));
        Ok(model)
    }

    /// Drop the map entry for `key` if it is still `slot` and nothing filled it
    fn discard_empty(&self, key: &str, slot: &Slot) {
        let mut slots = lock(&self.slots);
        let unchanged = slots.get(key).is_some_and(|current| Arc::ptr_eq(current, slot));
        // A slot another caller is busy filling stays
        if unchanged && slot.try_lock().is_ok_and(|loaded| loaded.is_none()) {
            slots.remove(key);
        }
    }

    /// The cached model for `key`, without loading
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Arc<Model>> {
        let slot = lock(&self.slots).get(key).cloned()?;
        let guard = lock(&slot);
        guard.clone()
    }

    /// Store `model` under `key`, replacing any previous entry
    pub fn insert(&self, key: &str, model: Model) -> Arc<Model> {
        let model = Arc::new(model);
        let slot = self.slot(key);
        *lock(&slot) = Some(Arc::clone(&model));
        model
    }

    /// Remove `key`; returns whether a loaded model was evicted.
    ///
    /// Holders of the evicted `Arc` keep using it.
    pub fn evict(&self, key: &str) -> bool {
        let Some(slot) = lock(&self.slots).remove(key) else {
            return false;
        };
        let loaded = lock(&slot).is_some();
        loaded
    }

    pub fn clear(&self) {
        lock(&self.slots).clear();
    }

    /// Number of loaded models
    #[must_use]
    pub fn len(&self) -> usize {
        let slots: Vec<Slot> = lock(&self.slots).values().cloned().collect();
        slots.iter().filter(|slot| lock(slot).is_some()).count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
