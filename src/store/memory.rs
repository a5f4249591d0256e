//! In-memory store for tests, shared between handles so a test can inspect
//! what the controller saved

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use super::{PersistedState, StateStore, StoreError};

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    saved: Arc<Mutex<Option<PersistedState>>>,
    fail_writes: Arc<AtomicBool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a previously saved document
    pub fn with_state(state: PersistedState) -> Self {
        let store = Self::default();
        *store.saved.lock().unwrap_or_else(|e| e.into_inner()) = Some(state);
        store
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// The most recently saved document
    pub fn saved(&self) -> Option<PersistedState> {
        self.saved.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl StateStore for MemoryStore {
    fn load(&self) -> Result<Option<PersistedState>, StoreError> {
        Ok(self.saved())
    }

    fn save(&mut self, state: &PersistedState) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("writes disabled".into()));
        }
        *self.saved.lock().unwrap_or_else(|e| e.into_inner()) = Some(state.clone());
        Ok(())
    }
}
