//! # Configuration Context
//!
//! Decouples the slow configuration refresh from the fast poll loop. Writers
//! replace the whole snapshot; readers get a shared pointer to whichever
//! complete snapshot was current when they asked.

use std::sync::{Arc, Mutex, PoisonError};

use crate::model::ConfigurationSnapshot;

/// Holder of the current configuration snapshot.
#[derive(Debug, Default)]
pub struct ConfigurationContext {
    current: Mutex<Arc<ConfigurationSnapshot>>,
}

impl ConfigurationContext {
    /// Creates a context holding an empty snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the held snapshot.
    pub fn update_configuration(&self, snapshot: ConfigurationSnapshot) {
        let snapshot = Arc::new(snapshot);
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        *current = snapshot;
    }

    /// Returns the current snapshot, or an empty one if nothing has been loaded yet.
    pub fn get_configuration(&self) -> Arc<ConfigurationSnapshot> {
        let current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&current)
    }
}
