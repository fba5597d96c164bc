//! Read-once result storage keyed by request token
//!
//! Each entry is written by the background resolution that owns the token
//! and removed by the first pull that finds it. Entries that are never
//! pulled again stay behind; there is at most one per abandoned request.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::address::RequestToken;

/// Rendered documents waiting to be pulled
#[derive(Debug, Default)]
pub struct ResultStore {
    entries: Mutex<HashMap<RequestToken, String>>,
}

impl ResultStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the text for a token, returning any unconsumed previous entry
    pub fn insert(&self, token: RequestToken, text: String) -> Option<String> {
        self.entries().insert(token, text)
    }

    /// Remove and return the text for a token
    pub fn take(&self, token: RequestToken) -> Option<String> {
        self.entries().remove(&token)
    }

    /// Number of entries waiting to be pulled
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    /// Check if no entries are waiting
    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<RequestToken, String>> {
        // a panic while holding the lock cannot leave the map half-updated
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
