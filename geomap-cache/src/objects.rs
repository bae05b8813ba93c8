//! Memoization of derived objects under composite keys.
//!
//! A key is the `|`-joined display form of its fragments, in order, so a
//! file identifier used as the first fragment can later invalidate every
//! object derived from that file by substring match.

use std::any::Any;
use std::collections::HashMap;
use std::fmt::Display;

/// Build a composite key from ordered fragments.
pub fn composite_key(fragments: &[&dyn Display]) -> String {
    fragments
        .iter()
        .map(|f| f.to_string())
        .collect::<Vec<_>>()
        .join("|")
}

/// Type-erased object store.
#[derive(Default)]
pub struct ObjectStore {
    entries: HashMap<String, Box<dyn Any>>,
}

impl ObjectStore {
    pub fn store<T: Any>(&mut self, key: String, value: T) {
        self.entries.insert(key, Box::new(value));
    }

    /// A copy of the stored object, if present and of type `T`.
    pub fn get<T: Any + Clone>(&self, key: &str) -> Option<T> {
        self.entries
            .get(key)
            .and_then(|boxed| boxed.downcast_ref::<T>())
            .cloned()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Remove every entry whose key contains `token`. Returns how many were removed.
    pub fn invalidate(&mut self, token: &str) -> usize {
        let before = self.entries.len();
        self.entries.retain(|key, _| !key.contains(token));
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
