//! Set-valued map helpers used for app-id bookkeeping.

use std::collections::{BTreeMap, BTreeSet};

/// Outcome of [`SetMapExt::remove_from_set`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SetRemoval {
    /// The value was present and has been removed.
    pub removed: bool,
    /// The key's set became empty and the key was deleted.
    pub emptied: bool,
}

/// A map from keys to non-empty sets. Empty sets never persist.
pub trait SetMapExt<K, V> {
    /// Inserts `value` under `key`. Returns `true` if the key's set was created.
    fn add_to_set(&mut self, key: K, value: V) -> bool;

    fn remove_from_set(&mut self, key: &K, value: &V) -> SetRemoval;

    fn set_contains(&self, key: &K, value: &V) -> bool;
}

impl<K: Ord, V: Ord> SetMapExt<K, V> for BTreeMap<K, BTreeSet<V>> {
    fn add_to_set(&mut self, key: K, value: V) -> bool {
        let mut created = false;
        self.entry(key)
            .or_insert_with(|| {
                created = true;
                BTreeSet::new()
            })
            .insert(value);
        created
    }

    fn remove_from_set(&mut self, key: &K, value: &V) -> SetRemoval {
        let Some(set) = self.get_mut(key) else {
            return SetRemoval::default();
        };
        let removed = set.remove(value);
        let emptied = set.is_empty();
        if emptied {
            self.remove(key);
        }
        SetRemoval { removed, emptied }
    }

    fn set_contains(&self, key: &K, value: &V) -> bool {
        self.get(key).is_some_and(|set| set.contains(value))
    }
}
