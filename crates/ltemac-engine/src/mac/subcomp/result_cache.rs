use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;

use ltemac_core::{FrameNum, PduInstance};

/// Key for results of which there may be several per frame, one per MAC PDU
pub type FrameKey = (FrameNum, PduInstance);

/// Store of inference results, keyed by frame number or by frame number and PDU instance.
///
/// Entries are written during the first pass over a capture and live until the session is
/// reset. Later passes only read them back, so every redissection of a frame reproduces the
/// exact annotation computed the first time. There is no eviction.
///
/// A result for an earlier frame may be amended while a later frame is processed (forward
/// links), which is what `get_or_create` is for.
pub struct ResultCache<K, V> {
    entries: HashMap<K, V>,
}

impl<K, V> ResultCache<K, V>
where
    K: Eq + Hash + Copy + Debug,
{
    pub fn new() -> Self {
        Self { entries: HashMap::new() }
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    /// Stores a result, replacing any earlier one under the same key
    pub fn put(&mut self, key: K, value: V) {
        if self.entries.insert(key, value).is_some() {
            tracing::trace!("result_cache: replaced entry for {:?}", key);
        }
    }

    /// Returns the entry for `key`, inserting the value produced by `default` if there is none yet
    pub fn get_or_create<F>(&mut self, key: K, default: F) -> &mut V
    where
        F: FnOnce() -> V,
    {
        self.entries.entry(key).or_insert_with(default)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops all entries. Only done when a new capture is loaded.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.entries.iter()
    }
}

impl<K, V> Default for ResultCache<K, V>
where
    K: Eq + Hash + Copy + Debug,
{
    fn default() -> Self {
        Self::new()
    }
}
