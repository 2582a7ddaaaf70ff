use std::collections::BTreeMap;

/// Insertion ordered collection with removal by key.
///
/// Keys are handed out in increasing order, so iterating the map follows insertion order and
/// removing one entry leaves the order of the others untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupOrdering<T> {
    entries: BTreeMap<u64, T>,
    next_key: u64,
}

impl<T> Default for GroupOrdering<T> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
            next_key: 0,
        }
    }
}

impl<T> GroupOrdering<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `value` and returns its key.
    pub fn insert(&mut self, value: T) -> u64 {
        let key = self.next_key;
        self.next_key += 1;
        self.entries.insert(key, value);
        key
    }

    pub fn remove(&mut self, key: u64) -> Option<T> {
        self.entries.remove(&key)
    }

    pub fn get(&self, key: u64) -> Option<&T> {
        self.entries.get(&key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u64, &T)> {
        self.entries.iter().map(|(key, value)| (*key, value))
    }

    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.entries.values()
    }

    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.entries.values_mut()
    }

    /// Keeps the entries for which `keep` returns `true`, in order.
    pub fn retain<F>(&mut self, mut keep: F)
    where
        F: FnMut(&T) -> bool,
    {
        self.entries.retain(|_, value| keep(value));
    }
}
