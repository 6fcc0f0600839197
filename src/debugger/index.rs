use std::collections::BTreeMap;
use std::ops::Bound;

use thiserror::Error;

/// Errors reported by an ordered index
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IndexError {
    /// The index refused a new key because it holds `capacity` entries already
    #[error("{name} index is full ({capacity} entries)")]
    Full { name: &'static str, capacity: usize },
    /// The key is not present
    #[error("key not found in {0} index")]
    NotFound(&'static str),
    /// The index definition cannot be instantiated
    #[error("invalid definition for {name} index: {reason}")]
    InvalidDefinition { name: &'static str, reason: &'static str },
}

/// Static description of an index, handed to `OrderedIndex::create`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexDef {
    /// Short name used in log and error messages
    pub name: &'static str,
    /// Maximum number of distinct keys (unbounded if `None`)
    pub capacity: Option<usize>,
}

impl IndexDef {
    pub const fn new(name: &'static str, capacity: Option<usize>) -> Self {
        Self { name, capacity }
    }
}

/// How `OrderedIndex::seek` positions itself
#[derive(Debug, Clone, Copy)]
pub enum Seek<'a, K> {
    /// The smallest key in the index
    First,
    /// The smallest key strictly greater than the given one
    Next(&'a K),
    /// The greatest key less than or equal to the given one
    LessOrEqual(&'a K),
}

/// A sorted associative container.
///
/// This is the storage primitive underneath the symbol table. Keys are
/// totally ordered; values are small and handed out by copy so that
/// implementations are free to keep entries in pages, on disk or behind
/// a lock.
pub trait OrderedIndex<K: Ord + Clone, V: Clone> {
    /// Instantiate an empty index from its definition
    fn create(def: &IndexDef) -> Result<Self, IndexError>
    where
        Self: Sized;

    /// Insert or overwrite the value stored under `key`
    fn insert(&mut self, key: K, value: V) -> Result<(), IndexError>;

    /// Exact-match lookup
    fn lookup(&self, key: &K) -> Option<V>;

    /// Remove `key`, returning the value it held
    fn delete(&mut self, key: &K) -> Result<V, IndexError>;

    /// Ordered positioning, see `Seek`
    fn seek(&self, mode: Seek<'_, K>) -> Option<(K, V)>;

    /// Remove every entry
    fn clear(&mut self);

    /// Number of entries
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// `OrderedIndex` backed by the standard library B-tree
#[derive(Debug, Clone)]
pub struct BTreeIndex<K, V> {
    def: IndexDef,
    map: BTreeMap<K, V>,
}

impl<K: Ord + Clone, V: Clone> BTreeIndex<K, V> {
    /// Name this index was created with
    pub fn name(&self) -> &'static str {
        self.def.name
    }
}

impl<K: Ord + Clone, V: Clone> OrderedIndex<K, V> for BTreeIndex<K, V> {
    fn create(def: &IndexDef) -> Result<Self, IndexError> {
        if def.capacity == Some(0) {
            return Err(IndexError::InvalidDefinition {
                name: def.name,
                reason: "capacity must be at least one entry",
            });
        }

        Ok(Self {
            def: *def,
            map: BTreeMap::new(),
        })
    }

    fn insert(&mut self, key: K, value: V) -> Result<(), IndexError> {
        if let Some(slot) = self.map.get_mut(&key) {
            *slot = value;
            return Ok(());
        }

        if let Some(capacity) = self.def.capacity {
            if self.map.len() >= capacity {
                return Err(IndexError::Full {
                    name: self.def.name,
                    capacity,
                });
            }
        }

        self.map.insert(key, value);
        Ok(())
    }

    fn lookup(&self, key: &K) -> Option<V> {
        self.map.get(key).cloned()
    }

    fn delete(&mut self, key: &K) -> Result<V, IndexError> {
        self.map.remove(key).ok_or(IndexError::NotFound(self.def.name))
    }

    fn seek(&self, mode: Seek<'_, K>) -> Option<(K, V)> {
        let entry = match mode {
            Seek::First => self.map.iter().next(),
            Seek::Next(key) => self
                .map
                .range((Bound::Excluded(key), Bound::Unbounded))
                .next(),
            Seek::LessOrEqual(key) => self.map.range(..=key).next_back(),
        };

        entry.map(|(k, v)| (k.clone(), v.clone()))
    }

    fn clear(&mut self) {
        self.map.clear();
    }

    fn len(&self) -> usize {
        self.map.len()
    }
}
