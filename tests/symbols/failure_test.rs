use std::cell::Cell;
use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};

use stabcat::debugger::symbols::{AddressIndex, NameIndex};
use stabcat::{
    AddrKey, BTreeIndex, IndexDef, IndexError, OrderedIndex, Seek, StabError, SymbolName,
    SymbolTable, TableConfig,
};

/// What a `FlakyIndex` should refuse to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Fault {
    None,
    Insert,
    Delete,
}

/// B-tree index whose writes can be made to fail from outside the table
#[derive(Debug)]
struct FlakyIndex<K, V> {
    inner: BTreeIndex<K, V>,
    fault: Rc<Cell<Fault>>,
}

impl<K: Ord + Clone, V: Clone> FlakyIndex<K, V> {
    fn new(name: &'static str, fault: Rc<Cell<Fault>>) -> Self {
        Self {
            inner: BTreeIndex::create(&IndexDef::new(name, None)).unwrap(),
            fault,
        }
    }
}

impl<K: Ord + Clone, V: Clone> OrderedIndex<K, V> for FlakyIndex<K, V> {
    fn create(def: &IndexDef) -> Result<Self, IndexError> {
        Ok(Self {
            inner: BTreeIndex::create(def)?,
            fault: Rc::new(Cell::new(Fault::None)),
        })
    }

    fn insert(&mut self, key: K, value: V) -> Result<(), IndexError> {
        if self.fault.get() == Fault::Insert {
            return Err(IndexError::Full {
                name: self.inner.name(),
                capacity: self.inner.len(),
            });
        }
        self.inner.insert(key, value)
    }

    fn lookup(&self, key: &K) -> Option<V> {
        self.inner.lookup(key)
    }

    fn delete(&mut self, key: &K) -> Result<V, IndexError> {
        if self.fault.get() == Fault::Delete {
            return Err(IndexError::NotFound(self.inner.name()));
        }
        self.inner.delete(key)
    }

    fn seek(&self, mode: Seek<'_, K>) -> Option<(K, V)> {
        self.inner.seek(mode)
    }

    fn clear(&mut self) {
        self.inner.clear();
    }

    fn len(&self) -> usize {
        self.inner.len()
    }
}

/// Index that can never be created
#[derive(Debug)]
struct BrokenIndex;

impl OrderedIndex<AddrKey, ()> for BrokenIndex {
    fn create(def: &IndexDef) -> Result<Self, IndexError> {
        Err(IndexError::InvalidDefinition {
            name: def.name,
            reason: "out of memory",
        })
    }

    fn insert(&mut self, _key: AddrKey, _value: ()) -> Result<(), IndexError> {
        unreachable!()
    }

    fn lookup(&self, _key: &AddrKey) -> Option<()> {
        unreachable!()
    }

    fn delete(&mut self, _key: &AddrKey) -> Result<(), IndexError> {
        unreachable!()
    }

    fn seek(&self, _mode: Seek<'_, AddrKey>) -> Option<(AddrKey, ())> {
        unreachable!()
    }

    fn clear(&mut self) {}

    fn len(&self) -> usize {
        0
    }
}

static TRACKED_CREATED: AtomicUsize = AtomicUsize::new(0);
static TRACKED_DROPPED: AtomicUsize = AtomicUsize::new(0);

/// Name index that counts how many instances were created and released
#[derive(Debug)]
struct TrackedIndex(NameIndex);

impl Drop for TrackedIndex {
    fn drop(&mut self) {
        TRACKED_DROPPED.fetch_add(1, Ordering::SeqCst);
    }
}

impl OrderedIndex<SymbolName, u64> for TrackedIndex {
    fn create(def: &IndexDef) -> Result<Self, IndexError> {
        let index = NameIndex::create(def)?;
        TRACKED_CREATED.fetch_add(1, Ordering::SeqCst);
        Ok(Self(index))
    }

    fn insert(&mut self, key: SymbolName, value: u64) -> Result<(), IndexError> {
        self.0.insert(key, value)
    }

    fn lookup(&self, key: &SymbolName) -> Option<u64> {
        self.0.lookup(key)
    }

    fn delete(&mut self, key: &SymbolName) -> Result<u64, IndexError> {
        self.0.delete(key)
    }

    fn seek(&self, mode: Seek<'_, SymbolName>) -> Option<(SymbolName, u64)> {
        self.0.seek(mode)
    }

    fn clear(&mut self) {
        self.0.clear();
    }

    fn len(&self) -> usize {
        self.0.len()
    }
}

#[test]
fn test_creation_failure_releases_name_index() {
    let result = SymbolTable::<TrackedIndex, BrokenIndex>::create(&TableConfig::default());

    let err = result.err().expect("creation should fail");
    assert!(matches!(
        err,
        StabError::Allocation {
            what: "address table",
            ..
        }
    ));
    assert_eq!(TRACKED_CREATED.load(Ordering::SeqCst), 1);
    assert_eq!(TRACKED_DROPPED.load(Ordering::SeqCst), 1);
}

#[test]
fn test_zero_capacity_fails_creation() {
    let config = TableConfig {
        max_symbols: Some(0),
    };
    let err = SymbolTable::<NameIndex, AddressIndex>::create(&config).unwrap_err();
    assert!(matches!(
        err,
        StabError::Allocation {
            what: "symbol table",
            source: IndexError::InvalidDefinition { .. },
        }
    ));
}

#[test]
fn test_full_table_rejects_new_names_cleanly() {
    let config = TableConfig {
        max_symbols: Some(2),
    };
    let mut table = SymbolTable::<NameIndex, AddressIndex>::create(&config).unwrap();
    table.set("a", 1).unwrap();
    table.set("b", 2).unwrap();

    let err = table.set("c", 3).unwrap_err();
    assert!(matches!(err, StabError::WriteFailure { op: "set", .. }));

    // The refused insert happened before either index changed
    table.verify().unwrap();
    assert!(table.get("c").is_err());

    // Moving an existing symbol still works when full
    table.set("b", 0x20).unwrap();
    assert_eq!(table.get("b").unwrap(), 0x20);
    table.verify().unwrap();
}

#[test]
fn test_partial_set_failure_is_detectable() {
    let fault = Rc::new(Cell::new(Fault::None));
    let by_name: FlakyIndex<SymbolName, u64> = FlakyIndex::new("symbol", fault.clone());
    let by_address = AddressIndex::create(&IndexDef::new("address", None)).unwrap();
    let mut table = SymbolTable::from_indexes(by_name, by_address);

    fault.set(Fault::Insert);
    let err = table.set("x", 0x10).unwrap_err();
    assert!(matches!(
        err,
        StabError::WriteFailure {
            op: "set",
            address: 0x10,
            ..
        }
    ));

    // The address entry went in, the name entry did not
    assert!(matches!(table.verify(), Err(StabError::Inconsistent(_))));
    assert!(table.get("x").is_err());

    // Repeating the update once the index recovers repairs the table
    fault.set(Fault::None);
    table.set("x", 0x10).unwrap();
    table.verify().unwrap();
    assert_eq!(table.nearest(0x10).unwrap(), ("x".to_string(), 0));
}

#[test]
fn test_partial_delete_failure_is_detectable() {
    let fault = Rc::new(Cell::new(Fault::None));
    let by_name: FlakyIndex<SymbolName, u64> = FlakyIndex::new("symbol", fault.clone());
    let by_address = AddressIndex::create(&IndexDef::new("address", None)).unwrap();
    let mut table = SymbolTable::from_indexes(by_name, by_address);

    table.set("y", 0x20).unwrap();

    fault.set(Fault::Delete);
    let err = table.delete("y").unwrap_err();
    assert!(matches!(err, StabError::WriteFailure { op: "delete", .. }));
    assert!(matches!(table.verify(), Err(StabError::Inconsistent(_))));

    // A retry with a healthy index finishes the job
    fault.set(Fault::None);
    table.delete("y").unwrap();
    table.verify().unwrap();
    assert!(table.is_empty());
}

#[test]
fn test_failed_address_insert_leaves_name_untouched() {
    let fault = Rc::new(Cell::new(Fault::None));
    let by_name = NameIndex::create(&IndexDef::new("symbol", None)).unwrap();
    let by_address: FlakyIndex<AddrKey, ()> = FlakyIndex::new("address", fault.clone());
    let mut table = SymbolTable::from_indexes(by_name, by_address);

    fault.set(Fault::Insert);
    assert!(table.set("fresh", 0x30).is_err());

    assert!(table.get("fresh").is_err());
    table.verify().unwrap();
}
