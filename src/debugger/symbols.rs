use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use log::{debug, error, warn};
use regex::Regex;

use crate::debugger::error::{StabError, StabResult};
use crate::debugger::index::{BTreeIndex, IndexDef, IndexError, OrderedIndex, Seek};

/// Target address width
pub type Address = u64;

/// Longest symbol name kept, in bytes. Anything past this is dropped.
pub const MAX_NAME_LEN: usize = 63;

/// A symbol name of bounded length.
///
/// Names are cut at the first NUL byte and at `MAX_NAME_LEN` bytes,
/// backing off to the previous UTF-8 character boundary. Truncation is
/// silent. Names compare byte by byte, never by locale.
#[derive(Clone, Copy)]
pub struct SymbolName {
    len: u8,
    bytes: [u8; MAX_NAME_LEN],
}

impl SymbolName {
    /// Build a name from text, truncating as needed
    pub fn new(text: &str) -> Self {
        let text = match text.find('\0') {
            Some(end) => &text[..end],
            None => text,
        };

        let mut len = text.len().min(MAX_NAME_LEN);
        while !text.is_char_boundary(len) {
            len -= 1;
        }

        let mut bytes = [0; MAX_NAME_LEN];
        bytes[..len].copy_from_slice(&text.as_bytes()[..len]);

        Self {
            len: len as u8,
            bytes,
        }
    }

    /// The largest possible name: every byte set to 0xff.
    ///
    /// No stored name can compare above it, which turns a single
    /// less-or-equal seek into "last name at this address".
    fn probe() -> Self {
        Self {
            len: MAX_NAME_LEN as u8,
            bytes: [0xff; MAX_NAME_LEN],
        }
    }

    /// Raw name bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..usize::from(self.len)]
    }

    /// Name as text
    pub fn as_str(&self) -> &str {
        std::str::from_utf8(self.as_bytes()).unwrap_or_default()
    }

    /// The name as it fits into a buffer of `max_len` bytes including
    /// a terminator, i.e. at most `max_len - 1` bytes of text
    pub fn truncated(&self, max_len: usize) -> &str {
        let text = self.as_str();
        let mut len = text.len().min(max_len.saturating_sub(1));
        while !text.is_char_boundary(len) {
            len -= 1;
        }
        &text[..len]
    }

    pub fn len(&self) -> usize {
        usize::from(self.len)
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl From<&str> for SymbolName {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

impl PartialEq for SymbolName {
    fn eq(&self, other: &Self) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl Eq for SymbolName {}

impl PartialOrd for SymbolName {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SymbolName {
    fn cmp(&self, other: &Self) -> Ordering {
        self.as_bytes().cmp(other.as_bytes())
    }
}

impl Hash for SymbolName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_bytes().hash(state);
    }
}

impl fmt::Debug for SymbolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", String::from_utf8_lossy(self.as_bytes()))
    }
}

impl fmt::Display for SymbolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Key of the address index: ordered by address, then by name
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AddrKey {
    pub address: Address,
    pub name: SymbolName,
}

impl AddrKey {
    pub fn new(address: Address, name: SymbolName) -> Self {
        Self { address, name }
    }
}

/// A (name, address) pair as handed out by the table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    /// Symbol name
    name: SymbolName,
    /// Memory address
    address: Address,
}

impl Symbol {
    /// Create a new symbol
    pub fn new(name: &str, address: Address) -> Self {
        Self {
            name: SymbolName::new(name),
            address,
        }
    }

    /// Get the symbol name
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Get the symbol address
    pub fn address(&self) -> Address {
        self.address
    }
}

impl From<AddrKey> for Symbol {
    fn from(key: AddrKey) -> Self {
        Self {
            name: key.name,
            address: key.address,
        }
    }
}

/// Sizing of a symbol table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TableConfig {
    /// Upper bound on the number of symbols (unbounded if `None`)
    pub max_symbols: Option<usize>,
}

/// Index of names to addresses used by the default table
pub type NameIndex = BTreeIndex<SymbolName, Address>;
/// Index of (address, name) pairs used by the default table
pub type AddressIndex = BTreeIndex<AddrKey, ()>;

/// Symbol table for the target program.
///
/// Two ordered indexes hold the same symbols: `by_name` answers exact
/// lookups, `by_address` answers nearest-address lookups and ordered
/// listings. Every name in `by_name` with address `a` has exactly one
/// `(a, name)` entry in `by_address`.
///
/// Updates touch the indexes in a fixed order (stale address entry out,
/// new address entry in, name entry in). There is no rollback: if an
/// index write fails part way the error is returned and `verify` will
/// report the mismatch. The table does no locking of its own.
#[derive(Debug)]
pub struct SymbolTable<N = NameIndex, A = AddressIndex> {
    /// Symbols by name
    by_name: N,
    /// Symbols by address
    by_address: A,
}

impl SymbolTable {
    /// Create a new empty, unbounded symbol table
    pub fn new() -> StabResult<Self> {
        Self::create(&TableConfig::default())
    }
}

impl<N, A> SymbolTable<N, A>
where
    N: OrderedIndex<SymbolName, Address>,
    A: OrderedIndex<AddrKey, ()>,
{
    /// Create both indexes as a unit
    pub fn create(config: &TableConfig) -> StabResult<Self> {
        let by_name = N::create(&IndexDef::new("symbol", config.max_symbols)).map_err(|source| {
            error!("stab: failed to allocate symbol table: {}", source);
            StabError::Allocation {
                what: "symbol table",
                source,
            }
        })?;

        let by_address = match A::create(&IndexDef::new("address", config.max_symbols)) {
            Ok(index) => index,
            Err(source) => {
                error!("stab: failed to allocate address table: {}", source);
                drop(by_name);
                return Err(StabError::Allocation {
                    what: "address table",
                    source,
                });
            }
        };

        debug!("stab: created table (max_symbols = {:?})", config.max_symbols);
        Ok(Self::from_indexes(by_name, by_address))
    }

    /// Assemble a table from existing indexes. They must already agree.
    pub fn from_indexes(by_name: N, by_address: A) -> Self {
        Self {
            by_name,
            by_address,
        }
    }

    /// Empty both indexes
    pub fn clear(&mut self) {
        self.by_name.clear();
        self.by_address.clear();
        debug!("stab: cleared");
    }

    /// Associate `name` with `address`, replacing any previous address
    pub fn set(&mut self, name: &str, address: Address) -> StabResult<()> {
        let key = SymbolName::new(name);

        // Drop the reverse mapping of the old address first
        if let Some(old) = self.by_name.lookup(&key) {
            if self.by_address.delete(&AddrKey::new(old, key)).is_err() {
                warn!("stab: {} = 0x{:04x} had no address entry", key, old);
            }
        }

        self.by_address
            .insert(AddrKey::new(address, key), ())
            .map_err(write_failure("set", key, address))?;
        self.by_name
            .insert(key, address)
            .map_err(write_failure("set", key, address))?;

        debug!("stab: {} = 0x{:04x}", key, address);
        Ok(())
    }

    /// Exact lookup by name
    pub fn get(&self, name: &str) -> StabResult<Address> {
        self.by_name
            .lookup(&SymbolName::new(name))
            .ok_or_else(|| StabError::NotFound(name.to_string()))
    }

    /// Remove a symbol from both indexes
    pub fn delete(&mut self, name: &str) -> StabResult<()> {
        let key = SymbolName::new(name);
        let address = self
            .by_name
            .lookup(&key)
            .ok_or_else(|| StabError::NotFound(name.to_string()))?;

        if let Err(e) = self.by_address.delete(&AddrKey::new(address, key)) {
            warn!("stab: {} = 0x{:04x}: {}", key, address, e);
        }
        self.by_name
            .delete(&key)
            .map_err(write_failure("delete", key, address))?;

        debug!("stab: deleted {}", key);
        Ok(())
    }

    /// Find the symbol at or below `address`.
    ///
    /// Returns its name and the distance from it. When several names
    /// share that address, the one that sorts last wins.
    pub fn nearest(&self, address: Address) -> StabResult<(String, Address)> {
        let found = self.nearest_key(address)?;
        Ok((found.name.as_str().to_string(), address - found.address))
    }

    /// Like `nearest`, but the name is cut to fit a `max_len` byte
    /// buffer including its terminator
    pub fn nearest_bounded(&self, address: Address, max_len: usize) -> StabResult<(String, Address)> {
        let found = self.nearest_key(address)?;
        Ok((found.name.truncated(max_len).to_string(), address - found.address))
    }

    fn nearest_key(&self, address: Address) -> StabResult<AddrKey> {
        let probe = AddrKey::new(address, SymbolName::probe());

        self.by_address
            .seek(Seek::LessOrEqual(&probe))
            .map(|(key, ())| key)
            .ok_or(StabError::NoPredecessor(address))
    }

    /// Visit every symbol in ascending address order, then by name.
    ///
    /// Stops at the first error returned by the visitor and passes it on.
    pub fn enumerate<E, F>(&self, mut visitor: F) -> Result<(), E>
    where
        F: FnMut(&str, Address) -> Result<(), E>,
    {
        for key in self.entries() {
            visitor(key.name.as_str(), key.address)?;
        }
        Ok(())
    }

    /// All symbols in ascending address order
    pub fn symbols(&self) -> Vec<Symbol> {
        self.entries().map(Symbol::from).collect()
    }

    /// Symbols whose name matches `pattern`, in ascending address order
    pub fn find(&self, pattern: &Regex) -> Vec<Symbol> {
        self.entries()
            .filter(|key| pattern.is_match(key.name.as_str()))
            .map(Symbol::from)
            .collect()
    }

    /// Rename every symbol matching `pattern`, keeping its address.
    ///
    /// The first match in each name is replaced by `replacement`, which may
    /// refer to capture groups. Returns the number of symbols renamed.
    pub fn rename(&mut self, pattern: &Regex, replacement: &str) -> StabResult<usize> {
        let renames: Vec<(Symbol, String)> = self
            .find(pattern)
            .into_iter()
            .filter_map(|symbol| {
                let new_name = pattern.replace(symbol.name(), replacement).into_owned();
                (new_name != symbol.name()).then_some((symbol, new_name))
            })
            .collect();

        // All old names go before any new one is set, so a new name can
        // never be deleted as the old name of a later entry
        for (symbol, new_name) in &renames {
            debug!("stab: rename {} -> {}", symbol.name(), new_name);
            self.delete(symbol.name())?;
        }
        for (symbol, new_name) in &renames {
            self.set(new_name, symbol.address())?;
        }

        Ok(renames.len())
    }

    /// Check that the two indexes describe the same symbols
    pub fn verify(&self) -> StabResult<()> {
        let mut entry = self.by_name.seek(Seek::First);
        while let Some((name, address)) = entry {
            if self.by_address.lookup(&AddrKey::new(address, name)).is_none() {
                return Err(StabError::Inconsistent(format!(
                    "{} = 0x{:04x} has no address entry",
                    name, address
                )));
            }
            entry = self.by_name.seek(Seek::Next(&name));
        }

        if self.by_address.len() != self.by_name.len() {
            let stray = self
                .entries()
                .find(|key| self.by_name.lookup(&key.name) != Some(key.address));

            return Err(StabError::Inconsistent(match stray {
                Some(key) => format!("stray address entry {} at 0x{:04x}", key.name, key.address),
                None => format!(
                    "{} names but {} address entries",
                    self.by_name.len(),
                    self.by_address.len()
                ),
            }));
        }

        Ok(())
    }

    /// Number of symbols
    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    fn entries(&self) -> impl Iterator<Item = AddrKey> + '_ {
        let first = self.by_address.seek(Seek::First).map(|(key, ())| key);
        std::iter::successors(first, move |prev| {
            self.by_address.seek(Seek::Next(prev)).map(|(key, ())| key)
        })
    }
}

fn write_failure(
    op: &'static str,
    name: SymbolName,
    address: Address,
) -> impl FnOnce(IndexError) -> StabError {
    move |source| {
        error!("stab: can't {} {} = 0x{:04x}: {}", op, name, address, source);
        StabError::WriteFailure {
            op,
            name: name.to_string(),
            address,
            source,
        }
    }
}
