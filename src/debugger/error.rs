use thiserror::Error;

use crate::debugger::index::IndexError;
use crate::debugger::symbols::Address;

/// Errors reported by the symbol table
#[derive(Debug, Error)]
pub enum StabError {
    /// One of the two indexes could not be created
    #[error("stab: failed to allocate {what}")]
    Allocation {
        what: &'static str,
        #[source]
        source: IndexError,
    },
    /// No symbol with this name
    #[error("stab: no such symbol: {0}")]
    NotFound(String),
    /// Nothing is stored at or below this address
    #[error("stab: no symbol at or below 0x{0:04x}")]
    NoPredecessor(Address),
    /// An index mutation failed part way through an update
    #[error("stab: can't {op} {name} = 0x{address:04x}")]
    WriteFailure {
        op: &'static str,
        name: String,
        address: Address,
        #[source]
        source: IndexError,
    },
    /// The name and address indexes disagree
    #[error("stab: index mismatch: {0}")]
    Inconsistent(String),
}

impl StabError {
    /// True for both flavours of lookup miss
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::NoPredecessor(_))
    }
}

pub type StabResult<T> = Result<T, StabError>;
