//! STABCAT - symbol table and symbol console for embedded debuggers
//!
//! This library provides the bidirectional symbol table used to resolve
//! names to target addresses and addresses back to the nearest name,
//! along with the session and command layer built on top of it.

pub mod cli;
pub mod debugger;

/// Re-export key modules for easier access in tests
pub use cli::commands::{parse_command, Command};
pub use debugger::core::Session;
pub use debugger::error::{StabError, StabResult};
pub use debugger::index::{BTreeIndex, IndexDef, IndexError, OrderedIndex, Seek};
pub use debugger::symbols::{Address, AddrKey, Symbol, SymbolName, SymbolTable, TableConfig, MAX_NAME_LEN};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const PKG_NAME: &str = env!("CARGO_PKG_NAME");
pub const PKG_DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// Initialize the logging system
pub fn init_logging(level: log::LevelFilter) {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Warn)
        .filter_module("stabcat", level)
        .format_timestamp_secs()
        .init();
}
