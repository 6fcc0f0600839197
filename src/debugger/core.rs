use anyhow::{anyhow, Context, Result};
use log::{debug, info};

use crate::debugger::options::{parse_boolean, OptionDb, OptionType, OptionValue};
use crate::debugger::symbols::{Address, SymbolTable, TableConfig};

/// Debugging session state.
///
/// Owns the one symbol table of the session together with the option
/// registry. Everything that resolves names to addresses, such as the
/// command layer, receives the session explicitly.
#[derive(Debug)]
pub struct Session {
    /// Symbol table
    symbols: SymbolTable,
    /// Run-time options
    options: OptionDb,
    /// Set by the `exit` command
    exit_requested: bool,
    /// Nesting of `read` commands in progress
    read_depth: usize,
}

impl Session {
    /// Create a new session with an empty symbol table
    pub fn new(config: &TableConfig) -> Result<Self> {
        let symbols = SymbolTable::create(config).context("Failed to create symbol table")?;

        info!("Initialized session (max symbols: {:?})", config.max_symbols);

        Ok(Self {
            symbols,
            options: OptionDb::new(),
            exit_requested: false,
            read_depth: 0,
        })
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    pub fn symbols_mut(&mut self) -> &mut SymbolTable {
        &mut self.symbols
    }

    pub fn options(&self) -> &OptionDb {
        &self.options
    }

    pub fn options_mut(&mut self) -> &mut OptionDb {
        &mut self.options
    }

    /// Ask the command loop to stop after the current command
    pub fn request_exit(&mut self) {
        debug!("Exit requested");
        self.exit_requested = true;
    }

    pub fn exit_requested(&self) -> bool {
        self.exit_requested
    }

    pub fn read_depth(&self) -> usize {
        self.read_depth
    }

    pub fn enter_read(&mut self) {
        self.read_depth += 1;
    }

    pub fn leave_read(&mut self) {
        self.read_depth = self.read_depth.saturating_sub(1);
    }

    /// Turn user text into an address.
    ///
    /// Accepts `0x`-prefixed hex, a number in the `iradix` radix, or the
    /// name of a symbol.
    pub fn resolve_address(&self, text: &str) -> Result<Address> {
        let text = text.trim();
        if text.is_empty() {
            return Err(anyhow!("Empty address"));
        }

        if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
            return Address::from_str_radix(hex, 16)
                .map_err(|e| anyhow!("Invalid hex address {}: {}", text, e));
        }

        let radix = self.options.numeric("iradix").unwrap_or(10);
        if !(2..=36).contains(&radix) {
            return Err(anyhow!("iradix must be between 2 and 36, not {}", radix));
        }

        if let Ok(value) = Address::from_str_radix(text, radix as u32) {
            return Ok(value);
        }

        self.symbols
            .get(text)
            .map_err(|_| anyhow!("Not a number or known symbol: {}", text))
    }

    /// Describe an address relative to the nearest symbol at or below it
    pub fn format_address(&self, address: Address) -> String {
        match self.symbols.nearest(address) {
            Ok((name, 0)) => name,
            Ok((name, offset)) => format!("{}+0x{:x}", name, offset),
            Err(_) => format!("0x{:04x}", address),
        }
    }

    /// Set an option from the text the user typed, parsed per the
    /// option's type
    pub fn set_option(&mut self, name: &str, word: &str) -> Result<()> {
        let kind = self
            .options
            .get(name)
            .map(|entry| entry.option_type())
            .ok_or_else(|| anyhow!("no such option: {}", name))?;

        let value = match kind {
            OptionType::Boolean => OptionValue::Boolean(parse_boolean(word)),
            OptionType::Numeric => OptionValue::Numeric(
                self.resolve_address(word)
                    .with_context(|| format!("can't parse option: {}", word))?,
            ),
            OptionType::Text => OptionValue::text(word),
        };

        self.options.set(name, value)?;
        debug!("Option {} set to {}", name, word);
        Ok(())
    }
}
