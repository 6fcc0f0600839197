use std::collections::BTreeMap;
use std::fmt;

use anyhow::{anyhow, Result};

use crate::debugger::symbols::Address;

/// Longest text option value kept, in bytes
pub const MAX_TEXT_LEN: usize = 127;

/// Type of a run-time option
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionType {
    Boolean,
    Numeric,
    Text,
}

impl OptionType {
    /// Convert to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Boolean => "boolean",
            Self::Numeric => "numeric",
            Self::Text => "text",
        }
    }
}

/// Value held by an option
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionValue {
    Boolean(bool),
    Numeric(Address),
    Text(String),
}

impl OptionValue {
    pub fn option_type(&self) -> OptionType {
        match self {
            Self::Boolean(_) => OptionType::Boolean,
            Self::Numeric(_) => OptionType::Numeric,
            Self::Text(_) => OptionType::Text,
        }
    }

    /// Text value cut down to `MAX_TEXT_LEN` bytes
    pub fn text(value: &str) -> Self {
        let mut len = value.len().min(MAX_TEXT_LEN);
        while !value.is_char_boundary(len) {
            len -= 1;
        }
        Self::Text(value[..len].to_string())
    }
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Boolean(b) => write!(f, "{}", b),
            Self::Numeric(n) => write!(f, "0x{:x} ({})", n, n),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// A named option with its help text and current value
#[derive(Debug, Clone)]
pub struct OptionEntry {
    name: &'static str,
    help: &'static str,
    value: OptionValue,
}

impl OptionEntry {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn help(&self) -> &'static str {
        self.help
    }

    pub fn value(&self) -> &OptionValue {
        &self.value
    }

    pub fn option_type(&self) -> OptionType {
        self.value.option_type()
    }
}

impl fmt::Display for OptionEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:>32} = {}", self.name, self.value)
    }
}

/// Registry of run-time options
#[derive(Debug, Clone)]
pub struct OptionDb {
    options: BTreeMap<&'static str, OptionEntry>,
}

impl OptionDb {
    /// Create a registry holding the default options
    pub fn new() -> Self {
        let mut db = Self {
            options: BTreeMap::new(),
        };

        db.define(
            "color",
            "Colorize command output.",
            OptionValue::Boolean(false),
        );
        db.define(
            "quiet",
            "Suppress informational messages after symbol table updates.",
            OptionValue::Boolean(false),
        );
        db.define(
            "iradix",
            "Default radix for numbers that carry no 0x prefix.",
            OptionValue::Numeric(10),
        );
        db.define(
            "prompt",
            "Prompt shown by the interactive command reader.",
            OptionValue::text("(stabcat) "),
        );

        db
    }

    fn define(&mut self, name: &'static str, help: &'static str, value: OptionValue) {
        self.options.insert(name, OptionEntry { name, help, value });
    }

    /// Look up an option by name
    pub fn get(&self, name: &str) -> Option<&OptionEntry> {
        self.options.get(name)
    }

    /// Replace an option's value. The value must have the option's type.
    pub fn set(&mut self, name: &str, value: OptionValue) -> Result<()> {
        let entry = self
            .options
            .get_mut(name)
            .ok_or_else(|| anyhow!("no such option: {}", name))?;

        if entry.option_type() != value.option_type() {
            return Err(anyhow!(
                "option {} is {}, not {}",
                name,
                entry.option_type().as_str(),
                value.option_type().as_str()
            ));
        }

        entry.value = match value {
            OptionValue::Text(s) => OptionValue::text(&s),
            other => other,
        };
        Ok(())
    }

    /// All options, sorted by name
    pub fn iter(&self) -> impl Iterator<Item = &OptionEntry> {
        self.options.values()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.options.keys().copied().collect()
    }

    /// Value of a boolean option, false if absent or of another type
    pub fn boolean(&self, name: &str) -> bool {
        matches!(
            self.get(name).map(OptionEntry::value),
            Some(OptionValue::Boolean(true))
        )
    }

    pub fn numeric(&self, name: &str) -> Option<Address> {
        match self.get(name).map(OptionEntry::value) {
            Some(OptionValue::Numeric(n)) => Some(*n),
            _ => None,
        }
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        match self.get(name).map(OptionEntry::value) {
            Some(OptionValue::Text(s)) => Some(s.as_str()),
            _ => None,
        }
    }
}

impl Default for OptionDb {
    fn default() -> Self {
        Self::new()
    }
}

/// Interpret a word as a boolean: a non-zero leading digit, `t...`,
/// `y...` or `on...` mean true, anything else false
pub fn parse_boolean(word: &str) -> bool {
    let bytes = word.as_bytes();
    match bytes.first() {
        Some(b'1'..=b'9') | Some(b't') | Some(b'y') => true,
        Some(b'o') => bytes.get(1) == Some(&b'n'),
        _ => false,
    }
}
