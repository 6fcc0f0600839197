//! Plain-text symbol maps.
//!
//! One symbol per line, `ADDRESS NAME`, with the address in hex. Lines of
//! the `ADDRESS TYPE NAME` form written by `nm` are accepted as well, and
//! its address-less undefined entries (`U name`) are skipped.
//! Blank lines and lines starting with `#` are ignored.

use std::io::{BufRead, Write};

use anyhow::{anyhow, Context, Result};
use log::{debug, info};

use crate::debugger::index::OrderedIndex;
use crate::debugger::symbols::{AddrKey, Address, SymbolName, SymbolTable};

/// Write every symbol, in ascending address order. Returns the count.
pub fn export_symbols<N, A, W>(table: &SymbolTable<N, A>, out: &mut W) -> Result<usize>
where
    N: OrderedIndex<SymbolName, Address>,
    A: OrderedIndex<AddrKey, ()>,
    W: Write,
{
    let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
    writeln!(out, "# stabcat symbol map, exported {timestamp}")
        .context("Failed to write symbol map header")?;

    let mut count = 0;
    table.enumerate(|name, address| -> Result<()> {
        writeln!(out, "0x{:04x} {}", address, name)
            .with_context(|| format!("Failed to write symbol {}", name))?;
        count += 1;
        Ok(())
    })?;

    debug!("symmap: exported {} symbols", count);
    Ok(count)
}

/// Read a symbol map into `table`. Returns the number of symbols set.
pub fn import_symbols<N, A, R>(table: &mut SymbolTable<N, A>, input: R) -> Result<usize>
where
    N: OrderedIndex<SymbolName, Address>,
    A: OrderedIndex<AddrKey, ()>,
    R: BufRead,
{
    let mut count = 0;

    for (i, line) in input.lines().enumerate() {
        let line = line.with_context(|| format!("Failed to read line {}", i + 1))?;
        let parsed = parse_line(&line).with_context(|| format!("line {}", i + 1))?;
        let Some((address, name)) = parsed else {
            continue;
        };

        table.set(name, address)?;
        count += 1;
    }

    info!("symmap: imported {} symbols", count);
    Ok(count)
}

fn parse_line(line: &str) -> Result<Option<(Address, &str)>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let fields: Vec<&str> = line.split_whitespace().collect();
    let (addr_text, name) = match fields.as_slice() {
        // nm lists undefined and weak undefined symbols without an address
        [kind @ ("U" | "w" | "v"), name] => {
            debug!("symmap: skipping undefined symbol {} ({})", name, kind);
            return Ok(None);
        },
        [addr, name] | [addr, _, name] => (*addr, *name),
        _ => return Err(anyhow!("expected ADDRESS [TYPE] NAME: {}", line)),
    };

    let digits = addr_text
        .strip_prefix("0x")
        .or_else(|| addr_text.strip_prefix("0X"))
        .unwrap_or(addr_text);
    let address = Address::from_str_radix(digits, 16)
        .map_err(|e| anyhow!("invalid address {}: {}", addr_text, e))?;

    Ok(Some((address, name)))
}
