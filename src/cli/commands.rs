use std::fs::File;
use std::io::{BufReader, BufWriter, Write};

use anyhow::{anyhow, Context, Result};
use log::debug;
use regex::Regex;

use crate::cli::repl::process_file;
use crate::debugger::core::Session;
use crate::debugger::symmap::{export_symbols, import_symbols};

/// Console commands
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    // Symbol table commands
    SymClear,                   // Remove all symbols
    SymSet(String, String),     // Set symbol to address expression
    SymGet(String),             // Show a symbol's address
    SymDel(String),             // Delete a symbol
    SymFind(Option<String>),    // List symbols, optionally filtered by regex
    SymRename(String, String),  // Rename symbols matching regex
    SymNearest(String),         // Show the symbol at or below an address
    SymImport(String),          // Load a symbol map
    SymExport(String),          // Save a symbol map
    SymVerify,                  // Cross-check the two symbol indexes

    // Control commands
    Help(Option<String>),               // Show help for command or option
    Opt(Option<String>, Option<String>), // Show or set an option
    Read(String),                       // Execute commands from file
    Exit,                               // Leave the command loop

    // Unknown command
    Unknown(String),
}

/// Name and help text of every top-level command
pub const COMMANDS: &[(&str, &str)] = &[
    (
        "exit",
        "exit\n    Exit from the command reader.",
    ),
    (
        "help",
        "help [command]\n    Without arguments, displays a list of commands. With a command\n    or option name as an argument, displays help for that topic.",
    ),
    (
        "opt",
        "opt [name] [value]\n    Query or set option values. With no arguments, displays all\n    options. With an option name, shows that option. With a name and\n    a value, sets the option.",
    ),
    (
        "read",
        "read <filename>\n    Read commands from a file and evaluate them, stopping at the\n    first command that fails.",
    ),
    (
        "sym",
        "sym clear\n    Clear the symbol table.\n\
         sym set <name> <value>\n    Set or overwrite the value of a symbol.\n\
         sym get <name>\n    Show the address of a symbol.\n\
         sym del <name>\n    Delete a symbol from the symbol table.\n\
         sym find [regex]\n    List symbols by address, optionally only those matching regex.\n\
         sym rename <regex> <string>\n    Replace the first match of regex in each symbol name.\n\
         sym nearest <address>\n    Show the symbol at or below an address and the offset.\n\
         sym import <filename>\n    Load symbols from a map of \"ADDRESS [TYPE] NAME\" lines.\n\
         sym export <filename>\n    Save all symbols as a map, one \"0xADDR NAME\" per line.\n\
         sym verify\n    Check that the name and address indexes agree.",
    ),
];

/// Parse a command line. Never fails: bad input becomes `Command::Unknown`.
pub fn parse_command(cmd_str: &str) -> Command {
    let cmd_str = cmd_str.trim_end_matches(|c| c == '\r' || c == '\n');
    if cmd_str.trim().is_empty() {
        return Command::Unknown(String::new());
    }

    // Split command into parts
    let parts: Vec<&str> = cmd_str.split_whitespace().collect();

    match parts[0] {
        "h" | "help" => Command::Help(parts.get(1).map(|s| s.to_string())),
        "opt" => match parts.len() {
            1 => Command::Opt(None, None),
            2 => Command::Opt(Some(parts[1].to_string()), None),
            _ => Command::Opt(Some(parts[1].to_string()), Some(skip_words(cmd_str, 2).to_string())),
        },
        "read" => {
            if parts.len() > 1 {
                Command::Read(parts[1..].join(" "))
            } else {
                Command::Unknown("read: filename must be specified".to_string())
            }
        },
        "q" | "quit" | "exit" => Command::Exit,
        "sym" => parse_sym(&parts[1..]),
        other => Command::Unknown(format!("unknown command: {}", other)),
    }
}

/// The text after the first `count` words, with its spacing kept
fn skip_words(line: &str, count: usize) -> &str {
    let mut rest = line.trim_start();
    for _ in 0..count {
        let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
        rest = rest[end..].trim_start();
    }
    rest
}

fn parse_sym(args: &[&str]) -> Command {
    let Some(sub) = args.first() else {
        return Command::Unknown("sym: need to specify a subcommand (try \"help sym\")".to_string());
    };

    match (*sub, &args[1..]) {
        ("clear", []) => Command::SymClear,
        ("set", [name, value @ ..]) if !value.is_empty() => {
            Command::SymSet(name.to_string(), value.join(" "))
        },
        ("get", [name]) => Command::SymGet(name.to_string()),
        ("del", [name]) => Command::SymDel(name.to_string()),
        ("find", []) => Command::SymFind(None),
        ("find", [pattern]) => Command::SymFind(Some(pattern.to_string())),
        ("rename", [pattern, replacement]) => {
            Command::SymRename(pattern.to_string(), replacement.to_string())
        },
        ("nearest", [address]) => Command::SymNearest(address.to_string()),
        ("import", [path]) => Command::SymImport(path.to_string()),
        ("export", [path]) => Command::SymExport(path.to_string()),
        ("verify", []) => Command::SymVerify,
        ("clear" | "set" | "get" | "del" | "find" | "rename" | "nearest" | "import" | "export" | "verify", _) => {
            Command::Unknown(format!("sym {}: wrong number of arguments (try \"help sym\")", sub))
        },
        _ => Command::Unknown(format!("sym: unknown subcommand: {}", sub)),
    }
}

/// Run one command against the session, writing its output to `out`
pub fn execute(session: &mut Session, command: &Command, out: &mut dyn Write) -> Result<()> {
    debug!("Executing command: {:?}", command);
    let quiet = session.options().boolean("quiet");

    match command {
        Command::SymClear => session.symbols_mut().clear(),
        Command::SymSet(name, value) => {
            let address = session
                .resolve_address(value)
                .with_context(|| format!("sym set: can't resolve {}", value))?;
            session.symbols_mut().set(name, address)?;
        },
        Command::SymGet(name) => {
            let address = session.symbols().get(name)?;
            writeln!(out, "{} = 0x{:04x}", name, address)?;
        },
        Command::SymDel(name) => session.symbols_mut().delete(name)?,
        Command::SymFind(pattern) => {
            let re = compile(pattern.as_deref().unwrap_or(""))?;
            for symbol in session.symbols().find(&re) {
                writeln!(out, "0x{:04x}: {}", symbol.address(), symbol.name())?;
            }
        },
        Command::SymRename(pattern, replacement) => {
            let re = compile(pattern)?;
            let count = session.symbols_mut().rename(&re, replacement)?;
            if !quiet {
                writeln!(out, "{} symbols renamed", count)?;
            }
        },
        Command::SymNearest(text) => {
            let address = session.resolve_address(text)?;
            // Fail rather than print a bare address when nothing precedes it
            session.symbols().nearest(address)?;
            writeln!(out, "0x{:04x} = {}", address, session.format_address(address))?;
        },
        Command::SymImport(path) => {
            let file = File::open(path).with_context(|| format!("sym import: can't open {}", path))?;
            let count = import_symbols(session.symbols_mut(), BufReader::new(file))
                .with_context(|| format!("sym import: {}", path))?;
            if !quiet {
                writeln!(out, "{} symbols imported", count)?;
            }
        },
        Command::SymExport(path) => {
            let file = File::create(path).with_context(|| format!("sym export: can't create {}", path))?;
            let mut writer = BufWriter::new(file);
            let count = export_symbols(session.symbols(), &mut writer)?;
            writer.flush().context("Failed to flush symbol map")?;
            if !quiet {
                writeln!(out, "{} symbols exported", count)?;
            }
        },
        Command::SymVerify => {
            session.symbols().verify()?;
            writeln!(out, "symbol table consistent ({} symbols)", session.symbols().len())?;
        },
        Command::Help(topic) => show_help(session, topic.as_deref(), out)?,
        Command::Opt(name, value) => match (name, value) {
            (None, _) => {
                for entry in session.options().iter() {
                    writeln!(out, "{}", entry)?;
                }
            },
            (Some(name), None) => {
                let entry = session
                    .options()
                    .get(name)
                    .ok_or_else(|| anyhow!("opt: no such option: {}", name))?;
                writeln!(out, "{}", entry)?;
            },
            (Some(name), Some(value)) => session.set_option(name, value)?,
        },
        Command::Read(path) => process_file(session, path, out)?,
        Command::Exit => session.request_exit(),
        Command::Unknown(msg) => {
            if !msg.is_empty() {
                return Err(anyhow!("{}", msg));
            }
        },
    }

    Ok(())
}

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| anyhow!("Invalid regex pattern: {}", e))
}

fn show_help(session: &Session, topic: Option<&str>, out: &mut dyn Write) -> Result<()> {
    let color = session.options().boolean("color");
    let title = |text: String| {
        if color {
            format!("\x1b[1m{}\x1b[0m", text)
        } else {
            text
        }
    };

    let Some(topic) = topic else {
        let commands: Vec<&str> = COMMANDS.iter().map(|(name, _)| *name).collect();
        writeln!(out, "Available commands:")?;
        write!(out, "{}", format_namelist(&commands))?;
        writeln!(out)?;

        writeln!(out, "Available options:")?;
        write!(out, "{}", format_namelist(&session.options().names()))?;
        writeln!(out)?;

        writeln!(out, "Type \"help <topic>\" for more information.")?;
        writeln!(out, "Press Ctrl+D to quit.")?;
        return Ok(());
    };

    if let Some((name, help)) = COMMANDS.iter().find(|(name, _)| *name == topic) {
        writeln!(out, "{}\n\n{}", title(format!("COMMAND: {}", name)), help)?;
        return Ok(());
    }

    if let Some(entry) = session.options().get(topic) {
        writeln!(
            out,
            "{}\n\n{}",
            title(format!("OPTION: {} ({})", entry.name(), entry.option_type().as_str())),
            entry.help()
        )?;
        return Ok(());
    }

    Err(anyhow!("help: unknown command: {}", topic))
}

/// Lay names out in columns, column-major, sorted, inside 72 characters
pub fn format_namelist(names: &[&str]) -> String {
    if names.is_empty() {
        return String::new();
    }

    let mut sorted = names.to_vec();
    sorted.sort_unstable();

    let width = sorted.iter().map(|n| n.len()).max().unwrap_or(0) + 2;
    let cols = (72 / width).max(1);
    let rows = sorted.len().div_ceil(cols);

    let mut text = String::new();
    for row in 0..rows {
        text.push_str("    ");
        for col in 0..cols {
            if let Some(name) = sorted.get(col * rows + row) {
                text.push_str(&format!("{:<width$}", name, width = width));
            }
        }
        text.truncate(text.trim_end().len());
        text.push('\n');
    }

    text
}
