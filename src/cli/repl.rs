use std::fs::File;
use std::io::{BufRead, BufReader, Write};

use anyhow::{anyhow, Context, Result};
use log::{debug, error, info};

use crate::cli::commands::{execute, parse_command};
use crate::debugger::core::Session;

/// How deeply `read` may nest before it is refused
pub const MAX_READ_DEPTH: usize = 16;

/// Parse and run a single command line
pub fn run_command(session: &mut Session, line: &str, out: &mut dyn Write) -> Result<()> {
    let command = parse_command(line);
    execute(session, &command, out)
}

/// Run every command in a file, stopping at the first one that fails
pub fn process_file(session: &mut Session, path: &str, out: &mut dyn Write) -> Result<()> {
    if session.read_depth() >= MAX_READ_DEPTH {
        return Err(anyhow!("read: {}: nested too deeply", path));
    }

    let file = File::open(path).with_context(|| format!("read: can't open {}", path))?;
    info!("Reading commands from {}", path);

    session.enter_read();
    let result = run_lines(session, BufReader::new(file), path, out);
    session.leave_read();
    result
}

fn run_lines<R: BufRead>(session: &mut Session, input: R, path: &str, out: &mut dyn Write) -> Result<()> {
    for (i, line) in input.lines().enumerate() {
        let line = line.with_context(|| format!("read: {}: I/O error", path))?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        run_command(session, &line, out).with_context(|| format!("{}:{}: {}", path, i + 1, trimmed))?;

        if session.exit_requested() {
            break;
        }
    }
    Ok(())
}

/// Read commands from `input` until end of input or `exit`.
///
/// Failing commands are logged and the loop carries on. When `prompt` is
/// set the `prompt` option is written before each line.
pub fn command_loop<R: BufRead>(
    session: &mut Session,
    mut input: R,
    out: &mut dyn Write,
    prompt: bool,
) -> Result<()> {
    let mut line = String::new();

    while !session.exit_requested() {
        if prompt {
            write!(out, "{}", session.options().text("prompt").unwrap_or(""))?;
            out.flush()?;
        }

        line.clear();
        if input.read_line(&mut line).context("Failed to read command")? == 0 {
            debug!("End of input");
            if prompt {
                writeln!(out)?;
            }
            break;
        }

        if line.trim_start().starts_with('#') {
            continue;
        }

        if let Err(e) = run_command(session, &line, out) {
            error!("{:#}", e);
        }
    }

    Ok(())
}
