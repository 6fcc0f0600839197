use std::env;
use std::fs::File;
use std::io::{self, BufReader, IsTerminal};
use std::process;

use anyhow::{anyhow, Context, Result};
use log::{error, info, LevelFilter};

use stabcat::cli::repl::{command_loop, run_command};
use stabcat::debugger::options::OptionValue;
use stabcat::debugger::symmap::import_symbols;
use stabcat::{Session, TableConfig, PKG_DESCRIPTION, VERSION};

/// Settings gathered from the command line
#[derive(Debug, Default)]
struct Args {
    quiet: bool,
    debug: bool,
    symbol_files: Vec<String>,
    max_symbols: Option<usize>,
    commands: Vec<String>,
}

/// STABCAT - symbol table console
fn main() {
    let args: Vec<String> = env::args().collect();

    let parsed = match parse_args(&args) {
        Ok(parsed) => parsed,
        Err(e) => {
            eprintln!("{}: {}", args[0], e);
            print_usage(&args[0]);
            process::exit(1);
        }
    };

    stabcat::init_logging(if parsed.debug {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    });

    info!("Starting STABCAT v{}", VERSION);

    if let Err(e) = run(&parsed) {
        error!("{:#}", e);
        process::exit(1);
    }

    info!("STABCAT exiting");
}

fn parse_args(args: &[String]) -> Result<Args> {
    let mut parsed = Args::default();
    let mut i = 1;

    while i < args.len() {
        match args[i].as_str() {
            // Version
            "-v" | "--version" => {
                println!("STABCAT v{}", VERSION);
                println!("{}", PKG_DESCRIPTION);
                process::exit(0);
            },
            // Help
            "-h" | "--help" => {
                print_usage(&args[0]);
                process::exit(0);
            },
            "-q" | "--quiet" => parsed.quiet = true,
            "-d" | "--debug" => parsed.debug = true,
            "-s" | "--symbols" => {
                i += 1;
                let path = args.get(i).ok_or_else(|| anyhow!("{} requires a file name", args[i - 1]))?;
                parsed.symbol_files.push(path.clone());
            },
            "-m" | "--max-symbols" => {
                i += 1;
                let text = args.get(i).ok_or_else(|| anyhow!("{} requires a number", args[i - 1]))?;
                let limit = text
                    .parse::<usize>()
                    .map_err(|e| anyhow!("invalid symbol limit {}: {}", text, e))?;
                parsed.max_symbols = Some(limit);
            },
            flag if flag.starts_with('-') && flag.len() > 1 => {
                return Err(anyhow!("unknown option: {}", flag));
            },
            // Everything else is a command to run
            command => parsed.commands.push(command.to_string()),
        }

        i += 1;
    }

    Ok(parsed)
}

fn run(args: &Args) -> Result<()> {
    let config = TableConfig {
        max_symbols: args.max_symbols,
    };
    let mut session = Session::new(&config)?;

    if args.quiet {
        session.options_mut().set("quiet", OptionValue::Boolean(true))?;
    }

    for path in &args.symbol_files {
        let file = File::open(path).with_context(|| format!("Failed to open symbol map {}", path))?;
        let count = import_symbols(session.symbols_mut(), BufReader::new(file))
            .with_context(|| format!("Failed to load symbol map {}", path))?;
        info!("Loaded {} symbols from {}", count, path);
    }

    let mut stdout = io::stdout().lock();

    // One-shot mode: run the given commands and stop at the first failure
    if !args.commands.is_empty() {
        for command in &args.commands {
            run_command(&mut session, command, &mut stdout)
                .with_context(|| format!("command failed: {}", command))?;
            if session.exit_requested() {
                break;
            }
        }
        return Ok(());
    }

    let stdin = io::stdin();
    let interactive = stdin.is_terminal();
    command_loop(&mut session, stdin.lock(), &mut stdout, interactive)
}

/// Print usage information
fn print_usage(program_name: &str) {
    println!("STABCAT - symbol table console for embedded debuggers");
    println!("Usage: {} [options] [command ...]", program_name);
    println!();
    println!("Options:");
    println!("  -h, --help             Display this help message");
    println!("  -v, --version          Display version information");
    println!("  -q, --quiet            Suppress informational messages");
    println!("  -d, --debug            Enable debug logging");
    println!("  -s, --symbols FILE     Load a symbol map before running commands");
    println!("  -m, --max-symbols N    Limit the symbol table to N symbols");
    println!();
    println!("Each remaining argument is run as one command, for example:");
    println!("  {} -s app.map \"sym nearest 0x4402\"", program_name);
    println!();
    println!("Without commands, commands are read from standard input.");
    println!("Type \"help\" for a list of commands.");
}
