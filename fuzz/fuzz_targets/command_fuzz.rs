#![no_main]

use libfuzzer_sys::fuzz_target;
use stabcat::{parse_command, Command};

fuzz_target!(|line: &str| {
    let command = parse_command(line);

    if let Command::Unknown(msg) = &command {
        // Only blank input comes back without an explanation
        assert_eq!(msg.is_empty(), line.trim().is_empty(), "input {:?}", line);
    }

    // Option values keep their text verbatim, so they never gain whitespace
    if let Command::Opt(_, Some(value)) = &command {
        assert!(line.contains(value.as_str()));
    }
});
