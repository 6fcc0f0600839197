#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use stabcat::{SymbolTable, TableConfig};

#[derive(Arbitrary, Debug)]
enum SymbolOp {
    Set { name: String, address: u64 },
    Delete { name: String },
    Nearest { address: u64, max_len: u8 },
    Clear,
}

#[derive(Arbitrary, Debug)]
struct SymbolFuzzInput {
    // Small limits exercise the full-table path
    max_symbols: Option<u8>,
    ops: Vec<SymbolOp>,
}

fuzz_target!(|input: SymbolFuzzInput| {
    let config = TableConfig {
        max_symbols: input.max_symbols.map(usize::from),
    };

    // A zero limit is refused at creation
    let created: Result<SymbolTable, _> = SymbolTable::create(&config);
    let Ok(mut table) = created else {
        return;
    };

    for op in &input.ops {
        match op {
            SymbolOp::Set { name, address } => {
                let _ = table.set(name, *address);
            },
            SymbolOp::Delete { name } => {
                let _ = table.delete(name);
            },
            SymbolOp::Nearest { address, max_len } => {
                if let Ok((name, offset)) = table.nearest_bounded(*address, usize::from(*max_len)) {
                    assert!(name.len() < usize::from(*max_len).max(1));
                    assert!(offset <= *address);
                }
            },
            SymbolOp::Clear => table.clear(),
        }

        // Index writes never fail part way for the B-tree backend
        assert!(table.verify().is_ok());
    }
});
