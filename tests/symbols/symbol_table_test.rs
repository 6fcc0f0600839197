use stabcat::{StabError, Symbol, SymbolTable, MAX_NAME_LEN};
use test_case::test_case;

use crate::test_helpers::table_with;

#[test]
fn test_set_then_get() {
    let table = table_with(&[("foo", 0x1000)]);
    assert_eq!(table.get("foo").unwrap(), 0x1000);
}

#[test]
fn test_overwrite_drops_old_address() {
    let mut table = table_with(&[("foo", 0x1000)]);
    table.set("foo", 0x2000).unwrap();

    assert_eq!(table.get("foo").unwrap(), 0x2000);

    // Nothing is left at the old address
    let err = table.nearest(0x1000).unwrap_err();
    assert!(matches!(err, StabError::NoPredecessor(0x1000)));
    assert_eq!(table.symbols(), vec![Symbol::new("foo", 0x2000)]);
    table.verify().unwrap();
}

#[test]
fn test_aliases_resolve_to_greatest_name() {
    let table = table_with(&[("a", 0x100), ("b", 0x100)]);

    assert_eq!(table.get("a").unwrap(), 0x100);
    assert_eq!(table.get("b").unwrap(), 0x100);
    assert_eq!(table.nearest(0x100).unwrap(), ("b".to_string(), 0));
}

#[test]
fn test_nearest_with_offset() {
    let table = table_with(&[("base", 0x2000)]);
    assert_eq!(table.nearest(0x2005).unwrap(), ("base".to_string(), 0x5));
}

#[test_case(&[], 0x1000 ; "empty table")]
#[test_case(&[("low", 0x200)], 0x1ff ; "just below the only symbol")]
#[test_case(&[("a", 0x200), ("b", 0x300)], 0 ; "address zero")]
fn test_nearest_not_found(symbols: &[(&str, u64)], address: u64) {
    let table = table_with(symbols);
    let err = table.nearest(address).unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn test_delete() {
    let mut table = table_with(&[("x", 0x10)]);
    table.delete("x").unwrap();

    assert!(table.get("x").unwrap_err().is_not_found());
    assert!(table.nearest(0x10).unwrap_err().is_not_found());
    assert!(table.delete("x").unwrap_err().is_not_found());
    assert!(table.is_empty());
}

#[test]
fn test_delete_one_alias_keeps_the_other() {
    let mut table = table_with(&[("a", 0x100), ("b", 0x100)]);
    table.delete("b").unwrap();
    assert_eq!(table.nearest(0x104).unwrap(), ("a".to_string(), 4));
    table.verify().unwrap();
}

#[test]
fn test_enumeration_order() {
    let table = table_with(&[("c", 0x300), ("a", 0x100), ("b", 0x200)]);

    let mut seen = Vec::new();
    table
        .enumerate(|name, address| -> Result<(), ()> {
            seen.push((name.to_string(), address));
            Ok(())
        })
        .unwrap();

    assert_eq!(
        seen,
        vec![
            ("a".to_string(), 0x100),
            ("b".to_string(), 0x200),
            ("c".to_string(), 0x300),
        ]
    );
}

#[test]
fn test_enumeration_orders_aliases_by_name() {
    let table = table_with(&[("zz", 0x10), ("aa", 0x10), ("mm", 0x08)]);
    let names: Vec<String> = table.symbols().iter().map(|s| s.name().to_string()).collect();
    assert_eq!(names, vec!["mm", "aa", "zz"]);
}

#[test]
fn test_enumeration_stops_on_visitor_error() {
    let table = table_with(&[("a", 1), ("b", 2), ("c", 3)]);

    let mut visited = Vec::new();
    let result = table.enumerate(|name, _| {
        if name == "b" {
            return Err(format!("stop at {}", name));
        }
        visited.push(name.to_string());
        Ok(())
    });

    assert_eq!(result, Err("stop at b".to_string()));
    assert_eq!(visited, vec!["a"]);
}

#[test_case(MAX_NAME_LEN - 1 ; "one short of the limit")]
#[test_case(MAX_NAME_LEN ; "exactly the limit")]
#[test_case(MAX_NAME_LEN + 1 ; "one past the limit")]
#[test_case(500 ; "far past the limit")]
fn test_truncation(len: usize) {
    let long = "s".repeat(len);
    let stored = &long[..len.min(MAX_NAME_LEN)];

    let mut table = SymbolTable::new().unwrap();
    table.set(&long, 0x4000).unwrap();

    assert_eq!(table.get(stored).unwrap(), 0x4000);
    assert_eq!(table.nearest(0x4000).unwrap().0, stored);
    assert_eq!(table.symbols()[0].name(), stored);
}

#[test]
fn test_truncated_names_collide() {
    let prefix = "p".repeat(MAX_NAME_LEN);
    let mut table = SymbolTable::new().unwrap();
    table.set(&format!("{}_one", prefix), 0x1).unwrap();
    table.set(&format!("{}_two", prefix), 0x2).unwrap();

    // Both truncate to the same key, so the second overwrote the first
    assert_eq!(table.len(), 1);
    assert_eq!(table.get(&prefix).unwrap(), 0x2);
    table.verify().unwrap();
}

#[test]
fn test_nearest_bounded_truncates_name() {
    let table = table_with(&[("watchdog_timer_isr", 0xfff4)]);
    assert_eq!(
        table.nearest_bounded(0xfff6, 9).unwrap(),
        ("watchdog".to_string(), 2)
    );
}

#[test]
fn test_clear_keeps_table_usable() {
    let mut table = table_with(&[("a", 1), ("b", 2)]);
    table.clear();
    assert!(table.is_empty());
    assert!(table.nearest(10).is_err());

    table.set("c", 3).unwrap();
    assert_eq!(table.get("c").unwrap(), 3);
    table.verify().unwrap();
}
