//! Line-command execution against an embedded `txkv::Manager`. Grounded in
//! `kv-cli/src/lib.rs`'s doc-comment usage example (`SET`/`GET`/`DEL` ->
//! `OK ~`/`N/A ~`); `session::handle_query` just echoed `cmd: {query}`, so
//! this is the real backend wiring that example implied, generalized from a
//! single flat keyspace to txkv's named tables, run each as its own
//! `Direct` (`Any`/`Instant`) transaction since the REPL has no notion of a
//! multi-statement transaction block.

use txkv::error::{CResult, Error};
use txkv::storage::engine::Engine;
use txkv::txn::flags::{ReadIso, WriteIso};
use txkv::txn::manager::Manager;

pub const OK: &str = "OK ~";
pub const NOT_FOUND: &str = "N/A ~";

pub fn execute<E: Engine>(manager: &Manager<E>, line: &str) -> CResult<String> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    match parts.as_slice() {
        ["GET", table, key] => get(manager, table, key),
        ["SET", table, key, value] => set(manager, table, key, value),
        ["DEL", table, key] => del(manager, table, key),
        ["SCAN", table] => scan(manager, table),
        ["KEYS", table] => keys(manager, table),
        ["KSIZE", table] => ksize(manager, table),
        _ => Err(Error::Internal(format!(
            "unrecognized command {line:?} (expected GET/SET/DEL/SCAN/KEYS/KSIZE <table> ...)"
        ))),
    }
}

fn get<E: Engine>(manager: &Manager<E>, table: &str, key: &str) -> CResult<String> {
    let mut txn = manager.begin(&[table], ReadIso::Any, WriteIso::Instant)?;
    match txn.get(table, key.as_bytes())? {
        Some(value) => Ok(String::from_utf8_lossy(&value).into_owned()),
        None => Ok(NOT_FOUND.to_string()),
    }
}

fn set<E: Engine>(manager: &Manager<E>, table: &str, key: &str, value: &str) -> CResult<String> {
    let mut txn = manager.begin(&[table], ReadIso::Any, WriteIso::Instant)?;
    txn.set(table, key.as_bytes(), value.as_bytes().to_vec())?;
    Ok(OK.to_string())
}

fn del<E: Engine>(manager: &Manager<E>, table: &str, key: &str) -> CResult<String> {
    let mut txn = manager.begin(&[table], ReadIso::Any, WriteIso::Instant)?;
    txn.delete(table, key.as_bytes())?;
    Ok(OK.to_string())
}

fn scan<E: Engine>(manager: &Manager<E>, table: &str) -> CResult<String> {
    let mut txn = manager.begin(&[table], ReadIso::Any, WriteIso::Instant)?;
    let rows = txn.scan(table)?;
    if rows.is_empty() {
        return Ok(NOT_FOUND.to_string());
    }
    Ok(rows
        .into_iter()
        .map(|(k, v)| format!("{} = {}", String::from_utf8_lossy(&k), String::from_utf8_lossy(&v)))
        .collect::<Vec<_>>()
        .join("\n"))
}

fn keys<E: Engine>(manager: &Manager<E>, table: &str) -> CResult<String> {
    let mut txn = manager.begin(&[table], ReadIso::Any, WriteIso::Instant)?;
    let rows = txn.scan(table)?;
    if rows.is_empty() {
        return Ok(NOT_FOUND.to_string());
    }
    Ok(rows.into_iter().map(|(k, _)| String::from_utf8_lossy(&k).into_owned()).collect::<Vec<_>>().join("\n"))
}

fn ksize<E: Engine>(manager: &Manager<E>, table: &str) -> CResult<String> {
    let mut txn = manager.begin(&[table], ReadIso::Any, WriteIso::Instant)?;
    Ok(txn.scan(table)?.len().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use txkv::storage::memory::Memory;

    #[test]
    fn set_then_get_roundtrips() {
        let manager = Manager::new(Memory::new());
        assert_eq!(execute(&manager, "SET users 1 alice").unwrap(), OK);
        assert_eq!(execute(&manager, "GET users 1").unwrap(), "alice");
    }

    #[test]
    fn get_missing_key_reports_not_found() {
        let manager = Manager::new(Memory::new());
        assert_eq!(execute(&manager, "GET users 1").unwrap(), NOT_FOUND);
    }

    #[test]
    fn del_then_get_reports_not_found() {
        let manager = Manager::new(Memory::new());
        execute(&manager, "SET users 1 alice").unwrap();
        execute(&manager, "DEL users 1").unwrap();
        assert_eq!(execute(&manager, "GET users 1").unwrap(), NOT_FOUND);
    }

    #[test]
    fn scan_lists_every_row_in_key_order() {
        let manager = Manager::new(Memory::new());
        execute(&manager, "SET users 2 bob").unwrap();
        execute(&manager, "SET users 1 alice").unwrap();
        assert_eq!(execute(&manager, "SCAN users").unwrap(), "1 = alice\n2 = bob");
    }

    #[test]
    fn unrecognized_command_is_an_error() {
        let manager = Manager::new(Memory::new());
        assert!(execute(&manager, "BOGUS").is_err());
    }
}
