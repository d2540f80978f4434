//! In-memory ledger for tests, embedding, and ephemeral servers.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::{LedgerError, LedgerResult};
use crate::traits::{check_key, Ledger};

/// `HashMap`-based ledger.
///
/// All entries live behind a `RwLock`; values are cloned on read and write.
/// Data is lost when the ledger is dropped.
pub struct InMemoryLedger {
    entries: RwLock<HashMap<String, Vec<u8>>>,
}

impl InMemoryLedger {
    /// Create a new empty ledger.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl Ledger for InMemoryLedger {
    fn get(&self, key: &str) -> LedgerResult<Option<Vec<u8>>> {
        check_key(key)?;
        let map = self.entries.read().map_err(poisoned)?;
        Ok(map.get(key).cloned())
    }

    fn put(&self, key: &str, value: &[u8]) -> LedgerResult<()> {
        check_key(key)?;
        let mut map = self.entries.write().map_err(poisoned)?;
        map.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn put_if_absent(&self, key: &str, value: &[u8]) -> LedgerResult<bool> {
        check_key(key)?;
        let mut map = self.entries.write().map_err(poisoned)?;
        if map.contains_key(key) {
            return Ok(false);
        }
        map.insert(key.to_string(), value.to_vec());
        Ok(true)
    }

    fn len(&self) -> LedgerResult<usize> {
        Ok(self.entries.read().map_err(poisoned)?.len())
    }

    fn contains(&self, key: &str) -> LedgerResult<bool> {
        check_key(key)?;
        Ok(self.entries.read().map_err(poisoned)?.contains_key(key))
    }
}

impl std::fmt::Debug for InMemoryLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.len().unwrap_or_default();
        f.debug_struct("InMemoryLedger")
            .field("entry_count", &count)
            .finish()
    }
}

fn poisoned<E: std::fmt::Display>(e: E) -> LedgerError {
    LedgerError::Unavailable(format!("lock poisoned: {e}"))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::*;

    #[test]
    fn get_missing_is_none() {
        let ledger = InMemoryLedger::new();
        assert_eq!(ledger.get("nothing").unwrap(), None);
        assert!(!ledger.contains("nothing").unwrap());
    }

    #[test]
    fn put_then_get() {
        let ledger = InMemoryLedger::new();
        ledger.put("k1", b"v1").unwrap();
        assert_eq!(ledger.get("k1").unwrap(), Some(b"v1".to_vec()));
        assert!(ledger.contains("k1").unwrap());
        assert_eq!(ledger.len().unwrap(), 1);
    }

    #[test]
    fn put_overwrites() {
        let ledger = InMemoryLedger::new();
        ledger.put("k", b"first").unwrap();
        ledger.put("k", b"second").unwrap();
        assert_eq!(ledger.get("k").unwrap(), Some(b"second".to_vec()));
        assert_eq!(ledger.len().unwrap(), 1);
    }

    #[test]
    fn put_if_absent_keeps_existing_value() {
        let ledger = InMemoryLedger::new();
        assert!(ledger.put_if_absent("k", b"first").unwrap());
        assert!(!ledger.put_if_absent("k", b"second").unwrap());
        assert_eq!(ledger.get("k").unwrap(), Some(b"first".to_vec()));
    }

    #[test]
    fn empty_key_rejected() {
        let ledger = InMemoryLedger::new();
        assert!(matches!(ledger.get(""), Err(LedgerError::EmptyKey)));
        assert!(matches!(ledger.put("", b"x"), Err(LedgerError::EmptyKey)));
        assert!(matches!(
            ledger.put_if_absent("", b"x"),
            Err(LedgerError::EmptyKey)
        ));
        assert!(ledger.is_empty().unwrap());
    }

    #[test]
    fn empty_value_is_stored() {
        let ledger = InMemoryLedger::new();
        ledger.put("k", b"").unwrap();
        assert_eq!(ledger.get("k").unwrap(), Some(Vec::new()));
    }

    #[test]
    fn concurrent_put_if_absent_has_one_winner() {
        let ledger = Arc::new(InMemoryLedger::new());
        let handles: Vec<_> = (0..16u8)
            .map(|i| {
                let ledger = Arc::clone(&ledger);
                thread::spawn(move || ledger.put_if_absent("contended", &[i]).unwrap())
            })
            .collect();
        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();
        assert_eq!(winners, 1);
    }

    #[test]
    fn debug_shows_count() {
        let ledger = InMemoryLedger::new();
        ledger.put("k", b"v").unwrap();
        let debug = format!("{ledger:?}");
        assert!(debug.contains("entry_count: 1"));
    }
}
