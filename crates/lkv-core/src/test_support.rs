//! Shared fixtures for unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};

use lkv_ledger::{InMemoryLedger, Ledger, LedgerError, LedgerResult};

use crate::password::PasswordConfig;

/// Argon2 with the smallest legal cost, so tests stay fast in debug builds.
pub(crate) fn fast_password_config() -> PasswordConfig {
    PasswordConfig {
        memory_kib: 8,
        iterations: 1,
        parallelism: 1,
        ..PasswordConfig::default()
    }
}

/// Ledger that fails every call.
pub(crate) struct FailingLedger;

impl Ledger for FailingLedger {
    fn get(&self, _key: &str) -> LedgerResult<Option<Vec<u8>>> {
        Err(LedgerError::Unavailable("backend down".into()))
    }

    fn put(&self, _key: &str, _value: &[u8]) -> LedgerResult<()> {
        Err(LedgerError::Unavailable("backend down".into()))
    }

    fn put_if_absent(&self, _key: &str, _value: &[u8]) -> LedgerResult<bool> {
        Err(LedgerError::Unavailable("backend down".into()))
    }

    fn len(&self) -> LedgerResult<usize> {
        Err(LedgerError::Unavailable("backend down".into()))
    }
}

/// In-memory ledger that records how many calls reached it.
#[derive(Default)]
pub(crate) struct CountingLedger {
    inner: InMemoryLedger,
    calls: AtomicUsize,
}

impl CountingLedger {
    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn tick(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

impl Ledger for CountingLedger {
    fn get(&self, key: &str) -> LedgerResult<Option<Vec<u8>>> {
        self.tick();
        self.inner.get(key)
    }

    fn put(&self, key: &str, value: &[u8]) -> LedgerResult<()> {
        self.tick();
        self.inner.put(key, value)
    }

    fn put_if_absent(&self, key: &str, value: &[u8]) -> LedgerResult<bool> {
        self.tick();
        self.inner.put_if_absent(key, value)
    }

    fn len(&self) -> LedgerResult<usize> {
        self.tick();
        self.inner.len()
    }
}
