use crate::error::{LedgerError, LedgerResult};

/// A single consistent key/bytes state map.
///
/// All implementations must satisfy these invariants:
/// - A successful `put` is immediately visible to subsequent `get` calls.
/// - `put_if_absent` is atomic with respect to every other call on the same
///   ledger: of two concurrent conditional puts for one key, exactly one wins.
/// - Absence is a normal outcome (`Ok(None)`), never an error.
/// - The ledger never interprets values.
pub trait Ledger: Send + Sync {
    /// Read the value stored at `key`.
    ///
    /// Returns `Ok(None)` if the key has never been written.
    fn get(&self, key: &str) -> LedgerResult<Option<Vec<u8>>>;

    /// Store `value` at `key`, replacing any existing value.
    fn put(&self, key: &str, value: &[u8]) -> LedgerResult<()>;

    /// Store `value` at `key` only if the key is absent.
    ///
    /// Returns `true` if the value was written, `false` if the key already
    /// held a value (which is left untouched).
    fn put_if_absent(&self, key: &str, value: &[u8]) -> LedgerResult<bool>;

    /// Number of live keys.
    fn len(&self) -> LedgerResult<usize>;

    /// Returns `true` if no key has been written.
    fn is_empty(&self) -> LedgerResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Check whether a key holds a value.
    ///
    /// Default implementation reads the value. Backends may override.
    fn contains(&self, key: &str) -> LedgerResult<bool> {
        Ok(self.get(key)?.is_some())
    }
}

/// Reject empty keys before they reach a backend.
pub(crate) fn check_key(key: &str) -> LedgerResult<()> {
    if key.is_empty() {
        return Err(LedgerError::EmptyKey);
    }
    Ok(())
}
