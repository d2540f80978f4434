use std::sync::Arc;

use tracing::trace;

use lkv_ledger::Ledger;

use crate::error::StateError;

/// Outcome of a state read.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Lookup {
    Found(Vec<u8>),
    NotFound,
}

/// Outcome of a conditional write.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PutOutcome {
    Written,
    AlreadyPresent,
}

/// Thin adapter over the ledger's primitives.
///
/// Converts backend signals into [`Lookup`] / [`StateError`]. No retries:
/// every failure is surfaced to the caller as-is.
#[derive(Clone)]
pub struct StateAccessor {
    ledger: Arc<dyn Ledger>,
}

impl StateAccessor {
    pub fn new(ledger: Arc<dyn Ledger>) -> Self {
        Self { ledger }
    }

    pub fn get(&self, key: &str) -> Result<Lookup, StateError> {
        trace!(key, "state get");
        Ok(match self.ledger.get(key)? {
            Some(bytes) => Lookup::Found(bytes),
            None => Lookup::NotFound,
        })
    }

    pub fn put(&self, key: &str, value: &[u8]) -> Result<(), StateError> {
        trace!(key, len = value.len(), "state put");
        self.ledger.put(key, value)?;
        Ok(())
    }

    pub fn put_if_absent(&self, key: &str, value: &[u8]) -> Result<PutOutcome, StateError> {
        trace!(key, len = value.len(), "state put_if_absent");
        Ok(if self.ledger.put_if_absent(key, value)? {
            PutOutcome::Written
        } else {
            PutOutcome::AlreadyPresent
        })
    }
}

impl std::fmt::Debug for StateAccessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateAccessor").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use lkv_ledger::{InMemoryLedger, LedgerError};

    use super::*;
    use crate::test_support::FailingLedger;

    fn accessor() -> StateAccessor {
        StateAccessor::new(Arc::new(InMemoryLedger::new()))
    }

    #[test]
    fn missing_key_is_not_found() {
        assert_eq!(accessor().get("absent").unwrap(), Lookup::NotFound);
    }

    #[test]
    fn put_then_found() {
        let state = accessor();
        state.put("k", b"v").unwrap();
        assert_eq!(state.get("k").unwrap(), Lookup::Found(b"v".to_vec()));
    }

    #[test]
    fn conditional_put_outcomes() {
        let state = accessor();
        assert_eq!(state.put_if_absent("k", b"a").unwrap(), PutOutcome::Written);
        assert_eq!(
            state.put_if_absent("k", b"b").unwrap(),
            PutOutcome::AlreadyPresent
        );
        assert_eq!(state.get("k").unwrap(), Lookup::Found(b"a".to_vec()));
    }

    #[test]
    fn backend_failure_is_store_error_not_absence() {
        let state = StateAccessor::new(Arc::new(FailingLedger));
        assert!(matches!(
            state.get("k"),
            Err(StateError::Ledger(LedgerError::Unavailable(_)))
        ));
        assert!(state.put("k", b"v").is_err());
        assert!(state.put_if_absent("k", b"v").is_err());
    }
}
