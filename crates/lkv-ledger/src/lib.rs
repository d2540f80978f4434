//! Ledger contract and reference backends for LedgerKV.
//!
//! The ledger is a single consistent key/bytes map. The dispatch layer in
//! `lkv-core` depends only on the [`Ledger`] trait; the backends here exist so
//! the store can run standalone.
//!
//! # Backends
//!
//! - [`InMemoryLedger`] -- `HashMap`-based ledger for tests and embedding
//! - [`FileLedger`] -- append-only, CRC-framed log replayed on open
//!
//! # Design Rules
//!
//! 1. Absence is a value (`Ok(None)`), never an error.
//! 2. `put` overwrites unconditionally; `put_if_absent` is the only
//!    conditional write and is atomic.
//! 3. Values are opaque bytes.
//! 4. All I/O errors are propagated, never silently ignored.

pub mod error;
pub mod file;
pub mod memory;
pub mod traits;

pub use error::{LedgerError, LedgerResult};
pub use file::{FileLedger, FileLedgerConfig, RecoveryReport, SyncMode, MAX_RECORD_SIZE};
pub use memory::InMemoryLedger;
pub use traits::Ledger;
