//! Dispatch and validation layer for LedgerKV.
//!
//! Sits on top of any [`lkv_ledger::Ledger`] and exposes five named
//! operations across two paths:
//!
//! | Operation    | Path           | Arguments                    |
//! |--------------|----------------|------------------------------|
//! | `init`       | invoke         | ignored                      |
//! | `read`       | query, invoke  | key                          |
//! | `write`      | invoke         | key, value                   |
//! | `createUser` | invoke         | username, password, role     |
//! | `login`      | query          | username, password           |
//!
//! # Layers
//!
//! - [`state`] -- [`StateAccessor`], typed outcomes over ledger get/put
//! - [`users`] -- [`UserRepository`], record schema, uniqueness, login
//! - [`dispatch`] -- [`Dispatcher`], name routing and arity checks
//!
//! Arguments are validated before any ledger access. Every operation issues
//! at most one ledger mutation, so a failure never leaves partial effects.

pub mod config;
pub mod dispatch;
pub mod envelope;
pub mod error;
pub mod operation;
pub mod password;
pub mod record;
pub mod state;
pub mod users;

#[cfg(test)]
mod test_support;

pub use config::{CoreConfig, Keyspace, SeedUser};
pub use dispatch::Dispatcher;
pub use envelope::{ErrorBody, Request};
pub use error::{CoreError, CoreResult, ErrorCode, StateError};
pub use operation::{NewUser, Operation, OperationName, Path};
pub use password::{CredentialHasher, PasswordConfig, PasswordScheme};
pub use record::{Credential, RecordError, UserProfile, UserRecord};
pub use state::{Lookup, PutOutcome, StateAccessor};
pub use users::{BootstrapOutcome, UserRepository};
