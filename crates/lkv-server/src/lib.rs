//! HTTP transport for LedgerKV.
//!
//! Exposes the dispatcher's two paths as `POST /v1/query` and
//! `POST /v1/invoke`, each taking `{"function": ..., "args": [...]}`.
//! Success returns the raw payload; failure returns `{"code", "message"}`.

pub mod config;
pub mod error;
pub mod handler;
pub mod router;
pub mod server;

pub use config::{LedgerBackend, ServerConfig};
pub use error::{ServerError, ServerResult};
pub use handler::{status_for, AppState, HealthResponse};
pub use server::{open_ledger, LkvServer};
