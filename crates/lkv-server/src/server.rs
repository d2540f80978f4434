use std::sync::Arc;

use tokio::net::TcpListener;

use lkv_core::{BootstrapOutcome, Dispatcher};
use lkv_ledger::{FileLedger, FileLedgerConfig, InMemoryLedger, Ledger};

use crate::config::{LedgerBackend, ServerConfig};
use crate::error::{ServerError, ServerResult};
use crate::handler::AppState;
use crate::router::build_router;

/// LedgerKV HTTP server.
pub struct LkvServer {
    config: ServerConfig,
    dispatcher: Arc<Dispatcher>,
}

impl LkvServer {
    /// Open the configured ledger and build the dispatcher over it.
    pub fn new(config: ServerConfig) -> ServerResult<Self> {
        let ledger = open_ledger(&config.ledger)?;
        Self::with_ledger(config, ledger)
    }

    /// Serve an already-open ledger; `config.ledger` is ignored.
    pub fn with_ledger(config: ServerConfig, ledger: Arc<dyn Ledger>) -> ServerResult<Self> {
        let dispatcher = Dispatcher::new(ledger, config.core.clone())?;
        Ok(Self {
            config,
            dispatcher: Arc::new(dispatcher),
        })
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Build the router (useful for testing).
    pub fn router(&self) -> axum::Router {
        build_router(AppState::new(Arc::clone(&self.dispatcher)))
    }

    /// Seed the bootstrap user if it is not there yet.
    pub async fn bootstrap(&self) -> ServerResult<BootstrapOutcome> {
        let dispatcher = Arc::clone(&self.dispatcher);
        let outcome = tokio::task::spawn_blocking(move || dispatcher.init())
            .await
            .map_err(|e| ServerError::Internal(e.to_string()))??;
        Ok(outcome)
    }

    /// Start serving requests until ctrl-c.
    pub async fn serve(self) -> ServerResult<()> {
        if self.config.bootstrap_on_start {
            let outcome = self.bootstrap().await?;
            tracing::info!(?outcome, "bootstrap complete");
        }

        let app = self.router();
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        tracing::info!("LedgerKV server listening on {}", self.config.bind_addr);
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| ServerError::Internal(e.to_string()))
    }
}

impl std::fmt::Debug for LkvServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LkvServer")
            .field("bind_addr", &self.config.bind_addr)
            .field("ledger", &self.config.ledger)
            .finish()
    }
}

/// Open the ledger a backend config names.
pub fn open_ledger(backend: &LedgerBackend) -> ServerResult<Arc<dyn Ledger>> {
    match backend {
        LedgerBackend::Memory => Ok(Arc::new(InMemoryLedger::new())),
        LedgerBackend::File { path, sync } => {
            let ledger = FileLedger::open(path, FileLedgerConfig { sync: *sync })?;
            let report = ledger.recovery();
            tracing::info!(
                path = %path.display(),
                replayed = report.replayed,
                skipped = report.skipped,
                truncated_bytes = report.truncated_bytes,
                "ledger opened"
            );
            if let Some(salvage) = &report.salvaged_to {
                tracing::warn!(salvage = %salvage.display(), "unreadable ledger tail saved aside");
            }
            Ok(Arc::new(ledger))
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("cannot listen for ctrl-c: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}

#[cfg(test)]
mod tests {
    use super::*;
    use lkv_core::{PasswordConfig, PasswordScheme};
    use lkv_ledger::SyncMode;

    fn fast_config() -> ServerConfig {
        let mut config = ServerConfig::default();
        config.core.password = PasswordConfig {
            scheme: PasswordScheme::Argon2,
            memory_kib: 8,
            iterations: 1,
            parallelism: 1,
        };
        config
    }

    #[test]
    fn server_construction() {
        let server = LkvServer::new(ServerConfig::default()).unwrap();
        assert_eq!(server.config().bind_addr, "127.0.0.1:7050".parse().unwrap());
    }

    #[test]
    fn router_builds() {
        let server = LkvServer::new(ServerConfig::default()).unwrap();
        let _router = server.router();
    }

    #[test]
    fn bad_password_params_fail_construction() {
        let mut config = ServerConfig::default();
        config.core.password.memory_kib = 0;
        assert!(matches!(LkvServer::new(config), Err(ServerError::Core(_))));
    }

    #[tokio::test]
    async fn bootstrap_is_idempotent() {
        let server = LkvServer::new(fast_config()).unwrap();
        assert_eq!(server.bootstrap().await.unwrap(), BootstrapOutcome::Created);
        assert_eq!(server.bootstrap().await.unwrap(), BootstrapOutcome::AlreadySeeded);
    }

    #[tokio::test]
    async fn file_backend_persists_seed() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = fast_config();
        config.ledger = LedgerBackend::File {
            path: dir.path().join("state.ledger"),
            sync: SyncMode::EveryWrite,
        };

        {
            let server = LkvServer::new(config.clone()).unwrap();
            assert_eq!(server.bootstrap().await.unwrap(), BootstrapOutcome::Created);
        }

        let server = LkvServer::new(config).unwrap();
        assert_eq!(server.bootstrap().await.unwrap(), BootstrapOutcome::AlreadySeeded);
    }
}
