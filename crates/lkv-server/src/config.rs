use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use lkv_core::CoreConfig;
use lkv_ledger::SyncMode;

use crate::error::{ServerError, ServerResult};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub ledger: LedgerBackend,
    /// Run the idempotent seed-user bootstrap before accepting requests.
    pub bootstrap_on_start: bool,
    pub core: CoreConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 7050)),
            ledger: LedgerBackend::default(),
            bootstrap_on_start: true,
            core: CoreConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn from_toml_str(text: &str) -> ServerResult<Self> {
        toml::from_str(text).map_err(|e| ServerError::Config(e.to_string()))
    }

    /// Load a TOML config file. Missing keys take their defaults.
    pub fn load(path: &Path) -> ServerResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| ServerError::Config(format!("cannot read {}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }
}

/// Which ledger backs the server.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "kebab-case")]
pub enum LedgerBackend {
    /// Volatile; lost on shutdown.
    #[default]
    Memory,
    File {
        path: PathBuf,
        #[serde(default)]
        sync: SyncMode,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use lkv_core::PasswordScheme;

    #[test]
    fn default_config() {
        let c = ServerConfig::default();
        assert_eq!(c.bind_addr, "127.0.0.1:7050".parse::<SocketAddr>().unwrap());
        assert_eq!(c.ledger, LedgerBackend::Memory);
        assert!(c.bootstrap_on_start);
        assert_eq!(c.core.keyspace.user_prefix, "user/");
    }

    #[test]
    fn parse_full_toml() {
        let c = ServerConfig::from_toml_str(
            r#"
            bind_addr = "0.0.0.0:8080"
            bootstrap_on_start = false

            [ledger]
            backend = "file"
            path = "/var/lib/lkv/state.ledger"
            sync = "every-write"

            [core.keyspace]
            user_prefix = ""
            raw_prefix = ""

            [core.seed]
            username = "operator"
            password = "changeme"
            role = "ops"

            [core.password]
            scheme = "plaintext"
            "#,
        )
        .unwrap();
        assert_eq!(c.bind_addr.port(), 8080);
        assert!(!c.bootstrap_on_start);
        assert_eq!(
            c.ledger,
            LedgerBackend::File {
                path: PathBuf::from("/var/lib/lkv/state.ledger"),
                sync: SyncMode::EveryWrite,
            }
        );
        assert!(c.core.keyspace.overlaps());
        assert_eq!(c.core.seed.username, "operator");
        assert_eq!(c.core.password.scheme, PasswordScheme::Plaintext);
    }

    #[test]
    fn empty_toml_is_default() {
        let c = ServerConfig::from_toml_str("").unwrap();
        assert_eq!(c.bind_addr.port(), 7050);
        assert_eq!(c.core.seed.username, "importerBank");
    }

    #[test]
    fn bad_toml_is_config_error() {
        assert!(matches!(
            ServerConfig::from_toml_str("bind_addr = 42"),
            Err(ServerError::Config(_))
        ));
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lkv.toml");
        std::fs::write(&path, "[ledger]\nbackend = \"memory\"\n").unwrap();
        let c = ServerConfig::load(&path).unwrap();
        assert_eq!(c.ledger, LedgerBackend::Memory);
        assert!(matches!(
            ServerConfig::load(&dir.path().join("missing.toml")),
            Err(ServerError::Config(_))
        ));
    }
}
