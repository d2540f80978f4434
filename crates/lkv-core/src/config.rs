use serde::{Deserialize, Serialize};

use crate::password::PasswordConfig;

/// Configuration for the dispatch layer.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    pub keyspace: Keyspace,
    pub seed: SeedUser,
    pub password: PasswordConfig,
}

/// Maps logical keys onto ledger keys.
///
/// User records and raw entries share one ledger. Distinct prefixes keep a
/// raw `write` from landing on a user record; empty prefixes reproduce the
/// legacy flat layout where the two can collide.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Keyspace {
    pub user_prefix: String,
    pub raw_prefix: String,
}

impl Default for Keyspace {
    fn default() -> Self {
        Self {
            user_prefix: "user/".into(),
            raw_prefix: "kv/".into(),
        }
    }
}

impl Keyspace {
    /// The legacy layout: users and raw entries share unprefixed keys.
    pub fn shared() -> Self {
        Self {
            user_prefix: String::new(),
            raw_prefix: String::new(),
        }
    }

    /// Returns `true` if a raw key and a user key can name the same ledger
    /// key, i.e. one prefix is a prefix of the other.
    pub fn overlaps(&self) -> bool {
        self.user_prefix.starts_with(&self.raw_prefix)
            || self.raw_prefix.starts_with(&self.user_prefix)
    }

    pub fn user_key(&self, username: &str) -> String {
        format!("{}{username}", self.user_prefix)
    }

    pub fn raw_key(&self, key: &str) -> String {
        format!("{}{key}", self.raw_prefix)
    }
}

/// The user created by `init`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeedUser {
    pub username: String,
    pub password: String,
    pub role: String,
}

impl Default for SeedUser {
    fn default() -> Self {
        Self {
            username: "importerBank".into(),
            password: "importerBank".into(),
            role: "Importer Bank".into(),
        }
    }
}

impl std::fmt::Debug for SeedUser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SeedUser")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("role", &self.role)
            .finish()
    }
}
