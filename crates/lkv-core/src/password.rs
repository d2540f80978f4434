//! Credential sealing and verification.
//!
//! New records store an Argon2id hash in PHC format. Plaintext storage is
//! still available for deployments that must stay byte-compatible with
//! ledgers written by older clients; such records verify by exact match.

use argon2::password_hash::{self, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::record::Credential;

/// How new credentials are stored.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PasswordScheme {
    /// Salted Argon2id hash.
    #[default]
    Argon2,
    /// The password itself. Only for compatibility with legacy ledgers.
    Plaintext,
}

/// Password storage settings. Cost parameters apply to Argon2 only.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PasswordConfig {
    pub scheme: PasswordScheme,
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for PasswordConfig {
    fn default() -> Self {
        Self {
            scheme: PasswordScheme::Argon2,
            memory_kib: Params::DEFAULT_M_COST,
            iterations: Params::DEFAULT_T_COST,
            parallelism: Params::DEFAULT_P_COST,
        }
    }
}

/// Seals passwords into [`Credential`]s and checks them on login.
#[derive(Clone)]
pub struct CredentialHasher {
    scheme: PasswordScheme,
    argon2: Argon2<'static>,
}

impl CredentialHasher {
    pub fn new(config: &PasswordConfig) -> CoreResult<Self> {
        let params = Params::new(
            config.memory_kib,
            config.iterations,
            config.parallelism,
            None,
        )
        .map_err(|e| CoreError::Config(format!("invalid argon2 parameters: {e}")))?;

        Ok(Self {
            scheme: config.scheme,
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }

    /// Turn a password into the credential stored in a new record.
    pub fn seal(&self, password: &str) -> CoreResult<Credential> {
        match self.scheme {
            PasswordScheme::Plaintext => Ok(Credential::Plaintext {
                password: password.to_string(),
            }),
            PasswordScheme::Argon2 => {
                let salt = SaltString::generate(&mut OsRng);
                let hash = self
                    .argon2
                    .hash_password(password.as_bytes(), &salt)
                    .map_err(|e| CoreError::Credential(format!("password hashing failed: {e}")))?;
                Ok(Credential::Hashed {
                    password_hash: hash.to_string(),
                })
            }
        }
    }

    /// Check `password` against a stored credential.
    ///
    /// Returns `Ok(false)` on mismatch. An unparseable hash is an error, not
    /// a mismatch.
    pub fn verify(&self, credential: &Credential, password: &str) -> CoreResult<bool> {
        match credential {
            Credential::Plaintext { password: stored } => Ok(stored == password),
            Credential::Hashed { password_hash } => {
                let parsed = PasswordHash::new(password_hash)
                    .map_err(|e| CoreError::Credential(format!("unreadable password hash: {e}")))?;
                // Cost parameters are read from the hash itself.
                match self.argon2.verify_password(password.as_bytes(), &parsed) {
                    Ok(()) => Ok(true),
                    Err(password_hash::Error::Password) => Ok(false),
                    Err(e) => Err(CoreError::Credential(format!(
                        "password verification failed: {e}"
                    ))),
                }
            }
        }
    }
}

impl std::fmt::Debug for CredentialHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialHasher")
            .field("scheme", &self.scheme)
            .finish()
    }
}
