//! User record schema.
//!
//! Records are JSON objects keyed `userName`, `role`, and either
//! `passwordHash` (PHC string) or the legacy plaintext `password`.

use argon2::password_hash::PasswordHash;
use serde::{Deserialize, Serialize};

/// Stored proof of a user's password.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Credential {
    Hashed {
        #[serde(rename = "passwordHash")]
        password_hash: String,
    },
    Plaintext {
        password: String,
    },
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Hashed { .. } => f.write_str("Credential::Hashed(..)"),
            Self::Plaintext { .. } => f.write_str("Credential::Plaintext(..)"),
        }
    }
}

/// A user as persisted in the ledger.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    #[serde(rename = "userName")]
    pub username: String,
    pub role: String,
    #[serde(flatten)]
    pub credential: Credential,
}

impl UserRecord {
    pub fn new(username: impl Into<String>, role: impl Into<String>, credential: Credential) -> Self {
        Self {
            username: username.into(),
            role: role.into(),
            credential,
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, RecordError> {
        serde_json::to_vec(self).map_err(|e| RecordError::Encode(e.to_string()))
    }

    /// Decode and structurally validate a stored record.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, RecordError> {
        if bytes.is_empty() {
            return Err(RecordError::Empty);
        }
        let record: Self =
            serde_json::from_slice(bytes).map_err(|e| RecordError::Decode(e.to_string()))?;
        if record.username.is_empty() {
            return Err(RecordError::Decode("userName is empty".into()));
        }
        if let Credential::Hashed { password_hash } = &record.credential {
            PasswordHash::new(password_hash)
                .map_err(|e| RecordError::Decode(format!("passwordHash is not a PHC string: {e}")))?;
        }
        Ok(record)
    }

    /// The credential-free view returned to callers.
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            username: self.username.clone(),
            role: self.role.clone(),
        }
    }
}

/// Public view of a user: never carries the credential.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(rename = "userName")]
    pub username: String,
    pub role: String,
}

impl UserProfile {
    pub fn to_bytes(&self) -> Result<Vec<u8>, RecordError> {
        serde_json::to_vec(self).map_err(|e| RecordError::Encode(e.to_string()))
    }
}

/// Why stored bytes are not a usable user record.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecordError {
    #[error("record is empty")]
    Empty,
    #[error("cannot decode record: {0}")]
    Decode(String),
    #[error("cannot encode record: {0}")]
    Encode(String),
}
