use tracing::{debug, info, warn};

use crate::config::{Keyspace, SeedUser};
use crate::error::{CoreError, CoreResult};
use crate::operation::NewUser;
use crate::password::CredentialHasher;
use crate::record::{UserProfile, UserRecord};
use crate::state::{Lookup, PutOutcome, StateAccessor};

/// Result of seeding the initial user.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BootstrapOutcome {
    Created,
    AlreadySeeded,
}

/// Owns the user record schema on top of the state accessor.
///
/// Usernames are unique: creation uses the ledger's atomic conditional put,
/// so two concurrent creations for one username cannot both succeed.
#[derive(Clone, Debug)]
pub struct UserRepository {
    state: StateAccessor,
    keyspace: Keyspace,
    hasher: CredentialHasher,
}

impl UserRepository {
    pub fn new(state: StateAccessor, keyspace: Keyspace, hasher: CredentialHasher) -> Self {
        Self {
            state,
            keyspace,
            hasher,
        }
    }

    /// Create a user record.
    ///
    /// Fails with `UserAlreadyExists` if a valid record is already stored
    /// under the username, or `CorruptRecord` if the existing bytes are not a
    /// user record. Existing data is never overwritten.
    pub fn create_user(&self, user: &NewUser) -> CoreResult<()> {
        let key = self.keyspace.user_key(&user.username);
        let record = UserRecord::new(
            user.username.clone(),
            user.role.clone(),
            self.hasher.seal(&user.password)?,
        );
        let bytes = record.to_bytes().map_err(|e| CoreError::Credential(e.to_string()))?;

        match self.state.put_if_absent(&key, &bytes)? {
            PutOutcome::Written => {
                info!(username = %user.username, "user created");
                Ok(())
            }
            PutOutcome::AlreadyPresent => {
                debug!(username = %user.username, "user key already occupied");
                match self.state.get(&key)? {
                    Lookup::Found(existing) => {
                        self.decode(&key, &user.username, &existing)?;
                        Err(CoreError::UserAlreadyExists {
                            username: user.username.clone(),
                        })
                    }
                    // Lost the conditional put; someone else holds the name.
                    Lookup::NotFound => Err(CoreError::UserAlreadyExists {
                        username: user.username.clone(),
                    }),
                }
            }
        }
    }

    /// Authenticate and return the user's public profile.
    pub fn login(&self, username: &str, password: &str) -> CoreResult<UserProfile> {
        let key = self.keyspace.user_key(username);
        let bytes = match self.state.get(&key) {
            Ok(Lookup::Found(bytes)) => bytes,
            Ok(Lookup::NotFound) => {
                return Err(CoreError::UserNotFound {
                    username: username.to_string(),
                })
            }
            Err(e) => {
                warn!(username, error = %e, "ledger failure during login lookup");
                return Err(CoreError::UserNotFound {
                    username: username.to_string(),
                });
            }
        };

        let record = self.decode(&key, username, &bytes)?;
        if !self.hasher.verify(&record.credential, password)? {
            info!(username, "login rejected");
            return Err(CoreError::InvalidCredentials {
                username: username.to_string(),
            });
        }

        info!(username, role = %record.role, "login complete");
        Ok(record.profile())
    }

    /// Create the seed user unless a valid record already holds its name.
    ///
    /// Safe to run on every start. The existing record is left untouched,
    /// whatever its password and role.
    pub fn bootstrap(&self, seed: &SeedUser) -> CoreResult<BootstrapOutcome> {
        let user = NewUser {
            username: seed.username.clone(),
            password: seed.password.clone(),
            role: seed.role.clone(),
        };
        match self.create_user(&user) {
            Ok(()) => Ok(BootstrapOutcome::Created),
            Err(CoreError::UserAlreadyExists { .. }) => {
                debug!(username = %seed.username, "seed user already present");
                Ok(BootstrapOutcome::AlreadySeeded)
            }
            Err(e) => Err(e),
        }
    }

    /// Look up a user without checking credentials.
    pub fn profile(&self, username: &str) -> CoreResult<Option<UserProfile>> {
        let key = self.keyspace.user_key(username);
        match self.state.get(&key)? {
            Lookup::Found(bytes) => Ok(Some(self.decode(&key, username, &bytes)?.profile())),
            Lookup::NotFound => Ok(None),
        }
    }

    /// Decode bytes at a user key, checking they belong to `username`.
    fn decode(&self, key: &str, username: &str, bytes: &[u8]) -> CoreResult<UserRecord> {
        let record = UserRecord::from_bytes(bytes).map_err(|e| {
            warn!(key, error = %e, "corrupt user record");
            CoreError::CorruptRecord {
                key: key.to_string(),
                reason: e.to_string(),
            }
        })?;
        if record.username != username {
            warn!(key, stored = %record.username, "user record names a different user");
            return Err(CoreError::CorruptRecord {
                key: key.to_string(),
                reason: format!("record belongs to {}", record.username),
            });
        }
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use lkv_ledger::{InMemoryLedger, Ledger};

    use super::*;
    use crate::password::{PasswordConfig, PasswordScheme};
    use crate::test_support::{fast_password_config, FailingLedger};

    fn repo_on(ledger: Arc<dyn Ledger>) -> UserRepository {
        UserRepository::new(
            StateAccessor::new(ledger),
            Keyspace::default(),
            CredentialHasher::new(&fast_password_config()).unwrap(),
        )
    }

    fn repo() -> (Arc<InMemoryLedger>, UserRepository) {
        let ledger = Arc::new(InMemoryLedger::new());
        (ledger.clone(), repo_on(ledger))
    }

    fn new_user(username: &str, password: &str, role: &str) -> NewUser {
        NewUser {
            username: username.into(),
            password: password.into(),
            role: role.into(),
        }
    }

    #[test]
    fn create_then_login() {
        let (_, users) = repo();
        users.create_user(&new_user("alice", "secret", "auditor")).unwrap();
        let profile = users.login("alice", "secret").unwrap();
        assert_eq!(profile.username, "alice");
        assert_eq!(profile.role, "auditor");
    }

    #[test]
    fn stored_record_is_hashed_under_user_prefix() {
        let (ledger, users) = repo();
        users.create_user(&new_user("alice", "secret", "auditor")).unwrap();
        let stored = ledger.get("user/alice").unwrap().unwrap();
        let text = String::from_utf8(stored).unwrap();
        assert!(text.contains("\"passwordHash\":\"$argon2id$"));
        assert!(!text.contains("secret"));
        assert_eq!(ledger.get("alice").unwrap(), None);
    }

    #[test]
    fn duplicate_username_rejected() {
        let (ledger, users) = repo();
        users.create_user(&new_user("alice", "secret", "auditor")).unwrap();
        let before = ledger.get("user/alice").unwrap();
        let err = users.create_user(&new_user("alice", "other", "x")).unwrap_err();
        assert!(matches!(err, CoreError::UserAlreadyExists { ref username } if username == "alice"));
        assert_eq!(ledger.get("user/alice").unwrap(), before);
        assert!(users.login("alice", "secret").is_ok());
    }

    #[test]
    fn login_unknown_user() {
        let (_, users) = repo();
        let err = users.login("ghost", "pw").unwrap_err();
        assert!(matches!(err, CoreError::UserNotFound { ref username } if username == "ghost"));
        assert_eq!(err.to_string(), "user not found: ghost");
    }

    #[test]
    fn login_wrong_password() {
        let (_, users) = repo();
        users.create_user(&new_user("alice", "secret", "auditor")).unwrap();
        let err = users.login("alice", "wrong").unwrap_err();
        assert!(matches!(err, CoreError::InvalidCredentials { .. }));
        assert!(!err.to_string().contains("alice"));
    }

    #[test]
    fn corrupt_record_blocks_creation_and_login() {
        let (ledger, users) = repo();
        ledger.put("user/bob", br#"{"userName":"bob""#).unwrap();

        let err = users.create_user(&new_user("bob", "pw", "r")).unwrap_err();
        assert!(matches!(err, CoreError::CorruptRecord { ref key, .. } if key == "user/bob"));
        // The corrupt bytes are left for inspection, not overwritten.
        assert_eq!(
            ledger.get("user/bob").unwrap(),
            Some(br#"{"userName":"bob""#.to_vec())
        );

        let err = users.login("bob", "pw").unwrap_err();
        assert!(matches!(err, CoreError::CorruptRecord { .. }));
    }

    #[test]
    fn empty_record_is_corrupt() {
        let (ledger, users) = repo();
        ledger.put("user/bob", b"").unwrap();
        assert!(matches!(
            users.create_user(&new_user("bob", "pw", "r")),
            Err(CoreError::CorruptRecord { .. })
        ));
    }

    #[test]
    fn record_for_another_user_is_corrupt() {
        let (ledger, users) = repo();
        ledger
            .put(
                "user/mallory",
                br#"{"userName":"alice","role":"admin","password":"pw"}"#,
            )
            .unwrap();
        assert!(matches!(
            users.login("mallory", "pw"),
            Err(CoreError::CorruptRecord { .. })
        ));
    }

    #[test]
    fn legacy_plaintext_record_still_logs_in() {
        let (ledger, users) = repo();
        ledger
            .put(
                "user/importerBank",
                br#"{"userName":"importerBank","role":"Importer Bank","password":"importerBank"}"#,
            )
            .unwrap();
        let profile = users.login("importerBank", "importerBank").unwrap();
        assert_eq!(profile.role, "Importer Bank");
        assert!(matches!(
            users.login("importerBank", "nope"),
            Err(CoreError::InvalidCredentials { .. })
        ));
    }

    #[test]
    fn plaintext_scheme_stores_password() {
        let ledger = Arc::new(InMemoryLedger::new());
        let users = UserRepository::new(
            StateAccessor::new(ledger.clone()),
            Keyspace::shared(),
            CredentialHasher::new(&PasswordConfig {
                scheme: PasswordScheme::Plaintext,
                ..PasswordConfig::default()
            })
            .unwrap(),
        );
        users.create_user(&new_user("alice", "secret", "auditor")).unwrap();
        let stored = String::from_utf8(ledger.get("alice").unwrap().unwrap()).unwrap();
        assert_eq!(
            stored,
            r#"{"userName":"alice","role":"auditor","password":"secret"}"#
        );
    }

    #[test]
    fn store_failure_on_login_reads_as_not_found() {
        let users = repo_on(Arc::new(FailingLedger));
        assert!(matches!(
            users.login("alice", "pw"),
            Err(CoreError::UserNotFound { .. })
        ));
    }

    #[test]
    fn store_failure_on_create_is_store_error() {
        let users = repo_on(Arc::new(FailingLedger));
        assert!(matches!(
            users.create_user(&new_user("alice", "pw", "r")),
            Err(CoreError::Store(_))
        ));
    }

    #[test]
    fn bootstrap_is_idempotent() {
        let (_, users) = repo();
        let seed = SeedUser::default();
        assert_eq!(users.bootstrap(&seed).unwrap(), BootstrapOutcome::Created);
        assert_eq!(users.bootstrap(&seed).unwrap(), BootstrapOutcome::AlreadySeeded);
        assert!(users.login("importerBank", "importerBank").is_ok());
    }

    #[test]
    fn bootstrap_surfaces_corruption() {
        let (ledger, users) = repo();
        ledger.put("user/importerBank", b"garbage").unwrap();
        assert!(matches!(
            users.bootstrap(&SeedUser::default()),
            Err(CoreError::CorruptRecord { .. })
        ));
    }

    #[test]
    fn profile_lookup() {
        let (_, users) = repo();
        assert_eq!(users.profile("alice").unwrap(), None);
        users.create_user(&new_user("alice", "secret", "auditor")).unwrap();
        let profile = users.profile("alice").unwrap().unwrap();
        assert_eq!(profile.role, "auditor");
    }

    #[test]
    fn concurrent_creation_has_one_winner() {
        let (_, users) = repo();
        let users = Arc::new(users);
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let users = Arc::clone(&users);
                thread::spawn(move || users.create_user(&new_user("race", &format!("pw{i}"), "r")))
            })
            .collect();
        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(|e| matches!(e, CoreError::UserAlreadyExists { .. })));
    }
}
