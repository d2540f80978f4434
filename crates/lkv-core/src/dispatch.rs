use std::sync::Arc;

use tracing::{debug, info, warn};

use lkv_ledger::Ledger;

use crate::config::{CoreConfig, Keyspace, SeedUser};
use crate::error::{CoreError, CoreResult};
use crate::operation::{Operation, Path};
use crate::password::CredentialHasher;
use crate::state::{Lookup, StateAccessor};
use crate::users::{BootstrapOutcome, UserRepository};

/// Routes named operations to their handlers.
///
/// Each call parses and validates its arguments, performs at most one ledger
/// mutation, and returns either the payload bytes or a typed error. Calls
/// share nothing but the ledger.
#[derive(Clone, Debug)]
pub struct Dispatcher {
    state: StateAccessor,
    users: UserRepository,
    keyspace: Keyspace,
    seed: SeedUser,
}

impl Dispatcher {
    pub fn new(ledger: Arc<dyn Ledger>, config: CoreConfig) -> CoreResult<Self> {
        let hasher = CredentialHasher::new(&config.password)?;
        let state = StateAccessor::new(ledger);
        if config.keyspace.overlaps() {
            warn!(
                user_prefix = %config.keyspace.user_prefix,
                raw_prefix = %config.keyspace.raw_prefix,
                "user and raw keyspaces overlap; raw writes can overwrite users"
            );
        }
        let users = UserRepository::new(state.clone(), config.keyspace.clone(), hasher);
        Ok(Self {
            state,
            users,
            keyspace: config.keyspace,
            seed: config.seed,
        })
    }

    /// Read-only entry point: `read`, `login`.
    pub fn query(&self, name: &str, args: &[String]) -> CoreResult<Vec<u8>> {
        self.dispatch(Path::Query, name, args)
    }

    /// Mutating entry point: `init`, `write`, `createUser`, `read`.
    pub fn invoke(&self, name: &str, args: &[String]) -> CoreResult<Vec<u8>> {
        self.dispatch(Path::Invoke, name, args)
    }

    pub fn dispatch(&self, path: Path, name: &str, args: &[String]) -> CoreResult<Vec<u8>> {
        debug!(%path, function = name, args = args.len(), "dispatching");
        let operation = Operation::parse(path, name, args).inspect_err(|e| {
            debug!(%path, function = name, code = %e.code(), error = %e, "rejected before execution");
        })?;
        self.execute(operation)
    }

    /// Run an already-parsed operation.
    pub fn execute(&self, operation: Operation) -> CoreResult<Vec<u8>> {
        let name = operation.name();
        let result = match operation {
            Operation::Init => self.init().map(|_| Vec::new()),
            Operation::Read { key } => self.read(&key),
            Operation::Write { key, value } => self
                .state
                .put(&self.keyspace.raw_key(&key), value.as_bytes())
                .map(|()| Vec::new())
                .map_err(CoreError::from),
            Operation::CreateUser(user) => self.users.create_user(&user).map(|()| Vec::new()),
            Operation::Login { username, password } => {
                self.users.login(&username, &password).and_then(|profile| {
                    profile
                        .to_bytes()
                        .map_err(|e| CoreError::Credential(e.to_string()))
                })
            }
        };

        match &result {
            Ok(payload) => info!(operation = %name, payload_len = payload.len(), "operation complete"),
            Err(e) => warn!(operation = %name, code = %e.code(), error = %e, "operation failed"),
        }
        result
    }

    /// Seed the initial user. Re-running on a seeded ledger is a no-op.
    pub fn init(&self) -> CoreResult<BootstrapOutcome> {
        info!(username = %self.seed.username, "initializing user accounts");
        let outcome = self.users.bootstrap(&self.seed)?;
        info!(?outcome, "initialization complete");
        Ok(outcome)
    }

    fn read(&self, key: &str) -> CoreResult<Vec<u8>> {
        match self.state.get(&self.keyspace.raw_key(key)) {
            Ok(Lookup::Found(bytes)) => Ok(bytes),
            Ok(Lookup::NotFound) => Err(CoreError::ReadFailed {
                key: key.to_string(),
                detail: None,
            }),
            Err(e) => Err(CoreError::ReadFailed {
                key: key.to_string(),
                detail: Some(e.to_string()),
            }),
        }
    }
}
