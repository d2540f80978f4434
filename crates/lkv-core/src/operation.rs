//! The closed set of operations and their argument parsing.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// Entry point an operation arrives on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Path {
    /// Read-only operations.
    Query,
    /// State-mutating operations.
    Invoke,
}

impl Path {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Query => "query",
            Self::Invoke => "invoke",
        }
    }

    /// Operations accepted on this path, in wire-name order.
    pub fn operations(self) -> Vec<OperationName> {
        OperationName::ALL
            .into_iter()
            .filter(|op| op.allowed_on(self))
            .collect()
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Names of every supported operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OperationName {
    Init,
    Read,
    Write,
    CreateUser,
    Login,
}

impl OperationName {
    pub const ALL: [Self; 5] = [
        Self::Init,
        Self::Read,
        Self::Write,
        Self::CreateUser,
        Self::Login,
    ];

    /// The name used on the wire.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Read => "read",
            Self::Write => "write",
            Self::CreateUser => "createUser",
            Self::Login => "login",
        }
    }

    /// Look up a wire name. Matching is exact and case-sensitive.
    pub fn from_wire(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.as_str() == name)
    }

    pub fn allowed_on(self, path: Path) -> bool {
        match self {
            Self::Read => true,
            Self::Login => path == Path::Query,
            Self::Init | Self::Write | Self::CreateUser => path == Path::Invoke,
        }
    }
}

impl fmt::Display for OperationName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Arguments for user creation.
#[derive(Clone, PartialEq, Eq)]
pub struct NewUser {
    pub username: String,
    pub password: String,
    pub role: String,
}

impl fmt::Debug for NewUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewUser")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("role", &self.role)
            .finish()
    }
}

/// A parsed, arity-checked request.
#[derive(Clone, PartialEq, Eq)]
pub enum Operation {
    Init,
    Read { key: String },
    Write { key: String, value: String },
    CreateUser(NewUser),
    Login { username: String, password: String },
}

impl Operation {
    /// Resolve `name` on `path` and validate `args`.
    ///
    /// Runs entirely before any ledger access.
    pub fn parse(path: Path, name: &str, args: &[String]) -> CoreResult<Self> {
        let op = OperationName::from_wire(name)
            .filter(|op| op.allowed_on(path))
            .ok_or_else(|| CoreError::UnknownOperation {
                path,
                name: name.to_string(),
            })?;

        match op {
            // init takes no arguments and ignores whatever it is given.
            OperationName::Init => Ok(Self::Init),
            OperationName::Read => {
                let [key] = exact::<1>(op, args, "key")?;
                Ok(Self::Read {
                    key: non_empty(op, "key", key)?,
                })
            }
            OperationName::Write => {
                let [key, value] = exact::<2>(op, args, "key, value")?;
                Ok(Self::Write {
                    key: non_empty(op, "key", key)?,
                    value: value.to_string(),
                })
            }
            OperationName::CreateUser => {
                let [username, password, role] = exact::<3>(op, args, "username, password, role")?;
                Ok(Self::CreateUser(NewUser {
                    username: non_empty(op, "username", username)?,
                    password: non_empty(op, "password", password)?,
                    role: role.to_string(),
                }))
            }
            OperationName::Login => {
                let [username, password] = exact::<2>(op, args, "username, password")?;
                Ok(Self::Login {
                    username: non_empty(op, "username", username)?,
                    password: non_empty(op, "password", password)?,
                })
            }
        }
    }

    pub fn name(&self) -> OperationName {
        match self {
            Self::Init => OperationName::Init,
            Self::Read { .. } => OperationName::Read,
            Self::Write { .. } => OperationName::Write,
            Self::CreateUser(_) => OperationName::CreateUser,
            Self::Login { .. } => OperationName::Login,
        }
    }
}

impl fmt::Debug for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Init => f.write_str("Init"),
            Self::Read { key } => f.debug_struct("Read").field("key", key).finish(),
            Self::Write { key, value } => f
                .debug_struct("Write")
                .field("key", key)
                .field("value_len", &value.len())
                .finish(),
            Self::CreateUser(user) => f.debug_tuple("CreateUser").field(user).finish(),
            Self::Login { username, .. } => f
                .debug_struct("Login")
                .field("username", username)
                .finish_non_exhaustive(),
        }
    }
}

fn exact<'a, const N: usize>(
    op: OperationName,
    args: &'a [String],
    expecting: &str,
) -> CoreResult<[&'a str; N]> {
    let fixed: &[String; N] = args.try_into().map_err(|_| CoreError::InvalidArguments {
        operation: op,
        reason: format!(
            "expected {N} argument{} ({expecting}), got {}",
            if N == 1 { "" } else { "s" },
            args.len()
        ),
    })?;
    Ok(fixed.each_ref().map(String::as_str))
}

fn non_empty(op: OperationName, field: &str, value: &str) -> CoreResult<String> {
    if value.is_empty() {
        return Err(CoreError::InvalidArguments {
            operation: op,
            reason: format!("{field} must not be empty"),
        });
    }
    Ok(value.to_string())
}
