//! Request and error bodies shared by every transport.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, ErrorCode};

/// A named operation with positional string arguments.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    pub function: String,
    #[serde(default)]
    pub args: Vec<String>,
}

impl Request {
    pub fn new(function: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            function: function.into(),
            args,
        }
    }
}

/// The failure half of the result envelope.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: ErrorCode,
    pub message: String,
}

impl From<&CoreError> for ErrorBody {
    fn from(err: &CoreError) -> Self {
        Self {
            code: err.code(),
            message: err.to_string(),
        }
    }
}
