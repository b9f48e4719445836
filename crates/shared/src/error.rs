use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A login or registration request that did not succeed.
///
/// Transport errors and non-2xx responses share this one kind; `status`
/// is only set when the server answered.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("account request failed: {message}")]
pub struct AccountFailure {
    pub status: Option<u16>,
    pub body: String,
    pub message: String,
}

impl AccountFailure {
    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            status: None,
            body: String::new(),
            message: message.into(),
        }
    }

    pub fn rejected(status: u16, body: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            body: body.into(),
            message: format!("server responded with status {status}"),
        }
    }
}
