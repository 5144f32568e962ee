//! Error taxonomy for the bridge.
//!
//! [`EngineError`] describes what went wrong while running the answer engine.
//! [`BridgeError`] is what the bridge hands back to the HTTP layer; every
//! failure is folded into one of its variants, and each variant maps to a
//! single [`ErrorKind`] and HTTP status.

use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

use crate::consts::{
    MSG_EXECUTION_FAILED, MSG_INTERNAL, MSG_TIMEOUT, MSG_TOO_MANY_REQUESTS,
};

/// Failures at the process layer.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to spawn `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("engine did not finish within {}ms", .0.as_millis())]
    Timeout(Duration),

    #[error("failed to collect engine output: {0}")]
    Io(#[from] std::io::Error),
}

/// Client-visible classification of a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidInput,
    Timeout,
    ExecutionFailed,
    TooManyRequests,
    InternalError,
}

impl ErrorKind {
    /// HTTP status code for this kind.
    pub fn status_code(self) -> u16 {
        match self {
            ErrorKind::InvalidInput => 400,
            ErrorKind::TooManyRequests => 429,
            ErrorKind::InternalError => 500,
            ErrorKind::ExecutionFailed => 502,
            ErrorKind::Timeout => 504,
        }
    }
}

/// Every way a single question can fail.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),

    #[error("engine timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    #[error("engine exited with {}", describe_exit(.exit_code))]
    ExecutionFailed {
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("too many concurrent invocations")]
    TooManyRequests,

    #[error("internal error: {0}")]
    Internal(String),
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("status {}", code),
        None => "a signal".to_string(),
    }
}

impl BridgeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BridgeError::InvalidInput(_) => ErrorKind::InvalidInput,
            BridgeError::Timeout(_) => ErrorKind::Timeout,
            BridgeError::ExecutionFailed { .. } => ErrorKind::ExecutionFailed,
            BridgeError::TooManyRequests => ErrorKind::TooManyRequests,
            BridgeError::Internal(_) => ErrorKind::InternalError,
        }
    }

    /// Message safe to send to the client.
    ///
    /// With `verbose` set, an execution failure also carries the engine's
    /// stderr. Nothing else ever includes engine output or OS error text.
    pub fn client_message(&self, verbose: bool) -> String {
        match self {
            BridgeError::InvalidInput(msg) => (*msg).to_string(),
            BridgeError::Timeout(_) => MSG_TIMEOUT.to_string(),
            BridgeError::ExecutionFailed { stderr, .. } if verbose && !stderr.trim().is_empty() => {
                format!("{} {}", MSG_EXECUTION_FAILED, stderr.trim_end())
            }
            BridgeError::ExecutionFailed { .. } => MSG_EXECUTION_FAILED.to_string(),
            BridgeError::TooManyRequests => MSG_TOO_MANY_REQUESTS.to_string(),
            BridgeError::Internal(_) => MSG_INTERNAL.to_string(),
        }
    }
}

impl From<EngineError> for BridgeError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Timeout(after) => BridgeError::Timeout(after),
            other => BridgeError::Internal(other.to_string()),
        }
    }
}
