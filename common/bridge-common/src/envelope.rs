//! Action response envelope
//!
//! Every network action answers with the same JSON shape:
//!
//! ```json
//! {"success": true,  "data": ...}
//! {"success": false, "error": "human-readable message"}
//! ```
//!
//! The service builds envelopes with [`Envelope::ok`] / [`Envelope::err`];
//! callers turn them back into a `Result` with [`Envelope::into_result`].

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Uniform success/error wrapper for action responses
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Failure carried by an envelope
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EnvelopeError {
    /// The action reported an error message
    #[error("{0}")]
    Failed(String),

    /// `success` was true but no payload was attached
    #[error("response reported success without data")]
    MissingData,
}

impl<T> Envelope<T> {
    /// Wrap a successful payload
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    /// Wrap an error message
    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }

    /// Convert into a `Result`, keeping the action's own message on failure
    pub fn into_result(self) -> Result<T, EnvelopeError> {
        if self.success {
            self.data.ok_or(EnvelopeError::MissingData)
        } else {
            Err(EnvelopeError::Failed(
                self.error
                    .unwrap_or_else(|| "Unknown error occurred".to_string()),
            ))
        }
    }
}

impl<T, E: std::fmt::Display> From<Result<T, E>> for Envelope<T> {
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(data) => Self::ok(data),
            Err(e) => Self::err(e.to_string()),
        }
    }
}
