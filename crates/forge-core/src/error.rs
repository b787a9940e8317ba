//! Error type for the whole pipeline.

use core::result::Result as CoreResult;
use std::io::Error as IoError;

use reqwest::Error as ReqwestError;
use serde_json::Error as SerdeJsonError;
use thiserror::Error;
use toml::de::Error as TomlError;

use crate::session::SessionStatus;

/// Result type for core operations.
pub type Result<T> = CoreResult<T, Error>;

/// Errors that can occur anywhere in the pipeline.
#[derive(Debug, Error)]
pub enum Error {
    /// An I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// An HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Request(#[from] ReqwestError),

    /// JSON serialization or deserialization failed.
    #[error("JSON serialization error: {0}")]
    Json(#[from] SerdeJsonError),

    /// TOML deserialization failed.
    #[error("TOML deserialization error: {0}")]
    Toml(#[from] TomlError),

    /// Configuration is invalid or missing.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A model provider encountered an error.
    #[error("Provider error: {0}")]
    Provider(String),

    /// Required API key was not found.
    #[error("API key not found: {0}")]
    MissingApiKey(String),

    /// Model provider returned an invalid response.
    #[error("Invalid response from provider: {0}")]
    InvalidResponse(String),

    /// A model call did not finish within its time budget.
    #[error("Model call timed out after {0}s")]
    Timeout(u64),

    /// The persistence collaborator failed.
    #[error("Store error: {0}")]
    Store(String),

    /// The artifact publication collaborator failed.
    #[error("Publish error: {0}")]
    Publish(String),

    /// A session status change that the state machine does not allow.
    #[error("Invalid session transition: {from} -> {to}")]
    InvalidTransition {
        /// Status the session was in
        from: SessionStatus,
        /// Status that was requested
        to: SessionStatus,
    },

    /// A general error not covered by other variants.
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Determines whether this error may succeed if retried.
    ///
    /// Returns `true` for transient errors like network failures, provider errors or timeouts.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Request(_) | Self::Provider(_) | Self::Timeout(_)
        )
    }
}
