//! Resolver error types

use contracts::ContractError;
use thiserror::Error;

/// Failure reported by a reflection client
#[derive(Debug, Error)]
pub enum ResolveError {
    /// Remote temporarily unavailable; the only retried failure
    #[error("remote unavailable: {message}")]
    Unavailable { message: String },

    /// Service absent on the remote
    #[error("service '{service}' not found")]
    ServiceNotFound { service: String },

    /// Method absent on the service
    #[error("method '{method}' not found on service '{service}'")]
    MethodNotFound { service: String, method: String },

    /// Transport / protocol failure
    #[error("transport error: {message}")]
    Transport { message: String },
}

impl ResolveError {
    /// Create unavailable error
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    /// Create transport error
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Whether retrying may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }

    /// Classify into the contract error seen by the compiler
    pub fn into_contract(self, method: &str) -> ContractError {
        match self {
            Self::ServiceNotFound { .. } | Self::MethodNotFound { .. } => {
                ContractError::MethodNotFound {
                    method: method.to_string(),
                }
            }
            Self::Unavailable { message } => ContractError::Unavailable {
                method: method.to_string(),
                attempts: 1,
                message,
            },
            Self::Transport { message } => ContractError::transport(method, message),
        }
    }
}

/// Result alias
pub type Result<T> = std::result::Result<T, ResolveError>;
