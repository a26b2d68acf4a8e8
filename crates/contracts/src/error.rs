//! Layered error definitions
//!
//! Categorized by source: config / names / schema / method resolution / call

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    /// Name does not match the grammar
    #[error("invalid {kind} name '{name}': {reason}")]
    InvalidName {
        kind: &'static str,
        name: String,
        reason: String,
    },

    // ===== Schema Errors =====
    /// Field does not exist on a message or schema
    #[error("field '{field}' not found on '{message}'")]
    FieldNotFound { message: String, field: String },

    /// Value does not match the expected shape
    #[error("schema error: {message}")]
    Schema { message: String },

    // ===== Method Resolution Errors =====
    /// Malformed method identifier
    #[error("invalid method id '{method}': {message}")]
    InvalidMethodId { method: String, message: String },

    /// Service or method absent on the remote
    #[error("method not found: {method}")]
    MethodNotFound { method: String },

    /// Remote temporarily unavailable (after retries)
    #[error("method '{method}' unavailable after {attempts} attempts: {message}")]
    Unavailable {
        method: String,
        attempts: u32,
        message: String,
    },

    /// Transport / protocol failure
    #[error("transport error for '{method}': {message}")]
    Transport { method: String, message: String },

    // ===== Call Errors =====
    /// Remote call failed
    #[error("call to '{method}' failed: {message}")]
    Call { method: String, message: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create invalid name error
    pub fn invalid_name(
        kind: &'static str,
        name: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidName {
            kind,
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Create field not found error
    pub fn field_not_found(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::FieldNotFound {
            message: message.into(),
            field: field.into(),
        }
    }

    /// Create schema error
    pub fn schema(message: impl Into<String>) -> Self {
        Self::Schema {
            message: message.into(),
        }
    }

    /// Create transport error
    pub fn transport(method: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transport {
            method: method.into(),
            message: message.into(),
        }
    }

    /// Create call error
    pub fn call(method: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Call {
            method: method.into(),
            message: message.into(),
        }
    }

    /// Whether this error denotes an absent service or method
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::MethodNotFound { .. })
    }
}
