//! Reflection client abstraction
//!
//! Defines the remote schema-reflection capability the loader relies on,
//! supporting real transports and mock testing.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use contracts::{ContractError, MethodDesc, MethodId};

use crate::error::Result;

/// Parsed `address/service/method` identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodTarget {
    /// Remote address, e.g. "localhost:50051"
    pub address: String,
    /// Fully qualified service name, e.g. "demo.Math"
    pub service: String,
    /// Method name, e.g. "Double"
    pub method: String,
}

impl MethodTarget {
    /// Parse a method identifier
    ///
    /// Exactly three non-empty `/`-separated segments are required.
    pub fn parse(id: &MethodId) -> std::result::Result<Self, ContractError> {
        let invalid = |message: &str| ContractError::InvalidMethodId {
            method: id.to_string(),
            message: message.to_string(),
        };

        let mut parts = id.as_str().split('/');
        let (Some(address), Some(service), Some(method), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(invalid("expected 'address/service/method'"));
        };
        if address.is_empty() || service.is_empty() || method.is_empty() {
            return Err(invalid("address, service and method must be non-empty"));
        }

        Ok(Self {
            address: address.to_string(),
            service: service.to_string(),
            method: method.to_string(),
        })
    }
}

impl fmt::Display for MethodTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.address, self.service, self.method)
    }
}

/// Reflection client trait
///
/// Looks up a service on a remote and resolves one of its unary methods into a
/// `MethodDesc` (schemas + connection factory).
pub trait ReflectionClient: Send + Sync {
    /// Resolve a single method
    ///
    /// # Errors
    /// - `Unavailable` when the remote asks the caller to come back later
    /// - `ServiceNotFound` / `MethodNotFound` when the target is absent
    /// - `Transport` for any other protocol or connection failure
    fn resolve(
        &self,
        target: &MethodTarget,
    ) -> impl Future<Output = Result<Arc<dyn MethodDesc>>> + Send;
}
