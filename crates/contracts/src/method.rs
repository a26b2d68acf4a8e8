//! Method capability - resolved unary remote methods
//!
//! `MethodLoader` resolves an opaque `MethodId` into a `MethodDesc`, which exposes
//! the request/response schemas and a connection factory.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::{ContractError, DynMessage, MessageDesc, MethodId};

/// Open connection to a unary remote method
///
/// Cancellation and timeouts are the caller's business: dropping the
/// `call` future abandons the in-flight request.
#[async_trait]
pub trait Conn: Send + Sync {
    /// Perform one request/response exchange
    async fn call(&self, request: DynMessage) -> Result<DynMessage, ContractError>;

    /// Release the connection
    async fn close(&self) -> Result<(), ContractError>;
}

/// Resolved method descriptor
#[async_trait]
pub trait MethodDesc: Send + Sync + fmt::Debug {
    /// Open a new connection
    async fn dial(&self) -> Result<Box<dyn Conn>, ContractError>;

    /// Request schema
    fn input(&self) -> Arc<dyn MessageDesc>;

    /// Response schema
    fn output(&self) -> Arc<dyn MessageDesc>;
}

/// Method resolution
#[trait_variant::make(MethodLoader: Send)]
pub trait LocalMethodLoader {
    /// Resolve a method identifier
    ///
    /// # Errors
    /// `MethodNotFound` when the service or method is absent, `Transport` /
    /// `Unavailable` when the remote cannot be reached.
    async fn load(&self, method: &MethodId) -> Result<Arc<dyn MethodDesc>, ContractError>;
}
