//! # Resolver
//!
//! Method resolution module.
//!
//! Responsibilities:
//! - Parse `address/service/method` identifiers
//! - Resolve methods through a reflection client, retrying with exponential
//!   backoff while the remote is unavailable
//! - Classify failures as not-found vs transport
//! - Provide mock reflection and in-process methods for tests

pub mod client;
pub mod error;
pub mod in_process;
pub mod loader;
pub mod mock_client;

pub use client::{MethodTarget, ReflectionClient};
pub use error::{ResolveError, Result};
pub use in_process::{ConnStats, Handler, InProcessMethod};
pub use loader::{ReflectionLoader, RetryPolicy};
pub use mock_client::{MockConfig, MockReflectionClient};
