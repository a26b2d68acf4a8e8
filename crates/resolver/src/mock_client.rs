//! Mock reflection client
//!
//! In-memory method registry for tests; supports injecting "unavailable"
//! streaks and unreachable addresses.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use contracts::MethodDesc;
use tracing::instrument;

use crate::client::{MethodTarget, ReflectionClient};
use crate::error::{ResolveError, Result};

/// Mock client configuration
#[derive(Debug, Default, Clone)]
pub struct MockConfig {
    /// Number of leading resolve calls answered with `Unavailable`
    pub unavailable_responses: u32,
    /// Addresses that fail with a transport error
    pub unreachable_addresses: Vec<String>,
}

/// Mock reflection client
pub struct MockReflectionClient {
    config: MockConfig,
    /// address -> service -> method -> descriptor
    registry: Mutex<HashMap<String, HashMap<String, HashMap<String, Arc<dyn MethodDesc>>>>>,
    resolve_count: AtomicU32,
}

impl MockReflectionClient {
    /// Create an empty mock client
    pub fn new() -> Self {
        Self::with_config(MockConfig::default())
    }

    /// Create a mock client with injected failures
    pub fn with_config(config: MockConfig) -> Self {
        Self {
            config,
            registry: Mutex::new(HashMap::new()),
            resolve_count: AtomicU32::new(0),
        }
    }

    /// Register a method under its `address/service/method` id
    ///
    /// # Panics
    /// Panics if `id` is malformed; this is a test helper.
    pub fn register(&self, id: &str, desc: Arc<dyn MethodDesc>) {
        let target = MethodTarget::parse(&id.into()).expect("malformed mock method id");
        self.registry
            .lock()
            .unwrap()
            .entry(target.address)
            .or_default()
            .entry(target.service)
            .or_default()
            .insert(target.method, desc);
    }

    /// Number of resolve calls seen so far
    pub fn resolve_count(&self) -> u32 {
        self.resolve_count.load(Ordering::SeqCst)
    }
}

impl Default for MockReflectionClient {
    fn default() -> Self {
        Self::new()
    }
}

impl ReflectionClient for MockReflectionClient {
    #[instrument(name = "mock_reflection_resolve", skip(self), fields(target = %target))]
    async fn resolve(&self, target: &MethodTarget) -> Result<Arc<dyn MethodDesc>> {
        let seen = self.resolve_count.fetch_add(1, Ordering::SeqCst);

        if seen < self.config.unavailable_responses {
            return Err(ResolveError::unavailable("mock server warming up"));
        }
        if self.config.unreachable_addresses.contains(&target.address) {
            return Err(ResolveError::transport(format!(
                "connection refused: {}",
                target.address
            )));
        }

        let registry = self.registry.lock().unwrap();
        let services = registry
            .get(&target.address)
            .ok_or_else(|| ResolveError::transport(format!("no server at {}", target.address)))?;
        let methods = services
            .get(&target.service)
            .ok_or_else(|| ResolveError::ServiceNotFound {
                service: target.service.clone(),
            })?;
        methods
            .get(&target.method)
            .cloned()
            .ok_or_else(|| ResolveError::MethodNotFound {
                service: target.service.clone(),
                method: target.method.clone(),
            })
    }
}
