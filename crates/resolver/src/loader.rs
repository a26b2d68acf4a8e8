//! ReflectionLoader - `MethodLoader` over a reflection client
//!
//! Parses `address/service/method`, retries while the remote reports
//! "unavailable" and classifies every other failure without retrying.

use std::sync::Arc;
use std::time::Duration;

use contracts::{ContractError, MethodDesc, MethodId, MethodLoader};
use tracing::{debug, info, instrument, warn};

use crate::client::{MethodTarget, ReflectionClient};

/// Base backoff duration for retries.
pub const BACKOFF_BASE: Duration = Duration::from_millis(100);

/// Maximum backoff duration.
pub const BACKOFF_MAX: Duration = Duration::from_secs(5);

/// Default number of attempts, including the first one.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Exponential backoff policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: u32,
    /// First delay
    pub base: Duration,
    /// Delay cap
    pub max: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base: BACKOFF_BASE,
            max: BACKOFF_MAX,
        }
    }
}

impl RetryPolicy {
    /// Delay before attempt `attempt + 1` (attempt counted from 1)
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt.saturating_sub(1)).unwrap_or(u32::MAX);
        self.base.saturating_mul(factor).min(self.max)
    }
}

/// Method loader backed by remote reflection
pub struct ReflectionLoader<C: ReflectionClient> {
    client: C,
    retry: RetryPolicy,
}

impl<C: ReflectionClient> ReflectionLoader<C> {
    /// Create a loader with the default retry policy
    pub fn new(client: C) -> Self {
        Self::with_retry(client, RetryPolicy::default())
    }

    /// Create a loader with a custom retry policy
    pub fn with_retry(client: C, retry: RetryPolicy) -> Self {
        Self { client, retry }
    }

    /// Access the underlying client
    pub fn client(&self) -> &C {
        &self.client
    }
}

impl<C: ReflectionClient> MethodLoader for ReflectionLoader<C> {
    #[instrument(name = "reflection_loader_load", skip(self), fields(method = %method))]
    async fn load(&self, method: &MethodId) -> Result<Arc<dyn MethodDesc>, ContractError> {
        let target = MethodTarget::parse(method)?;
        let mut attempt = 0;

        loop {
            attempt += 1;
            match self.client.resolve(&target).await {
                Ok(desc) => {
                    info!(attempt, "method resolved");
                    return Ok(desc);
                }
                Err(e) if e.is_retryable() => {
                    if attempt >= self.retry.max_attempts {
                        warn!(attempt, error = %e, "method still unavailable, giving up");
                        return Err(ContractError::Unavailable {
                            method: method.to_string(),
                            attempts: attempt,
                            message: e.to_string(),
                        });
                    }

                    let delay = self.retry.delay(attempt);
                    debug!(
                        attempt,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %e,
                        "method unavailable, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    warn!(attempt, error = %e, "method resolution failed");
                    return Err(e.into_contract(method.as_str()));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::in_process::InProcessMethod;
    use crate::mock_client::{MockConfig, MockReflectionClient};
    use contracts::JsonSchema;

    const ID: &str = "localhost:50051/demo.Math/Double";

    fn fast_retry(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            base: Duration::from_millis(1),
            max: Duration::from_millis(4),
        }
    }

    fn echo() -> Arc<dyn MethodDesc> {
        let num = JsonSchema::object("Num", [("val", JsonSchema::integer())]);
        Arc::new(InProcessMethod::json(num.clone(), num, |v| Ok(v.clone())))
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay(1), Duration::from_millis(100));
        assert_eq!(policy.delay(2), Duration::from_millis(200));
        assert_eq!(policy.delay(3), Duration::from_millis(400));
        assert_eq!(policy.delay(10), BACKOFF_MAX);
        assert_eq!(policy.delay(64), BACKOFF_MAX);
    }

    #[tokio::test]
    async fn test_load_registered_method() {
        let client = MockReflectionClient::new();
        client.register(ID, echo());
        let loader = ReflectionLoader::new(client);

        let desc = loader.load(&MethodId::new(ID)).await.unwrap();
        assert!(desc.input().compatible(desc.output().as_ref()));
    }

    #[tokio::test]
    async fn test_retries_while_unavailable() {
        let client = MockReflectionClient::with_config(MockConfig {
            unavailable_responses: 2,
            ..Default::default()
        });
        client.register(ID, echo());
        let loader = ReflectionLoader::with_retry(client, fast_retry(5));

        assert!(loader.load(&MethodId::new(ID)).await.is_ok());
        assert_eq!(loader.client().resolve_count(), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let client = MockReflectionClient::with_config(MockConfig {
            unavailable_responses: 10,
            ..Default::default()
        });
        client.register(ID, echo());
        let loader = ReflectionLoader::with_retry(client, fast_retry(3));

        let err = loader.load(&MethodId::new(ID)).await.unwrap_err();
        assert!(matches!(err, ContractError::Unavailable { attempts: 3, .. }));
        assert_eq!(loader.client().resolve_count(), 3);
    }

    #[tokio::test]
    async fn test_not_found_is_not_retried() {
        let client = MockReflectionClient::new();
        client.register(ID, echo());
        let loader = ReflectionLoader::with_retry(client, fast_retry(5));

        for missing in [
            "localhost:50051/demo.Missing/Nope",
            "localhost:50051/demo.Math/Nope",
        ] {
            let err = loader.load(&MethodId::new(missing)).await.unwrap_err();
            assert!(err.is_not_found(), "{missing}: {err}");
        }
        assert_eq!(loader.client().resolve_count(), 2);
    }

    #[tokio::test]
    async fn test_unknown_address_is_transport_error() {
        let loader = ReflectionLoader::with_retry(MockReflectionClient::new(), fast_retry(5));

        let err = loader.load(&MethodId::new(ID)).await.unwrap_err();
        assert!(matches!(err, ContractError::Transport { .. }));
        assert_eq!(loader.client().resolve_count(), 1);
    }

    #[tokio::test]
    async fn test_transport_error_classified() {
        let client = MockReflectionClient::with_config(MockConfig {
            unreachable_addresses: vec!["localhost:50051".into()],
            ..Default::default()
        });
        client.register(ID, echo());
        let loader = ReflectionLoader::with_retry(client, fast_retry(5));

        let err = loader.load(&MethodId::new(ID)).await.unwrap_err();
        assert!(matches!(err, ContractError::Transport { .. }));
    }

    #[tokio::test]
    async fn test_malformed_id_rejected_before_resolution() {
        let loader = ReflectionLoader::new(MockReflectionClient::new());
        let err = loader.load(&MethodId::new("not-a-method")).await.unwrap_err();
        assert!(matches!(err, ContractError::InvalidMethodId { .. }));
        assert_eq!(loader.client().resolve_count(), 0);
    }
}
