//! In-process method
//!
//! A `MethodDesc` whose connections run a local handler instead of a remote
//! call. Used to assemble pipelines in tests and demos without a transport.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use contracts::{
    Conn, ContractError, DynMessage, JsonMessage, JsonSchema, MessageDesc, MethodDesc,
};
use serde_json::Value;

/// Request handler
pub type Handler = Arc<dyn Fn(DynMessage) -> Result<DynMessage, ContractError> + Send + Sync>;

/// Dial / close bookkeeping shared by a method and its connections
#[derive(Debug, Default)]
pub struct ConnStats {
    dialed: AtomicUsize,
    closed: AtomicUsize,
    calls: AtomicUsize,
}

impl ConnStats {
    pub fn dialed(&self) -> usize {
        self.dialed.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

/// Method served by a local handler
pub struct InProcessMethod {
    name: String,
    input: Arc<dyn MessageDesc>,
    output: Arc<dyn MessageDesc>,
    handler: Handler,
    latency: Duration,
    fail_dial: bool,
    stats: Arc<ConnStats>,
}

impl InProcessMethod {
    /// Create a method from schemas and a handler
    pub fn new(
        name: impl Into<String>,
        input: Arc<dyn MessageDesc>,
        output: Arc<dyn MessageDesc>,
        handler: Handler,
    ) -> Self {
        Self {
            name: name.into(),
            input,
            output,
            handler,
            latency: Duration::ZERO,
            fail_dial: false,
            stats: Arc::new(ConnStats::default()),
        }
    }

    /// Method over JSON messages
    ///
    /// The handler sees the request value and returns the response value; an
    /// `Err(message)` becomes a call error.
    pub fn json<F>(input: JsonSchema, output: JsonSchema, f: F) -> Self
    where
        F: Fn(&Value) -> Result<Value, String> + Send + Sync + 'static,
    {
        let name = format!("{}->{}", input.name(), output.name());
        let method = name.clone();
        let handler: Handler = Arc::new(move |request: DynMessage| {
            let value = JsonMessage::from_dyn(&*request)
                .ok_or_else(|| ContractError::call(&method, "request is not a JSON message"))?
                .value();
            f(value)
                .map(JsonMessage::boxed)
                .map_err(|message| ContractError::call(&method, message))
        });
        Self::new(name, input.into_desc(), output.into_desc(), handler)
    }

    /// Simulated per-call latency
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Make every dial fail
    pub fn failing_dial(mut self) -> Self {
        self.fail_dial = true;
        self
    }

    /// Shared dial / close / call counters
    pub fn stats(&self) -> Arc<ConnStats> {
        Arc::clone(&self.stats)
    }
}

impl fmt::Debug for InProcessMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InProcessMethod")
            .field("name", &self.name)
            .field("input", &self.input.name())
            .field("output", &self.output.name())
            .field("latency", &self.latency)
            .finish()
    }
}

#[async_trait]
impl MethodDesc for InProcessMethod {
    async fn dial(&self) -> Result<Box<dyn Conn>, ContractError> {
        if self.fail_dial {
            return Err(ContractError::transport(&self.name, "dial refused"));
        }
        self.stats.dialed.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(InProcessConn {
            handler: Arc::clone(&self.handler),
            latency: self.latency,
            stats: Arc::clone(&self.stats),
        }))
    }

    fn input(&self) -> Arc<dyn MessageDesc> {
        Arc::clone(&self.input)
    }

    fn output(&self) -> Arc<dyn MessageDesc> {
        Arc::clone(&self.output)
    }
}

struct InProcessConn {
    handler: Handler,
    latency: Duration,
    stats: Arc<ConnStats>,
}

#[async_trait]
impl Conn for InProcessConn {
    async fn call(&self, request: DynMessage) -> Result<DynMessage, ContractError> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        self.stats.calls.fetch_add(1, Ordering::SeqCst);
        (self.handler)(request)
    }

    async fn close(&self) -> Result<(), ContractError> {
        self.stats.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn num() -> JsonSchema {
        JsonSchema::object("Num", [("val", JsonSchema::integer())])
    }

    fn doubler() -> InProcessMethod {
        InProcessMethod::json(num(), num(), |v| {
            let val = v["val"].as_i64().ok_or("missing val")?;
            Ok(json!({ "val": val * 2 }))
        })
    }

    #[tokio::test]
    async fn test_call_runs_handler() {
        let method = doubler();
        let conn = method.dial().await.unwrap();
        let reply = conn.call(JsonMessage::boxed(json!({"val": 21}))).await.unwrap();
        assert_eq!(
            JsonMessage::from_dyn(&*reply).unwrap().value(),
            &json!({"val": 42})
        );
        assert_eq!(method.stats().calls(), 1);
    }

    #[tokio::test]
    async fn test_handler_error_is_call_error() {
        let method = doubler();
        let conn = method.dial().await.unwrap();
        let err = conn.call(JsonMessage::boxed(json!({}))).await.unwrap_err();
        assert!(matches!(err, ContractError::Call { .. }));
    }

    #[tokio::test]
    async fn test_dial_and_close_counted() {
        let method = doubler();
        let stats = method.stats();
        let conn = method.dial().await.unwrap();
        conn.close().await.unwrap();
        assert_eq!(stats.dialed(), 1);
        assert_eq!(stats.closed(), 1);
    }

    #[tokio::test]
    async fn test_failing_dial() {
        let method = doubler().failing_dial();
        assert!(method.dial().await.is_err());
    }
}
