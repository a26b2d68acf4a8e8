//! Unary stage: one remote call per message

use std::time::{Duration, Instant};

use contracts::{Conn, StageName};
use observability::{metrics, RunningStats};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::envelope::Envelope;
use crate::error::{ExecutorError, Result};
use crate::port::{Input, Output};

pub(crate) struct UnaryStage {
    pub name: StageName,
    pub input: Input,
    pub output: Output,
    pub conn: Box<dyn Conn>,
    pub call_timeout: Duration,
}

impl UnaryStage {
    /// Process until input closure or cancellation, then close the connection
    pub async fn run(self, cancel: CancellationToken) -> Result<()> {
        let mut latency = RunningStats::default();
        let result = self.process(&cancel, &mut latency).await;
        info!(calls = latency.count(), latency_ms = %latency, "unary stage exiting");
        if let Err(e) = self.conn.close().await {
            warn!(error = %e, "failed to close connection");
        }
        result
    }

    async fn process(&self, cancel: &CancellationToken, latency: &mut RunningStats) -> Result<()> {
        while let Some(envelope) = self.input.recv(cancel).await {
            let started = Instant::now();
            let call = tokio::time::timeout(self.call_timeout, self.conn.call(envelope.message));
            let reply = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!(id = envelope.id, "in-flight call abandoned");
                    return Ok(());
                }
                reply = call => reply,
            };

            let message = match reply {
                Ok(Ok(message)) => message,
                Ok(Err(e)) => return Err(ExecutorError::call(self.name.as_str(), e)),
                Err(_) => {
                    let timeout_ms = u64::try_from(self.call_timeout.as_millis()).unwrap_or(u64::MAX);
                    return Err(ExecutorError::CallTimeout {
                        stage: self.name.to_string(),
                        timeout_ms,
                    });
                }
            };
            let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
            latency.push(elapsed_ms);
            metrics::record_call_latency_ms(&self.name, elapsed_ms);
            metrics::record_stage_message(&self.name, "unary");

            if !self
                .output
                .send(Envelope::new(envelope.id, message), cancel)
                .await
            {
                break;
            }
        }
        Ok(())
    }
}
