//! Sink adapter: drains a stage that has no outputs

use contracts::StageName;
use observability::metrics;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::Result;
use crate::port::Input;

pub(crate) struct SinkStage {
    pub name: StageName,
    pub input: Input,
}

impl SinkStage {
    pub async fn run(self, cancel: CancellationToken) -> Result<()> {
        let mut received = 0u64;
        while let Some(_envelope) = self.input.recv(&cancel).await {
            received += 1;
            metrics::record_stage_message(&self.name, "sink");
        }
        debug!(received, "sink finished");
        Ok(())
    }
}
