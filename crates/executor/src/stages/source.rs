//! Source adapter: feeds a stage that has no inputs

use contracts::{MessageGen, StageName};
use observability::metrics;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::envelope::Envelope;
use crate::error::Result;
use crate::port::Output;

/// Emits empty requests for the augmented stage, tagged with increasing ids
pub(crate) struct SourceStage {
    pub name: StageName,
    pub output: Output,
    pub request: MessageGen,
    /// Stop after this many messages
    pub limit: Option<u64>,
}

impl SourceStage {
    pub async fn run(self, cancel: CancellationToken) -> Result<()> {
        let mut next_id = 1u64;
        loop {
            if self.limit.is_some_and(|limit| next_id > limit) {
                debug!(emitted = next_id - 1, "source limit reached");
                break;
            }

            let envelope = Envelope::new(next_id, (self.request)());
            if !self.output.send(envelope, &cancel).await {
                break;
            }
            metrics::record_stage_message(&self.name, "source");
            next_id += 1;
        }
        Ok(())
    }
}
