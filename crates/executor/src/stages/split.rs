//! Split adapter: fans a stage output out to its links

use contracts::{Message, StageName};
use observability::metrics;
use tokio_util::sync::CancellationToken;

use crate::envelope::Envelope;
use crate::error::{ExecutorError, Result};
use crate::port::{Input, Output};

pub(crate) struct SplitStage {
    pub name: StageName,
    pub input: Input,
    /// One per outgoing link; `Output::field` selects what it carries
    pub outputs: Vec<Output>,
}

impl SplitStage {
    pub async fn run(self, cancel: CancellationToken) -> Result<()> {
        while let Some(envelope) = self.input.recv(&cancel).await {
            for output in &self.outputs {
                let message = if output.field.is_whole() {
                    envelope.message.clone()
                } else {
                    envelope
                        .message
                        .field(&output.field)
                        .map_err(|source| ExecutorError::Extract {
                            stage: self.name.to_string(),
                            link: output.link.to_string(),
                            source,
                        })?
                };
                if !output.send(Envelope::new(envelope.id, message), &cancel).await {
                    return Ok(());
                }
            }
            metrics::record_stage_message(&self.name, "split");
        }
        Ok(())
    }
}
