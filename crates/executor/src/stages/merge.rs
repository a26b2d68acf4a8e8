//! Merge adapter: builds a stage input from its links
//!
//! Offline: lockstep, one envelope from every input per round.
//! Online: id-correlated. A message is emitted only once every input shows
//! the same id; inputs that skipped an id move the cursor forward and the
//! partial round is dropped.

use contracts::{DynMessage, Message, MessageGen, Mode, StageName};
use observability::metrics;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::envelope::Envelope;
use crate::error::{ExecutorError, Result};
use crate::port::{Input, Output};

pub(crate) struct MergeStage {
    pub name: StageName,
    pub mode: Mode,
    /// In link order; `Input::field` is the field each one sets
    pub inputs: Vec<Input>,
    pub output: Output,
    /// Empty message of the augmented stage's input
    pub request: MessageGen,
}

impl MergeStage {
    pub async fn run(self, cancel: CancellationToken) -> Result<()> {
        match self.mode {
            Mode::Offline => self.run_offline(&cancel).await,
            Mode::Online => self.run_online(&cancel).await,
        }
    }

    async fn run_offline(&self, cancel: &CancellationToken) -> Result<()> {
        let mut round = 0u64;
        loop {
            let mut message = (self.request)();
            for input in &self.inputs {
                let Some(envelope) = input.recv(cancel).await else {
                    return Ok(());
                };
                self.assemble(&mut message, input, envelope)?;
            }

            round += 1;
            if !self.output.send(Envelope::new(round, message), cancel).await {
                return Ok(());
            }
            metrics::record_stage_message(&self.name, "merge");
        }
    }

    async fn run_online(&self, cancel: &CancellationToken) -> Result<()> {
        let mut curr = 1u64;
        let mut slots: Vec<Option<Envelope>> = self.inputs.iter().map(|_| None).collect();

        'round: loop {
            for (slot, input) in slots.iter_mut().zip(&self.inputs) {
                // pull forward, dropping anything behind the cursor
                let id = loop {
                    if let Some(envelope) = slot {
                        if envelope.id >= curr {
                            break envelope.id;
                        }
                    }
                    match input.recv(cancel).await {
                        Some(envelope) => *slot = Some(envelope),
                        None => return Ok(()),
                    }
                };

                if id > curr {
                    debug!(from = curr, to = id, link = %input.link, "merge cursor skipped forward");
                    metrics::record_merge_skip(&self.name, curr, id);
                    curr = id;
                    continue 'round;
                }
            }

            let mut message = (self.request)();
            for (slot, input) in slots.iter_mut().zip(&self.inputs) {
                if let Some(envelope) = slot.take() {
                    self.assemble(&mut message, input, envelope)?;
                }
            }

            if !self.output.send(Envelope::new(curr, message), cancel).await {
                return Ok(());
            }
            metrics::record_stage_message(&self.name, "merge");
            curr += 1;
        }
    }

    fn assemble(&self, message: &mut DynMessage, input: &Input, envelope: Envelope) -> Result<()> {
        message
            .set_field(&input.field, envelope.message)
            .map_err(|source| ExecutorError::Assemble {
                stage: self.name.to_string(),
                link: input.link.to_string(),
                source,
            })
    }
}
