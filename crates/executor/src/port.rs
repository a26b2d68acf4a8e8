//! Stage ports: the ends of one link channel held by a stage task
//!
//! Every receive and send races against pipeline cancellation. Dropping a
//! port closes its channel, so a stage that exits for any reason unblocks
//! both neighbours.

use async_channel::{Receiver, Sender};
use contracts::{LinkName, MessageField};
use tokio_util::sync::CancellationToken;

use crate::envelope::Envelope;

/// Allocate one bounded link channel
pub(crate) fn channel(capacity: usize) -> (Sender<Envelope>, Receiver<Envelope>) {
    async_channel::bounded(capacity)
}

/// Receiving end of a link
#[derive(Debug)]
pub(crate) struct Input {
    pub link: LinkName,
    /// Field of the stage input this link sets (Merge only)
    pub field: MessageField,
    rx: Receiver<Envelope>,
}

impl Input {
    pub fn new(link: LinkName, field: MessageField, rx: Receiver<Envelope>) -> Self {
        Self { link, field, rx }
    }

    /// Next envelope; `None` once the channel is closed and empty or the
    /// pipeline is cancelled
    pub async fn recv(&self, cancel: &CancellationToken) -> Option<Envelope> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            res = self.rx.recv() => res.ok(),
        }
    }
}

impl Drop for Input {
    fn drop(&mut self) {
        self.rx.close();
    }
}

/// Sending end of a link
#[derive(Debug)]
pub(crate) struct Output {
    pub link: LinkName,
    /// Field of the stage output this link carries (Split only)
    pub field: MessageField,
    tx: Sender<Envelope>,
}

impl Output {
    pub fn new(link: LinkName, field: MessageField, tx: Sender<Envelope>) -> Self {
        Self { link, field, tx }
    }

    /// Send an envelope; `false` once the channel is closed or the pipeline
    /// is cancelled
    pub async fn send(&self, envelope: Envelope, cancel: &CancellationToken) -> bool {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => false,
            res = self.tx.send(envelope) => res.is_ok(),
        }
    }
}

impl Drop for Output {
    fn drop(&mut self) {
        self.tx.close();
    }
}

/// Read-only view of an allocated link channel
#[derive(Debug, Clone)]
pub struct ChannelInfo {
    link: LinkName,
    capacity: usize,
    rx: Receiver<Envelope>,
}

impl ChannelInfo {
    pub(crate) fn new(link: LinkName, capacity: usize, rx: Receiver<Envelope>) -> Self {
        Self { link, capacity, rx }
    }

    pub fn link(&self) -> &LinkName {
        &self.link
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Buffered envelopes
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    pub fn is_closed(&self) -> bool {
        self.rx.is_closed()
    }

    /// Pop one buffered envelope without waiting
    pub(crate) fn try_pop(&self) -> Option<Envelope> {
        self.rx.try_recv().ok()
    }
}
