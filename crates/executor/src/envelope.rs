//! Channel item

use contracts::DynMessage;

/// Message plus its correlation id
///
/// Sources mint ids from 1. Unary and Split keep the id of the message they
/// received; online Merge only emits ids every input agreed on.
#[derive(Debug, Clone)]
pub struct Envelope {
    pub id: u64,
    pub message: DynMessage,
}

impl Envelope {
    pub fn new(id: u64, message: DynMessage) -> Self {
        Self { id, message }
    }
}
