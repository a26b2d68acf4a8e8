//! Schema capability - opaque structured messages and their descriptors
//!
//! The core never inspects message contents. It only projects fields,
//! sets fields on freshly generated messages and checks descriptor compatibility.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::{ContractError, MessageField};

/// Owned, type-erased message
pub type DynMessage = Box<dyn Message>;

/// Zero-value message factory
pub type MessageGen = Arc<dyn Fn() -> DynMessage + Send + Sync>;

/// Structured message instance
pub trait Message: Send + Sync + fmt::Debug {
    /// Project a field. The whole field returns a copy of the message.
    fn field(&self, field: &MessageField) -> Result<DynMessage, ContractError>;

    /// Set a field. The whole field replaces the message contents.
    fn set_field(&mut self, field: &MessageField, value: DynMessage) -> Result<(), ContractError>;

    /// Deep copy
    fn clone_message(&self) -> DynMessage;

    /// Downcast support for concrete implementations
    fn as_any(&self) -> &dyn Any;
}

impl Clone for DynMessage {
    fn clone(&self) -> Self {
        self.clone_message()
    }
}

/// Message type descriptor
pub trait MessageDesc: Send + Sync + fmt::Debug {
    /// Type name (diagnostics only)
    fn name(&self) -> &str;

    /// Whether values of `other` can be delivered where `self` is expected
    fn compatible(&self, other: &dyn MessageDesc) -> bool;

    /// Descriptor of a field. The whole field returns this descriptor.
    fn field(&self, field: &MessageField) -> Result<Arc<dyn MessageDesc>, ContractError>;

    /// Factory producing zero-valued messages of this type
    fn empty_gen(&self) -> MessageGen;

    /// Downcast support for `compatible` implementations
    fn as_any(&self) -> &dyn Any;
}
