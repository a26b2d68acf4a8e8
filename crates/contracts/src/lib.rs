//! # Contracts
//!
//! Frozen interface contracts shared by every pipeline crate.
//! Business crates depend on this crate only; reverse dependencies are prohibited.
//!
//! ## Capabilities
//! - Names: validated, cheap-to-clone identifiers
//! - Configs: declarative stage/link description (compiler input)
//! - Schema: opaque messages with field projection and compatibility checks
//! - Methods: resolved unary remote methods and their loader

mod error;
mod json;
mod method;
mod names;
mod pipeline_config;
mod schema;

pub use error::*;
pub use json::{JsonMessage, JsonSchema, SchemaKind};
pub use method::{Conn, LocalMethodLoader, MethodDesc, MethodLoader};
pub use names::*;
pub use pipeline_config::*;
pub use schema::{DynMessage, Message, MessageDesc, MessageGen};
