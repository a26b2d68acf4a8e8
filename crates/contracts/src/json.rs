//! JSON-backed reference implementation of the schema capability
//!
//! `JsonSchema` describes object/scalar shapes structurally; `JsonMessage`
//! wraps a `serde_json::Value`. Used by in-process methods and tests.

use std::any::Any;
use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::{ContractError, DynMessage, Message, MessageDesc, MessageField, MessageGen};

/// Shape of a JSON schema node
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaKind {
    Bool,
    Integer,
    Float,
    String,
    Object(BTreeMap<String, Arc<JsonSchema>>),
}

/// Structural message descriptor
#[derive(Debug, Clone, PartialEq)]
pub struct JsonSchema {
    name: String,
    kind: SchemaKind,
}

impl JsonSchema {
    /// Object schema with the given fields
    pub fn object<'a>(
        name: impl Into<String>,
        fields: impl IntoIterator<Item = (&'a str, JsonSchema)>,
    ) -> Self {
        let fields = fields
            .into_iter()
            .map(|(field, schema)| (field.to_string(), Arc::new(schema)))
            .collect();
        Self {
            name: name.into(),
            kind: SchemaKind::Object(fields),
        }
    }

    pub fn integer() -> Self {
        Self::scalar("int64", SchemaKind::Integer)
    }

    pub fn float() -> Self {
        Self::scalar("double", SchemaKind::Float)
    }

    pub fn boolean() -> Self {
        Self::scalar("bool", SchemaKind::Bool)
    }

    pub fn string() -> Self {
        Self::scalar("string", SchemaKind::String)
    }

    fn scalar(name: &str, kind: SchemaKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
        }
    }

    pub fn kind(&self) -> &SchemaKind {
        &self.kind
    }

    /// Erase into a shared descriptor
    pub fn into_desc(self) -> Arc<dyn MessageDesc> {
        Arc::new(self)
    }

    /// Zero value for this shape
    pub fn zero_value(&self) -> Value {
        match &self.kind {
            SchemaKind::Bool => Value::Bool(false),
            SchemaKind::Integer => Value::from(0i64),
            SchemaKind::Float => Value::from(0.0f64),
            SchemaKind::String => Value::String(String::new()),
            SchemaKind::Object(fields) => Value::Object(
                fields
                    .iter()
                    .map(|(name, schema)| (name.clone(), schema.zero_value()))
                    .collect::<Map<_, _>>(),
            ),
        }
    }

    fn structurally_equal(&self, other: &JsonSchema) -> bool {
        match (&self.kind, &other.kind) {
            (SchemaKind::Object(a), SchemaKind::Object(b)) => {
                a.len() == b.len()
                    && a.iter().all(|(name, schema)| {
                        b.get(name)
                            .is_some_and(|theirs| schema.structurally_equal(theirs))
                    })
            }
            (a, b) => a == b,
        }
    }
}

impl MessageDesc for JsonSchema {
    fn name(&self) -> &str {
        &self.name
    }

    fn compatible(&self, other: &dyn MessageDesc) -> bool {
        other
            .as_any()
            .downcast_ref::<JsonSchema>()
            .is_some_and(|other| self.structurally_equal(other))
    }

    fn field(&self, field: &MessageField) -> Result<Arc<dyn MessageDesc>, ContractError> {
        if field.is_whole() {
            return Ok(Arc::new(self.clone()));
        }
        match &self.kind {
            SchemaKind::Object(fields) => fields
                .get(field.as_str())
                .map(|schema| Arc::clone(schema) as Arc<dyn MessageDesc>)
                .ok_or_else(|| ContractError::field_not_found(&self.name, field.as_str())),
            _ => Err(ContractError::field_not_found(&self.name, field.as_str())),
        }
    }

    fn empty_gen(&self) -> MessageGen {
        let zero = self.zero_value();
        Arc::new(move || Box::new(JsonMessage::new(zero.clone())) as DynMessage)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Message instance backed by a JSON value
#[derive(Debug, Clone, PartialEq)]
pub struct JsonMessage(Value);

impl JsonMessage {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    pub fn value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }

    /// Box as a type-erased message
    pub fn boxed(value: Value) -> DynMessage {
        Box::new(Self(value))
    }

    /// Downcast a type-erased message
    pub fn from_dyn(message: &dyn Message) -> Option<&JsonMessage> {
        message.as_any().downcast_ref::<JsonMessage>()
    }

    fn take_value(value: DynMessage) -> Result<Value, ContractError> {
        JsonMessage::from_dyn(&*value)
            .map(|m| m.0.clone())
            .ok_or_else(|| ContractError::schema("expected a JSON message value"))
    }
}

impl Message for JsonMessage {
    fn field(&self, field: &MessageField) -> Result<DynMessage, ContractError> {
        if field.is_whole() {
            return Ok(self.clone_message());
        }
        self.0
            .get(field.as_str())
            .map(|v| JsonMessage::boxed(v.clone()))
            .ok_or_else(|| ContractError::field_not_found("json message", field.as_str()))
    }

    fn set_field(&mut self, field: &MessageField, value: DynMessage) -> Result<(), ContractError> {
        let value = Self::take_value(value)?;
        if field.is_whole() {
            self.0 = value;
            return Ok(());
        }
        let object = self.0.as_object_mut().ok_or_else(|| {
            ContractError::schema(format!("cannot set field '{field}' on a non-object"))
        })?;
        object.insert(field.to_string(), value);
        Ok(())
    }

    fn clone_message(&self) -> DynMessage {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
