//! Shared fixtures for executor unit tests

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

use compiler::{Compiler, Pipeline};
use contracts::{JsonSchema, LinkConfig, MethodDesc, Mode, PipelineConfig, StageConfig};
use resolver::{InProcessMethod, MockReflectionClient, ReflectionLoader};
use serde_json::{json, Value};

pub(crate) fn num() -> JsonSchema {
    JsonSchema::object("Num", [("val", JsonSchema::integer())])
}

pub(crate) fn pair() -> JsonSchema {
    JsonSchema::object("Pair", [("orig", num()), ("transf", num())])
}

/// Ignores its request, answers 1, 2, 3, ...
pub(crate) fn counter() -> InProcessMethod {
    let next = AtomicI64::new(0);
    InProcessMethod::json(num(), num(), move |_| {
        Ok(json!({ "val": next.fetch_add(1, Ordering::SeqCst) + 1 }))
    })
}

pub(crate) fn scale(factor: i64) -> InProcessMethod {
    InProcessMethod::json(num(), num(), move |v| {
        let val = v["val"].as_i64().ok_or("missing val")?;
        Ok(json!({ "val": val * factor }))
    })
}

pub(crate) fn failing() -> InProcessMethod {
    InProcessMethod::json(num(), num(), |_| Err("boom".to_string()))
}

/// Echoes its request and records it
pub(crate) fn collector(schema: JsonSchema) -> (InProcessMethod, Arc<Mutex<Vec<Value>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let method = InProcessMethod::json(schema.clone(), schema, move |v| {
        sink.lock().unwrap().push(v.clone());
        Ok(v.clone())
    });
    (method, seen)
}

/// In-memory method registry
#[derive(Default)]
pub(crate) struct Registry {
    client: MockReflectionClient,
}

impl Registry {
    pub fn with(self, id: &str, method: InProcessMethod) -> Self {
        self.with_desc(id, Arc::new(method))
    }

    pub fn with_desc(self, id: &str, method: Arc<dyn MethodDesc>) -> Self {
        self.client.register(id, method);
        self
    }

    pub async fn compile(self, config: &PipelineConfig) -> Pipeline {
        Compiler::new(ReflectionLoader::new(self.client))
            .compile(config)
            .await
            .unwrap()
    }
}

pub(crate) fn config(mode: Mode, stages: &[(&str, &str)], links: Vec<LinkConfig>) -> PipelineConfig {
    PipelineConfig {
        version: Default::default(),
        name: "test".into(),
        mode,
        stages: stages
            .iter()
            .map(|(name, method)| StageConfig::new(*name, *method))
            .collect(),
        links,
        execution: Default::default(),
    }
}
