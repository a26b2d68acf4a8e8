//! In-process methods and helpers shared by the end-to-end tests

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex, OnceLock};

use compiler::{Compiler, Pipeline};
use contracts::{JsonSchema, PipelineConfig};
use observability::{LogFormat, MetricsExporter, Observability, ObservabilityConfig};
use resolver::{InProcessMethod, MockReflectionClient, ReflectionLoader};
use serde_json::{json, Value};

pub const GEN: &str = "localhost:50051/demo.Counter/Next";
pub const DOUBLE: &str = "localhost:50051/demo.Math/Double";
pub const TRIPLE: &str = "localhost:50051/demo.Math/Triple";
pub const FAIL: &str = "localhost:50051/demo.Math/Fail";
pub const COLLECT: &str = "localhost:50052/demo.Collect/Num";
pub const COLLECT_PAIR: &str = "localhost:50052/demo.Collect/Pair";

static OBSERVABILITY: OnceLock<Observability> = OnceLock::new();

/// Compact logs plus an in-memory Prometheus recorder; `RUST_LOG` still applies
pub fn init_tracing() -> &'static Observability {
    OBSERVABILITY.get_or_init(|| {
        observability::init_with_config(ObservabilityConfig {
            log_format: LogFormat::Compact,
            metrics: MetricsExporter::InMemory,
            default_log_level: "warn".to_string(),
        })
        .unwrap_or_default()
    })
}

/// Prometheus text for everything recorded so far in this process
pub fn metrics_snapshot() -> String {
    init_tracing().render().unwrap_or_default()
}

pub fn num() -> JsonSchema {
    JsonSchema::object("Num", [("val", JsonSchema::integer())])
}

pub fn pair() -> JsonSchema {
    JsonSchema::object("Pair", [("orig", num()), ("transf", num())])
}

pub type Collected = Arc<Mutex<Vec<Value>>>;

/// Every method the tests reference, plus handles on what the collectors saw
pub struct Fixture {
    pub client: MockReflectionClient,
    pub collected: Collected,
    pub collected_pairs: Collected,
}

impl Fixture {
    pub fn new() -> Self {
        let client = MockReflectionClient::new();
        let collected: Collected = Arc::default();
        let collected_pairs: Collected = Arc::default();

        let next = AtomicI64::new(0);
        let counter = InProcessMethod::json(num(), num(), move |_| {
            Ok(json!({ "val": next.fetch_add(1, Ordering::SeqCst) + 1 }))
        });

        client.register(GEN, Arc::new(counter));
        client.register(DOUBLE, Arc::new(scale(2)));
        client.register(TRIPLE, Arc::new(scale(3)));
        client.register(
            FAIL,
            Arc::new(InProcessMethod::json(num(), num(), |_| {
                Err("remote rejected request".to_string())
            })),
        );
        client.register(COLLECT, Arc::new(collector(num(), &collected)));
        client.register(COLLECT_PAIR, Arc::new(collector(pair(), &collected_pairs)));

        Self {
            client,
            collected,
            collected_pairs,
        }
    }

    /// Compile with a reflection loader over the registered methods
    pub async fn compile(self, config: &PipelineConfig) -> (Pipeline, Collected, Collected) {
        let Self {
            client,
            collected,
            collected_pairs,
        } = self;
        let pipeline = Compiler::new(ReflectionLoader::new(client))
            .compile(config)
            .await
            .unwrap();
        (pipeline, collected, collected_pairs)
    }
}

fn scale(factor: i64) -> InProcessMethod {
    InProcessMethod::json(num(), num(), move |v| {
        let val = v["val"].as_i64().ok_or("missing val")?;
        Ok(json!({ "val": val * factor }))
    })
}

fn collector(schema: JsonSchema, seen: &Collected) -> InProcessMethod {
    let seen = Arc::clone(seen);
    InProcessMethod::json(schema.clone(), schema, move |v| {
        seen.lock().map_err(|e| e.to_string())?.push(v.clone());
        Ok(v.clone())
    })
}

pub fn snapshot(collected: &Collected) -> Vec<Value> {
    collected.lock().unwrap().clone()
}
