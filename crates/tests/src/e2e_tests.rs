//! Config -> Compiler -> ExecutionBuilder -> Execution

use std::time::Duration;

use compiler::StageKind;
use config_loader::ConfigLoader;
use contracts::{ExecutionConfig, LinkConfig, Mode, PipelineConfig, StageConfig};
use executor::{ExecutionBuilder, ExecutorError};

use crate::fixtures::*;

fn pipeline_config(
    mode: Mode,
    stages: &[(&str, &str)],
    links: Vec<LinkConfig>,
    execution: ExecutionConfig,
) -> PipelineConfig {
    PipelineConfig {
        version: Default::default(),
        name: "e2e".to_string(),
        mode,
        stages: stages
            .iter()
            .map(|(name, method)| StageConfig::new(*name, *method))
            .collect(),
        links,
        execution,
    }
}

/// gen -> double -> collect
fn linear(mode: Mode, execution: ExecutionConfig) -> PipelineConfig {
    pipeline_config(
        mode,
        &[("gen", GEN), ("double", DOUBLE), ("collect", COLLECT)],
        vec![
            LinkConfig::new("gen-double", "gen", "double"),
            LinkConfig::new("double-collect", "double", "collect"),
        ],
        execution,
    )
}

/// gen fans into triple and into check.orig; triple feeds check.transf
fn correlated(execution: ExecutionConfig) -> PipelineConfig {
    pipeline_config(
        Mode::Online,
        &[("gen", GEN), ("triple", TRIPLE), ("check", COLLECT_PAIR)],
        vec![
            LinkConfig::new("gen-triple", "gen", "triple"),
            LinkConfig::new("orig", "gen", "check").to_field("orig"),
            LinkConfig::new("transf", "triple", "check").to_field("transf"),
        ],
        execution,
    )
}

#[tokio::test]
async fn test_offline_round_trip() {
    init_tracing();
    const N: u64 = 25;
    let config = linear(
        Mode::Offline,
        ExecutionConfig {
            channel_capacity: 4,
            source_limit: Some(N),
            ..Default::default()
        },
    );
    let (pipeline, collected, _) = Fixture::new().compile(&config).await;

    let mut execution = ExecutionBuilder::new(config.execution.clone())
        .build(&pipeline)
        .await
        .unwrap();
    execution.start().unwrap();
    tokio::time::timeout(Duration::from_secs(10), execution.wait())
        .await
        .expect("offline pipeline did not terminate")
        .unwrap();

    let vals: Vec<i64> = snapshot(&collected)
        .iter()
        .map(|v| v["val"].as_i64().unwrap())
        .collect();
    let expected: Vec<i64> = (1..=N as i64).map(|i| 2 * i).collect();
    assert_eq!(vals, expected);

    let metrics = metrics_snapshot();
    assert!(metrics.contains("pipeline_stage_messages_total"), "{metrics}");
    assert!(metrics.contains("pipeline_call_latency_ms_bucket"), "{metrics}");
}

#[tokio::test]
async fn test_online_correlation() {
    init_tracing();
    const N: u64 = 50;
    let config = correlated(ExecutionConfig {
        channel_capacity: 16,
        source_limit: Some(N),
        ..Default::default()
    });
    let (pipeline, _, collected) = Fixture::new().compile(&config).await;

    let mut execution = ExecutionBuilder::new(config.execution.clone())
        .build(&pipeline)
        .await
        .unwrap();
    execution.start().unwrap();
    tokio::time::timeout(Duration::from_secs(10), execution.wait())
        .await
        .expect("online pipeline did not terminate")
        .unwrap();

    let pairs = snapshot(&collected);
    assert!(!pairs.is_empty());
    let mut last = 0;
    for pair in &pairs {
        let orig = pair["orig"]["val"].as_i64().unwrap();
        let transf = pair["transf"]["val"].as_i64().unwrap();
        assert_eq!(transf, 3 * orig, "mismatched pair {pair}");
        assert!(orig > last, "orig not strictly increasing at {pair}");
        last = orig;
    }
}

#[tokio::test]
async fn test_online_unbounded_run_stops_cleanly() {
    init_tracing();
    let config = correlated(ExecutionConfig {
        channel_capacity: 8,
        drain_interval_ms: 5,
        ..Default::default()
    });
    let (pipeline, _, collected) = Fixture::new().compile(&config).await;

    let mut execution = ExecutionBuilder::new(config.execution.clone())
        .build(&pipeline)
        .await
        .unwrap();
    execution.start().unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    tokio::time::timeout(Duration::from_secs(2), execution.stop())
        .await
        .expect("stop did not return")
        .unwrap();
    assert!(execution.channels().iter().all(|c| c.is_closed()));

    for pair in snapshot(&collected) {
        let orig = pair["orig"]["val"].as_i64().unwrap();
        assert_eq!(pair["transf"]["val"].as_i64(), Some(3 * orig));
    }
}

#[tokio::test]
async fn test_call_error_is_fail_fast() {
    init_tracing();
    let config = pipeline_config(
        Mode::Offline,
        &[("gen", GEN), ("fail", FAIL), ("collect", COLLECT)],
        vec![
            LinkConfig::new("gen-fail", "gen", "fail"),
            LinkConfig::new("fail-collect", "fail", "collect"),
        ],
        ExecutionConfig::default(),
    );
    let (pipeline, collected, _) = Fixture::new().compile(&config).await;

    let mut execution = ExecutionBuilder::new(config.execution.clone())
        .build(&pipeline)
        .await
        .unwrap();
    execution.start().unwrap();
    let err = tokio::time::timeout(Duration::from_secs(5), execution.wait())
        .await
        .expect("failed pipeline did not tear down")
        .unwrap_err();

    assert!(matches!(err, ExecutorError::Call { ref stage, .. } if stage == "fail"));
    assert!(snapshot(&collected).is_empty());
    assert!(execution.channels().iter().all(|c| c.is_closed()));
}

#[tokio::test]
async fn test_user_stages_have_one_channel_each_way() {
    let config = correlated(ExecutionConfig::default());
    let (pipeline, _, _) = Fixture::new().compile(&config).await;
    let execution = ExecutionBuilder::new(config.execution.clone())
        .build(&pipeline)
        .await
        .unwrap();

    let user: Vec<_> = execution
        .stage_summaries()
        .iter()
        .filter(|s| s.kind == StageKind::Unary)
        .collect();
    assert_eq!(user.len(), 3);
    assert!(user.iter().all(|s| s.inputs == 1 && s.outputs == 1));
}

#[tokio::test]
async fn test_config_file_pipeline() {
    init_tracing();
    let toml = format!(
        r#"
name = "from-file"
mode = "offline"

[[stages]]
name = "gen"
method = "{GEN}"

[[stages]]
name = "triple"
method = "{TRIPLE}"

[[stages]]
name = "collect"
method = "{COLLECT}"

[[links]]
name = "gen-triple"
source_stage = "gen"
target_stage = "triple"

[[links]]
name = "triple-collect"
source_stage = "triple"
target_stage = "collect"

[execution]
channel_capacity = 2
source_limit = 3
"#
    );
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pipeline.toml");
    std::fs::write(&path, toml).unwrap();

    let config = ConfigLoader::load_from_path(&path).unwrap();
    assert_eq!(config.execution.source_limit, Some(3));
    let (pipeline, collected, _) = Fixture::new().compile(&config).await;
    assert_eq!(pipeline.name(), "from-file");

    let mut execution = ExecutionBuilder::new(config.execution.clone())
        .build(&pipeline)
        .await
        .unwrap();
    execution.start().unwrap();
    tokio::time::timeout(Duration::from_secs(5), execution.wait())
        .await
        .unwrap()
        .unwrap();

    let vals: Vec<i64> = snapshot(&collected)
        .iter()
        .map(|v| v["val"].as_i64().unwrap())
        .collect();
    assert_eq!(vals, vec![3, 6, 9]);
}
