//! Runs the full scenario set under file-based configurations.

use mimic_core::{MockConfig, MockMode};
use mimic_e2e::{all_scenarios, ScenarioRunner};
use std::fs;
use tempfile::TempDir;

fn config_from(yaml: &str) -> MockConfig {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("mimic.yml");
    fs::write(&path, yaml).unwrap();
    MockConfig::from_file(&path).unwrap()
}

#[tokio::test]
async fn test_scenarios_pass_under_relaxed_default() {
    let config = config_from("default_mode: relaxed\nmax_reported_invocations: 5\n");
    assert_eq!(config.default_mode, MockMode::Relaxed);

    let summary = ScenarioRunner::new(config).run_all(&all_scenarios()).await;
    let failed: Vec<_> = summary.results.iter().filter(|r| !r.passed).collect();
    assert!(failed.is_empty(), "{failed:#?}");
}

#[tokio::test]
async fn test_filtered_run_under_strict_default() {
    let config = config_from("default_mode: strict\n");
    let summary = ScenarioRunner::new(config)
        .with_filter(Some("object".to_string()))
        .run_all(&all_scenarios())
        .await;
    assert_eq!(summary.total(), 1);
    assert!(summary.all_passed());
}
