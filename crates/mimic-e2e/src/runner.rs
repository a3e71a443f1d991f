//! Sequential scenario runner.

use crate::models::{RunSummary, TestResult};
use crate::scenarios::TestScenario;
use chrono::Utc;
use futures::FutureExt;
use mimic_core::{MockConfig, MockRegistry};
use std::panic::AssertUnwindSafe;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Runs scenarios one at a time, each against its own registry.
#[derive(Debug, Clone, Default)]
pub struct ScenarioRunner {
    config: MockConfig,
    filter: Option<String>,
}

impl ScenarioRunner {
    pub fn new(config: MockConfig) -> Self {
        Self { config, filter: None }
    }

    /// Keeps only scenarios whose id contains `filter`.
    pub fn with_filter(mut self, filter: Option<String>) -> Self {
        self.filter = filter.filter(|f| !f.is_empty());
        self
    }

    pub fn selects(&self, scenario: &dyn TestScenario) -> bool {
        self.filter.as_deref().is_none_or(|f| scenario.id().contains(f))
    }

    pub async fn run_all(&self, scenarios: &[Box<dyn TestScenario>]) -> RunSummary {
        let started_at = Utc::now();
        let mut results = Vec::new();
        for scenario in scenarios.iter().filter(|s| self.selects(s.as_ref())) {
            results.push(self.run_one(scenario.as_ref()).await);
        }
        let summary = RunSummary::new(started_at, results);
        info!(
            total = summary.total(),
            passed = summary.passed,
            failed = summary.failed,
            "Scenario run finished"
        );
        summary
    }

    /// Runs one scenario. Setup errors, execution errors and panics become
    /// failed results; intercepts are torn down on every path.
    pub async fn run_one(&self, scenario: &dyn TestScenario) -> TestResult {
        let start = Instant::now();
        let registry = scopeguard::guard(MockRegistry::with_config(self.config.clone()), |registry| {
            registry.teardown();
        });
        debug!(scenario = scenario.id(), registry = registry.id(), "Running scenario");

        if let Err(e) = scenario.setup(&registry) {
            warn!(scenario = scenario.id(), error = %e, "Scenario setup failed");
            return errored(scenario, e.to_string(), start.elapsed());
        }

        let outcome = AssertUnwindSafe(scenario.run(&registry)).catch_unwind().await;
        match outcome {
            Ok(Ok(result)) => {
                debug!(scenario = scenario.id(), passed = result.passed, "Scenario finished");
                result
            }
            Ok(Err(e)) => {
                warn!(scenario = scenario.id(), error = %e, "Scenario failed to execute");
                errored(scenario, e.to_string(), start.elapsed())
            }
            Err(panic) => {
                let message = panic
                    .downcast_ref::<&str>()
                    .map(ToString::to_string)
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "scenario panicked".to_string());
                warn!(scenario = scenario.id(), message = %message, "Scenario panicked");
                errored(scenario, format!("panicked: {message}"), start.elapsed())
            }
        }
    }
}

fn errored(scenario: &dyn TestScenario, error: String, duration: Duration) -> TestResult {
    TestResult {
        scenario_id: scenario.id().to_string(),
        scenario_description: scenario.description().to_string(),
        tier: scenario.tier().to_string(),
        passed: false,
        assertions: Vec::new(),
        duration,
        error: Some(error),
    }
}
