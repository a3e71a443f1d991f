//! Result types produced by scenario runs.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;

/// A single checked condition within a scenario.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Assertion {
    pub name: String,
    pub passed: bool,
    pub expected: String,
    pub actual: String,
}

impl Assertion {
    pub fn with_passed(mut self, passed: bool) -> Self {
        self.passed = passed;
        self
    }
}

/// Outcome of one scenario.
#[derive(Debug, Clone, Serialize)]
pub struct TestResult {
    pub scenario_id: String,
    pub scenario_description: String,
    pub tier: String,
    pub passed: bool,
    pub assertions: Vec<Assertion>,
    #[serde(serialize_with = "as_millis")]
    pub duration: Duration,
    /// Set when the scenario could not run to completion.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

fn as_millis<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}

/// Aggregate of a full run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub results: Vec<TestResult>,
    pub passed: usize,
    pub failed: usize,
}

impl RunSummary {
    pub fn new(started_at: DateTime<Utc>, results: Vec<TestResult>) -> Self {
        let passed = results.iter().filter(|r| r.passed).count();
        let failed = results.len() - passed;
        Self {
            started_at,
            results,
            passed,
            failed,
        }
    }

    pub fn total(&self) -> usize {
        self.results.len()
    }

    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }
}
