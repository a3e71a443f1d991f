//! Demonstration scenarios for the mock core.
//!
//! Each scenario runs against a fresh [`MockRegistry`] and reports a
//! [`TestResult`] built from individual assertions. Scenarios are grouped
//! into tiers:
//!
//! - stubbing: return values, suspending members, properties and chains
//! - verification: call counts and argument capture
//! - value wrapper: inline wrappers as mocks and as arguments
//! - interception: constructors, singletons and free functions

use crate::models::{Assertion, TestResult};
use async_trait::async_trait;
use mimic_core::{MockError, MockRegistry};
use std::fmt::Debug;
use std::time::Instant;

/// Error preventing a scenario from producing a result.
#[derive(Debug, thiserror::Error)]
pub enum ScenarioError {
    #[error("setup failed: {0}")]
    SetupError(String),

    #[error("execution failed: {0}")]
    ExecutionError(String),
}

/// A runnable scenario.
#[async_trait]
pub trait TestScenario: Send + Sync {
    /// Stable identifier used for filtering.
    fn id(&self) -> &str;

    fn description(&self) -> &str;

    fn tier(&self) -> &str;

    /// Declares the capability sets the scenario relies on.
    fn setup(&self, registry: &MockRegistry) -> Result<(), ScenarioError> {
        let _ = registry;
        Ok(())
    }

    async fn run(&self, registry: &MockRegistry) -> Result<TestResult, ScenarioError>;
}

mod intercepts;
mod stubbing;
mod value_wrapper;
mod verification;

pub use intercepts::{ConstructorScenario, ObjectScenario, TopLevelFunctionScenario};
pub use stubbing::{BasicScenario, CoroutineScenario, NestScenario, PropertyScenario};
pub use value_wrapper::{ValueClassArgsScenario, ValueClassMockScenario, ValueClassPropertyScenario};
pub use verification::{CaptureArgsScenario, VerifyCallCountScenario};

pub const TIER_STUBBING: &str = "stubbing";
pub const TIER_VERIFICATION: &str = "verification";
pub const TIER_VALUE_WRAPPER: &str = "value wrapper";
pub const TIER_INTERCEPTION: &str = "interception";

/// Every scenario in run order.
pub fn all_scenarios() -> Vec<Box<dyn TestScenario>> {
    vec![
        Box::new(BasicScenario::new()),
        Box::new(CoroutineScenario::new()),
        Box::new(PropertyScenario::new()),
        Box::new(NestScenario::new()),
        Box::new(VerifyCallCountScenario::new()),
        Box::new(CaptureArgsScenario::new()),
        Box::new(ValueClassMockScenario::new()),
        Box::new(ValueClassPropertyScenario::new()),
        Box::new(ValueClassArgsScenario::new()),
        Box::new(ConstructorScenario::new()),
        Box::new(ObjectScenario::new()),
        Box::new(TopLevelFunctionScenario::new()),
    ]
}

/// Builds the result of a scenario from its assertions.
pub(crate) fn finish(scenario: &dyn TestScenario, assertions: Vec<Assertion>, start: Instant) -> TestResult {
    TestResult {
        scenario_id: scenario.id().to_string(),
        scenario_description: scenario.description().to_string(),
        tier: scenario.tier().to_string(),
        passed: assertions.iter().all(|a| a.passed),
        assertions,
        duration: start.elapsed(),
        error: None,
    }
}

/// Maps a mock error raised while arranging a scenario.
pub(crate) fn arrange_error(step: &str) -> impl FnOnce(MockError) -> ScenarioError + '_ {
    move |e| ScenarioError::ExecutionError(format!("{step}: {e}"))
}

/// Builder for a single assertion.
pub struct AssertionBuilder {
    name: String,
    expected: String,
    actual: String,
}

impl AssertionBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            expected: String::new(),
            actual: String::new(),
        }
    }

    pub fn expected(mut self, expected: impl Into<String>) -> Self {
        self.expected = expected.into();
        self
    }

    pub fn actual(mut self, actual: impl Into<String>) -> Self {
        self.actual = actual.into();
        self
    }

    /// Builds a failing assertion; callers set the outcome with `with_passed`.
    pub fn build(self) -> Assertion {
        Assertion {
            name: self.name,
            passed: false,
            expected: self.expected,
            actual: self.actual,
        }
    }
}

/// Assertions shared by the scenarios.
pub struct Assertions;

impl Assertions {
    /// The operation completed without error.
    pub fn succeeded<T: Debug>(name: &str, result: &Result<T, MockError>) -> Assertion {
        AssertionBuilder::new(name)
            .expected("no error")
            .actual(describe(result))
            .build()
            .with_passed(result.is_ok())
    }

    /// The operation produced `expected`.
    pub fn equals<T: Debug + PartialEq>(name: &str, expected: &T, actual: &Result<T, MockError>) -> Assertion {
        let passed = actual.as_ref().is_ok_and(|v| v == expected);
        AssertionBuilder::new(name)
            .expected(format!("{expected:?}"))
            .actual(describe(actual))
            .build()
            .with_passed(passed)
    }

    /// The operation failed with the error `kind` recognizes.
    pub fn fails_with<T: Debug>(
        name: &str,
        kind: &str,
        result: &Result<T, MockError>,
        recognize: impl Fn(&MockError) -> bool,
    ) -> Assertion {
        let passed = result.as_ref().err().is_some_and(recognize);
        AssertionBuilder::new(name)
            .expected(format!("{kind} error"))
            .actual(describe(result))
            .build()
            .with_passed(passed)
    }

    pub fn holds(name: &str, expected: &str, actual: impl Into<String>, passed: bool) -> Assertion {
        AssertionBuilder::new(name)
            .expected(expected)
            .actual(actual)
            .build()
            .with_passed(passed)
    }
}

fn describe<T: Debug>(result: &Result<T, MockError>) -> String {
    match result {
        Ok(v) => format!("Ok({v:?})"),
        Err(e) => format!("Err({e})"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_all_scenarios_have_unique_ids() {
        let scenarios = all_scenarios();
        assert_eq!(scenarios.len(), 12);
        let ids: HashSet<&str> = scenarios.iter().map(|s| s.id()).collect();
        assert_eq!(ids.len(), scenarios.len());
    }

    #[test]
    fn test_every_scenario_has_description_and_tier() {
        let tiers = [TIER_STUBBING, TIER_VERIFICATION, TIER_VALUE_WRAPPER, TIER_INTERCEPTION];
        for scenario in all_scenarios() {
            assert!(!scenario.description().is_empty(), "{}", scenario.id());
            assert!(tiers.contains(&scenario.tier()), "{}", scenario.id());
        }
    }

    #[test]
    fn test_assertion_builder() {
        let a = AssertionBuilder::new("check")
            .expected("x")
            .actual("y")
            .build();
        assert!(!a.passed);
        assert_eq!(a.expected, "x");
        assert!(a.with_passed(true).passed);
    }

    #[test]
    fn test_assertions_equals() {
        let ok: Result<i32, MockError> = Ok(3);
        assert!(Assertions::equals("eq", &3, &ok).passed);
        assert!(!Assertions::equals("eq", &4, &ok).passed);

        let err: Result<i32, MockError> = Err(MockError::CaptureEmpty { slot: "s".into() });
        let a = Assertions::equals("eq", &3, &err);
        assert!(!a.passed);
        assert!(a.actual.contains("capture slot 's' is empty"));
    }

    #[test]
    fn test_assertions_fails_with() {
        let err: Result<(), MockError> = Err(MockError::CaptureEmpty { slot: "s".into() });
        assert!(Assertions::fails_with("f", "capture", &err, |e| matches!(e, MockError::CaptureEmpty { .. })).passed);
        assert!(!Assertions::fails_with("f", "capture", &Ok(()), |_| true).passed);
    }
}
