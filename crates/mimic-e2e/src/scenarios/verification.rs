//! Verification scenarios: call counts and argument capture.

use super::{arrange_error, finish, Assertions, ScenarioError, TestScenario, TIER_VERIFICATION};
use crate::models::TestResult;
use async_trait::async_trait;
use mimic_core::testing::{Sut, SutMock, WrapObject};
use mimic_core::{CaptureSlot, Expectation, Matcher, MockError, MockRegistry};
use std::time::Instant;

fn value_is(expected: &str) -> Matcher {
    Matcher::field("value", Matcher::eq(expected))
}

/// Test scenario that verifies exact call counts.
///
/// This scenario:
/// - Stubs `args(any())` and calls it once with `WrapObject("hello world")`
/// - Verifies that call happened exactly once
/// - Verifies that `hello()` and `helloAsync()` were never called
/// - Checks that demanding two calls of `args` fails verification
///
/// # Example
///
/// ```
/// use mimic_e2e::scenarios::{TestScenario, VerifyCallCountScenario};
///
/// let scenario = VerifyCallCountScenario::new();
/// assert_eq!(scenario.id(), "verify-call-count");
/// ```
pub struct VerifyCallCountScenario {
    id: String,
    description: String,
    tier: String,
}

impl VerifyCallCountScenario {
    /// Creates a new call count scenario.
    pub fn new() -> Self {
        Self {
            id: "verify-call-count".to_string(),
            description: "args(WrapObject(\"hello world\")) called once, hello() and helloAsync() never".to_string(),
            tier: TIER_VERIFICATION.to_string(),
        }
    }
}

impl Default for VerifyCallCountScenario {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TestScenario for VerifyCallCountScenario {
    fn id(&self) -> &str {
        &self.id
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn tier(&self) -> &str {
        &self.tier
    }

    async fn run(&self, registry: &MockRegistry) -> Result<TestResult, ScenarioError> {
        let start = Instant::now();
        let mock = registry.mock_of::<SutMock>();
        mock.stub("args", vec![Matcher::any()])
            .just_run()
            .map_err(arrange_error("stub args"))?;

        let sut = SutMock(mock.clone());
        let call = sut.args(&WrapObject::new("hello world"));

        let hello_world = WrapObject::new("hello world").to_value();
        let over_count = mock.verify(&Expectation::new("args", vec![Matcher::any()]).exactly(2));

        let assertions = vec![
            Assertions::succeeded("args() accepted the call", &call),
            Assertions::succeeded(
                "args(WrapObject(\"hello world\")) called once",
                &mock.verify(&Expectation::new("args", vec![Matcher::eq(hello_world)])),
            ),
            Assertions::succeeded(
                "hello() and helloAsync() never called",
                &mock.verify_all(&[
                    Expectation::new("hello", vec![]).never(),
                    Expectation::new("helloAsync", vec![]).never(),
                ]),
            ),
            Assertions::fails_with("args() called twice is rejected", "verification", &over_count, |e| {
                e.is_verification_failure()
            }),
        ];
        Ok(finish(self, assertions, start))
    }
}

/// Test scenario for argument capture across calls.
///
/// This scenario:
/// - Stubs `args` with a capture matcher bound to one slot
/// - Calls `args` twice with different wrapped values
/// - Checks the slot holds the last argument and its `value` field
pub struct CaptureArgsScenario {
    id: String,
    description: String,
    tier: String,
}

impl CaptureArgsScenario {
    /// Creates a new argument capture scenario.
    pub fn new() -> Self {
        Self {
            id: "capture-args".to_string(),
            description: "Capture slot keeps the last of two args() calls".to_string(),
            tier: TIER_VERIFICATION.to_string(),
        }
    }
}

impl Default for CaptureArgsScenario {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TestScenario for CaptureArgsScenario {
    fn id(&self) -> &str {
        &self.id
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn tier(&self) -> &str {
        &self.tier
    }

    async fn run(&self, registry: &MockRegistry) -> Result<TestResult, ScenarioError> {
        let start = Instant::now();
        let mock = registry.mock_of::<SutMock>();
        let slot = CaptureSlot::new("argSlot");
        mock.stub("args", vec![Matcher::capture(&slot)])
            .just_run()
            .map_err(arrange_error("stub args"))?;

        let sut = SutMock(mock.clone());
        let calls = sut
            .args(&WrapObject::new("hello world"))
            .and_then(|()| sut.args(&WrapObject::new("good bye")));

        let captured = slot.captured().and_then(|v| {
            WrapObject::from_value(&v)
                .map(|w| w.value)
                .ok_or(MockError::CaptureEmpty {
                    slot: slot.name().to_string(),
                })
        });

        let assertions = vec![
            Assertions::succeeded("both calls accepted", &calls),
            Assertions::equals("slot holds the last argument", &"good bye".to_string(), &captured),
            Assertions::equals("slot saw both calls", &2, &Ok(slot.count())),
            Assertions::succeeded(
                "args(value = \"hello world\") called once",
                &mock.verify(&Expectation::new("args", vec![value_is("hello world")])),
            ),
            Assertions::succeeded(
                "args(value = \"good bye\") called once",
                &mock.verify(&Expectation::new("args", vec![value_is("good bye")])),
            ),
            Assertions::succeeded(
                "args(value = \"see you\") never called",
                &mock.verify(&Expectation::new("args", vec![value_is("see you")]).never()),
            ),
        ];
        Ok(finish(self, assertions, start))
    }
}
