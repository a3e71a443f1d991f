//! Stubbing scenarios: return values, suspending members, properties and
//! chained (deep) stubs.

use super::{arrange_error, finish, Assertions, ScenarioError, TestScenario, TIER_STUBBING};
use crate::models::TestResult;
use async_trait::async_trait;
use mimic_core::testing::{Sut, SutMock, WrapObject, WrapObjectApi, WrapObjectMock};
use mimic_core::{Expectation, MockMode, MockRegistry};
use std::time::Instant;

fn declare_fixtures(registry: &MockRegistry) -> Result<(), ScenarioError> {
    registry.declare_type::<WrapObject>();
    Ok(())
}

/// Test scenario that stubs a blocking member to return a data object.
///
/// This scenario:
/// - Creates a mock of `Sut` and stubs `hello()` with `WrapObject("hello world")`
/// - Calls `hello()` through the typed facade and reads `value` off the result
/// - Verifies the call was recorded exactly once
///
/// # Example
///
/// ```
/// use mimic_e2e::scenarios::{BasicScenario, TestScenario};
///
/// let scenario = BasicScenario::new();
/// assert_eq!(scenario.tier(), "stubbing");
/// ```
pub struct BasicScenario {
    id: String,
    description: String,
    tier: String,
}

impl BasicScenario {
    /// Creates a new blocking stub scenario.
    pub fn new() -> Self {
        Self {
            id: "basic".to_string(),
            description: "Stubbed hello() returns WrapObject(\"hello world\")".to_string(),
            tier: TIER_STUBBING.to_string(),
        }
    }
}

impl Default for BasicScenario {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TestScenario for BasicScenario {
    fn id(&self) -> &str {
        &self.id
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn tier(&self) -> &str {
        &self.tier
    }

    fn setup(&self, registry: &MockRegistry) -> Result<(), ScenarioError> {
        declare_fixtures(registry)
    }

    async fn run(&self, registry: &MockRegistry) -> Result<TestResult, ScenarioError> {
        let start = Instant::now();
        let mock = registry.mock_of::<SutMock>();
        mock.stub("hello", vec![])
            .returns(WrapObject::new("hello world").to_value())
            .map_err(arrange_error("stub hello"))?;

        let sut = SutMock(mock.clone());
        let got = sut.hello().and_then(|w| w.value());

        let assertions = vec![
            Assertions::equals("hello() answers the stubbed object", &"hello world".to_string(), &got),
            Assertions::succeeded(
                "hello() recorded once",
                &mock.verify(&Expectation::new("hello", vec![])),
            ),
        ];
        Ok(finish(self, assertions, start))
    }
}

/// Test scenario that stubs a suspending member and awaits it.
///
/// This scenario:
/// - Stubs `helloAsync()` with `WrapObject("hello world async")`
/// - Awaits the call and checks the answer
/// - Verifies the call was recorded as suspending and `hello()` was never called
pub struct CoroutineScenario {
    id: String,
    description: String,
    tier: String,
}

impl CoroutineScenario {
    /// Creates a new suspending stub scenario.
    pub fn new() -> Self {
        Self {
            id: "coroutine".to_string(),
            description: "Stubbed suspending helloAsync() returns WrapObject(\"hello world async\")".to_string(),
            tier: TIER_STUBBING.to_string(),
        }
    }
}

impl Default for CoroutineScenario {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TestScenario for CoroutineScenario {
    fn id(&self) -> &str {
        &self.id
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn tier(&self) -> &str {
        &self.tier
    }

    fn setup(&self, registry: &MockRegistry) -> Result<(), ScenarioError> {
        declare_fixtures(registry)
    }

    async fn run(&self, registry: &MockRegistry) -> Result<TestResult, ScenarioError> {
        let start = Instant::now();
        let mock = registry.mock_of::<SutMock>();
        mock.stub("helloAsync", vec![])
            .returns(WrapObject::new("hello world async").to_value())
            .map_err(arrange_error("stub helloAsync"))?;

        let sut = SutMock(mock.clone());
        let got = match sut.hello_async().await {
            Ok(w) => w.value(),
            Err(e) => Err(e),
        };

        let assertions = vec![
            Assertions::equals(
                "helloAsync() answers the stubbed object",
                &"hello world async".to_string(),
                &got,
            ),
            Assertions::succeeded(
                "helloAsync() recorded as suspending",
                &mock.verify(&Expectation::new("helloAsync", vec![]).suspending()),
            ),
            Assertions::succeeded(
                "hello() never called",
                &mock.verify(&Expectation::new("hello", vec![]).never()),
            ),
        ];
        Ok(finish(self, assertions, start))
    }
}

/// Stubs the `value` getter on a mock of `WrapObject`.
pub struct PropertyScenario {
    id: String,
    description: String,
    tier: String,
}

impl PropertyScenario {
    /// Creates a new property getter scenario.
    pub fn new() -> Self {
        Self {
            id: "property".to_string(),
            description: "Stubbed WrapObject.value getter returns \"hello world\"".to_string(),
            tier: TIER_STUBBING.to_string(),
        }
    }
}

impl Default for PropertyScenario {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TestScenario for PropertyScenario {
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
        let mock = registry.mock_of::<WrapObject>();
        mock.stub("value", vec![])
            .returns("hello world")
            .map_err(arrange_error("stub value"))?;

        let wrap = WrapObjectMock(mock);
        let assertions = vec![Assertions::equals(
            "value getter answers the stub",
            &"hello world".to_string(),
            &wrap.value(),
        )];
        Ok(finish(self, assertions, start))
    }
}

/// Test scenario that configures the chain `hello().value` through a nested mock.
///
/// The mock runs in deep-stubs mode, so `hello()` answers a nested mock of
/// `WrapObject` without being stubbed. Repeated calls must hand back the same
/// nested mock. Without `WrapObject` declared on the registry the chain cannot
/// be built and the scenario fails with an execution error.
pub struct NestScenario {
    id: String,
    description: String,
    tier: String,
}

impl NestScenario {
    /// Creates a new deep stub scenario.
    pub fn new() -> Self {
        Self {
            id: "nest".to_string(),
            description: "Deep stub hello().value returns \"hello world\"".to_string(),
            tier: TIER_STUBBING.to_string(),
        }
    }
}

impl Default for NestScenario {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TestScenario for NestScenario {
    fn id(&self) -> &str {
        &self.id
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn tier(&self) -> &str {
        &self.tier
    }

    fn setup(&self, registry: &MockRegistry) -> Result<(), ScenarioError> {
        declare_fixtures(registry)
    }

    async fn run(&self, registry: &MockRegistry) -> Result<TestResult, ScenarioError> {
        let start = Instant::now();
        let mock = registry.mock_of_with::<SutMock>(MockMode::DeepStubs);
        mock.deep("hello")
            .and_then(|nested| nested.stub("value", vec![]).returns("hello world"))
            .map_err(arrange_error("stub hello().value"))?;

        let sut = SutMock(mock.clone());
        let got = sut.hello().and_then(|w| w.value());
        let first = mock.invoke("hello", vec![]);
        let second = mock.invoke("hello", vec![]);
        let memoized = matches!((&first, &second), (Ok(a), Ok(b)) if a == b);

        let assertions = vec![
            Assertions::equals("hello().value answers the chain", &"hello world".to_string(), &got),
            Assertions::holds(
                "nested mock is memoized",
                "same nested mock on every call",
                format!("{first:?} / {second:?}"),
                memoized,
            ),
        ];
        Ok(finish(self, assertions, start))
    }
}
