//! Interception scenarios: constructors, singletons and free functions.
//!
//! These install process-wide intercepts, so each one holds
//! [`intercept::serial`] while it runs and releases its guard before
//! returning.

use super::{arrange_error, finish, Assertions, ScenarioError, TestScenario, TIER_INTERCEPTION};
use crate::models::{Assertion, TestResult};
use async_trait::async_trait;
use mimic_core::intercept::{self, InterceptKey};
use mimic_core::testing::{
    hello_world, new_sut, object_capabilities, top_level_capabilities, top_level_function, Sut, SutMock,
    WrapObject, OBJECT, SUT, TOP_LEVEL,
};
use mimic_core::{Expectation, Matcher, MockError, MockMode, MockRegistry, Mockable};
use std::sync::Arc;
use std::time::Instant;

fn call_args(value: &str) -> Result<(), MockError> {
    let sut: Arc<dyn Sut> = new_sut();
    sut.args(&WrapObject::new(value))
}

fn not_implemented<T>(result: &Result<T, MockError>) -> bool {
    matches!(result, Err(MockError::Raised { error, .. }) if error.kind == "NotImplementedError")
}

/// Test scenario that redirects construction of `Sut` to one shared mock.
///
/// This scenario:
/// - Intercepts the `Sut` constructor and stubs `args` on the mock it hands out
/// - Constructs two instances and checks both calls land in one call log
/// - Releases the guard and checks construction builds a real `Sut` again
///
/// # Example
///
/// ```
/// use mimic_e2e::scenarios::{ConstructorScenario, TestScenario};
///
/// let scenario = ConstructorScenario::new();
/// assert_eq!(scenario.tier(), "interception");
/// ```
pub struct ConstructorScenario {
    id: String,
    description: String,
    tier: String,
}

impl ConstructorScenario {
    /// Creates a new constructor interception scenario.
    pub fn new() -> Self {
        Self {
            id: "constructor".to_string(),
            description: "Intercepted Sut construction hands out one shared mock".to_string(),
            tier: TIER_INTERCEPTION.to_string(),
        }
    }

    fn exercise(&self, registry: &MockRegistry) -> Result<Vec<Assertion>, ScenarioError> {
        let _serial = intercept::serial();
        let guard = registry
            .intercept_constructor(SutMock::capabilities(), MockMode::Strict)
            .map_err(arrange_error("intercept Sut constructor"))?;
        guard
            .mock()
            .stub("args", vec![Matcher::any()])
            .just_run()
            .map_err(arrange_error("stub args"))?;

        let first = call_args("hello world");
        let second = call_args("good bye");
        let shared = guard
            .mock()
            .verify(&Expectation::new("args", vec![Matcher::any()]).exactly(2));

        guard.release();
        let real_again = call_args("hello world");

        Ok(vec![
            Assertions::succeeded("first instance is the mock", &first),
            Assertions::succeeded("second instance is the mock", &second),
            Assertions::succeeded("both instances share one call log", &shared),
            Assertions::holds(
                "released intercept restores real construction",
                "NotImplementedError",
                format!("{real_again:?}"),
                not_implemented(&real_again) && !intercept::is_intercepted(&InterceptKey::Constructor(SUT.into())),
            ),
        ])
    }
}

impl Default for ConstructorScenario {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TestScenario for ConstructorScenario {
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
        registry.declare_type::<WrapObject>();
        Ok(())
    }

    async fn run(&self, registry: &MockRegistry) -> Result<TestResult, ScenarioError> {
        let start = Instant::now();
        let assertions = self.exercise(registry)?;
        Ok(finish(self, assertions, start))
    }
}

/// Test scenario that intercepts a singleton in spy mode.
///
/// Only `helloWorld()` is stubbed. While the intercept is installed the call
/// answers `"good bye"`, and once the guard is dropped the real singleton
/// answers again.
pub struct ObjectScenario {
    id: String,
    description: String,
    tier: String,
}

impl ObjectScenario {
    /// Creates a new singleton interception scenario.
    pub fn new() -> Self {
        Self {
            id: "object".to_string(),
            description: "Object.helloWorld() returns \"good bye\" while intercepted".to_string(),
            tier: TIER_INTERCEPTION.to_string(),
        }
    }

    fn exercise(&self, registry: &MockRegistry) -> Result<Vec<Assertion>, ScenarioError> {
        let _serial = intercept::serial();
        let guard = registry
            .intercept_object(OBJECT, object_capabilities(), MockMode::Spy)
            .map_err(arrange_error("intercept Object"))?;

        let delegated = hello_world();
        guard
            .mock()
            .stub("helloWorld", vec![])
            .returns("good bye")
            .map_err(arrange_error("stub helloWorld"))?;
        let stubbed = hello_world();
        let recorded = guard
            .mock()
            .verify(&Expectation::new("helloWorld", vec![]).exactly(2));

        drop(guard);
        let restored = hello_world();

        Ok(vec![
            Assertions::equals("unstubbed call reaches the real object", &"hello world".to_string(), &delegated),
            Assertions::equals("stubbed call answers the stub", &"good bye".to_string(), &stubbed),
            Assertions::succeeded("both calls recorded", &recorded),
            Assertions::equals("teardown restores the real object", &"hello world".to_string(), &restored),
        ])
    }
}

impl Default for ObjectScenario {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TestScenario for ObjectScenario {
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
        let assertions = self.exercise(registry)?;
        Ok(finish(self, assertions, start))
    }
}

/// Intercepts a free function and runs it without error.
pub struct TopLevelFunctionScenario {
    id: String,
    description: String,
    tier: String,
}

impl TopLevelFunctionScenario {
    /// Creates a new free function interception scenario.
    pub fn new() -> Self {
        Self {
            id: "top-level-function".to_string(),
            description: "Intercepted topLevelFunction() runs without error".to_string(),
            tier: TIER_INTERCEPTION.to_string(),
        }
    }

    fn exercise(&self, registry: &MockRegistry) -> Result<Vec<Assertion>, ScenarioError> {
        let _serial = intercept::serial();
        let before = top_level_function();

        let guard = registry
            .intercept_static(TOP_LEVEL, top_level_capabilities(), MockMode::Strict)
            .map_err(arrange_error("intercept topLevelFunction"))?;
        guard
            .mock()
            .stub("topLevelFunction", vec![])
            .just_run()
            .map_err(arrange_error("stub topLevelFunction"))?;

        let intercepted = top_level_function();
        let recorded = guard
            .mock()
            .verify(&Expectation::new("topLevelFunction", vec![]));
        drop(guard);

        // Teardown with nothing installed is a no-op.
        let leftover = registry.teardown_intercepts();

        Ok(vec![
            Assertions::holds(
                "real function is unimplemented",
                "NotImplementedError",
                format!("{before:?}"),
                not_implemented(&before),
            ),
            Assertions::succeeded("intercepted call runs", &intercepted),
            Assertions::succeeded("call recorded once", &recorded),
            Assertions::holds(
                "no intercepts left behind",
                "0",
                leftover.to_string(),
                leftover == 0,
            ),
        ])
    }
}

impl Default for TopLevelFunctionScenario {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TestScenario for TopLevelFunctionScenario {
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
        let assertions = self.exercise(registry)?;
        Ok(finish(self, assertions, start))
    }
}
