//! Inline value wrapper scenarios.
//!
//! A value wrapper can be mocked, but it exposes no members to stub or verify.
//! As an argument it matches structurally.

use super::{arrange_error, finish, Assertions, ScenarioError, TestScenario, TIER_VALUE_WRAPPER};
use crate::models::TestResult;
use async_trait::async_trait;
use mimic_core::testing::{Sut, SutMock, ValueClass};
use mimic_core::{Expectation, Matcher, MockError, MockMode, MockRegistry};
use std::time::Instant;

fn unsupported(e: &MockError) -> bool {
    matches!(e, MockError::UnsupportedTarget { .. })
}

/// Test scenario showing a mock of a value wrapper can be created.
///
/// The mock must be tracked by the registry like any other target, and its
/// capability set has no members.
///
/// # Example
///
/// ```
/// use mimic_e2e::scenarios::{TestScenario, ValueClassMockScenario};
///
/// let scenario = ValueClassMockScenario::new();
/// assert_eq!(scenario.tier(), "value wrapper");
/// ```
pub struct ValueClassMockScenario {
    id: String,
    description: String,
    tier: String,
}

impl ValueClassMockScenario {
    /// Creates a new value wrapper mock scenario.
    pub fn new() -> Self {
        Self {
            id: "value-class-mock".to_string(),
            description: "A mock of ValueClass can be created".to_string(),
            tier: TIER_VALUE_WRAPPER.to_string(),
        }
    }
}

impl Default for ValueClassMockScenario {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TestScenario for ValueClassMockScenario {
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
        let mock = registry.mock_of::<ValueClass>();
        let tracked = registry.handle(mock.id()).map(|h| h.id());

        let assertions = vec![
            Assertions::equals("mock is tracked by the registry", &mock.id(), &tracked),
            Assertions::holds(
                "capability set has no members",
                "0 members",
                format!("{} members", mock.capabilities().len()),
                mock.capabilities().is_empty(),
            ),
        ];
        Ok(finish(self, assertions, start))
    }
}

/// Test scenario for the wrapped property of a value wrapper.
///
/// This scenario:
/// - Tries to stub `ValueClass.value` on a mock of the wrapper
/// - Tries to verify and to read the same property
/// - Expects every attempt to fail with an unsupported-target error
pub struct ValueClassPropertyScenario {
    id: String,
    description: String,
    tier: String,
}

impl ValueClassPropertyScenario {
    /// Creates a new value wrapper property scenario.
    pub fn new() -> Self {
        Self {
            id: "value-class-property".to_string(),
            description: "Stubbing ValueClass.value fails with an unsupported-target error".to_string(),
            tier: TIER_VALUE_WRAPPER.to_string(),
        }
    }
}

impl Default for ValueClassPropertyScenario {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TestScenario for ValueClassPropertyScenario {
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
        let mock = registry.mock_of::<ValueClass>();

        let stubbed = mock.stub("value", vec![]).returns("hello world");
        let verified = mock.verify(&Expectation::new("value", vec![]));
        let invoked = mock.invoke("value", vec![]);

        let assertions = vec![
            Assertions::fails_with("stubbing value is rejected", "unsupported target", &stubbed, unsupported),
            Assertions::fails_with("verifying value is rejected", "unsupported target", &verified, unsupported),
            Assertions::fails_with("reading value is rejected", "unsupported target", &invoked, unsupported),
        ];
        Ok(finish(self, assertions, start))
    }
}

/// Value wrappers passed as arguments match by content.
pub struct ValueClassArgsScenario {
    id: String,
    description: String,
    tier: String,
}

impl ValueClassArgsScenario {
    /// Creates a new value wrapper argument scenario.
    pub fn new() -> Self {
        Self {
            id: "value-class-args".to_string(),
            description: "valueClass(ValueClass(\"hello world\")) returns \"hello world\"".to_string(),
            tier: TIER_VALUE_WRAPPER.to_string(),
        }
    }
}

impl Default for ValueClassArgsScenario {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TestScenario for ValueClassArgsScenario {
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
        let mock = registry.mock_of_with::<SutMock>(MockMode::Strict);
        let value_class = ValueClass::new("hello world");
        mock.stub("valueClass", vec![Matcher::eq(value_class.to_value())])
            .returns("hello world")
            .map_err(arrange_error("stub valueClass"))?;

        let sut = SutMock(mock);
        // A separately constructed wrapper with the same content.
        let got = sut.value_class(&ValueClass::new("hello world"));
        let other = sut.value_class(&ValueClass::new("see you"));

        let assertions = vec![
            Assertions::equals("equal wrapper matches the stub", &"hello world".to_string(), &got),
            Assertions::fails_with("different wrapper is unstubbed", "unstubbed call", &other, |e| {
                matches!(e, MockError::UnstubbedCall { .. })
            }),
        ];
        Ok(finish(self, assertions, start))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_class_property_scenario_new() {
        let scenario = ValueClassPropertyScenario::new();
        assert_eq!(scenario.id(), "value-class-property");
        assert_eq!(scenario.tier(), TIER_VALUE_WRAPPER);
        assert!(scenario.description().contains("unsupported-target"));
    }

    #[tokio::test]
    async fn test_value_wrapper_scenarios_pass() {
        let scenarios: Vec<Box<dyn TestScenario>> = vec![
            Box::new(ValueClassMockScenario::new()),
            Box::new(ValueClassPropertyScenario::new()),
            Box::new(ValueClassArgsScenario::new()),
        ];
        for scenario in scenarios {
            let registry = MockRegistry::new();
            let result = scenario.run(&registry).await.unwrap();
            assert!(result.passed, "{}: {:?}", scenario.id(), result.assertions);
        }
    }
}
