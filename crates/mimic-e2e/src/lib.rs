//! # mimic-e2e
//!
//! Scenario harness for the Mimic mock core.
//!
//! Every scenario exercises one behavior of the core through the typed
//! fixtures in `mimic_core::testing`:
//!
//! - stubbing: `basic`, `coroutine`, `property`, `nest`
//! - verification: `verify-call-count`, `capture-args`
//! - value wrapper: `value-class-mock`, `value-class-property`, `value-class-args`
//! - interception: `constructor`, `object`, `top-level-function`
//!
//! Scenarios run sequentially, each against a fresh registry that is torn
//! down afterwards, including when the scenario panics.

pub mod models;
pub mod reporter;
pub mod runner;
pub mod scenarios;

pub use models::{Assertion, RunSummary, TestResult};
pub use runner::ScenarioRunner;
pub use scenarios::{all_scenarios, AssertionBuilder, Assertions, ScenarioError, TestScenario};
