//! Argument matcher engine.
//!
//! Matchers are evaluated positionally against an argument list. Captures
//! are staged during evaluation and written to their slots only when every
//! position matched, so a failed match never disturbs a slot.

use crate::capture::CaptureSlot;
use crate::error::{MockError, Result};
use mimic_proto::Value;
use regex::Regex;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::trace;

/// Fallible predicate over one argument. `Err` means the predicate itself
/// could not be evaluated, which is distinct from "does not match".
pub type PredicateFn = dyn Fn(&Value) -> std::result::Result<bool, String> + Send + Sync;

/// A predicate over one argument position.
#[derive(Clone)]
pub enum Matcher {
    /// Structural equality.
    Equals(Value),
    /// Matches anything.
    Any,
    /// A user predicate with a description used in diagnostics.
    Predicate {
        description: String,
        predicate: Arc<PredicateFn>,
    },
    /// Always matches and records the argument.
    Capture(CaptureSlot),
    Not(Box<Matcher>),
    /// Matches string values against a pattern.
    Regex(Regex),
    /// Applies a matcher to one field of a record argument.
    Field { name: String, matcher: Box<Matcher> },
}

impl Matcher {
    pub fn eq(value: impl Into<Value>) -> Self {
        Matcher::Equals(value.into())
    }

    pub fn any() -> Self {
        Matcher::Any
    }

    /// Fallible predicate matcher.
    pub fn predicate<F>(description: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&Value) -> std::result::Result<bool, String> + Send + Sync + 'static,
    {
        Matcher::Predicate {
            description: description.into(),
            predicate: Arc::new(predicate),
        }
    }

    /// Infallible predicate matcher.
    pub fn check<F>(description: impl Into<String>, check: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        Self::predicate(description, move |v| Ok(check(v)))
    }

    pub fn capture(slot: &CaptureSlot) -> Self {
        Matcher::Capture(slot.clone())
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(matcher: Matcher) -> Self {
        Matcher::Not(Box::new(matcher))
    }

    pub fn regex(pattern: Regex) -> Self {
        Matcher::Regex(pattern)
    }

    pub fn field(name: impl Into<String>, matcher: Matcher) -> Self {
        Matcher::Field {
            name: name.into(),
            matcher: Box::new(matcher),
        }
    }

    fn evaluate(
        &self,
        value: &Value,
        staged: &mut Vec<(CaptureSlot, Value)>,
        catch_panics: bool,
    ) -> std::result::Result<bool, String> {
        match self {
            Matcher::Equals(expected) => Ok(expected == value),
            Matcher::Any => Ok(true),
            Matcher::Predicate { predicate, .. } => {
                if catch_panics {
                    match panic::catch_unwind(AssertUnwindSafe(|| predicate(value))) {
                        Ok(outcome) => outcome,
                        Err(payload) => Err(panic_message(payload.as_ref())),
                    }
                } else {
                    predicate(value)
                }
            }
            Matcher::Capture(slot) => {
                staged.push((slot.clone(), value.clone()));
                Ok(true)
            }
            Matcher::Not(inner) => {
                // Captures under a negation never reach their slot.
                let mut discarded = Vec::new();
                inner
                    .evaluate(value, &mut discarded, catch_panics)
                    .map(|matched| !matched)
            }
            Matcher::Regex(pattern) => Ok(value.as_str().is_some_and(|s| pattern.is_match(s))),
            Matcher::Field { name, matcher } => match value.field(name) {
                Some(field) => matcher.evaluate(field, staged, catch_panics),
                None => Ok(false),
            },
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("predicate panicked: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("predicate panicked: {s}")
    } else {
        "predicate panicked".to_string()
    }
}

impl fmt::Display for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Matcher::Equals(v) => write!(f, "{v}"),
            Matcher::Any => write!(f, "any()"),
            Matcher::Predicate { description, .. } => write!(f, "check({description})"),
            Matcher::Capture(slot) => write!(f, "capture({})", slot.name()),
            Matcher::Not(inner) => write!(f, "not({inner})"),
            Matcher::Regex(pattern) => write!(f, "regex(/{}/)", pattern.as_str()),
            Matcher::Field { name, matcher } => write!(f, "field({name}: {matcher})"),
        }
    }
}

impl fmt::Debug for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Matcher({self})")
    }
}

impl From<Value> for Matcher {
    fn from(value: Value) -> Self {
        Matcher::Equals(value)
    }
}

/// Evaluates matcher lists against argument lists.
#[derive(Debug, Clone, Copy)]
pub struct MatcherEngine {
    catch_panics: bool,
}

impl Default for MatcherEngine {
    fn default() -> Self {
        Self { catch_panics: true }
    }
}

impl MatcherEngine {
    pub fn new(catch_panics: bool) -> Self {
        Self { catch_panics }
    }

    /// Returns whether every matcher accepts its argument.
    ///
    /// Capture slots are written only when the whole list matches. A length
    /// difference between `matchers` and `args` is a configuration error.
    pub fn matches(&self, method: &str, matchers: &[Matcher], args: &[Value]) -> Result<bool> {
        if matchers.len() != args.len() {
            return Err(MockError::ArityMismatch {
                method: method.to_string(),
                expected: matchers.len(),
                actual: args.len(),
            });
        }

        let mut staged = Vec::new();
        for (position, (matcher, arg)) in matchers.iter().zip(args).enumerate() {
            match matcher.evaluate(arg, &mut staged, self.catch_panics) {
                Ok(true) => {}
                Ok(false) => {
                    trace!(method, position, matcher = %matcher, arg = %arg, "Matcher rejected argument");
                    return Ok(false);
                }
                Err(message) => {
                    return Err(MockError::MatcherEvaluation {
                        method: method.to_string(),
                        position,
                        message,
                    });
                }
            }
        }

        for (slot, value) in staged {
            slot.store(value);
        }
        Ok(true)
    }
}

/// Renders a matcher list as `method(m1, m2)`.
pub fn describe_call(method: &str, matchers: &[Matcher]) -> String {
    let rendered: Vec<String> = matchers.iter().map(ToString::to_string).collect();
    format!("{method}({})", rendered.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wrap(s: &str) -> Value {
        Value::record("WrapObject", [("value", Value::from(s))])
    }

    #[test]
    fn test_equality_is_structural() {
        let engine = MatcherEngine::default();
        assert!(engine
            .matches("args", &[Matcher::eq(wrap("hello world"))], &[wrap("hello world")])
            .unwrap());
        assert!(!engine
            .matches("args", &[Matcher::eq(wrap("hello world"))], &[wrap("good bye")])
            .unwrap());
    }

    #[test]
    fn test_any_matches_everything() {
        let engine = MatcherEngine::default();
        assert!(engine.matches("m", &[Matcher::any()], &[Value::Null]).unwrap());
    }

    #[test]
    fn test_arity_mismatch_is_error() {
        let engine = MatcherEngine::default();
        let err = engine.matches("args", &[Matcher::any()], &[]).unwrap_err();
        assert!(matches!(
            err,
            MockError::ArityMismatch { expected: 1, actual: 0, .. }
        ));
    }

    #[test]
    fn test_capture_written_only_on_full_match() {
        let engine = MatcherEngine::default();
        let slot = CaptureSlot::new("first");
        let matchers = [Matcher::capture(&slot), Matcher::eq(2)];

        assert!(!engine
            .matches("m", &matchers, &[Value::from(1), Value::from(3)])
            .unwrap());
        assert!(!slot.is_captured());

        assert!(engine
            .matches("m", &matchers, &[Value::from(1), Value::from(2)])
            .unwrap());
        assert_eq!(slot.captured().unwrap(), Value::from(1));
    }

    #[test]
    fn test_predicate_error_is_distinct_from_non_match() {
        let engine = MatcherEngine::default();
        let failing = Matcher::predicate("boom", |_| Err("no field".to_string()));
        let err = engine.matches("m", &[failing], &[Value::Int(1)]).unwrap_err();
        assert!(matches!(err, MockError::MatcherEvaluation { position: 0, .. }));

        let rejecting = Matcher::check("never", |_| false);
        assert!(!engine.matches("m", &[rejecting], &[Value::Int(1)]).unwrap());
    }

    #[test]
    fn test_predicate_panic_is_reported() {
        let engine = MatcherEngine::default();
        let panicking = Matcher::check("panics", |_| panic!("assertion failed"));
        let err = engine.matches("m", &[panicking], &[Value::Int(1)]).unwrap_err();
        match err {
            MockError::MatcherEvaluation { message, .. } => {
                assert!(message.contains("assertion failed"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_not_and_field() {
        let engine = MatcherEngine::default();
        let m = Matcher::field("value", Matcher::not(Matcher::eq("see you")));
        assert!(engine.matches("m", &[m.clone()], &[wrap("good bye")]).unwrap());
        assert!(!engine.matches("m", &[m.clone()], &[wrap("see you")]).unwrap());
        // Non-record arguments have no fields.
        assert!(!engine.matches("m", &[m], &[Value::from("good bye")]).unwrap());
    }

    #[test]
    fn test_not_does_not_capture() {
        let engine = MatcherEngine::default();
        let slot = CaptureSlot::new("s");
        let m = Matcher::not(Matcher::not(Matcher::capture(&slot)));
        assert!(engine.matches("m", &[m], &[Value::Int(1)]).unwrap());
        assert!(!slot.is_captured());
    }

    #[test]
    fn test_field_capture() {
        let engine = MatcherEngine::default();
        let slot = CaptureSlot::new("value");
        let m = Matcher::field("value", Matcher::capture(&slot));
        assert!(engine.matches("args", &[m], &[wrap("good bye")]).unwrap());
        assert_eq!(slot.captured().unwrap(), Value::from("good bye"));
    }

    #[test]
    fn test_regex() {
        let engine = MatcherEngine::default();
        let m = Matcher::regex(Regex::new("^hello").unwrap());
        assert!(engine.matches("m", &[m.clone()], &[Value::from("hello world")]).unwrap());
        assert!(!engine.matches("m", &[m.clone()], &[Value::from("good bye")]).unwrap());
        assert!(!engine.matches("m", &[m], &[Value::Int(1)]).unwrap());
    }

    #[test]
    fn test_describe_call() {
        let slot = CaptureSlot::new("arg");
        let text = describe_call(
            "args",
            &[Matcher::eq("x"), Matcher::any(), Matcher::capture(&slot)],
        );
        assert_eq!(text, r#"args("x", any(), capture(arg))"#);
    }
}
