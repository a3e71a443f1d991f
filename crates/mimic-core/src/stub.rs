//! Stub registry.
//!
//! Stubs are kept in registration order. Resolution walks them newest
//! first, so the most recently registered matching stub wins.

use crate::error::{MockError, Result, StubbedError};
use crate::matcher::{describe_call, Matcher, MatcherEngine};
use mimic_proto::{Capabilities, MethodSig, TargetId, TypeTag, Value};
use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::debug;

/// Computes an answer from the call arguments.
pub type ComputeFn = dyn Fn(&[Value]) -> std::result::Result<Value, StubbedError> + Send + Sync;

/// Configured response of a stub.
#[derive(Clone)]
pub enum Answer {
    /// Return a fixed value.
    Return(Value),
    /// Return each value in turn; the last one repeats once exhausted.
    ReturnsInOrder(Vec<Value>),
    /// Raise an error.
    Throw(StubbedError),
    /// Return a nested mock.
    DeepStub(TargetId),
    /// Do nothing and return unit.
    NoOp,
    /// Compute the value from the arguments.
    Compute(Arc<ComputeFn>),
}

impl Answer {
    pub fn compute<F>(f: F) -> Self
    where
        F: Fn(&[Value]) -> std::result::Result<Value, StubbedError> + Send + Sync + 'static,
    {
        Answer::Compute(Arc::new(f))
    }

    /// Checks the answer against the member it is registered for.
    fn validate(&self, sig: &MethodSig) -> Result<()> {
        let incompatible = |found: String| MockError::IncompatibleAnswer {
            method: sig.name.clone(),
            expected: sig.returns.clone(),
            found,
        };

        match self {
            Answer::Return(value) if !sig.returns.accepts(value) => Err(incompatible(value.to_string())),
            Answer::ReturnsInOrder(values) if values.is_empty() => {
                Err(incompatible("an empty value sequence".to_string()))
            }
            Answer::ReturnsInOrder(values) => match values.iter().find(|v| !sig.returns.accepts(v)) {
                Some(bad) => Err(incompatible(bad.to_string())),
                None => Ok(()),
            },
            Answer::NoOp if sig.returns != TypeTag::Unit => Err(incompatible("no value (just run)".to_string())),
            Answer::DeepStub(_) if sig.returns.mockable_name().is_none() => {
                Err(incompatible("a nested mock".to_string()))
            }
            _ => Ok(()),
        }
    }
}

impl fmt::Debug for Answer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Answer::Return(v) => f.debug_tuple("Return").field(v).finish(),
            Answer::ReturnsInOrder(vs) => f.debug_tuple("ReturnsInOrder").field(vs).finish(),
            Answer::Throw(e) => f.debug_tuple("Throw").field(e).finish(),
            Answer::DeepStub(id) => f.debug_tuple("DeepStub").field(id).finish(),
            Answer::NoOp => f.write_str("NoOp"),
            Answer::Compute(_) => f.write_str("Compute(..)"),
        }
    }
}

/// A registered (method, matchers) -> answer binding.
#[derive(Debug)]
pub struct Stub {
    id: u64,
    method: String,
    matchers: Vec<Matcher>,
    answer: Answer,
    cursor: AtomicUsize,
    hits: AtomicUsize,
}

impl Stub {
    /// Registration order within the owning registry.
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn matchers(&self) -> &[Matcher] {
        &self.matchers
    }

    pub fn answer(&self) -> &Answer {
        &self.answer
    }

    /// Number of calls this stub has answered.
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    /// Runs the answer. `DeepStub` answers come back as `Value::Mock`.
    pub fn respond(&self, args: &[Value]) -> std::result::Result<Value, StubbedError> {
        self.hits.fetch_add(1, Ordering::SeqCst);
        match &self.answer {
            Answer::Return(value) => Ok(value.clone()),
            Answer::ReturnsInOrder(values) => {
                let index = self.cursor.fetch_add(1, Ordering::SeqCst);
                let last = values.len().saturating_sub(1);
                Ok(values.get(index.min(last)).cloned().unwrap_or(Value::Null))
            }
            Answer::Throw(error) => Err(error.clone()),
            Answer::DeepStub(id) => Ok(Value::Mock(*id)),
            Answer::NoOp => Ok(Value::Unit),
            Answer::Compute(f) => f(args),
        }
    }
}

impl fmt::Display for Stub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} => {:?}", describe_call(&self.method, &self.matchers), self.answer)
    }
}

/// Resolves a member name against a capability set.
///
/// Members named after the wrapped field of a value wrapper are rejected as
/// unsupported rather than unknown.
pub(crate) fn lookup<'a>(caps: &'a Capabilities, method: &str) -> Result<&'a MethodSig> {
    if let Some(sig) = caps.get(method) {
        return Ok(sig);
    }
    if caps.wrapped_field() == Some(method) {
        return Err(MockError::UnsupportedTarget {
            type_name: caps.type_name().to_string(),
            member: method.to_string(),
        });
    }
    Err(MockError::UnknownMethod {
        type_name: caps.type_name().to_string(),
        method: method.to_string(),
    })
}

/// All stubs registered on one target.
#[derive(Debug)]
pub struct StubRegistry {
    caps: Arc<Capabilities>,
    stubs: RwLock<Vec<Arc<Stub>>>,
    next_id: AtomicU64,
}

impl StubRegistry {
    pub fn new(caps: Arc<Capabilities>) -> Self {
        Self {
            caps,
            stubs: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(0),
        }
    }

    /// Registers a stub after checking it against the declared member.
    pub fn register(&self, method: &str, matchers: Vec<Matcher>, answer: Answer) -> Result<Arc<Stub>> {
        let sig = lookup(&self.caps, method)?;
        if matchers.len() != sig.arity() {
            return Err(MockError::ArityMismatch {
                method: method.to_string(),
                expected: sig.arity(),
                actual: matchers.len(),
            });
        }
        answer.validate(sig)?;

        let mut stubs = self.stubs.write().unwrap_or_else(PoisonError::into_inner);
        let stub = Arc::new(Stub {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            method: method.to_string(),
            matchers,
            answer,
            cursor: AtomicUsize::new(0),
            hits: AtomicUsize::new(0),
        });
        debug!(type_name = self.caps.type_name(), stub = %stub, "Stub registered");
        stubs.push(Arc::clone(&stub));
        Ok(stub)
    }

    /// Finds the most recently registered stub matching the call.
    pub fn resolve(&self, engine: &MatcherEngine, method: &str, args: &[Value]) -> Result<Option<Arc<Stub>>> {
        let stubs = self.stubs.read().unwrap_or_else(PoisonError::into_inner);
        for stub in stubs.iter().rev().filter(|s| s.method == method) {
            if engine.matches(method, &stub.matchers, args)? {
                return Ok(Some(Arc::clone(stub)));
            }
        }
        Ok(None)
    }

    /// Removes every stub at once.
    pub fn clear(&self) {
        self.stubs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    pub fn len(&self) -> usize {
        self.stubs.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.caps
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::CaptureSlot;

    fn wrap(s: &str) -> Value {
        Value::record("WrapObject", [("value", Value::from(s))])
    }

    fn registry() -> StubRegistry {
        let caps = Capabilities::new("Sut")
            .method("hello", vec![], TypeTag::named("WrapObject"))
            .method("args", vec![TypeTag::named("WrapObject")], TypeTag::Unit)
            .method("count", vec![TypeTag::Int], TypeTag::Int);
        StubRegistry::new(Arc::new(caps))
    }

    #[test]
    fn test_unknown_method_rejected() {
        let stubs = registry();
        let err = stubs.register("goodbye", vec![], Answer::NoOp).unwrap_err();
        assert!(matches!(err, MockError::UnknownMethod { .. }));
    }

    #[test]
    fn test_value_wrapper_member_unsupported() {
        let stubs = StubRegistry::new(Arc::new(Capabilities::value_wrapper("ValueClass", "value")));
        let err = stubs
            .register("value", vec![], Answer::Return(Value::from("hello world")))
            .unwrap_err();
        assert!(matches!(err, MockError::UnsupportedTarget { .. }));
    }

    #[test]
    fn test_value_wrapper_unknown_member_is_unknown_method() {
        let stubs = StubRegistry::new(Arc::new(Capabilities::value_wrapper("ValueClass", "value")));
        let err = stubs.register("noSuchMember", vec![], Answer::NoOp).unwrap_err();
        assert!(matches!(
            err,
            MockError::UnknownMethod { ref type_name, ref method } if type_name == "ValueClass" && method == "noSuchMember"
        ));
    }

    #[test]
    fn test_arity_checked_at_registration() {
        let stubs = registry();
        let err = stubs.register("args", vec![], Answer::NoOp).unwrap_err();
        assert!(matches!(err, MockError::ArityMismatch { expected: 1, actual: 0, .. }));
    }

    #[test]
    fn test_answer_type_checked() {
        let stubs = registry();
        assert!(matches!(
            stubs.register("hello", vec![], Answer::Return(Value::from("plain string"))),
            Err(MockError::IncompatibleAnswer { .. })
        ));
        assert!(matches!(
            stubs.register("hello", vec![], Answer::NoOp),
            Err(MockError::IncompatibleAnswer { .. })
        ));
        assert!(matches!(
            stubs.register("count", vec![Matcher::any()], Answer::ReturnsInOrder(vec![])),
            Err(MockError::IncompatibleAnswer { .. })
        ));
        assert!(matches!(
            stubs.register("count", vec![Matcher::any()], Answer::DeepStub(TargetId::new(9))),
            Err(MockError::IncompatibleAnswer { .. })
        ));
        assert!(stubs.register("args", vec![Matcher::any()], Answer::NoOp).is_ok());
    }

    #[test]
    fn test_last_registration_wins() {
        let stubs = registry();
        let engine = MatcherEngine::default();
        stubs
            .register("count", vec![Matcher::any()], Answer::Return(Value::from(1)))
            .unwrap();
        stubs
            .register("count", vec![Matcher::eq(5)], Answer::Return(Value::from(2)))
            .unwrap();

        let hit = stubs.resolve(&engine, "count", &[Value::from(5)]).unwrap().unwrap();
        assert_eq!(hit.respond(&[]).unwrap(), Value::from(2));

        // Only the older, broader stub matches other arguments.
        let hit = stubs.resolve(&engine, "count", &[Value::from(6)]).unwrap().unwrap();
        assert_eq!(hit.respond(&[]).unwrap(), Value::from(1));
    }

    #[test]
    fn test_resolve_not_found() {
        let stubs = registry();
        let engine = MatcherEngine::default();
        stubs
            .register("args", vec![Matcher::eq(wrap("a"))], Answer::NoOp)
            .unwrap();
        assert!(stubs.resolve(&engine, "args", &[wrap("b")]).unwrap().is_none());
        assert!(stubs.resolve(&engine, "hello", &[]).unwrap().is_none());
    }

    #[test]
    fn test_only_winning_stub_captures() {
        let stubs = registry();
        let engine = MatcherEngine::default();
        let older = CaptureSlot::new("older");
        let newer = CaptureSlot::new("newer");
        stubs
            .register("args", vec![Matcher::capture(&older)], Answer::NoOp)
            .unwrap();
        stubs
            .register("args", vec![Matcher::capture(&newer)], Answer::NoOp)
            .unwrap();

        stubs.resolve(&engine, "args", &[wrap("x")]).unwrap();
        assert!(newer.is_captured());
        assert!(!older.is_captured());
    }

    #[test]
    fn test_returns_in_order_repeats_last() {
        let stubs = registry();
        let engine = MatcherEngine::default();
        stubs
            .register(
                "count",
                vec![Matcher::any()],
                Answer::ReturnsInOrder(vec![Value::from(1), Value::from(2)]),
            )
            .unwrap();
        let stub = stubs.resolve(&engine, "count", &[Value::from(0)]).unwrap().unwrap();
        let got: Vec<Value> = (0..4).map(|_| stub.respond(&[]).unwrap()).collect();
        assert_eq!(got, vec![Value::from(1), Value::from(2), Value::from(2), Value::from(2)]);
        assert_eq!(stub.hits(), 4);
    }

    #[test]
    fn test_compute_and_throw() {
        let stubs = registry();
        let engine = MatcherEngine::default();
        stubs
            .register(
                "count",
                vec![Matcher::any()],
                Answer::compute(|args| Ok(Value::from(args[0].as_int().unwrap_or(0) * 2))),
            )
            .unwrap();
        let stub = stubs.resolve(&engine, "count", &[Value::from(21)]).unwrap().unwrap();
        assert_eq!(stub.respond(&[Value::from(21)]).unwrap(), Value::from(42));

        stubs
            .register(
                "count",
                vec![Matcher::eq(0)],
                Answer::Throw(StubbedError::new("ArithmeticException", "zero")),
            )
            .unwrap();
        let stub = stubs.resolve(&engine, "count", &[Value::from(0)]).unwrap().unwrap();
        assert_eq!(stub.respond(&[]).unwrap_err().kind, "ArithmeticException");
    }

    #[test]
    fn test_clear() {
        let stubs = registry();
        stubs.register("args", vec![Matcher::any()], Answer::NoOp).unwrap();
        assert_eq!(stubs.len(), 1);
        stubs.clear();
        assert!(stubs.is_empty());
    }
}
