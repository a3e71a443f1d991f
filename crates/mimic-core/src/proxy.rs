//! Mock proxy: the interception surface handed to code under test.
//!
//! Every call through a proxy is validated against the declared capability
//! set, recorded, and then resolved to an answer: the newest matching stub,
//! a memoized nested mock, or the mode's default policy.

use crate::error::{MockError, Result, StubbedError};
use crate::matcher::Matcher;
use crate::recorder::{CallRecorder, Invocation};
use crate::registry::MockRegistry;
use crate::stub::{lookup, Answer, StubRegistry};
use crate::verify::{self, Expectation, LogOwner, Mismatch, Times, Verified};
use mimic_proto::{CallKind, Capabilities, MethodSig, MockMode, OriginKind, TargetId, TypeTag, Value};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

/// Identity and policy of a mocked entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MockTarget {
    pub id: TargetId,
    pub type_name: String,
    pub origin: OriginKind,
    pub mode: MockMode,
}

/// Per-target state owned by the registry.
pub(crate) struct TargetCell {
    pub(crate) target: MockTarget,
    pub(crate) caps: Arc<Capabilities>,
    pub(crate) stubs: StubRegistry,
    pub(crate) recorder: CallRecorder,
    /// Nested mocks memoized per member name.
    nested: Mutex<HashMap<String, TargetId>>,
    /// Sequence numbers accepted by a successful verification.
    verified: Mutex<HashSet<u64>>,
    /// Calls and verifications hold this shared; reset and clear hold it
    /// exclusively, so a call is either wholly before or wholly after them.
    gate: RwLock<()>,
}

impl TargetCell {
    pub(crate) fn new(target: MockTarget, caps: Arc<Capabilities>) -> Self {
        Self {
            target,
            stubs: StubRegistry::new(Arc::clone(&caps)),
            caps,
            recorder: CallRecorder::new(),
            nested: Mutex::new(HashMap::new()),
            verified: Mutex::new(HashSet::new()),
            gate: RwLock::new(()),
        }
    }

    fn shared(&self) -> RwLockReadGuard<'_, ()> {
        self.gate.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn exclusive(&self) -> RwLockWriteGuard<'_, ()> {
        self.gate.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Discards stubs, log, nested memo and verification marks.
    pub(crate) fn reset(&self) {
        let _gate = self.exclusive();
        self.stubs.clear();
        self.recorder.clear();
        self.nested.lock().unwrap_or_else(PoisonError::into_inner).clear();
        self.clear_verified();
    }

    pub(crate) fn clear_invocations(&self) {
        let _gate = self.exclusive();
        self.recorder.clear();
        self.clear_verified();
    }

    fn clear_verified(&self) {
        self.verified
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

enum Dispatch {
    Answered(Value),
    Unstubbed(MethodSig, Vec<Value>),
}

/// Handle to a mock target.
///
/// Cloning is cheap; clones refer to the same target.
#[derive(Clone)]
pub struct Mock {
    cell: Arc<TargetCell>,
    registry: MockRegistry,
}

impl Mock {
    pub(crate) fn new(cell: Arc<TargetCell>, registry: MockRegistry) -> Self {
        Self { cell, registry }
    }

    pub fn id(&self) -> TargetId {
        self.cell.target.id
    }

    pub fn target(&self) -> &MockTarget {
        &self.cell.target
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.cell.caps
    }

    pub fn mode(&self) -> MockMode {
        self.cell.target.mode
    }

    pub fn registry(&self) -> &MockRegistry {
        &self.registry
    }

    /// Starts configuring a stub for `method` with one matcher per parameter.
    pub fn stub(&self, method: &str, matchers: Vec<Matcher>) -> StubBuilder<'_> {
        StubBuilder {
            mock: self,
            method: method.to_string(),
            matchers,
        }
    }

    /// Calls a blocking member.
    pub fn invoke(&self, method: &str, args: Vec<Value>) -> Result<Value> {
        let _gate = self.cell.shared();
        match self.dispatch(method, args, CallKind::Blocking)? {
            Dispatch::Answered(value) => Ok(value),
            Dispatch::Unstubbed(sig, _) => self.default_answer(&sig),
        }
    }

    /// Calls a suspending member.
    ///
    /// The suspension point only tags the recorded invocation; the answer is
    /// resolved immediately.
    pub async fn invoke_async(&self, method: &str, args: Vec<Value>) -> Result<Value> {
        let _gate = self.cell.shared();
        match self.dispatch(method, args, CallKind::Suspending)? {
            Dispatch::Answered(value) => Ok(value),
            Dispatch::Unstubbed(sig, _) => self.default_answer(&sig),
        }
    }

    /// Calls a blocking member, running `real` for unstubbed calls when the
    /// mock is a spy. `real` runs after the call is recorded, outside the
    /// target's gate, so it may call back into this mock.
    pub fn invoke_or<F>(&self, method: &str, args: Vec<Value>, real: F) -> Result<Value>
    where
        F: FnOnce(&[Value]) -> Result<Value>,
    {
        let gate = self.cell.shared();
        match self.dispatch(method, args, CallKind::Blocking)? {
            Dispatch::Answered(value) => Ok(value),
            Dispatch::Unstubbed(_, args) if self.mode() == MockMode::Spy => {
                drop(gate);
                debug!(mock = %self.id(), method, "Spy delegating to real implementation");
                real(&args)
            }
            Dispatch::Unstubbed(sig, _) => self.default_answer(&sig),
        }
    }

    /// Records the call and resolves a stub. Callers hold the target's gate.
    fn dispatch(&self, method: &str, args: Vec<Value>, used: CallKind) -> Result<Dispatch> {
        let sig = lookup(&self.cell.caps, method)?;
        if args.len() != sig.arity() {
            return Err(MockError::ArityMismatch {
                method: method.to_string(),
                expected: sig.arity(),
                actual: args.len(),
            });
        }
        if sig.call != used {
            return Err(MockError::CallKindMismatch {
                method: method.to_string(),
                declared: sig.call,
                used,
            });
        }

        let invocation = self.cell.recorder.record(
            self.id(),
            method,
            args,
            used,
            self.registry.sequencer(),
        );

        let engine = self.registry.engine();
        if let Some(stub) = self.cell.stubs.resolve(&engine, method, &invocation.args)? {
            let value = stub.respond(&invocation.args).map_err(|error| MockError::Raised {
                method: method.to_string(),
                error,
            })?;
            if !sig.returns.accepts(&value) {
                return Err(MockError::IncompatibleAnswer {
                    method: method.to_string(),
                    expected: sig.returns.clone(),
                    found: value.to_string(),
                });
            }
            debug!(mock = %self.id(), call = %invocation, stub = stub.id(), "Stubbed call answered");
            return Ok(Dispatch::Answered(value));
        }

        if let Some(id) = self.memoized(method) {
            debug!(mock = %self.id(), call = %invocation, nested = %id, "Answered with memoized nested mock");
            return Ok(Dispatch::Answered(Value::Mock(id)));
        }

        debug!(mock = %self.id(), call = %invocation, mode = %self.mode(), "No stub matched");
        Ok(Dispatch::Unstubbed(sig.clone(), invocation.args))
    }

    fn default_answer(&self, sig: &MethodSig) -> Result<Value> {
        match self.mode() {
            MockMode::Strict | MockMode::Spy => Err(MockError::UnstubbedCall {
                target: self.id(),
                type_name: self.cell.target.type_name.clone(),
                method: sig.name.clone(),
            }),
            MockMode::Relaxed => Ok(sig.returns.zero_value()),
            MockMode::DeepStubs => match sig.returns.mockable_name() {
                Some(type_name) if self.registry.is_mockable(type_name) => {
                    Ok(Value::Mock(self.nested(&sig.name, type_name)?.id()))
                }
                _ => Ok(sig.returns.zero_value()),
            },
        }
    }

    fn memoized(&self, method: &str) -> Option<TargetId> {
        self.cell
            .nested
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(method)
            .copied()
    }

    fn nested(&self, method: &str, type_name: &str) -> Result<Mock> {
        let mut nested = self.cell.nested.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(id) = nested.get(method) {
            return self.registry.handle(*id);
        }
        let mock = self.registry.nested_mock(type_name, self.nested_mode(), &sig_path(self, method))?;
        nested.insert(method.to_string(), mock.id());
        Ok(mock)
    }

    fn nested_mode(&self) -> MockMode {
        match self.mode() {
            MockMode::Spy => MockMode::Strict,
            mode => mode,
        }
    }

    /// Returns the nested mock answering `method`, creating it on first use.
    ///
    /// Used to configure chains: stubbing a member of the returned mock is
    /// visible through every later call of `method` on this mock, in any
    /// mode, unless an explicit stub for `method` matches first.
    pub fn deep(&self, method: &str) -> Result<Mock> {
        let sig = lookup(&self.cell.caps, method)?;
        match &sig.returns {
            TypeTag::Named(type_name) => self.nested(method, type_name),
            TypeTag::Wrapper(type_name) => Err(MockError::UnsupportedTarget {
                type_name: type_name.clone(),
                member: method.to_string(),
            }),
            other => Err(MockError::IncompatibleAnswer {
                method: method.to_string(),
                expected: other.clone(),
                found: "a nested mock".to_string(),
            }),
        }
    }

    /// Converts a `Value::Mock` returned by this mock into a handle.
    pub fn resolve(&self, value: &Value) -> Result<Mock> {
        match value {
            Value::Mock(id) => self.registry.handle(*id),
            other => Err(MockError::IncompatibleAnswer {
                method: "resolve".to_string(),
                expected: TypeTag::Any,
                found: other.to_string(),
            }),
        }
    }

    /// Verifies the call count of one member.
    pub fn verify(&self, expectation: &Expectation) -> Result<Verified> {
        let sig = lookup(&self.cell.caps, &expectation.method)?;
        if expectation.matchers.len() != sig.arity() {
            return Err(MockError::ArityMismatch {
                method: expectation.method.clone(),
                expected: sig.arity(),
                actual: expectation.matchers.len(),
            });
        }

        let _gate = self.cell.shared();
        let log = self.cell.recorder.query(Some(&expectation.method));
        let verified = verify::check(
            self.owner(),
            &self.registry.engine(),
            expectation,
            &log,
            self.registry.config().max_reported_invocations,
        )?;
        self.cell
            .verified
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend(verified.sequences.iter().copied());
        Ok(verified)
    }

    /// Verifies a block of expectations, stopping at the first failure.
    pub fn verify_all(&self, expectations: &[Expectation]) -> Result<Vec<Verified>> {
        expectations.iter().map(|e| self.verify(e)).collect()
    }

    /// Fails if any invocation since the last reset was not accepted by an
    /// earlier successful verification.
    pub fn verify_no_more_interactions(&self) -> Result<()> {
        let _gate = self.cell.shared();
        let verified = self.cell.verified.lock().unwrap_or_else(PoisonError::into_inner).clone();
        let unverified: Vec<Invocation> = self
            .cell
            .recorder
            .query(None)
            .into_iter()
            .filter(|i| !verified.contains(&i.sequence))
            .collect();

        if unverified.is_empty() {
            return Ok(());
        }

        let limit = self.registry.config().max_reported_invocations;
        let omitted = unverified.len().saturating_sub(limit);
        Err(MockError::VerificationMismatch(Box::new(Mismatch {
            target: self.id(),
            type_name: self.cell.target.type_name.clone(),
            call: "*(no further interactions)".to_string(),
            expected: Times::never(),
            actual: unverified.len(),
            matched: unverified.into_iter().take(limit).collect(),
            unmatched: Vec::new(),
            omitted,
        })))
    }

    /// All invocations since the last reset, in arrival order.
    pub fn invocations(&self) -> Vec<Invocation> {
        self.cell.recorder.query(None)
    }

    pub fn invocations_of(&self, method: &str) -> Vec<Invocation> {
        self.cell.recorder.query(Some(method))
    }

    /// Discards stubs and recorded calls. The identity is kept.
    pub fn reset(&self) {
        debug!(mock = %self.id(), "Mock reset");
        self.cell.reset();
    }

    /// Discards recorded calls but keeps stubs.
    pub fn clear_invocations(&self) {
        self.cell.clear_invocations();
    }

    fn owner(&self) -> LogOwner<'_> {
        LogOwner {
            target: self.id(),
            type_name: &self.cell.target.type_name,
        }
    }
}

fn sig_path(mock: &Mock, method: &str) -> String {
    format!("{}.{}", mock.cell.target.type_name, method)
}

impl fmt::Debug for Mock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mock")
            .field("target", &self.cell.target)
            .field("stubs", &self.cell.stubs.len())
            .field("invocations", &self.cell.recorder.len())
            .finish()
    }
}

/// Pending stub configuration. Nothing is registered until an answer is
/// chosen.
#[must_use = "a stub is only registered once an answer is given"]
pub struct StubBuilder<'a> {
    mock: &'a Mock,
    method: String,
    matchers: Vec<Matcher>,
}

impl StubBuilder<'_> {
    /// Registers an arbitrary answer.
    pub fn answer(self, answer: Answer) -> Result<()> {
        self.mock
            .cell
            .stubs
            .register(&self.method, self.matchers, answer)
            .map(|_| ())
    }

    pub fn returns(self, value: impl Into<Value>) -> Result<()> {
        self.answer(Answer::Return(value.into()))
    }

    pub fn returns_many(self, values: Vec<Value>) -> Result<()> {
        self.answer(Answer::ReturnsInOrder(values))
    }

    pub fn throws(self, error: StubbedError) -> Result<()> {
        self.answer(Answer::Throw(error))
    }

    /// Stubs a unit member to do nothing.
    pub fn just_run(self) -> Result<()> {
        self.answer(Answer::NoOp)
    }

    pub fn answers<F>(self, f: F) -> Result<()>
    where
        F: Fn(&[Value]) -> std::result::Result<Value, StubbedError> + Send + Sync + 'static,
    {
        self.answer(Answer::compute(f))
    }

    /// Answers the matched call with a fresh nested mock and returns it for
    /// further configuration.
    pub fn returns_mock(self) -> Result<Mock> {
        let sig = lookup(self.mock.capabilities(), &self.method)?;
        let type_name = match &sig.returns {
            TypeTag::Named(name) => name.clone(),
            other => {
                return Err(MockError::IncompatibleAnswer {
                    method: self.method.clone(),
                    expected: other.clone(),
                    found: "a nested mock".to_string(),
                });
            }
        };
        let nested = self.mock.registry.nested_mock(
            &type_name,
            self.mock.nested_mode(),
            &sig_path(self.mock, &self.method),
        )?;
        let id = nested.id();
        self.answer(Answer::DeepStub(id))?;
        Ok(nested)
    }
}
