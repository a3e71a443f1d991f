//! Mock registry.
//!
//! The registry owns every target it creates together with its stubs and
//! call log, and the catalog of declared capability sets used to build
//! nested mocks. One registry per test case keeps cases isolated; a
//! process-wide instance is available through [`MockRegistry::global`].

use crate::config::MockConfig;
use crate::error::{MockError, Result};
use crate::matcher::MatcherEngine;
use crate::proxy::{Mock, MockTarget, TargetCell};
use mimic_proto::{Capabilities, MockMode, Mockable, OriginKind, TargetId};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, LazyLock, PoisonError, RwLock};
use tracing::debug;

/// Identity tokens are unique across every registry in the process.
static NEXT_TARGET: AtomicU64 = AtomicU64::new(1);
static NEXT_REGISTRY: AtomicU64 = AtomicU64::new(1);
static GLOBAL: LazyLock<MockRegistry> = LazyLock::new(MockRegistry::new);

struct RegistryInner {
    id: u64,
    config: MockConfig,
    sequence: AtomicU64,
    targets: RwLock<BTreeMap<TargetId, Arc<TargetCell>>>,
    catalog: RwLock<HashMap<String, Arc<Capabilities>>>,
}

/// Tracks live mocks and declared capability sets.
#[derive(Clone)]
pub struct MockRegistry {
    inner: Arc<RegistryInner>,
}

impl Default for MockRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl MockRegistry {
    pub fn new() -> Self {
        Self::with_config(MockConfig::default())
    }

    pub fn with_config(config: MockConfig) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                id: NEXT_REGISTRY.fetch_add(1, Ordering::SeqCst),
                config,
                sequence: AtomicU64::new(0),
                targets: RwLock::new(BTreeMap::new()),
                catalog: RwLock::new(HashMap::new()),
            }),
        }
    }

    /// The process-wide registry.
    pub fn global() -> &'static MockRegistry {
        &GLOBAL
    }

    pub fn id(&self) -> u64 {
        self.inner.id
    }

    pub fn config(&self) -> &MockConfig {
        &self.inner.config
    }

    pub(crate) fn engine(&self) -> MatcherEngine {
        MatcherEngine::new(self.inner.config.catch_predicate_panics)
    }

    pub(crate) fn sequencer(&self) -> &AtomicU64 {
        &self.inner.sequence
    }

    /// Makes a capability set available for nested mocks.
    pub fn declare(&self, caps: Capabilities) -> Arc<Capabilities> {
        let caps = Arc::new(caps);
        self.inner
            .catalog
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(caps.type_name().to_string(), Arc::clone(&caps));
        caps
    }

    pub fn declare_type<T: Mockable>(&self) -> Arc<Capabilities> {
        self.declare(T::capabilities())
    }

    pub fn declared(&self, type_name: &str) -> Option<Arc<Capabilities>> {
        self.inner
            .catalog
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(type_name)
            .cloned()
    }

    /// True if a nested mock can be built for `type_name`.
    pub(crate) fn is_mockable(&self, type_name: &str) -> bool {
        self.declared(type_name).is_some_and(|caps| !caps.is_value_wrapper())
    }

    /// Creates a mock in the configured default mode.
    pub fn mock(&self, caps: Capabilities) -> Mock {
        self.mock_with(caps, self.inner.config.default_mode)
    }

    pub fn mock_with(&self, caps: Capabilities, mode: MockMode) -> Mock {
        let caps = self.declare(caps);
        self.create(caps, mode, OriginKind::Instance)
    }

    pub fn mock_of<T: Mockable>(&self) -> Mock {
        self.mock(T::capabilities())
    }

    pub fn mock_of_with<T: Mockable>(&self, mode: MockMode) -> Mock {
        self.mock_with(T::capabilities(), mode)
    }

    pub(crate) fn create(&self, caps: Arc<Capabilities>, mode: MockMode, origin: OriginKind) -> Mock {
        let target = MockTarget {
            id: TargetId::new(NEXT_TARGET.fetch_add(1, Ordering::SeqCst)),
            type_name: caps.type_name().to_string(),
            origin,
            mode,
        };
        debug!(mock = %target.id, type_name = %target.type_name, origin = %origin, mode = %mode, "Mock created");
        let cell = Arc::new(TargetCell::new(target, caps));
        self.inner
            .targets
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(cell.target.id, Arc::clone(&cell));
        Mock::new(cell, self.clone())
    }

    /// Builds a nested mock of a declared type for the member at `path`.
    pub(crate) fn nested_mock(&self, type_name: &str, mode: MockMode, path: &str) -> Result<Mock> {
        let caps = self.declared(type_name).ok_or_else(|| MockError::UndeclaredType {
            type_name: type_name.to_string(),
        })?;
        if caps.is_value_wrapper() {
            return Err(MockError::UnsupportedTarget {
                type_name: type_name.to_string(),
                member: path.to_string(),
            });
        }
        let mock = self.create(caps, mode, OriginKind::Instance);
        debug!(path, nested = %mock.id(), "Nested mock created");
        Ok(mock)
    }

    /// Returns a handle to a tracked target.
    pub fn handle(&self, id: TargetId) -> Result<Mock> {
        self.cell(id).map(|cell| Mock::new(cell, self.clone()))
    }

    fn cell(&self, id: TargetId) -> Result<Arc<TargetCell>> {
        self.inner
            .targets
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .cloned()
            .ok_or(MockError::UnknownTarget(id))
    }

    fn cells(&self) -> Vec<Arc<TargetCell>> {
        self.inner
            .targets
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect()
    }

    /// Every tracked target in creation order.
    pub fn targets(&self) -> Vec<MockTarget> {
        self.cells().iter().map(|c| c.target.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.inner
            .targets
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Discards one target's stubs and log. Its identity stays valid.
    pub fn reset(&self, id: TargetId) -> Result<()> {
        self.cell(id)?.reset();
        debug!(mock = %id, "Target reset");
        Ok(())
    }

    pub fn reset_all(&self) {
        let cells = self.cells();
        for cell in &cells {
            cell.reset();
        }
        debug!(registry = self.id(), targets = cells.len(), "All targets reset");
    }

    /// Discards one target's log, keeping its stubs.
    pub fn clear_invocations(&self, id: TargetId) -> Result<()> {
        self.cell(id)?.clear_invocations();
        Ok(())
    }

    pub fn clear_all_invocations(&self) {
        for cell in self.cells() {
            cell.clear_invocations();
        }
    }

    /// Forgets every target and declared type.
    ///
    /// Handles still held by callers keep working but are no longer reached
    /// by registry-wide resets.
    pub fn teardown(&self) {
        let removed = {
            let mut targets = self.inner.targets.write().unwrap_or_else(PoisonError::into_inner);
            let n = targets.len();
            targets.clear();
            n
        };
        self.inner
            .catalog
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        let intercepts = self.teardown_intercepts();
        debug!(registry = self.id(), removed, intercepts, "Registry torn down");
    }
}

impl fmt::Debug for MockRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockRegistry")
            .field("id", &self.inner.id)
            .field("targets", &self.len())
            .field("config", &self.inner.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::Matcher;
    use mimic_proto::{TypeTag, Value};

    fn caps() -> Capabilities {
        Capabilities::new("Sut").method("count", vec![TypeTag::Int], TypeTag::Int)
    }

    #[test]
    fn test_ids_are_unique_across_registries() {
        let a = MockRegistry::new().mock(caps());
        let b = MockRegistry::new().mock(caps());
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_global_registry_is_shared() {
        let registry = MockRegistry::global();
        assert_eq!(registry.id(), MockRegistry::global().id());
        assert_eq!(registry.config().default_mode, MockMode::Strict);

        let mock = registry.mock(caps());
        let handle = MockRegistry::global().handle(mock.id()).unwrap();
        handle.stub("count", vec![Matcher::any()]).returns(4).unwrap();
        assert_eq!(mock.invoke("count", vec![Value::from(1)]).unwrap(), Value::from(4));
    }

    #[test]
    fn test_default_mode_from_config() {
        let registry = MockRegistry::with_config(MockConfig {
            default_mode: MockMode::Relaxed,
            ..MockConfig::default()
        });
        let mock = registry.mock(caps());
        assert_eq!(mock.mode(), MockMode::Relaxed);
        assert_eq!(mock.invoke("count", vec![Value::from(1)]).unwrap(), Value::from(0));
    }

    #[test]
    fn test_tracks_targets() {
        let registry = MockRegistry::new();
        let a = registry.mock(caps());
        let b = registry.mock_with(caps(), MockMode::Relaxed);

        let targets = registry.targets();
        assert_eq!(targets.len(), 2);
        assert_eq!(targets[0].id, a.id());
        assert_eq!(targets[1].mode, MockMode::Relaxed);
        assert_eq!(registry.handle(b.id()).unwrap().id(), b.id());
    }

    #[test]
    fn test_reset_scoped_to_target() {
        let registry = MockRegistry::new();
        let a = registry.mock(caps());
        let b = registry.mock(caps());
        for m in [&a, &b] {
            m.stub("count", vec![Matcher::any()]).returns(1).unwrap();
            m.invoke("count", vec![Value::from(1)]).unwrap();
        }

        registry.reset(a.id()).unwrap();
        assert!(a.invocations().is_empty());
        assert_eq!(b.invocations().len(), 1);
        assert!(b.invoke("count", vec![Value::from(1)]).is_ok());
    }

    #[test]
    fn test_reset_all() {
        let registry = MockRegistry::new();
        let a = registry.mock(caps());
        let b = registry.mock(caps());
        for m in [&a, &b] {
            m.stub("count", vec![Matcher::any()]).returns(1).unwrap();
        }
        registry.reset_all();
        assert!(a.invoke("count", vec![Value::from(1)]).is_err());
        assert!(b.invoke("count", vec![Value::from(1)]).is_err());
    }

    #[test]
    fn test_clear_invocations_keeps_stubs() {
        let registry = MockRegistry::new();
        let a = registry.mock(caps());
        a.stub("count", vec![Matcher::any()]).returns(1).unwrap();
        a.invoke("count", vec![Value::from(1)]).unwrap();

        registry.clear_all_invocations();
        assert!(a.invocations().is_empty());
        assert_eq!(a.invoke("count", vec![Value::from(1)]).unwrap(), Value::from(1));
    }

    #[test]
    fn test_unknown_target() {
        let registry = MockRegistry::new();
        let other = MockRegistry::new().mock(caps());
        assert!(matches!(
            registry.reset(other.id()),
            Err(MockError::UnknownTarget(_))
        ));
    }

    #[test]
    fn test_declared_catalog() {
        let registry = MockRegistry::new();
        registry.declare(Capabilities::value_wrapper("ValueClass", "value"));
        registry.declare(Capabilities::new("WrapObject").getter("value", TypeTag::Str));
        assert!(registry.is_mockable("WrapObject"));
        assert!(!registry.is_mockable("ValueClass"));
        assert!(!registry.is_mockable("Missing"));
    }

    #[test]
    fn test_teardown_forgets_targets() {
        let registry = MockRegistry::new();
        let a = registry.mock(caps());
        registry.teardown();
        assert!(registry.is_empty());
        assert!(registry.handle(a.id()).is_err());
        // Teardown is idempotent.
        registry.teardown();
    }

    #[test]
    fn test_invocation_sequence_spans_targets() {
        let registry = MockRegistry::new();
        let a = registry.mock_with(caps(), MockMode::Relaxed);
        let b = registry.mock_with(caps(), MockMode::Relaxed);
        a.invoke("count", vec![Value::from(1)]).unwrap();
        b.invoke("count", vec![Value::from(2)]).unwrap();
        a.invoke("count", vec![Value::from(3)]).unwrap();

        let seqs: Vec<u64> = a.invocations().iter().map(|i| i.sequence).collect();
        assert_eq!(seqs, vec![0, 2]);
        assert_eq!(b.invocations()[0].sequence, 1);
    }
}
