//! Process-wide interception of free functions, singletons and constructors.
//!
//! Installing an intercept puts a mock into a process-wide table and returns
//! an [`InterceptGuard`]; dropping the guard removes the entry. Code under
//! test reaches the table through [`route_static`], [`route_object`] and
//! [`construct`], which fall through to the real implementation when nothing
//! is installed.
//!
//! Because the table is shared by every test in the process, tests that
//! install intercepts should hold [`serial`] for their whole duration.

use crate::error::{MockError, Result};
use crate::proxy::Mock;
use crate::registry::MockRegistry;
use mimic_proto::{Capabilities, MockMode, OriginKind, TargetId, Value};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{LazyLock, Mutex, MutexGuard, PoisonError};
use tracing::{debug, warn};

/// What an intercept redirects.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum InterceptKey {
    /// Free functions of a module.
    Static(String),
    /// A named singleton object.
    Singleton(String),
    /// Instance creation of a type.
    Constructor(String),
}

impl InterceptKey {
    pub fn origin(&self) -> OriginKind {
        match self {
            InterceptKey::Static(_) => OriginKind::Static,
            InterceptKey::Singleton(_) => OriginKind::Singleton,
            InterceptKey::Constructor(_) => OriginKind::ConstructorIntercept,
        }
    }
}

impl fmt::Display for InterceptKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InterceptKey::Static(module) => write!(f, "static {module}"),
            InterceptKey::Singleton(name) => write!(f, "object {name}"),
            InterceptKey::Constructor(type_name) => write!(f, "constructor {type_name}"),
        }
    }
}

struct Installed {
    mock: Mock,
    generation: u64,
    owner: u64,
}

static TABLE: LazyLock<Mutex<HashMap<InterceptKey, Installed>>> = LazyLock::new(|| Mutex::new(HashMap::new()));
static GENERATION: AtomicU64 = AtomicU64::new(1);
static SERIAL: Mutex<()> = Mutex::new(());

fn table() -> MutexGuard<'static, HashMap<InterceptKey, Installed>> {
    TABLE.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Process-wide lock for tests that install intercepts.
///
/// A test that panicked while holding it does not poison later callers.
pub fn serial() -> MutexGuard<'static, ()> {
    SERIAL.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Scoped handle to an installed intercept.
///
/// Dropping the guard removes the intercept unless it was already torn down
/// and replaced by a newer one.
#[must_use = "the intercept is removed as soon as the guard is dropped"]
pub struct InterceptGuard {
    key: InterceptKey,
    generation: u64,
    mock: Mock,
}

impl InterceptGuard {
    /// The mock answering redirected calls.
    pub fn mock(&self) -> &Mock {
        &self.mock
    }

    pub fn key(&self) -> &InterceptKey {
        &self.key
    }

    /// Removes the intercept now.
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for InterceptGuard {
    fn drop(&mut self) {
        let mut table = table();
        if table.get(&self.key).is_some_and(|i| i.generation == self.generation) {
            table.remove(&self.key);
            debug!(key = %self.key, mock = %self.mock.id(), "Intercept released");
        }
    }
}

impl fmt::Debug for InterceptGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterceptGuard")
            .field("key", &self.key)
            .field("generation", &self.generation)
            .field("mock", &self.mock.id())
            .finish()
    }
}

impl MockRegistry {
    /// Redirects the free functions of `module` to a mock built from `caps`.
    pub fn intercept_static(&self, module: &str, caps: Capabilities, mode: MockMode) -> Result<InterceptGuard> {
        self.install(InterceptKey::Static(module.to_string()), caps, mode)
    }

    /// Redirects calls on the singleton `name` to a mock built from `caps`.
    pub fn intercept_object(&self, name: &str, caps: Capabilities, mode: MockMode) -> Result<InterceptGuard> {
        self.install(InterceptKey::Singleton(name.to_string()), caps, mode)
    }

    /// Makes every [`construct`] of `caps`'s type return one shared mock.
    pub fn intercept_constructor(&self, caps: Capabilities, mode: MockMode) -> Result<InterceptGuard> {
        self.install(InterceptKey::Constructor(caps.type_name().to_string()), caps, mode)
    }

    fn install(&self, key: InterceptKey, caps: Capabilities, mode: MockMode) -> Result<InterceptGuard> {
        let mut table = table();
        if table.contains_key(&key) {
            return Err(MockError::AlreadyIntercepted { key: key.to_string() });
        }
        let caps = self.declare(caps);
        let mock = self.create(caps, mode, key.origin());
        let generation = GENERATION.fetch_add(1, Ordering::SeqCst);
        table.insert(
            key.clone(),
            Installed {
                mock: mock.clone(),
                generation,
                owner: self.id(),
            },
        );
        debug!(key = %key, mock = %mock.id(), mode = %mode, "Intercept installed");
        Ok(InterceptGuard { key, generation, mock })
    }

    /// Removes every intercept installed through this registry.
    pub fn teardown_intercepts(&self) -> usize {
        teardown_owned_by(self.id())
    }
}

fn installed(key: &InterceptKey) -> Option<Mock> {
    table().get(key).map(|i| i.mock.clone())
}

/// Returns true if `key` currently has an intercept.
pub fn is_intercepted(key: &InterceptKey) -> bool {
    table().contains_key(key)
}

/// Calls `module.function`, through its intercept if one is installed.
///
/// Intercepts in spy mode run `real` for unstubbed calls.
pub fn route_static<F>(module: &str, function: &str, args: Vec<Value>, real: F) -> Result<Value>
where
    F: FnOnce(&[Value]) -> Result<Value>,
{
    route(&InterceptKey::Static(module.to_string()), function, args, real)
}

/// Calls `name.method` on a singleton, through its intercept if one is
/// installed.
pub fn route_object<F>(name: &str, method: &str, args: Vec<Value>, real: F) -> Result<Value>
where
    F: FnOnce(&[Value]) -> Result<Value>,
{
    route(&InterceptKey::Singleton(name.to_string()), method, args, real)
}

fn route<F>(key: &InterceptKey, method: &str, args: Vec<Value>, real: F) -> Result<Value>
where
    F: FnOnce(&[Value]) -> Result<Value>,
{
    // The table lock is released before the mock runs so answers may route
    // further calls.
    match installed(key) {
        Some(mock) => mock.invoke_or(method, args, real),
        None => real(&args),
    }
}

/// Result of [`construct`].
#[derive(Debug)]
pub enum Constructed<T> {
    Real(T),
    Mocked(Mock),
}

/// Creates an instance of `type_name`, or hands out the intercepting mock.
pub fn construct<T>(type_name: &str, real: impl FnOnce() -> T) -> Constructed<T> {
    match constructed_mock(type_name) {
        Some(mock) => {
            debug!(type_name, mock = %mock.id(), "Constructor intercepted");
            Constructed::Mocked(mock)
        }
        None => Constructed::Real(real()),
    }
}

/// The mock an intercepted constructor of `type_name` hands out.
pub fn constructed_mock(type_name: &str) -> Option<Mock> {
    installed(&InterceptKey::Constructor(type_name.to_string()))
}

/// Removes every installed intercept and returns how many were removed.
///
/// Safe to call when nothing is installed, and any number of times.
pub fn teardown_all() -> usize {
    let removed: Vec<(InterceptKey, Installed)> = table().drain().collect();
    report_torn_down(&removed);
    removed.len()
}

/// Removes the intercepts installed through registry `owner`.
pub fn teardown_owned_by(owner: u64) -> usize {
    let removed: Vec<(InterceptKey, Installed)> = {
        let mut table = table();
        let keys: Vec<InterceptKey> = table
            .iter()
            .filter(|(_, i)| i.owner == owner)
            .map(|(k, _)| k.clone())
            .collect();
        keys.into_iter()
            .filter_map(|k| table.remove(&k).map(|i| (k, i)))
            .collect()
    };
    report_torn_down(&removed);
    removed.len()
}

fn report_torn_down(removed: &[(InterceptKey, Installed)]) {
    for (key, installed) in removed {
        warn!(key = %key, mock = %installed.mock.id(), "Intercept torn down before its guard was released");
    }
}

/// Targets of every installed intercept.
pub fn installed_targets() -> Vec<(InterceptKey, TargetId)> {
    table().iter().map(|(k, i)| (k.clone(), i.mock.id())).collect()
}
