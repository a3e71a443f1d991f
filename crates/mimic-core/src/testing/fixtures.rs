//! Typed fixtures over the dynamic mock core.

use crate::error::{MockError, Result, StubbedError};
use crate::intercept::{construct, route_object, route_static, Constructed};
use crate::proxy::Mock;
use async_trait::async_trait;
use mimic_proto::{Capabilities, Mockable, TypeTag, Value};
use std::sync::Arc;

pub const SUT: &str = "Sut";
pub const WRAP_OBJECT: &str = "WrapObject";
pub const VALUE_CLASS: &str = "ValueClass";
/// Singleton name used with [`route_object`].
pub const OBJECT: &str = "Object";
/// Module name used with [`route_static`].
pub const TOP_LEVEL: &str = "TopLevel";

fn not_implemented(method: &str) -> MockError {
    MockError::Raised {
        method: method.to_string(),
        error: StubbedError::new("NotImplementedError", "An operation is not implemented."),
    }
}

fn incompatible(method: &str, expected: TypeTag, found: &Value) -> MockError {
    MockError::IncompatibleAnswer {
        method: method.to_string(),
        expected,
        found: found.to_string(),
    }
}

fn expect_str(method: &str, value: &Value) -> Result<String> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| incompatible(method, TypeTag::Str, value))
}

/// A data object with a single string property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrapObject {
    pub value: String,
}

impl WrapObject {
    pub fn new(value: impl Into<String>) -> Self {
        Self { value: value.into() }
    }

    pub fn to_value(&self) -> Value {
        Value::record(WRAP_OBJECT, [("value", Value::from(self.value.as_str()))])
    }

    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Record { type_name, .. } if type_name == WRAP_OBJECT => {
                value.field("value").and_then(Value::as_str).map(Self::new)
            }
            _ => None,
        }
    }
}

impl From<&WrapObject> for Value {
    fn from(w: &WrapObject) -> Self {
        w.to_value()
    }
}

impl Mockable for WrapObject {
    fn capabilities() -> Capabilities {
        Capabilities::new(WRAP_OBJECT).getter("value", TypeTag::Str)
    }
}

/// Read access shared by real and mocked `WrapObject`s.
pub trait WrapObjectApi: Send + Sync {
    fn value(&self) -> Result<String>;
}

impl WrapObjectApi for WrapObject {
    fn value(&self) -> Result<String> {
        Ok(self.value.clone())
    }
}

/// A `WrapObject` whose property is answered by a mock.
#[derive(Debug, Clone)]
pub struct WrapObjectMock(pub Mock);

impl WrapObjectApi for WrapObjectMock {
    fn value(&self) -> Result<String> {
        expect_str("value", &self.0.invoke("value", vec![])?)
    }
}

/// An inline wrapper around a string. Has no mockable members.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueClass {
    pub value: String,
}

impl ValueClass {
    pub fn new(value: impl Into<String>) -> Self {
        Self { value: value.into() }
    }

    pub fn to_value(&self) -> Value {
        Value::wrapped(VALUE_CLASS, self.value.as_str())
    }
}

impl Mockable for ValueClass {
    fn capabilities() -> Capabilities {
        Capabilities::value_wrapper(VALUE_CLASS, "value")
    }
}

/// The system under test.
#[async_trait]
pub trait Sut: Send + Sync {
    fn hello(&self) -> Result<Arc<dyn WrapObjectApi>>;

    async fn hello_async(&self) -> Result<Arc<dyn WrapObjectApi>>;

    fn args(&self, value: &WrapObject) -> Result<()>;

    fn value_class(&self, value: &ValueClass) -> Result<String>;
}

/// The real `Sut`. Every member is unimplemented.
#[derive(Debug, Clone, Copy, Default)]
pub struct RealSut;

#[async_trait]
impl Sut for RealSut {
    fn hello(&self) -> Result<Arc<dyn WrapObjectApi>> {
        Err(not_implemented("hello"))
    }

    async fn hello_async(&self) -> Result<Arc<dyn WrapObjectApi>> {
        Err(not_implemented("helloAsync"))
    }

    fn args(&self, _value: &WrapObject) -> Result<()> {
        Err(not_implemented("args"))
    }

    fn value_class(&self, _value: &ValueClass) -> Result<String> {
        Err(not_implemented("valueClass"))
    }
}

/// A `Sut` backed by a mock.
#[derive(Debug, Clone)]
pub struct SutMock(pub Mock);

impl SutMock {
    fn wrap_object(&self, method: &str, value: &Value) -> Result<Arc<dyn WrapObjectApi>> {
        if value.as_mock().is_some() {
            return Ok(Arc::new(WrapObjectMock(self.0.resolve(value)?)));
        }
        WrapObject::from_value(value)
            .map(|w| Arc::new(w) as Arc<dyn WrapObjectApi>)
            .ok_or_else(|| incompatible(method, TypeTag::named(WRAP_OBJECT), value))
    }
}

impl Mockable for SutMock {
    fn capabilities() -> Capabilities {
        Capabilities::new(SUT)
            .method("hello", vec![], TypeTag::named(WRAP_OBJECT))
            .suspending("helloAsync", vec![], TypeTag::named(WRAP_OBJECT))
            .method("args", vec![TypeTag::named(WRAP_OBJECT)], TypeTag::Unit)
            .method("valueClass", vec![TypeTag::wrapper(VALUE_CLASS)], TypeTag::Str)
    }
}

#[async_trait]
impl Sut for SutMock {
    fn hello(&self) -> Result<Arc<dyn WrapObjectApi>> {
        let value = self.0.invoke("hello", vec![])?;
        self.wrap_object("hello", &value)
    }

    async fn hello_async(&self) -> Result<Arc<dyn WrapObjectApi>> {
        let value = self.0.invoke_async("helloAsync", vec![]).await?;
        self.wrap_object("helloAsync", &value)
    }

    fn args(&self, value: &WrapObject) -> Result<()> {
        self.0.invoke("args", vec![value.to_value()]).map(|_| ())
    }

    fn value_class(&self, value: &ValueClass) -> Result<String> {
        expect_str("valueClass", &self.0.invoke("valueClass", vec![value.to_value()])?)
    }
}

/// Creates a `Sut`, honoring an installed constructor intercept.
pub fn new_sut() -> Arc<dyn Sut> {
    match construct(SUT, || RealSut) {
        Constructed::Real(sut) => Arc::new(sut),
        Constructed::Mocked(mock) => Arc::new(SutMock(mock)),
    }
}

pub fn object_capabilities() -> Capabilities {
    Capabilities::new(OBJECT).method("helloWorld", vec![], TypeTag::Str)
}

/// The singleton's only member. Really returns `"hello world"`.
pub fn hello_world() -> Result<String> {
    let value = route_object(OBJECT, "helloWorld", vec![], |_| Ok(Value::from("hello world")))?;
    expect_str("helloWorld", &value)
}

pub fn top_level_capabilities() -> Capabilities {
    Capabilities::new(TOP_LEVEL).method("topLevelFunction", vec![], TypeTag::Unit)
}

/// A module-level procedure. Unimplemented unless intercepted.
pub fn top_level_function() -> Result<()> {
    route_static(TOP_LEVEL, "topLevelFunction", vec![], |_| {
        Err(not_implemented("topLevelFunction"))
    })
    .map(|_| ())
}
