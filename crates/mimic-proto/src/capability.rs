//! Declared capability sets.
//!
//! A capability set is the statically known shape of a mockable type: its
//! members, their parameter and return types, and whether each is a
//! blocking or suspending entry point. Mocks are built from this shape and
//! never look at a real implementation.

use crate::Value;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Declared type of a parameter or return value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "name", rename_all = "snake_case")]
pub enum TypeTag {
    Unit,
    Bool,
    Int,
    Str,
    List(Box<TypeTag>),
    /// A record or mockable type with its own capability set.
    Named(String),
    /// An inline value wrapper.
    Wrapper(String),
    /// Accepts any value.
    Any,
}

impl TypeTag {
    pub fn named(name: impl Into<String>) -> Self {
        TypeTag::Named(name.into())
    }

    pub fn wrapper(name: impl Into<String>) -> Self {
        TypeTag::Wrapper(name.into())
    }

    /// Returns true if `value` can stand in for this type.
    ///
    /// Named types accept matching records, nested mocks and null.
    pub fn accepts(&self, value: &Value) -> bool {
        match (self, value) {
            (TypeTag::Any, _)
            | (TypeTag::Unit, Value::Unit)
            | (TypeTag::Bool, Value::Bool(_))
            | (TypeTag::Int, Value::Int(_))
            | (TypeTag::Str, Value::Str(_))
            | (TypeTag::Named(_), Value::Mock(_) | Value::Null) => true,
            (TypeTag::List(item), Value::List(values)) => values.iter().all(|v| item.accepts(v)),
            (TypeTag::Named(name), Value::Record { type_name, .. })
            | (TypeTag::Wrapper(name), Value::Wrapped { type_name, .. }) => name == type_name,
            _ => false,
        }
    }

    /// Zero value returned by relaxed mocks.
    pub fn zero_value(&self) -> Value {
        match self {
            TypeTag::Unit => Value::Unit,
            TypeTag::Bool => Value::Bool(false),
            TypeTag::Int => Value::Int(0),
            TypeTag::Str => Value::Str(String::new()),
            TypeTag::List(_) => Value::List(Vec::new()),
            TypeTag::Named(_) | TypeTag::Wrapper(_) | TypeTag::Any => Value::Null,
        }
    }

    /// Name of the capability set a deep stub would mock, if any.
    pub fn mockable_name(&self) -> Option<&str> {
        match self {
            TypeTag::Named(name) => Some(name),
            _ => None,
        }
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeTag::Unit => f.write_str("unit"),
            TypeTag::Bool => f.write_str("bool"),
            TypeTag::Int => f.write_str("int"),
            TypeTag::Str => f.write_str("str"),
            TypeTag::List(item) => write!(f, "list<{item}>"),
            TypeTag::Named(name) | TypeTag::Wrapper(name) => f.write_str(name),
            TypeTag::Any => f.write_str("any"),
        }
    }
}

/// Whether a member is entered synchronously or through a suspension point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallKind {
    #[default]
    Blocking,
    Suspending,
}

impl fmt::Display for CallKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallKind::Blocking => f.write_str("blocking"),
            CallKind::Suspending => f.write_str("suspending"),
        }
    }
}

/// Signature of one declared member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodSig {
    pub name: String,
    pub params: Vec<TypeTag>,
    pub returns: TypeTag,
    #[serde(default)]
    pub call: CallKind,
}

impl MethodSig {
    pub fn new(name: impl Into<String>, params: Vec<TypeTag>, returns: TypeTag) -> Self {
        Self {
            name: name.into(),
            params,
            returns,
            call: CallKind::Blocking,
        }
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }

    pub fn is_suspending(&self) -> bool {
        self.call == CallKind::Suspending
    }
}

impl fmt::Display for MethodSig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_suspending() {
            write!(f, "suspend ")?;
        }
        write!(f, "{}(", self.name)?;
        for (i, p) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{p}")?;
        }
        write!(f, ") -> {}", self.returns)
    }
}

/// The declared shape of a mockable type.
///
/// Members are keyed by name; declaring a second member with the same name
/// replaces the first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    type_name: String,
    members: Vec<MethodSig>,
    /// Set for inline value wrappers: names the wrapped field, which is not
    /// an interceptable member.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    wrapped_field: Option<String>,
}

impl Capabilities {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            members: Vec::new(),
            wrapped_field: None,
        }
    }

    /// Declares an inline value wrapper around `field`.
    ///
    /// The resulting capability set exposes no members at all.
    pub fn value_wrapper(type_name: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            members: Vec::new(),
            wrapped_field: Some(field.into()),
        }
    }

    /// Adds a blocking function member.
    pub fn method(self, name: impl Into<String>, params: Vec<TypeTag>, returns: TypeTag) -> Self {
        self.member(MethodSig::new(name, params, returns))
    }

    /// Adds a suspending function member.
    pub fn suspending(
        self,
        name: impl Into<String>,
        params: Vec<TypeTag>,
        returns: TypeTag,
    ) -> Self {
        let mut sig = MethodSig::new(name, params, returns);
        sig.call = CallKind::Suspending;
        self.member(sig)
    }

    /// Adds a property read accessor, stubbed and verified like a
    /// zero-argument method.
    pub fn getter(self, name: impl Into<String>, ty: TypeTag) -> Self {
        self.member(MethodSig::new(name, Vec::new(), ty))
    }

    /// Adds an arbitrary member signature.
    pub fn member(mut self, sig: MethodSig) -> Self {
        self.members.retain(|m| m.name != sig.name);
        self.members.push(sig);
        self
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn get(&self, name: &str) -> Option<&MethodSig> {
        self.members.iter().find(|m| m.name == name)
    }

    pub fn members(&self) -> impl Iterator<Item = &MethodSig> {
        self.members.iter()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn is_value_wrapper(&self) -> bool {
        self.wrapped_field.is_some()
    }

    pub fn wrapped_field(&self) -> Option<&str> {
        self.wrapped_field.as_deref()
    }
}

/// Types that can describe their own capability set.
pub trait Mockable {
    fn capabilities() -> Capabilities;
}
