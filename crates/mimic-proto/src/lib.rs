//! # mimic-proto
//!
//! Shared vocabulary for the Mimic mock-object core.
//!
//! This crate defines:
//! - `Value`, the dynamic argument/return representation recorded by mocks
//! - `Capabilities`, the statically declared shape of a mockable type
//! - `TargetId` and `OriginKind`, the identity of a mocked entity
//! - `MockMode`, the default-answer policy for unstubbed calls

mod capability;
mod target;
mod value;

pub use capability::{CallKind, Capabilities, MethodSig, Mockable, TypeTag};
pub use target::{MockMode, OriginKind, ParseModeError, TargetId};
pub use value::Value;
