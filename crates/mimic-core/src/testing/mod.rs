//! Sample capability sets and typed adapters for exercising mocks.
//!
//! The fixtures model a small system under test: a `Sut` type with a
//! blocking and a suspending factory method, an argument-taking method and
//! one taking an inline value wrapper, plus a singleton `Object` and a
//! module-level `topLevelFunction`. Real implementations are deliberately
//! unimplemented so that only mocks can make them succeed.

pub mod fixtures;

pub use fixtures::{
    hello_world, new_sut, object_capabilities, top_level_capabilities, top_level_function, RealSut, Sut, SutMock,
    ValueClass, WrapObject, WrapObjectApi, WrapObjectMock, OBJECT, SUT, TOP_LEVEL, VALUE_CLASS, WRAP_OBJECT,
};
