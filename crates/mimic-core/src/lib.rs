//! Mimic core: a mock-object engine over declared capability sets.
//!
//! A [`MockRegistry`] creates [`Mock`] proxies from [`Capabilities`]. Each
//! call through a proxy is recorded and answered by the newest matching
//! stub, a memoized nested mock, or the mock's [`MockMode`] policy. Recorded
//! calls are checked with [`Expectation`]s.
//!
//! ```
//! use mimic_core::{Capabilities, Expectation, Matcher, MockRegistry, TypeTag, Value};
//!
//! let registry = MockRegistry::new();
//! let mock = registry.mock(Capabilities::new("Greeter").method("greet", vec![TypeTag::Str], TypeTag::Str));
//! mock.stub("greet", vec![Matcher::eq("bob")]).returns("hi bob").unwrap();
//!
//! assert_eq!(mock.invoke("greet", vec![Value::from("bob")]).unwrap(), Value::from("hi bob"));
//! mock.verify(&Expectation::new("greet", vec![Matcher::any()])).unwrap();
//! ```

mod capture;
mod config;
mod error;
pub mod intercept;
mod matcher;
mod proxy;
mod recorder;
mod registry;
mod stub;
pub mod testing;
mod verify;

pub use capture::CaptureSlot;
pub use config::{MockConfig, ENV_DEFAULT_MODE};
pub use error::{MockError, Result, StubbedError};
pub use intercept::{
    construct, constructed_mock, route_object, route_static, teardown_all, Constructed, InterceptGuard, InterceptKey,
};
pub use matcher::{describe_call, Matcher, MatcherEngine};
pub use proxy::{Mock, MockTarget, StubBuilder};
pub use recorder::{CallRecorder, Invocation};
pub use registry::MockRegistry;
pub use stub::{Answer, Stub, StubRegistry};
pub use verify::{Expectation, Mismatch, Times, Verified};

pub use mimic_proto::{
    CallKind, Capabilities, MethodSig, MockMode, Mockable, OriginKind, TargetId, TypeTag, Value,
};
