//! End-to-end scenarios through the typed `Sut` fixtures.

use mimic_core::intercept::serial;
use mimic_core::testing::{
    hello_world, new_sut, object_capabilities, top_level_capabilities, top_level_function, Sut, SutMock, ValueClass,
    WrapObject, WrapObjectApi, OBJECT, TOP_LEVEL,
};
use mimic_core::{
    CaptureSlot, Expectation, Matcher, Mock, MockError, MockMode, MockRegistry, Mockable, Value,
};

fn sut_with(mode: MockMode) -> (MockRegistry, Mock, SutMock) {
    let registry = MockRegistry::new();
    registry.declare_type::<WrapObject>();
    let mock = registry.mock_of_with::<SutMock>(mode);
    let sut = SutMock(mock.clone());
    (registry, mock, sut)
}

#[test]
fn test_basic() {
    let (_registry, mock, sut) = sut_with(MockMode::Strict);
    mock.stub("hello", vec![])
        .returns(WrapObject::new("hello world").to_value())
        .unwrap();

    let got = sut.hello().unwrap();
    assert_eq!(got.value().unwrap(), "hello world");
}

#[tokio::test]
async fn test_coroutine() {
    let (_registry, mock, sut) = sut_with(MockMode::Strict);
    mock.stub("helloAsync", vec![])
        .returns(WrapObject::new("hello world async").to_value())
        .unwrap();

    let got = sut.hello_async().await.unwrap();
    assert_eq!(got.value().unwrap(), "hello world async");
    mock.verify(&Expectation::new("helloAsync", vec![]).suspending()).unwrap();
}

#[tokio::test]
async fn test_concurrent_suspending_calls_are_all_recorded() {
    let (_registry, mock, sut) = sut_with(MockMode::Strict);
    mock.stub("helloAsync", vec![])
        .returns(WrapObject::new("hello world async").to_value())
        .unwrap();

    let calls = (0..8).map(|_| sut.hello_async());
    let results = futures::future::join_all(calls).await;
    assert!(results.iter().all(Result::is_ok));
    mock.verify(&Expectation::new("helloAsync", vec![]).exactly(8)).unwrap();
}

#[test]
fn test_property() {
    let registry = MockRegistry::new();
    let wrap = registry.mock_of::<WrapObject>();
    wrap.stub("value", vec![]).returns("hello world").unwrap();
    assert_eq!(wrap.invoke("value", vec![]).unwrap(), Value::from("hello world"));
}

#[test]
fn test_nest() {
    let (_registry, mock, sut) = sut_with(MockMode::DeepStubs);
    mock.deep("hello")
        .unwrap()
        .stub("value", vec![])
        .returns("hello world")
        .unwrap();

    assert_eq!(sut.hello().unwrap().value().unwrap(), "hello world");
    // The chain is memoized: a second call reaches the same nested mock.
    assert_eq!(sut.hello().unwrap().value().unwrap(), "hello world");
}

#[test]
fn test_verify_call_count() {
    let (_registry, mock, sut) = sut_with(MockMode::Strict);
    mock.stub("args", vec![Matcher::any()]).just_run().unwrap();

    sut.args(&WrapObject::new("hello world")).unwrap();

    mock.verify_all(&[
        Expectation::new("args", vec![Matcher::eq(WrapObject::new("hello world").to_value())]),
        Expectation::new("hello", vec![]).never(),
        Expectation::new("helloAsync", vec![]).never(),
    ])
    .unwrap();
}

#[test]
fn test_verify_call_count_reports_mismatch() {
    let (_registry, mock, sut) = sut_with(MockMode::Strict);
    mock.stub("args", vec![Matcher::any()]).just_run().unwrap();
    sut.args(&WrapObject::new("hello world")).unwrap();

    let err = mock
        .verify(&Expectation::new("args", vec![Matcher::any()]).exactly(2))
        .unwrap_err();
    let mismatch = err.mismatch().unwrap();
    assert_eq!(mismatch.actual, 1);
    assert!(err.to_string().contains("hello world"));
}

#[test]
fn test_capture_args() {
    let (_registry, mock, sut) = sut_with(MockMode::Strict);
    let slot = CaptureSlot::new("argSlot");
    mock.stub("args", vec![Matcher::capture(&slot)]).just_run().unwrap();

    sut.args(&WrapObject::new("hello world")).unwrap();
    sut.args(&WrapObject::new("good bye")).unwrap();

    let captured = WrapObject::from_value(&slot.captured().unwrap()).unwrap();
    assert_eq!(captured.value, "good bye");
    assert_eq!(slot.count(), 2);

    let value_is = |s: &str| Matcher::field("value", Matcher::eq(s));
    mock.verify(&Expectation::new("args", vec![value_is("hello world")])).unwrap();
    mock.verify(&Expectation::new("args", vec![value_is("good bye")])).unwrap();
    mock.verify(&Expectation::new("args", vec![value_is("see you")]).never()).unwrap();
}

#[test]
fn test_value_class_mock_creation() {
    let registry = MockRegistry::new();
    let mock = registry.mock_of::<ValueClass>();
    assert!(mock.capabilities().is_value_wrapper());
}

#[test]
fn test_value_class_property_rejected() {
    let registry = MockRegistry::new();
    let mock = registry.mock_of::<ValueClass>();
    let err = mock.stub("value", vec![]).returns("hello world").unwrap_err();
    assert!(matches!(err, MockError::UnsupportedTarget { .. }));
}

#[test]
fn test_value_class_args() {
    let (_registry, mock, sut) = sut_with(MockMode::Strict);
    let value_class = ValueClass::new("hello world");
    mock.stub("valueClass", vec![Matcher::eq(value_class.to_value())])
        .returns("hello world")
        .unwrap();

    assert_eq!(sut.value_class(&ValueClass::new("hello world")).unwrap(), "hello world");
    assert!(sut.value_class(&ValueClass::new("other")).is_err());
}

#[test]
fn test_constructor() {
    let _serial = serial();
    let registry = MockRegistry::new();
    let guard = registry
        .intercept_constructor(SutMock::capabilities(), MockMode::Relaxed)
        .unwrap();

    let sut = new_sut();
    sut.args(&WrapObject::new("hello world")).unwrap();
    guard
        .mock()
        .verify(&Expectation::new("args", vec![Matcher::any()]))
        .unwrap();

    guard.release();
    assert!(new_sut().args(&WrapObject::new("hello world")).is_err());
}

#[test]
fn test_object() {
    let _serial = serial();
    let registry = MockRegistry::new();
    let guard = registry
        .intercept_object(OBJECT, object_capabilities(), MockMode::Spy)
        .unwrap();
    assert_eq!(hello_world().unwrap(), "hello world");

    guard.mock().stub("helloWorld", vec![]).returns("good bye").unwrap();
    assert_eq!(hello_world().unwrap(), "good bye");

    registry.teardown();
    assert_eq!(hello_world().unwrap(), "hello world");
    drop(guard);
}

#[test]
fn test_top_level_function() {
    let _serial = serial();
    assert!(top_level_function().is_err());

    let registry = MockRegistry::new();
    let guard = registry
        .intercept_static(TOP_LEVEL, top_level_capabilities(), MockMode::Strict)
        .unwrap();
    guard.mock().stub("topLevelFunction", vec![]).just_run().unwrap();

    top_level_function().unwrap();
    guard
        .mock()
        .verify(&Expectation::new("topLevelFunction", vec![]))
        .unwrap();

    drop(guard);
    assert!(top_level_function().is_err());
    assert_eq!(mimic_core::teardown_all(), 0);
}

#[test]
fn test_clear_between_cases_keeps_stubs() {
    let (registry, mock, sut) = sut_with(MockMode::Strict);
    mock.stub("hello", vec![])
        .returns(WrapObject::new("hello world").to_value())
        .unwrap();
    sut.hello().unwrap();

    registry.clear_all_invocations();
    mock.verify(&Expectation::new("hello", vec![]).never()).unwrap();
    assert_eq!(sut.hello().unwrap().value().unwrap(), "hello world");
}
