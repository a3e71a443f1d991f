//! Argument capture slots.

use crate::error::{MockError, Result};
use mimic_proto::Value;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

#[derive(Debug, Default)]
struct SlotState {
    value: Option<Value>,
    captures: usize,
}

/// Holds the last value captured by a `Matcher::Capture`.
///
/// Clones share the same slot, so a test keeps one handle while the matcher
/// owns another. Each successful match overwrites the previous value.
#[derive(Clone)]
pub struct CaptureSlot {
    name: Arc<str>,
    state: Arc<Mutex<SlotState>>,
}

impl CaptureSlot {
    pub fn new(name: impl Into<String>) -> Self {
        let name: String = name.into();
        Self {
            name: name.into(),
            state: Arc::new(Mutex::new(SlotState::default())),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the last captured value.
    pub fn captured(&self) -> Result<Value> {
        self.lock()
            .value
            .clone()
            .ok_or_else(|| MockError::CaptureEmpty {
                slot: self.name.to_string(),
            })
    }

    pub fn is_captured(&self) -> bool {
        self.lock().value.is_some()
    }

    /// Number of captures since creation or the last `clear`.
    pub fn count(&self) -> usize {
        self.lock().captures
    }

    pub fn clear(&self) {
        let mut state = self.lock();
        state.value = None;
        state.captures = 0;
    }

    pub(crate) fn store(&self, value: Value) {
        let mut state = self.lock();
        state.value = Some(value);
        state.captures += 1;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SlotState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for CaptureSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock();
        f.debug_struct("CaptureSlot")
            .field("name", &self.name)
            .field("value", &state.value)
            .field("captures", &state.captures)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_read_is_error() {
        let slot = CaptureSlot::new("arg");
        assert!(!slot.is_captured());
        assert!(matches!(
            slot.captured(),
            Err(MockError::CaptureEmpty { slot }) if slot == "arg"
        ));
    }

    #[test]
    fn test_last_capture_wins() {
        let slot = CaptureSlot::new("arg");
        slot.store(Value::from("hello world"));
        slot.store(Value::from("good bye"));

        assert_eq!(slot.captured().unwrap(), Value::from("good bye"));
        assert_eq!(slot.count(), 2);
    }

    #[test]
    fn test_clones_share_state() {
        let slot = CaptureSlot::new("arg");
        let other = slot.clone();
        other.store(Value::from(1));
        assert_eq!(slot.captured().unwrap(), Value::from(1));

        slot.clear();
        assert!(!other.is_captured());
        assert_eq!(other.count(), 0);
    }
}
