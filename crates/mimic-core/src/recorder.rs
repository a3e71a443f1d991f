//! Call recording.
//!
//! Each mock target owns one `CallRecorder`. The log is append-only between
//! resets and preserves arrival order per target.

use chrono::{DateTime, Utc};
use mimic_proto::{CallKind, TargetId, Value};
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};

/// One recorded call. Never modified after it is recorded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Invocation {
    /// Registry-wide arrival sequence number.
    pub sequence: u64,
    pub target: TargetId,
    pub method: String,
    pub args: Vec<Value>,
    /// Entry point used: blocking or suspending.
    pub call: CallKind,
    pub at: DateTime<Utc>,
}

impl Invocation {
    pub fn is_suspending(&self) -> bool {
        self.call == CallKind::Suspending
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} ", self.sequence)?;
        if self.is_suspending() {
            write!(f, "suspend ")?;
        }
        write!(f, "{}(", self.method)?;
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{arg}")?;
        }
        write!(f, ")")
    }
}

/// Append-only invocation log for one target.
#[derive(Debug, Default)]
pub struct CallRecorder {
    log: RwLock<Vec<Invocation>>,
}

impl CallRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an invocation, drawing its sequence number from `sequencer`
    /// under the log lock so sequence order equals log order.
    pub fn record(
        &self,
        target: TargetId,
        method: &str,
        args: Vec<Value>,
        call: CallKind,
        sequencer: &AtomicU64,
    ) -> Invocation {
        let mut log = self.log.write().unwrap_or_else(PoisonError::into_inner);
        let invocation = Invocation {
            sequence: sequencer.fetch_add(1, Ordering::SeqCst),
            target,
            method: method.to_string(),
            args,
            call,
            at: Utc::now(),
        };
        log.push(invocation.clone());
        invocation
    }

    /// Returns invocations in arrival order, optionally filtered by method.
    pub fn query(&self, method: Option<&str>) -> Vec<Invocation> {
        let log = self.log.read().unwrap_or_else(PoisonError::into_inner);
        match method {
            Some(name) => log.iter().filter(|i| i.method == name).cloned().collect(),
            None => log.clone(),
        }
    }

    pub fn len(&self) -> usize {
        self.log.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Truncates the log.
    pub fn clear(&self) {
        self.log
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn target() -> TargetId {
        TargetId::new(1)
    }

    #[test]
    fn test_record_and_query_preserves_order() {
        let recorder = CallRecorder::new();
        let seq = AtomicU64::new(0);

        recorder.record(target(), "hello", vec![], CallKind::Blocking, &seq);
        recorder.record(target(), "args", vec![Value::from("a")], CallKind::Blocking, &seq);
        recorder.record(target(), "helloAsync", vec![], CallKind::Suspending, &seq);

        let all = recorder.query(None);
        let names: Vec<&str> = all.iter().map(|i| i.method.as_str()).collect();
        assert_eq!(names, ["hello", "args", "helloAsync"]);
        assert_eq!(all[0].sequence, 0);
        assert_eq!(all[2].sequence, 2);
        assert!(all[2].is_suspending());
    }

    #[test]
    fn test_query_by_method() {
        let recorder = CallRecorder::new();
        let seq = AtomicU64::new(0);
        recorder.record(target(), "args", vec![Value::from("a")], CallKind::Blocking, &seq);
        recorder.record(target(), "hello", vec![], CallKind::Blocking, &seq);
        recorder.record(target(), "args", vec![Value::from("b")], CallKind::Blocking, &seq);

        let args = recorder.query(Some("args"));
        assert_eq!(args.len(), 2);
        assert_eq!(args[1].args, vec![Value::from("b")]);
        assert!(recorder.query(Some("missing")).is_empty());
    }

    #[test]
    fn test_clear_truncates() {
        let recorder = CallRecorder::new();
        let seq = AtomicU64::new(0);
        recorder.record(target(), "hello", vec![], CallKind::Blocking, &seq);
        recorder.clear();
        assert!(recorder.is_empty());
    }

    #[test]
    fn test_concurrent_records_are_complete_and_ordered() {
        let recorder = Arc::new(CallRecorder::new());
        let seq = Arc::new(AtomicU64::new(0));

        let handles: Vec<_> = (0..4_i64)
            .map(|t| {
                let recorder = Arc::clone(&recorder);
                let seq = Arc::clone(&seq);
                thread::spawn(move || {
                    for i in 0..50_i64 {
                        recorder.record(
                            target(),
                            "args",
                            vec![Value::from(t * 100 + i)],
                            CallKind::Blocking,
                            &seq,
                        );
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let log = recorder.query(None);
        assert_eq!(log.len(), 200);
        assert!(log.windows(2).all(|w| w[0].sequence < w[1].sequence));
    }

    #[test]
    fn test_display() {
        let recorder = CallRecorder::new();
        let seq = AtomicU64::new(4);
        let inv = recorder.record(target(), "args", vec![Value::from("x")], CallKind::Suspending, &seq);
        assert_eq!(inv.to_string(), r#"#4 suspend args("x")"#);
    }
}
