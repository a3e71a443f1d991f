//! Call-count verification.
//!
//! Verification is a synchronous read of a completed log: the invocations
//! recorded for a member are split into those the expectation's matchers
//! accept and those they reject, and the accepted count is checked against
//! the expected `Times`.

use crate::error::{MockError, Result};
use crate::matcher::{describe_call, Matcher, MatcherEngine};
use crate::recorder::Invocation;
use mimic_proto::{CallKind, TargetId};
use std::fmt;
use tracing::debug;

/// Expected number of matching calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Times {
    Exactly(usize),
    AtLeast(usize),
    AtMost(usize),
    /// Inclusive range.
    Between(usize, usize),
}

impl Times {
    pub fn never() -> Self {
        Times::Exactly(0)
    }

    pub fn once() -> Self {
        Times::Exactly(1)
    }

    pub fn admits(self, count: usize) -> bool {
        match self {
            Times::Exactly(n) => count == n,
            Times::AtLeast(n) => count >= n,
            Times::AtMost(n) => count <= n,
            Times::Between(lo, hi) => (lo..=hi).contains(&count),
        }
    }
}

impl fmt::Display for Times {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Times::Exactly(0) => write!(f, "no calls"),
            Times::Exactly(n) => write!(f, "exactly {n} call(s)"),
            Times::AtLeast(n) => write!(f, "at least {n} call(s)"),
            Times::AtMost(n) => write!(f, "at most {n} call(s)"),
            Times::Between(lo, hi) => write!(f, "between {lo} and {hi} call(s)"),
        }
    }
}

/// What a verification expects of a member's call log.
#[derive(Debug, Clone)]
pub struct Expectation {
    pub method: String,
    pub matchers: Vec<Matcher>,
    pub times: Times,
    /// Restrict to calls made through one entry point.
    pub call: Option<CallKind>,
}

impl Expectation {
    /// Expects exactly one matching call.
    pub fn new(method: impl Into<String>, matchers: Vec<Matcher>) -> Self {
        Self {
            method: method.into(),
            matchers,
            times: Times::once(),
            call: None,
        }
    }

    #[must_use]
    pub fn times(mut self, times: Times) -> Self {
        self.times = times;
        self
    }

    #[must_use]
    pub fn never(self) -> Self {
        self.times(Times::never())
    }

    #[must_use]
    pub fn exactly(self, n: usize) -> Self {
        self.times(Times::Exactly(n))
    }

    #[must_use]
    pub fn at_least(self, n: usize) -> Self {
        self.times(Times::AtLeast(n))
    }

    #[must_use]
    pub fn at_most(self, n: usize) -> Self {
        self.times(Times::AtMost(n))
    }

    /// Only count calls made through the suspending entry point.
    #[must_use]
    pub fn suspending(mut self) -> Self {
        self.call = Some(CallKind::Suspending);
        self
    }

    /// Only count calls made through the blocking entry point.
    #[must_use]
    pub fn blocking(mut self) -> Self {
        self.call = Some(CallKind::Blocking);
        self
    }

    pub fn describe(&self) -> String {
        describe_call(&self.method, &self.matchers)
    }
}

/// Successful verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verified {
    pub method: String,
    /// Invocations accepted by the matchers.
    pub matched: usize,
    /// Invocations of the same member rejected by the matchers.
    pub unmatched: usize,
    /// Sequence numbers of the accepted invocations.
    pub sequences: Vec<u64>,
}

impl Verified {
    /// True when the member was never called at all.
    pub fn never_invoked(&self) -> bool {
        self.matched == 0 && self.unmatched == 0
    }
}

/// Diagnostic report of a failed verification.
#[derive(Debug, Clone)]
pub struct Mismatch {
    pub target: TargetId,
    pub type_name: String,
    /// Rendered expected call, e.g. `args("x")`.
    pub call: String,
    pub expected: Times,
    pub actual: usize,
    pub matched: Vec<Invocation>,
    pub unmatched: Vec<Invocation>,
    /// Invocations left out of the lists above to respect the report limit.
    pub omitted: usize,
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "verification failed for {}.{} on {}",
            self.type_name, self.call, self.target
        )?;
        writeln!(f, "  expected: {}", self.expected)?;
        write!(f, "  actual:   {} matching call(s)", self.actual)?;

        if self.matched.is_empty() && self.unmatched.is_empty() && self.omitted == 0 {
            return write!(f, "\n  the member was never invoked");
        }
        if !self.matched.is_empty() {
            write!(f, "\n  matching calls:")?;
            for inv in &self.matched {
                write!(f, "\n    {inv}")?;
            }
        }
        if !self.unmatched.is_empty() {
            write!(
                f,
                "\n  invoked {} time(s) with other arguments:",
                self.unmatched.len()
            )?;
            for inv in &self.unmatched {
                write!(f, "\n    {inv}")?;
            }
        }
        if self.omitted > 0 {
            write!(f, "\n  ... {} more invocation(s) not shown", self.omitted)?;
        }
        Ok(())
    }
}

/// Identity of the target a log belongs to, used in reports.
#[derive(Debug, Clone, Copy)]
pub struct LogOwner<'a> {
    pub target: TargetId,
    pub type_name: &'a str,
}

/// Checks `expectation` against the invocations recorded for its member.
///
/// Captures inside the matchers are written for every accepted invocation,
/// in log order, so a slot ends holding the last accepted argument.
pub fn check(
    owner: LogOwner<'_>,
    engine: &MatcherEngine,
    expectation: &Expectation,
    log: &[Invocation],
    report_limit: usize,
) -> Result<Verified> {
    let mut matched = Vec::new();
    let mut unmatched = Vec::new();

    for inv in log.iter().filter(|i| i.method == expectation.method) {
        if expectation.call.is_some_and(|kind| kind != inv.call) {
            continue;
        }
        if engine.matches(&expectation.method, &expectation.matchers, &inv.args)? {
            matched.push(inv);
        } else {
            unmatched.push(inv);
        }
    }

    let actual = matched.len();
    if expectation.times.admits(actual) {
        debug!(
            mock = %owner.target,
            call = %expectation.describe(),
            matched = actual,
            unmatched = unmatched.len(),
            "Verification passed"
        );
        return Ok(Verified {
            method: expectation.method.clone(),
            matched: actual,
            unmatched: unmatched.len(),
            sequences: matched.iter().map(|i| i.sequence).collect(),
        });
    }

    let total = matched.len() + unmatched.len();
    let shown_matched: Vec<Invocation> = matched.iter().take(report_limit).map(|&i| i.clone()).collect();
    let remaining = report_limit.saturating_sub(shown_matched.len());
    let shown_unmatched: Vec<Invocation> = unmatched.iter().take(remaining).map(|&i| i.clone()).collect();
    let omitted = total - shown_matched.len() - shown_unmatched.len();

    debug!(
        mock = %owner.target,
        call = %expectation.describe(),
        expected = %expectation.times,
        actual,
        "Verification failed"
    );

    Err(MockError::VerificationMismatch(Box::new(Mismatch {
        target: owner.target,
        type_name: owner.type_name.to_string(),
        call: expectation.describe(),
        expected: expectation.times,
        actual,
        matched: shown_matched,
        unmatched: shown_unmatched,
        omitted,
    })))
}
