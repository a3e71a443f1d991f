//! Identity and policy types for mocked entities.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Stable identity token of a mocked entity.
///
/// Tokens are unique within a process and survive `reset`; only a full
/// teardown of the owning registry retires them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TargetId(u64);

impl TargetId {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "mock#{}", self.0)
    }
}

/// How a mock target came into existence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OriginKind {
    /// An ordinary instance mock.
    Instance,
    /// A redirected free (module-level) function.
    Static,
    /// A redirected named singleton object.
    Singleton,
    /// The shared mock handed out by an intercepted constructor.
    ConstructorIntercept,
}

impl fmt::Display for OriginKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OriginKind::Instance => "instance",
            OriginKind::Static => "static",
            OriginKind::Singleton => "singleton",
            OriginKind::ConstructorIntercept => "constructor",
        };
        f.write_str(s)
    }
}

/// Default-answer policy applied when no stub matches a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MockMode {
    /// Unstubbed calls fail with an unstubbed-call error.
    #[default]
    Strict,
    /// Unstubbed calls return the zero value of the declared return type.
    Relaxed,
    /// Like `Relaxed`, but methods returning a declared mockable type
    /// return a memoized nested mock.
    DeepStubs,
    /// Unstubbed calls run the real implementation supplied by the caller.
    Spy,
}

impl fmt::Display for MockMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MockMode::Strict => "strict",
            MockMode::Relaxed => "relaxed",
            MockMode::DeepStubs => "deep_stubs",
            MockMode::Spy => "spy",
        };
        f.write_str(s)
    }
}

/// Error returned when a mode name cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown mock mode '{0}' (expected strict, relaxed, deep_stubs or spy)")]
pub struct ParseModeError(pub String);

impl FromStr for MockMode {
    type Err = ParseModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "strict" => Ok(MockMode::Strict),
            "relaxed" => Ok(MockMode::Relaxed),
            "deep_stubs" | "deep" => Ok(MockMode::DeepStubs),
            "spy" => Ok(MockMode::Spy),
            _ => Err(ParseModeError(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_parsing() {
        assert_eq!("strict".parse::<MockMode>(), Ok(MockMode::Strict));
        assert_eq!("Relaxed".parse::<MockMode>(), Ok(MockMode::Relaxed));
        assert_eq!("deep-stubs".parse::<MockMode>(), Ok(MockMode::DeepStubs));
        assert_eq!("spy".parse::<MockMode>(), Ok(MockMode::Spy));
        assert!("lenient".parse::<MockMode>().is_err());
    }

    #[test]
    fn test_mode_display_round_trips() {
        for mode in [
            MockMode::Strict,
            MockMode::Relaxed,
            MockMode::DeepStubs,
            MockMode::Spy,
        ] {
            assert_eq!(mode.to_string().parse::<MockMode>(), Ok(mode));
        }
    }

    #[test]
    fn test_target_id_display() {
        assert_eq!(TargetId::new(3).to_string(), "mock#3");
    }
}
