use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Concurrency policy for a multi-hotel run. Exactly one governs a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyMode {
    /// One fresh browser session per hotel, torn down before the next.
    #[default]
    Isolated,
    /// One browser session for the whole run, one tab per hotel.
    SharedSession,
    /// Fixed-width pool; every task owns its own browser session.
    BoundedParallel,
}

impl StrategyMode {
    /// Maps the scheduler's numeric codes (`1`, `2`, `3`) to a mode.
    ///
    /// Unknown codes fall back to [`StrategyMode::Isolated`], the safest mode.
    #[must_use]
    pub fn from_code(code: u8) -> Self {
        match code {
            2 => StrategyMode::SharedSession,
            3 => StrategyMode::BoundedParallel,
            _ => StrategyMode::Isolated,
        }
    }
}

impl std::fmt::Display for StrategyMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StrategyMode::Isolated => write!(f, "isolated"),
            StrategyMode::SharedSession => write!(f, "shared"),
            StrategyMode::BoundedParallel => write!(f, "parallel"),
        }
    }
}

impl FromStr for StrategyMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "1" | "isolated" => Ok(StrategyMode::Isolated),
            "2" | "shared" | "shared_session" | "shared-session" => {
                Ok(StrategyMode::SharedSession)
            }
            "3" | "parallel" | "bounded_parallel" | "bounded-parallel" => {
                Ok(StrategyMode::BoundedParallel)
            }
            other => Err(format!(
                "unknown strategy '{other}'; expected 1|2|3 or isolated|shared|parallel"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_numeric_codes() {
        assert_eq!("1".parse::<StrategyMode>(), Ok(StrategyMode::Isolated));
        assert_eq!("2".parse::<StrategyMode>(), Ok(StrategyMode::SharedSession));
        assert_eq!(
            "3".parse::<StrategyMode>(),
            Ok(StrategyMode::BoundedParallel)
        );
    }

    #[test]
    fn parses_names_case_insensitively() {
        assert_eq!(
            "Shared".parse::<StrategyMode>(),
            Ok(StrategyMode::SharedSession)
        );
        assert_eq!(
            " parallel ".parse::<StrategyMode>(),
            Ok(StrategyMode::BoundedParallel)
        );
    }

    #[test]
    fn rejects_unknown_name() {
        let err = "turbo".parse::<StrategyMode>().unwrap_err();
        assert!(err.contains("turbo"));
    }

    #[test]
    fn unknown_code_falls_back_to_isolated() {
        assert_eq!(StrategyMode::from_code(9), StrategyMode::Isolated);
        assert_eq!(StrategyMode::from_code(3), StrategyMode::BoundedParallel);
    }

    #[test]
    fn display_round_trips_through_from_str() {
        for mode in [
            StrategyMode::Isolated,
            StrategyMode::SharedSession,
            StrategyMode::BoundedParallel,
        ] {
            assert_eq!(mode.to_string().parse::<StrategyMode>(), Ok(mode));
        }
    }
}
