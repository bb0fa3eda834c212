//! Ordered alert severity levels.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Alert severity, ordered `Ok < Warn < Error`.
///
/// `Ok` is the rest level a leveled alert implicitly starts at, and the
/// success class used when a presence alert is cleared. `Error` is the
/// failure class used when a presence alert is raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Ok,
    Warn,
    Error,
}

impl Level {
    /// Uppercase tag used in rendered notification bodies.
    pub const fn tag(&self) -> &'static str {
        match self {
            Level::Ok => "OK",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Level::Ok => write!(f, "ok"),
            Level::Warn => write!(f, "warn"),
            Level::Error => write!(f, "error"),
        }
    }
}

impl FromStr for Level {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ok" | "success" => Ok(Level::Ok),
            "warn" | "warning" => Ok(Level::Warn),
            "error" | "crit" | "critical" => Ok(Level::Error),
            other => Err(format!("unknown level: '{other}'")),
        }
    }
}
