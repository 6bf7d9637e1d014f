//! Severity and threshold definitions

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Severity carried by a single event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Trace = 0,
    Debug = 1,
    Info = 2,
    Warn = 3,
    Error = 4,
    Critical = 5,
}

impl Severity {
    pub const ALL: [Severity; 6] = [
        Severity::Trace,
        Severity::Debug,
        Severity::Info,
        Severity::Warn,
        Severity::Error,
        Severity::Critical,
    ];

    /// Value stamped under the `level` key.
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Trace => "trace",
            Severity::Debug => "debug",
            Severity::Info => "info",
            Severity::Warn => "warn",
            Severity::Error => "error",
            Severity::Critical => "critical",
        }
    }

    /// Filtering rank. Trace shares a rank with Debug and Critical with Error.
    #[must_use]
    pub fn rank(&self) -> u8 {
        match self {
            Severity::Trace | Severity::Debug => 0,
            Severity::Info => 1,
            Severity::Warn => 2,
            Severity::Error | Severity::Critical => 3,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(Severity::Trace),
            "debug" => Ok(Severity::Debug),
            "info" => Ok(Severity::Info),
            "warn" | "warning" => Ok(Severity::Warn),
            "error" => Ok(Severity::Error),
            "critical" | "crit" => Ok(Severity::Critical),
            _ => Err(format!("Invalid severity: '{}'", s)),
        }
    }
}

/// Minimum severity a sink lets through.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Threshold {
    AllowDebug,
    #[default]
    AllowInfo,
    AllowWarn,
    AllowError,
}

impl Threshold {
    /// Whether an event at `severity` passes this threshold.
    #[inline]
    #[must_use]
    pub fn allows(&self, severity: Severity) -> bool {
        severity.rank() >= self.rank()
    }

    #[must_use]
    pub fn rank(&self) -> u8 {
        match self {
            Threshold::AllowDebug => 0,
            Threshold::AllowInfo => 1,
            Threshold::AllowWarn => 2,
            Threshold::AllowError => 3,
        }
    }
}

impl From<Severity> for Threshold {
    fn from(severity: Severity) -> Self {
        match severity {
            Severity::Trace | Severity::Debug => Threshold::AllowDebug,
            Severity::Info => Threshold::AllowInfo,
            Severity::Warn => Threshold::AllowWarn,
            Severity::Error | Severity::Critical => Threshold::AllowError,
        }
    }
}

/// Lookup table from configured level names to thresholds.
pub struct LevelSet;

impl LevelSet {
    const LEVELS: [(&'static str, Threshold); 6] = [
        ("trace", Threshold::AllowDebug),
        ("debug", Threshold::AllowDebug),
        ("info", Threshold::AllowInfo),
        ("warn", Threshold::AllowWarn),
        ("error", Threshold::AllowError),
        ("critical", Threshold::AllowError),
    ];

    /// Exact lookup; names are expected lowercase.
    #[must_use]
    pub fn lookup(name: &str) -> Option<Threshold> {
        Self::LEVELS
            .iter()
            .find(|(level, _)| *level == name)
            .map(|(_, threshold)| *threshold)
    }

    /// Resolve a level name, degrading unknown names to `AllowError`.
    ///
    /// `on_unknown` receives the offending name so the caller can report it
    /// through whatever registry is installed at that moment.
    pub fn resolve(name: &str, on_unknown: impl FnOnce(&str)) -> Threshold {
        match Self::lookup(name) {
            Some(threshold) => threshold,
            None => {
                on_unknown(name);
                Threshold::AllowError
            }
        }
    }
}
