//! Logging configuration surface
//!
//! Configuration is modeled as named sections of string keys, the shape of
//! an ini file (`[log]`, `[log.file]`, ...). Parsing the file syntax is left
//! to the caller; anything serde can read fills these types directly.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Name of the section carrying the global level and filters.
pub const ROOT_SECTION: &str = "log";

/// One configuration section: string keys to raw string values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Section {
    values: BTreeMap<String, String>,
}

impl Section {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// String value, or `default` when the key is missing or empty.
    pub fn string(&self, key: &str, default: &str) -> String {
        match self.get(key).map(str::trim) {
            Some(value) if !value.is_empty() => value.to_string(),
            _ => default.to_string(),
        }
    }

    /// Boolean value, or `default` when missing or unparsable.
    pub fn bool(&self, key: &str, default: bool) -> bool {
        match self.get(key).map(|v| v.trim().to_lowercase()).as_deref() {
            Some("true" | "1" | "yes" | "on") => true,
            Some("false" | "0" | "no" | "off") => false,
            _ => default,
        }
    }

    /// Integer value, or `default` when missing or unparsable.
    pub fn int(&self, key: &str, default: i32) -> i32 {
        self.get(key)
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(default)
    }

    /// 64-bit integer value, or `default` when missing or unparsable.
    pub fn int64(&self, key: &str, default: i64) -> i64 {
        self.get(key)
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(default)
    }
}

/// Whole logging configuration keyed by section name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LoggingConfig {
    sections: BTreeMap<String, Section>,
}

impl LoggingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set one key, creating the section on first use.
    ///
    /// # Example
    ///
    /// ```
    /// use log_router::LoggingConfig;
    ///
    /// let config = LoggingConfig::new()
    ///     .set("log", "level", "warn")
    ///     .set("log.file", "format", "json");
    /// assert_eq!(config.section("log.file").unwrap().get("format"), Some("json"));
    /// ```
    #[must_use]
    pub fn set(
        mut self,
        section: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.sections
            .entry(section.into())
            .or_default()
            .set(key, value);
        self
    }

    /// Declare a section with no keys, so a mode can run on defaults.
    #[must_use]
    pub fn with_section(mut self, name: impl Into<String>) -> Self {
        self.sections.entry(name.into()).or_default();
        self
    }

    pub fn insert_section(&mut self, name: impl Into<String>, section: Section) {
        self.sections.insert(name.into(), section);
    }

    pub fn section(&self, name: &str) -> Option<&Section> {
        self.sections.get(name)
    }

    /// Section for a mode, i.e. `log.<mode>`.
    pub fn mode_section(&self, mode: &str) -> Option<&Section> {
        self.sections.get(&format!("{}.{}", ROOT_SECTION, mode))
    }

    /// The `log` section, or an empty one.
    pub fn root(&self) -> Section {
        self.section(ROOT_SECTION).cloned().unwrap_or_default()
    }
}
