//! Typed key/value pairs attached to log events
//!
//! This module provides:
//! - `FieldValue`: the tagged value carried by one pair
//! - `KeyValues`: an ordered pair sequence that keeps duplicate keys
//! - `stack`: the caller's stack trace as a field value

use chrono::{DateTime, SecondsFormat, Utc};
use std::backtrace::{Backtrace, BacktraceStatus};
use std::fmt;
use std::path::Path;

/// Value type for structured logging fields
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Time(DateTime<Utc>),
    Error(String),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::String(s) => write!(f, "{}", s),
            FieldValue::Int(i) => write!(f, "{}", i),
            FieldValue::Float(fl) => write!(f, "{}", fl),
            FieldValue::Bool(b) => write!(f, "{}", b),
            FieldValue::Time(t) => write!(f, "{}", t.to_rfc3339_opts(SecondsFormat::Millis, true)),
            FieldValue::Error(e) => write!(f, "{}", e),
        }
    }
}

impl FieldValue {
    /// Capture an error by its display text.
    pub fn error(err: &dyn std::error::Error) -> Self {
        FieldValue::Error(err.to_string())
    }

    /// Convert to serde_json::Value for JSON serialization
    #[must_use]
    pub fn to_json_value(&self) -> serde_json::Value {
        match self {
            FieldValue::String(s) | FieldValue::Error(s) => serde_json::Value::String(s.clone()),
            FieldValue::Int(i) => serde_json::Value::Number((*i).into()),
            FieldValue::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            FieldValue::Bool(b) => serde_json::Value::Bool(*b),
            FieldValue::Time(_) => serde_json::Value::String(self.to_string()),
        }
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::String(s)
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::String(s.to_string())
    }
}

impl From<i64> for FieldValue {
    fn from(i: i64) -> Self {
        FieldValue::Int(i)
    }
}

impl From<i32> for FieldValue {
    fn from(i: i32) -> Self {
        FieldValue::Int(i64::from(i))
    }
}

impl From<u32> for FieldValue {
    fn from(i: u32) -> Self {
        FieldValue::Int(i64::from(i))
    }
}

impl From<u64> for FieldValue {
    fn from(i: u64) -> Self {
        FieldValue::Int(i64::try_from(i).unwrap_or(i64::MAX))
    }
}

impl From<usize> for FieldValue {
    fn from(i: usize) -> Self {
        FieldValue::Int(i64::try_from(i).unwrap_or(i64::MAX))
    }
}

impl From<f64> for FieldValue {
    fn from(f: f64) -> Self {
        FieldValue::Float(f)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Bool(b)
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(t: DateTime<Utc>) -> Self {
        FieldValue::Time(t)
    }
}

/// Symbol prefixes of frames that belong to the standard library or the
/// program entry, not to the code being logged.
const RUNTIME_PREFIXES: &[&str] = &[
    "std::", "core::", "alloc::", "<std::", "<core::", "<alloc::", "__", "_start", "start_thread",
    "clone",
];

/// Capture the current stack as `[symbol@file:line ...]`.
///
/// `skip` drops that many frames above the caller, so a helper that logs on
/// behalf of its own caller passes `1`. Runtime frames are trimmed.
///
/// # Examples
///
/// ```
/// use log_router::core::fields::stack;
/// use log_router::fields;
///
/// let kv = fields!("stack" => stack(0));
/// assert!(kv.get("stack").unwrap().to_string().starts_with('['));
/// ```
pub fn stack(skip: usize) -> FieldValue {
    let trace = Backtrace::force_capture();
    if trace.status() != BacktraceStatus::Captured {
        return FieldValue::String("[]".to_string());
    }

    let frames = parse_frames(&trace.to_string());
    let start = frames
        .iter()
        .position(|frame| frame.symbol.ends_with("core::fields::stack"))
        .map_or(0, |pos| pos + 1);

    let rendered: Vec<String> = frames
        .into_iter()
        .skip(start.saturating_add(skip))
        .filter(|frame| !is_runtime(&frame.symbol))
        .map(|frame| frame.render())
        .collect();
    FieldValue::String(format!("[{}]", rendered.join(" ")))
}

struct Frame {
    symbol: String,
    location: Option<String>,
}

impl Frame {
    fn render(&self) -> String {
        match &self.location {
            Some(location) => format!("{}@{}", self.symbol, location),
            None => self.symbol.clone(),
        }
    }
}

fn is_runtime(symbol: &str) -> bool {
    symbol == "main" || RUNTIME_PREFIXES.iter().any(|prefix| symbol.starts_with(prefix))
}

/// Parse the `N: symbol` / `at path:line:col` layout of a captured backtrace.
fn parse_frames(text: &str) -> Vec<Frame> {
    let mut frames: Vec<Frame> = Vec::new();
    for line in text.lines().map(str::trim) {
        if let Some(at) = line.strip_prefix("at ") {
            if let Some(frame) = frames.last_mut() {
                if frame.location.is_none() {
                    frame.location = short_location(at);
                }
            }
            continue;
        }
        let Some((index, symbol)) = line.split_once(": ") else {
            continue;
        };
        if index.parse::<usize>().is_ok() {
            frames.push(Frame {
                symbol: symbol.to_string(),
                location: None,
            });
        }
    }
    frames
}

/// `/src/app/db.rs:42:9` becomes `db.rs:42`.
fn short_location(at: &str) -> Option<String> {
    let (rest, _column) = at.rsplit_once(':')?;
    let (path, line) = rest.rsplit_once(':')?;
    let file = Path::new(path).file_name()?.to_str()?;
    Some(format!("{}:{}", file, line))
}

/// Ordered key/value pairs. Duplicate keys are kept in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KeyValues {
    pairs: Vec<(String, FieldValue)>,
}

impl KeyValues {
    pub fn new() -> Self {
        Self { pairs: Vec::new() }
    }

    /// Add a pair (builder version)
    pub fn with<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<FieldValue>,
    {
        self.pairs.push((key.into(), value.into()));
        self
    }

    /// Add a pair (mutable version)
    pub fn push<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: Into<FieldValue>,
    {
        self.pairs.push((key.into(), value.into()));
    }

    /// Append every pair of `other`, keeping its order.
    pub fn extend_from(&mut self, other: &KeyValues) {
        self.pairs.extend(other.pairs.iter().cloned());
    }

    /// Last value recorded for `key`.
    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.pairs.iter().rev().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Format pairs as space separated key=value
    pub fn format_fields(&self) -> String {
        self.pairs
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Display for KeyValues {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_fields())
    }
}

impl<K: Into<String>, V: Into<FieldValue>> FromIterator<(K, V)> for KeyValues {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            pairs: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

impl IntoIterator for KeyValues {
    type Item = (String, FieldValue);
    type IntoIter = std::vec::IntoIter<(String, FieldValue)>;

    fn into_iter(self) -> Self::IntoIter {
        self.pairs.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_values_keep_order() {
        let kv = KeyValues::new()
            .with("user_id", 123)
            .with("username", "john_doe")
            .with("active", true);

        let keys: Vec<&str> = kv.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["user_id", "username", "active"]);
    }

    #[test]
    fn test_duplicate_keys_are_kept() {
        let kv = KeyValues::new().with("attempt", 1).with("attempt", 2);

        assert_eq!(kv.len(), 2);
        assert_eq!(kv.get("attempt"), Some(&FieldValue::Int(2)));
        assert_eq!(kv.format_fields(), "attempt=1 attempt=2");
    }

    #[test]
    fn test_error_value() {
        let io_err = std::io::Error::new(std::io::ErrorKind::Other, "disk gone");
        let value = FieldValue::error(&io_err);

        assert_eq!(value.to_string(), "disk gone");
        assert_eq!(value.to_json_value(), serde_json::json!("disk gone"));
    }

    #[test]
    fn test_json_values() {
        assert_eq!(FieldValue::from(500).to_json_value(), serde_json::json!(500));
        assert_eq!(FieldValue::from(1.5).to_json_value(), serde_json::json!(1.5));
        assert_eq!(FieldValue::Float(f64::NAN).to_json_value(), serde_json::Value::Null);
        assert_eq!(FieldValue::from(false).to_json_value(), serde_json::json!(false));
    }

    #[inline(never)]
    fn capture_here(skip: usize) -> String {
        stack(skip).to_string()
    }

    #[test]
    fn test_stack_starts_at_caller() {
        let trace = capture_here(0);

        assert!(trace.starts_with('[') && trace.ends_with(']'));
        assert!(trace.contains("capture_here"));
        assert!(trace.contains("fields.rs:"));
        assert!(!trace.contains("core::fields::stack@"));
        assert!(!trace.contains("std::backtrace"));
    }

    #[test]
    fn test_stack_skip_drops_caller_frames() {
        let trace = capture_here(1);

        assert!(!trace.contains("capture_here"));
        assert!(trace.contains("test_stack_skip_drops_caller_frames"));
    }

    #[test]
    fn test_parse_frames() {
        let text = "   0: app::db::query\n             at /src/app/db.rs:42:9\n   1: std::rt::lang_start\n   2: main\n";
        let frames = parse_frames(text);

        assert_eq!(frames.len(), 3);
        assert_eq!(frames[0].render(), "app::db::query@db.rs:42");
        assert!(is_runtime(&frames[1].symbol));
        assert!(is_runtime(&frames[2].symbol));
    }

    #[test]
    fn test_extend_from() {
        let mut kv = KeyValues::new().with("logger", "db");
        kv.extend_from(&KeyValues::new().with("code", 500));

        assert_eq!(kv.format_fields(), "logger=db code=500");
    }
}
