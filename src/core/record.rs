//! Log record passed from the dispatcher to every sink

use super::fields::KeyValues;
use super::level::Severity;
use chrono::{DateTime, Utc};

#[derive(Debug, Clone)]
pub struct Record {
    pub level: Severity,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    /// Logger context pairs followed by call-site pairs.
    pub fields: KeyValues,
}

impl Record {
    /// Sanitize log message to prevent log injection attacks
    ///
    /// Replaces newlines, carriage returns, and tabs with escape sequences
    /// to prevent attackers from injecting fake log entries.
    fn sanitize_message(message: &str) -> String {
        message
            .replace('\n', "\\n")
            .replace('\r', "\\r")
            .replace('\t', "\\t")
    }

    pub fn new(level: Severity, message: impl Into<String>) -> Self {
        Self {
            level,
            message: Self::sanitize_message(&message.into()),
            timestamp: Utc::now(),
            fields: KeyValues::new(),
        }
    }

    pub fn with_fields(mut self, fields: KeyValues) -> Self {
        self.fields = fields;
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }
}
