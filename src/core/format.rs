//! Output formats for rendering records into lines
//!
//! Provides the line renderers a sink can be configured with:
//! - Terminal: logfmt colored by severity
//! - Logfmt: plain key=value pairs
//! - Json: one JSON object per line

use super::error::Result;
use super::fields::FieldValue;
use super::level::Severity;
use super::record::Record;
use chrono::SecondsFormat;
use colored::{Color, Colorize};
use std::io::IsTerminal;

/// Key holding the event timestamp.
pub const TIME_KEY: &str = "t";
/// Key holding the event severity.
pub const LEVEL_KEY: &str = "level";
/// Key holding the event message.
pub const MESSAGE_KEY: &str = "msg";

/// Foreground and optional background color for a terminal line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TermColor {
    pub fg: Color,
    pub bg: Option<Color>,
}

/// Output format for log records
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Logfmt colored by severity, for interactive terminals
    ///
    /// Example: `t=2025-01-08T10:30:45.123Z level=warn msg="disk almost full"` in yellow
    Terminal,

    /// Logfmt format (key=value pairs, default)
    ///
    /// Example: `t=2025-01-08T10:30:45.123Z level=info msg="Request processed" logger=api`
    #[default]
    Logfmt,

    /// JSON format for machine processing
    ///
    /// Example: `{"t":"2025-01-08T10:30:45.123Z","level":"info","msg":"Request processed","logger":"api"}`
    Json,
}

impl OutputFormat {
    /// Pick a format from its configured name.
    ///
    /// `console` becomes `Terminal` only when stdout is a terminal; unknown
    /// names fall back to `Logfmt`.
    pub fn from_name(name: &str) -> Self {
        match name {
            "console" => {
                if std::io::stdout().is_terminal() {
                    OutputFormat::Terminal
                } else {
                    OutputFormat::Logfmt
                }
            }
            "json" => OutputFormat::Json,
            _ => OutputFormat::Logfmt,
        }
    }

    /// Render one record as a newline-terminated line.
    pub fn render(&self, record: &Record) -> Result<String> {
        let mut line = match self {
            OutputFormat::Terminal => Self::format_terminal(record),
            OutputFormat::Logfmt => Self::format_logfmt(record),
            OutputFormat::Json => Self::format_json(record)?,
        };
        line.push('\n');
        Ok(line)
    }

    /// Color used for a severity on an interactive terminal
    pub fn terminal_color(level: Severity) -> TermColor {
        match level {
            Severity::Trace | Severity::Debug => TermColor {
                fg: Color::BrightBlack,
                bg: None,
            },
            Severity::Info => TermColor {
                fg: Color::White,
                bg: None,
            },
            Severity::Warn => TermColor {
                fg: Color::Yellow,
                bg: None,
            },
            Severity::Error => TermColor {
                fg: Color::Red,
                bg: None,
            },
            Severity::Critical => TermColor {
                fg: Color::White,
                bg: Some(Color::Red),
            },
        }
    }

    fn format_timestamp(record: &Record) -> String {
        record.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    fn format_terminal(record: &Record) -> String {
        let line = Self::format_logfmt(record);
        let color = Self::terminal_color(record.level);
        let colored = line.color(color.fg);
        match color.bg {
            Some(bg) => colored.on_color(bg).to_string(),
            None => colored.to_string(),
        }
    }

    /// Format as logfmt (key=value pairs)
    fn format_logfmt(record: &Record) -> String {
        let mut parts = Vec::with_capacity(record.fields.len() + 3);

        parts.push(format!(
            "{}={}",
            TIME_KEY,
            Self::escape_logfmt_value(&Self::format_timestamp(record))
        ));
        parts.push(format!("{}={}", LEVEL_KEY, record.level.as_str()));
        parts.push(format!(
            "{}={}",
            MESSAGE_KEY,
            Self::escape_logfmt_value(&record.message)
        ));

        for (key, value) in record.fields.iter() {
            let formatted_value = match value {
                FieldValue::Int(i) => i.to_string(),
                FieldValue::Float(f) => f.to_string(),
                FieldValue::Bool(b) => b.to_string(),
                other => Self::escape_logfmt_value(&other.to_string()),
            };
            parts.push(format!("{}={}", Self::escape_logfmt_key(key), formatted_value));
        }

        parts.join(" ")
    }

    /// Format as JSON
    ///
    /// Pairs are written in record order and duplicate keys are kept, the
    /// same as the logfmt renderer. A map would sort and collapse them.
    fn format_json(record: &Record) -> Result<String> {
        let mut line = String::with_capacity(128);
        line.push('{');
        Self::push_json_pair(
            &mut line,
            TIME_KEY,
            &serde_json::Value::String(Self::format_timestamp(record)),
        )?;
        Self::push_json_pair(
            &mut line,
            LEVEL_KEY,
            &serde_json::Value::String(record.level.as_str().to_string()),
        )?;
        Self::push_json_pair(
            &mut line,
            MESSAGE_KEY,
            &serde_json::Value::String(record.message.clone()),
        )?;

        for (key, value) in record.fields.iter() {
            Self::push_json_pair(&mut line, key, &value.to_json_value())?;
        }

        line.push('}');
        Ok(line)
    }

    fn push_json_pair(line: &mut String, key: &str, value: &serde_json::Value) -> Result<()> {
        if line.len() > 1 {
            line.push(',');
        }
        line.push_str(&serde_json::to_string(key)?);
        line.push(':');
        line.push_str(&serde_json::to_string(value)?);
        Ok(())
    }

    /// Escape a logfmt key (remove spaces and special chars)
    fn escape_logfmt_key(key: &str) -> String {
        key.chars()
            .filter(|c| c.is_alphanumeric() || *c == '_' || *c == '-')
            .collect()
    }

    /// Escape a logfmt value (quote if it would not survive as a bare token)
    fn escape_logfmt_value(value: &str) -> String {
        let needs_quotes = value.is_empty()
            || value
                .chars()
                .any(|c| c == ' ' || c == '"' || c == '=' || c.is_control());
        if needs_quotes {
            Self::quote_logfmt_value(value)
        } else {
            value.to_string()
        }
    }

    fn quote_logfmt_value(value: &str) -> String {
        format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
    }
}
