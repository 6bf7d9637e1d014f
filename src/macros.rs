//! Logging macros for building typed fields inline.
//!
//! Call-site pairs follow the message after a `;` as `key => value`.
//!
//! # Examples
//!
//! ```
//! use log_router::{info, warn, LoggerRegistry};
//!
//! let registry = LoggerRegistry::new();
//! let db = registry.new_logger("db", log_router::fields!("shard" => 3));
//!
//! // Message only
//! info!(registry, "server started");
//!
//! // With fields
//! warn!(db, "slow query"; "elapsed_ms" => 1250, "table" => "users");
//! ```

/// Build a [`KeyValues`](crate::KeyValues) sequence in order.
///
/// # Examples
///
/// ```
/// use log_router::fields;
///
/// let kv = fields!("code" => 500, "path" => "/api");
/// assert_eq!(kv.len(), 2);
/// assert!(fields!().is_empty());
/// ```
#[macro_export]
macro_rules! fields {
    () => {
        $crate::KeyValues::new()
    };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut kv = $crate::KeyValues::new();
        $(kv.push($key, $value);)+
        kv
    }};
}

/// Log at an explicit severity and return the write result.
///
/// # Examples
///
/// ```
/// # use log_router::{LoggerRegistry, Severity};
/// # let registry = LoggerRegistry::new();
/// use log_router::log;
/// log!(registry, Severity::Info, "simple message").unwrap();
/// log!(registry, Severity::Error, "request failed"; "code" => 500).unwrap();
/// ```
#[macro_export]
macro_rules! log {
    ($logger:expr, $level:expr, $msg:expr $(; $($key:expr => $value:expr),+ $(,)?)?) => {
        $logger.log($level, $msg, $crate::fields!($($($key => $value),+)?))
    };
}

// The severity macros below go through the convenience wrappers, which
// already report write failures, so their result is discarded.

/// Log a trace-level message.
#[macro_export]
macro_rules! trace {
    ($logger:expr, $msg:expr $(; $($key:expr => $value:expr),+ $(,)?)?) => {{
        let _ = $logger.trace($msg, $crate::fields!($($($key => $value),+)?));
    }};
}

/// Log a debug-level message.
///
/// # Examples
///
/// ```
/// # use log_router::LoggerRegistry;
/// # let registry = LoggerRegistry::new();
/// use log_router::debug;
/// debug!(registry, "cache miss"; "key" => "user:42");
/// ```
#[macro_export]
macro_rules! debug {
    ($logger:expr, $msg:expr $(; $($key:expr => $value:expr),+ $(,)?)?) => {{
        let _ = $logger.debug($msg, $crate::fields!($($($key => $value),+)?));
    }};
}

/// Log an info-level message.
#[macro_export]
macro_rules! info {
    ($logger:expr, $msg:expr $(; $($key:expr => $value:expr),+ $(,)?)?) => {{
        let _ = $logger.info($msg, $crate::fields!($($($key => $value),+)?));
    }};
}

/// Log a warning-level message.
#[macro_export]
macro_rules! warn {
    ($logger:expr, $msg:expr $(; $($key:expr => $value:expr),+ $(,)?)?) => {{
        let _ = $logger.warn($msg, $crate::fields!($($($key => $value),+)?));
    }};
}

/// Log an error-level message.
///
/// # Examples
///
/// ```
/// # use log_router::LoggerRegistry;
/// # let registry = LoggerRegistry::new();
/// use log_router::error;
/// error!(registry, "failed to connect"; "attempt" => 3, "retry" => true);
/// ```
#[macro_export]
macro_rules! error {
    ($logger:expr, $msg:expr $(; $($key:expr => $value:expr),+ $(,)?)?) => {{
        let _ = $logger.error($msg, $crate::fields!($($($key => $value),+)?));
    }};
}

/// Log a critical-level message.
#[macro_export]
macro_rules! crit {
    ($logger:expr, $msg:expr $(; $($key:expr => $value:expr),+ $(,)?)?) => {{
        let _ = $logger.crit($msg, $crate::fields!($($($key => $value),+)?));
    }};
}

#[cfg(test)]
mod tests {
    use crate::core::{FieldValue, KeyValues, Severity, Threshold};
    use crate::sinks::ConsoleSink;
    use crate::{FilterTable, LoggerRegistry, OutputFormat};
    use parking_lot::Mutex;
    use std::io::{self, Write};
    use std::sync::Arc;

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn registry(buf: &SharedBuf) -> LoggerRegistry {
        let sink = ConsoleSink::with_writer("buffer", OutputFormat::Logfmt, Box::new(buf.clone()));
        LoggerRegistry::builder()
            .route(Arc::new(sink), Threshold::AllowDebug, FilterTable::new())
            .build()
    }

    #[test]
    fn test_fields_macro_keeps_order_and_duplicates() {
        let kv: KeyValues = fields!("a" => 1, "b" => "two", "a" => 3.5,);
        let keys: Vec<&str> = kv.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["a", "b", "a"]);
        assert_eq!(kv.get("a"), Some(&FieldValue::Float(3.5)));
    }

    #[test]
    fn test_level_macros() {
        let buf = SharedBuf::default();
        let registry = registry(&buf);

        debug!(registry, "debugging");
        info!(registry, "with fields"; "code" => 200, "ok" => true);
        warn!(registry, "careful");
        error!(registry, "broken"; "attempt" => 2);
        crit!(registry, "down");
        trace!(registry, "trace maps to debug");

        let output = String::from_utf8_lossy(&buf.0.lock()).into_owned();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 6);
        assert!(lines[1].contains("code=200 ok=true"));
        assert!(lines[4].contains("level=critical"));
    }

    #[test]
    fn test_log_macro_returns_result() {
        let buf = SharedBuf::default();
        let registry = registry(&buf);

        assert!(log!(registry, Severity::Info, "plain").is_ok());
        assert!(log!(registry, Severity::Warn, "keyed"; "n" => 1).is_ok());
    }
}
