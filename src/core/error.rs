//! Error types for the log router

pub type Result<T> = std::result::Result<T, LoggerError>;

#[derive(Debug, thiserror::Error)]
pub enum LoggerError {
    /// IO error with context
    #[error("IO error while {operation}: {message}")]
    IoOperation {
        operation: String,
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A mode was requested but the configuration has no `log.<mode>` section
    #[error("failed to get config section log.{mode}")]
    UnknownMode { mode: String },

    /// Invalid configuration with details
    #[error("Invalid configuration for {component}: {message}")]
    InvalidConfiguration { component: String, message: String },

    /// Building one configured mode failed; nothing from that load was activated
    #[error("failed to initialize log mode '{mode}': {source}")]
    ModeLoad {
        mode: String,
        #[source]
        source: Box<LoggerError>,
    },

    /// File sink error with path
    #[error("File sink error for '{path}': {message}")]
    FileSinkError { path: String, message: String },

    /// File rotation error
    #[error("File rotation failed for '{path}': {message}")]
    FileRotationError { path: String, message: String },

    /// Syslog connection or transport error
    #[error("Syslog error: {message}")]
    Syslog { message: String },

    /// Write attempted on a sink that has already been closed
    #[error("Sink '{sink}' is closed")]
    SinkClosed { sink: String },

    /// Writer error (generic)
    #[error("Writer error: {0}")]
    WriterError(String),
}

impl LoggerError {
    /// Create an IO operation error with context
    pub fn io_operation(
        operation: impl Into<String>,
        message: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        LoggerError::IoOperation {
            operation: operation.into(),
            message: message.into(),
            source,
        }
    }

    /// Create an unknown mode error
    pub fn unknown_mode(mode: impl Into<String>) -> Self {
        LoggerError::UnknownMode { mode: mode.into() }
    }

    /// Create an invalid configuration error
    pub fn config(component: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::InvalidConfiguration {
            component: component.into(),
            message: message.into(),
        }
    }

    /// Wrap a construction failure with the mode that caused it
    pub fn mode_load(mode: impl Into<String>, source: LoggerError) -> Self {
        LoggerError::ModeLoad {
            mode: mode.into(),
            source: Box::new(source),
        }
    }

    /// Create a file sink error
    pub fn file_sink(path: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::FileSinkError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a file rotation error
    pub fn file_rotation(path: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::FileRotationError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a syslog error
    pub fn syslog(message: impl Into<String>) -> Self {
        LoggerError::Syslog {
            message: message.into(),
        }
    }

    /// Create a closed-sink error
    pub fn sink_closed(sink: impl Into<String>) -> Self {
        LoggerError::SinkClosed { sink: sink.into() }
    }

    /// Create a writer error (generic)
    pub fn writer<S: Into<String>>(msg: S) -> Self {
        LoggerError::WriterError(msg.into())
    }

    /// Whether this error came from loading configuration rather than writing an event
    #[must_use]
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            LoggerError::UnknownMode { .. }
                | LoggerError::InvalidConfiguration { .. }
                | LoggerError::ModeLoad { .. }
        )
    }
}
