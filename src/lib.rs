//! # Log Router
//!
//! A structured-logging dispatcher that fans every event out to several
//! independently configured sinks.
//!
//! ## Features
//!
//! - **Multiple Sinks**: Console, rotating file and syslog, each with its own format
//! - **Per-Logger Overrides**: Named loggers can lower or raise a sink's threshold
//! - **Safe Reconfiguration**: New configurations are built in full before they
//!   replace the active one; old sinks are closed only after the swap
//! - **Thread Safe**: Loggers are shared freely across threads

pub mod core;
pub mod macros;
pub mod sinks;

pub mod prelude {
    pub use crate::core::{
        FieldValue, FilterTable, KeyValues, LevelSet, Logger, LoggerError, LoggerRegistry,
        LoggingConfig, OutputFormat, Record, RegistryState, Result, Section, Severity, Threshold,
    };
    pub use crate::sinks::{ConsoleSink, FileSink, FileSinkOptions};
}

pub use crate::core::{
    stack, Disposable, FieldValue, FilterTable, KeyValues, LevelSet, LifecycleManager, Logger,
    LoggerError, LoggerRegistry, LoggingConfig, OutputFormat, Record, RegistryBuilder,
    RegistryState, Reloadable, Result, RoutedLogger, Section, Severity, Sink, SinkKind, Threshold,
};
