//! Core dispatcher types and traits

pub mod config;
pub mod error;
pub mod fields;
pub mod filter;
pub mod format;
pub mod level;
pub mod lifecycle;
pub mod record;
pub mod registry;
pub mod routed;
pub mod sink;

pub use config::{LoggingConfig, Section, ROOT_SECTION};
pub use error::{LoggerError, Result};
pub use fields::{stack, FieldValue, KeyValues};
pub use filter::FilterTable;
pub use format::{OutputFormat, TermColor, LEVEL_KEY, MESSAGE_KEY, TIME_KEY};
pub use level::{LevelSet, Severity, Threshold};
pub use lifecycle::{Disposable, LifecycleManager, Reloadable};
pub use record::Record;
pub use registry::{Logger, LoggerRegistry, RegistryBuilder, RegistryState, LOGGER_KEY};
pub use routed::RoutedLogger;
pub use sink::{Sink, SinkKind};
