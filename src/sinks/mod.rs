//! Sink implementations

pub mod console;
pub mod rotating_file;

#[cfg(feature = "syslog")]
pub mod syslog;

pub use console::ConsoleSink;
pub use rotating_file::{FileSink, FileSinkOptions, DEFAULT_FILE_NAME};

#[cfg(feature = "syslog")]
pub use self::syslog::{SyslogNetwork, SyslogOptions, SyslogSink};

pub use crate::core::Sink;

use crate::core::{LifecycleManager, LoggerError, OutputFormat, Result, Section};
use std::path::Path;
use std::sync::Arc;

/// Build the sink for one configured mode.
///
/// Sinks holding OS resources are registered with `lifecycle` so the
/// generation that owns them can close or reopen them later.
pub fn build_sink(
    mode: &str,
    section: &Section,
    logs_path: &Path,
    format: OutputFormat,
    lifecycle: &mut LifecycleManager,
) -> Result<Arc<dyn Sink>> {
    match mode {
        "console" => Ok(Arc::new(ConsoleSink::stdout(format))),
        "file" => {
            let options = FileSinkOptions::from_section(section, logs_path, format)?;
            let sink = Arc::new(FileSink::new(options)?);
            lifecycle.register_disposable(sink.clone());
            lifecycle.register_reloadable(sink.clone());
            Ok(sink)
        }
        "syslog" => build_syslog(section, format, lifecycle),
        other => Err(LoggerError::config(
            format!("log.{}", other),
            "unsupported log mode",
        )),
    }
}

#[cfg(feature = "syslog")]
fn build_syslog(
    section: &Section,
    format: OutputFormat,
    lifecycle: &mut LifecycleManager,
) -> Result<Arc<dyn Sink>> {
    let options = SyslogOptions::from_section(section, format)?;
    let sink = Arc::new(SyslogSink::connect(&options)?);
    lifecycle.register_disposable(sink.clone());
    Ok(sink)
}

#[cfg(not(feature = "syslog"))]
fn build_syslog(
    _section: &Section,
    _format: OutputFormat,
    _lifecycle: &mut LifecycleManager,
) -> Result<Arc<dyn Sink>> {
    Err(LoggerError::config(
        "log.syslog",
        "built without the `syslog` feature",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::SinkKind;
    use tempfile::tempdir;

    #[test]
    fn test_file_mode_registers_lifecycle() {
        let dir = tempdir().unwrap();
        let mut lifecycle = LifecycleManager::new();

        let sink = build_sink(
            "file",
            &Section::new(),
            dir.path(),
            OutputFormat::Json,
            &mut lifecycle,
        )
        .unwrap();

        assert_eq!(sink.kind(), SinkKind::File);
        assert_eq!(lifecycle.disposable_count(), 1);
        assert_eq!(lifecycle.reloadable_count(), 1);
        assert!(dir.path().join(DEFAULT_FILE_NAME).exists());
    }

    #[test]
    fn test_console_mode_has_no_lifecycle() {
        let mut lifecycle = LifecycleManager::new();
        let sink = build_sink(
            "console",
            &Section::new(),
            Path::new("."),
            OutputFormat::Logfmt,
            &mut lifecycle,
        )
        .unwrap();

        assert_eq!(sink.kind(), SinkKind::Console);
        assert_eq!(lifecycle.disposable_count(), 0);
    }

    #[test]
    fn test_unsupported_mode() {
        let mut lifecycle = LifecycleManager::new();
        let result = build_sink(
            "carrier-pigeon",
            &Section::new(),
            Path::new("."),
            OutputFormat::Logfmt,
            &mut lifecycle,
        );
        assert!(matches!(result, Err(LoggerError::InvalidConfiguration { .. })));
    }
}
