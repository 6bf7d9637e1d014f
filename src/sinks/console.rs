//! Console sink implementation

use crate::core::{OutputFormat, Record, Result, Sink, SinkKind};
use parking_lot::Mutex;
use std::io::{self, Write};

pub struct ConsoleSink {
    name: String,
    format: OutputFormat,
    writer: Mutex<Box<dyn Write + Send>>,
}

impl ConsoleSink {
    /// Console sink writing to standard output
    pub fn stdout(format: OutputFormat) -> Self {
        Self::with_writer("console", format, Box::new(io::stdout()))
    }

    /// Console sink writing to standard error
    pub fn stderr(format: OutputFormat) -> Self {
        Self::with_writer("stderr", format, Box::new(io::stderr()))
    }

    /// Console sink writing to an arbitrary writer
    ///
    /// # Example
    ///
    /// ```
    /// use log_router::sinks::ConsoleSink;
    /// use log_router::OutputFormat;
    ///
    /// let sink = ConsoleSink::with_writer("buffer", OutputFormat::Json, Box::new(Vec::new()));
    /// ```
    pub fn with_writer(
        name: impl Into<String>,
        format: OutputFormat,
        writer: Box<dyn Write + Send>,
    ) -> Self {
        Self {
            name: name.into(),
            format,
            writer: Mutex::new(writer),
        }
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }
}

impl Sink for ConsoleSink {
    fn write(&self, record: &Record) -> Result<()> {
        let line = self.format.render(record)?;

        // One locked write per line keeps concurrent writers from interleaving
        let mut writer = self.writer.lock();
        writer.write_all(line.as_bytes())?;
        writer.flush()?;
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        self.writer.lock().flush()?;
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> SinkKind {
        SinkKind::Console
    }
}
