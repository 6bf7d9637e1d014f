//! Sink trait for log output destinations

use super::{error::Result, record::Record};
use std::fmt;

/// Which kind of destination a sink writes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SinkKind {
    Console,
    File,
    Syslog,
}

impl SinkKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SinkKind::Console => "console",
            SinkKind::File => "file",
            SinkKind::Syslog => "syslog",
        }
    }
}

impl fmt::Display for SinkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A destination shared by every logger of a generation.
///
/// Methods take `&self`; implementations serialize concurrent writers
/// internally so lines never interleave.
pub trait Sink: Send + Sync {
    fn write(&self, record: &Record) -> Result<()>;
    fn flush(&self) -> Result<()>;
    fn name(&self) -> &str;
    fn kind(&self) -> SinkKind;
}
