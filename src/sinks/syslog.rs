//! Syslog sink
//!
//! Forwards rendered records to the local syslog daemon or a remote
//! collector over UDP or TCP, using RFC 3164 framing.

use crate::core::{
    Disposable, LoggerError, OutputFormat, Record, Result, Section, Severity, Sink, SinkKind,
};
use parking_lot::Mutex;
use std::path::Path;
use syslog::{Facility, Formatter3164, LoggerBackend};

type Connection = syslog::Logger<LoggerBackend, Formatter3164>;

const DEFAULT_FACILITY: &str = "local7";

/// Transport used to reach syslog
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyslogNetwork {
    /// Local daemon socket
    Local,
    Udp,
    Tcp,
}

impl SyslogNetwork {
    fn parse(name: &str) -> Result<Self> {
        match name.trim().to_lowercase().as_str() {
            "" | "unix" | "unixgram" => Ok(SyslogNetwork::Local),
            "udp" => Ok(SyslogNetwork::Udp),
            "tcp" => Ok(SyslogNetwork::Tcp),
            other => Err(LoggerError::config(
                "log.syslog",
                format!("unsupported network '{}'", other),
            )),
        }
    }
}

/// Connection settings for a [`SyslogSink`]
#[derive(Debug, Clone)]
pub struct SyslogOptions {
    pub network: SyslogNetwork,
    /// `host:port`; ignored for the local socket
    pub address: String,
    pub facility: Facility,
    pub tag: String,
    pub format: OutputFormat,
}

impl SyslogOptions {
    /// Read the `log.syslog` section
    ///
    /// # Errors
    ///
    /// Returns error for an unknown network or facility, or a remote
    /// network without an address
    pub fn from_section(section: &Section, format: OutputFormat) -> Result<Self> {
        let network = SyslogNetwork::parse(section.get("network").unwrap_or_default())?;
        let address = section.string("address", "");
        if network != SyslogNetwork::Local && address.is_empty() {
            return Err(LoggerError::config(
                "log.syslog",
                "an address is required for a remote network",
            ));
        }

        Ok(Self {
            network,
            address,
            facility: parse_facility(&section.string("facility", DEFAULT_FACILITY))?,
            tag: section.string("tag", &default_tag()),
            format,
        })
    }
}

/// Map a facility name such as `local7` or `daemon`
pub fn parse_facility(name: &str) -> Result<Facility> {
    match name.trim().to_lowercase().as_str() {
        "kern" => Ok(Facility::LOG_KERN),
        "user" => Ok(Facility::LOG_USER),
        "mail" => Ok(Facility::LOG_MAIL),
        "daemon" => Ok(Facility::LOG_DAEMON),
        "auth" => Ok(Facility::LOG_AUTH),
        "syslog" => Ok(Facility::LOG_SYSLOG),
        "lpr" => Ok(Facility::LOG_LPR),
        "news" => Ok(Facility::LOG_NEWS),
        "uucp" => Ok(Facility::LOG_UUCP),
        "cron" => Ok(Facility::LOG_CRON),
        "authpriv" => Ok(Facility::LOG_AUTHPRIV),
        "ftp" => Ok(Facility::LOG_FTP),
        "local0" => Ok(Facility::LOG_LOCAL0),
        "local1" => Ok(Facility::LOG_LOCAL1),
        "local2" => Ok(Facility::LOG_LOCAL2),
        "local3" => Ok(Facility::LOG_LOCAL3),
        "local4" => Ok(Facility::LOG_LOCAL4),
        "local5" => Ok(Facility::LOG_LOCAL5),
        "local6" => Ok(Facility::LOG_LOCAL6),
        "local7" => Ok(Facility::LOG_LOCAL7),
        other => Err(LoggerError::config(
            "log.syslog",
            format!("unknown facility '{}'", other),
        )),
    }
}

/// Name of the running executable
fn default_tag() -> String {
    std::env::args()
        .next()
        .as_deref()
        .and_then(|arg0| Path::new(arg0).file_name())
        .and_then(|name| name.to_str())
        .map(str::to_string)
        .unwrap_or_else(|| "log_router".to_string())
}

pub struct SyslogSink {
    format: OutputFormat,
    connection: Mutex<Option<Connection>>,
}

impl SyslogSink {
    /// Connect to syslog
    ///
    /// # Errors
    ///
    /// Returns error if the daemon or remote address cannot be reached
    pub fn connect(options: &SyslogOptions) -> Result<Self> {
        let formatter = Formatter3164 {
            facility: options.facility,
            hostname: None,
            process: options.tag.clone(),
            pid: std::process::id(),
        };

        let connection = match options.network {
            SyslogNetwork::Local => Self::connect_local(formatter)?,
            SyslogNetwork::Udp => {
                syslog::udp(formatter, "0.0.0.0:0", options.address.as_str()).map_err(|e| {
                    LoggerError::syslog(format!(
                        "Failed to connect to udp://{}: {}",
                        options.address, e
                    ))
                })?
            }
            SyslogNetwork::Tcp => {
                syslog::tcp(formatter, options.address.as_str()).map_err(|e| {
                    LoggerError::syslog(format!(
                        "Failed to connect to tcp://{}: {}",
                        options.address, e
                    ))
                })?
            }
        };

        Ok(Self {
            format: options.format,
            connection: Mutex::new(Some(connection)),
        })
    }

    #[cfg(unix)]
    fn connect_local(formatter: Formatter3164) -> Result<Connection> {
        syslog::unix(formatter)
            .map_err(|e| LoggerError::syslog(format!("Failed to connect to local syslog: {}", e)))
    }

    #[cfg(not(unix))]
    fn connect_local(_formatter: Formatter3164) -> Result<Connection> {
        Err(LoggerError::config(
            "log.syslog",
            "local syslog is only available on unix",
        ))
    }
}

impl Sink for SyslogSink {
    fn write(&self, record: &Record) -> Result<()> {
        let line = self.format.render(record)?;
        let message = line.trim_end_matches('\n');

        let mut guard = self.connection.lock();
        let connection = guard
            .as_mut()
            .ok_or_else(|| LoggerError::sink_closed("syslog"))?;

        let sent = match record.level {
            Severity::Trace | Severity::Debug => connection.debug(message),
            Severity::Info => connection.info(message),
            Severity::Warn => connection.warning(message),
            Severity::Error => connection.err(message),
            Severity::Critical => connection.crit(message),
        };
        sent.map_err(|e| LoggerError::syslog(format!("Failed to send record: {}", e)))
    }

    fn flush(&self) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &str {
        "syslog"
    }

    fn kind(&self) -> SinkKind {
        SinkKind::Syslog
    }
}

impl Disposable for SyslogSink {
    fn close(&self) -> Result<()> {
        self.connection.lock().take();
        Ok(())
    }
}
