//! Rotating file sink
//!
//! Writes rendered records to a file and rotates it by line count, size, or
//! calendar day. Rotated segments are renamed to `<file>.<YYYY-MM-DD>.<NNN>`
//! and segments older than the retention window are removed.

use crate::core::{
    Disposable, LoggerError, OutputFormat, Record, Reloadable, Result, Section, Sink, SinkKind,
};
use chrono::{Local, NaiveDate};
use parking_lot::Mutex;
use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

/// File name used when `file_name` is not configured.
pub const DEFAULT_FILE_NAME: &str = "grafana.log";

const SECONDS_PER_DAY: u64 = 24 * 60 * 60;
const MAX_SEGMENT_NUMBER: u32 = 999;

/// Settings for a [`FileSink`]
///
/// # Examples
///
/// ```
/// use log_router::sinks::FileSinkOptions;
///
/// let options = FileSinkOptions::new("/var/log/app/app.log")
///     .with_max_lines(10_000)
///     .with_max_size(64 * 1024 * 1024)
///     .with_daily(false);
/// assert!(options.rotate);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct FileSinkOptions {
    pub path: PathBuf,
    pub format: OutputFormat,
    /// Master switch; when off the file grows forever
    pub rotate: bool,
    /// Rotate once this many lines were written (0 disables)
    pub max_lines: usize,
    /// Rotate once the file reaches this many bytes (0 disables)
    pub max_size: u64,
    /// Rotate when the calendar day changes
    pub daily: bool,
    /// Delete rotated segments older than this many days (<= 0 keeps all)
    pub max_days: i64,
}

impl FileSinkOptions {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            format: OutputFormat::default(),
            rotate: true,
            max_lines: 1_000_000,
            max_size: 1 << 28,
            daily: true,
            max_days: 7,
        }
    }

    /// Read the `log.file` section; `logs_path` supplies the default location.
    pub fn from_section(section: &Section, logs_path: &Path, format: OutputFormat) -> Result<Self> {
        let path = match section.get("file_name").map(str::trim) {
            Some(name) if !name.is_empty() => PathBuf::from(name),
            _ => logs_path.join(DEFAULT_FILE_NAME),
        };

        let shift = section.int("max_size_shift", 28);
        let max_size = u32::try_from(shift)
            .ok()
            .and_then(|shift| 1u64.checked_shl(shift))
            .ok_or_else(|| {
                LoggerError::config("log.file", format!("max_size_shift {} is out of range", shift))
            })?;

        Ok(Self {
            path,
            format,
            rotate: section.bool("log_rotate", true),
            max_lines: usize::try_from(section.int("max_lines", 1_000_000)).unwrap_or(0),
            max_size,
            daily: section.bool("daily_rotate", true),
            max_days: section.int64("max_days", 7),
        })
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_rotate(mut self, rotate: bool) -> Self {
        self.rotate = rotate;
        self
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_max_lines(mut self, max_lines: usize) -> Self {
        self.max_lines = max_lines;
        self
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_max_size(mut self, max_size: u64) -> Self {
        self.max_size = max_size;
        self
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_daily(mut self, daily: bool) -> Self {
        self.daily = daily;
        self
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_max_days(mut self, max_days: i64) -> Self {
        self.max_days = max_days;
        self
    }
}

struct FileState {
    writer: Option<BufWriter<File>>,
    lines: usize,
    size: u64,
    open_date: NaiveDate,
    closed: bool,
}

/// File sink with line, size and daily rotation plus in-place reopen
///
/// # Examples
///
/// ```no_run
/// use log_router::sinks::{FileSink, FileSinkOptions};
///
/// let sink = FileSink::new(FileSinkOptions::new("/var/log/app/app.log")).unwrap();
/// ```
pub struct FileSink {
    options: FileSinkOptions,
    state: Mutex<FileState>,
}

impl FileSink {
    /// Create the parent directory if needed and open the file for appending
    ///
    /// # Errors
    ///
    /// Returns error if the directory or file cannot be created or opened
    pub fn new(options: FileSinkOptions) -> Result<Self> {
        if let Some(parent) = options.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| {
                    LoggerError::io_operation(
                        "create log directory",
                        format!("Failed to create directory '{}'", parent.display()),
                        e,
                    )
                })?;
            }
        }

        let state = Self::open(&options)?;
        Ok(Self {
            options,
            state: Mutex::new(state),
        })
    }

    /// Open the configured path and read back its line count and size
    fn open(options: &FileSinkOptions) -> Result<FileState> {
        let path = &options.path;
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| {
                LoggerError::file_sink(path.display().to_string(), format!("Failed to open: {}", e))
            })?;

        let size = file
            .metadata()
            .map_err(|e| {
                LoggerError::file_sink(
                    path.display().to_string(),
                    format!("Cannot access file metadata: {}", e),
                )
            })?
            .len();

        let lines = if options.rotate && options.max_lines > 0 && size > 0 {
            Self::count_lines(path)?
        } else {
            0
        };

        Ok(FileState {
            writer: Some(BufWriter::new(file)),
            lines,
            size,
            open_date: Local::now().date_naive(),
            closed: false,
        })
    }

    fn count_lines(path: &Path) -> Result<usize> {
        let file = File::open(path).map_err(|e| {
            LoggerError::io_operation(
                "count log lines",
                format!("Failed to open '{}'", path.display()),
                e,
            )
        })?;
        let mut reader = BufReader::with_capacity(64 * 1024, file);
        let mut buffer = vec![0u8; 64 * 1024];
        let mut lines = 0;
        loop {
            let bytes_read = reader.read(&mut buffer)?;
            if bytes_read == 0 {
                break;
            }
            lines += buffer[..bytes_read].iter().filter(|b| **b == b'\n').count();
        }
        Ok(lines)
    }

    /// Check if rotation is needed before writing the next line
    fn should_rotate(&self, state: &FileState, today: NaiveDate) -> bool {
        if !self.options.rotate {
            return false;
        }
        let lines_exceeded = self.options.max_lines > 0 && state.lines >= self.options.max_lines;
        let size_exceeded = self.options.max_size > 0 && state.size >= self.options.max_size;
        let day_changed = self.options.daily && today != state.open_date;

        lines_exceeded || size_exceeded || day_changed
    }

    /// Rename the live file to the next free segment and start a new one
    fn rotate(&self, state: &mut FileState) -> Result<()> {
        let path = &self.options.path;

        // Flush and release the handle before renaming
        if let Some(mut writer) = state.writer.take() {
            writer.flush().map_err(|e| {
                LoggerError::file_rotation(
                    path.display().to_string(),
                    format!("Failed to flush before rotation: {}", e),
                )
            })?;
        }

        if path.exists() {
            let segment = self.free_segment_path(state.open_date)?;
            fs::rename(path, &segment).map_err(|e| {
                LoggerError::file_rotation(
                    path.display().to_string(),
                    format!("Failed to rotate current log file: {}", e),
                )
            })?;
        }

        *state = Self::open(&self.options)?;
        self.delete_old_segments();
        Ok(())
    }

    /// First unused `<file>.<date>.<NNN>` name
    fn free_segment_path(&self, date: NaiveDate) -> Result<PathBuf> {
        let path = &self.options.path;
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(DEFAULT_FILE_NAME);

        (1..=MAX_SEGMENT_NUMBER)
            .map(|num| {
                path.with_file_name(format!("{}.{}.{:03}", filename, date.format("%Y-%m-%d"), num))
            })
            .find(|candidate| !candidate.exists())
            .ok_or_else(|| {
                LoggerError::file_rotation(
                    path.display().to_string(),
                    "Cannot find free log number to rename",
                )
            })
    }

    /// Remove rotated segments past the retention window
    fn delete_old_segments(&self) {
        let Ok(max_days) = u64::try_from(self.options.max_days) else {
            return;
        };
        if max_days == 0 {
            return;
        }

        let path = &self.options.path;
        let Some(prefix) = path.file_name().and_then(|n| n.to_str()) else {
            return;
        };
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let cutoff = SystemTime::now()
            .checked_sub(Duration::from_secs(max_days.saturating_mul(SECONDS_PER_DAY)))
            .unwrap_or(SystemTime::UNIX_EPOCH);

        let Ok(entries) = fs::read_dir(dir) else {
            return;
        };
        for entry in entries.filter_map(|e| e.ok()) {
            let candidate = entry.path();
            let is_segment = entry
                .file_name()
                .to_str()
                .is_some_and(|name| name.starts_with(prefix) && name != prefix);
            if !is_segment {
                continue;
            }

            let expired = entry
                .metadata()
                .and_then(|m| m.modified())
                .map(|modified| modified < cutoff)
                .unwrap_or(false);
            if expired {
                if let Err(e) = fs::remove_file(&candidate) {
                    eprintln!(
                        "[WARN] Failed to remove expired log segment {}: {}",
                        candidate.display(),
                        e
                    );
                }
            }
        }
    }

    /// Get configured path
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.options.path
    }

    /// Get rotation options
    #[must_use]
    pub fn options(&self) -> &FileSinkOptions {
        &self.options
    }

    /// Lines written to the live file, including what it held when opened
    #[must_use]
    pub fn current_lines(&self) -> usize {
        self.state.lock().lines
    }

    /// Bytes in the live file
    #[must_use]
    pub fn current_size(&self) -> u64 {
        self.state.lock().size
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }
}

impl Sink for FileSink {
    fn write(&self, record: &Record) -> Result<()> {
        let line = self.options.format.render(record)?;
        let mut state = self.state.lock();

        if state.closed {
            return Err(LoggerError::sink_closed(self.name()));
        }

        if self.should_rotate(&state, Local::now().date_naive()) {
            if let Err(e) = self.rotate(&mut state) {
                // Keep logging to whatever file we can reach rather than dropping lines
                eprintln!(
                    "[WARN] Log rotation failed: {}. Continuing with current file.",
                    e
                );
                if state.writer.is_none() {
                    *state = Self::open(&self.options)?;
                }
                // Prevent a rotation attempt on every subsequent write
                state.lines = 0;
                state.size = 0;
                state.open_date = Local::now().date_naive();
            }
        }

        if state.writer.is_none() {
            // A failed reload left no handle; try again before giving up on this line
            *state = Self::open(&self.options)?;
        }

        let path = &self.options.path;
        let writer = state
            .writer
            .as_mut()
            .ok_or_else(|| LoggerError::writer("Writer not initialized"))?;
        writer
            .write_all(line.as_bytes())
            .and_then(|_| writer.flush())
            .map_err(|e| {
                LoggerError::file_sink(
                    path.display().to_string(),
                    format!("Failed to write log entry: {}", e),
                )
            })?;

        state.lines += line.bytes().filter(|b| *b == b'\n').count();
        state.size += line.len() as u64;
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        let mut state = self.state.lock();
        if let Some(ref mut writer) = state.writer {
            writer.flush().map_err(|e| {
                LoggerError::file_sink(
                    self.options.path.display().to_string(),
                    format!("Failed to flush: {}", e),
                )
            })?;
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "file"
    }

    fn kind(&self) -> SinkKind {
        SinkKind::File
    }
}

impl Disposable for FileSink {
    /// Flush and release the handle; later writes fail with `SinkClosed`
    fn close(&self) -> Result<()> {
        let mut state = self.state.lock();
        state.closed = true;
        if let Some(mut writer) = state.writer.take() {
            writer.flush().map_err(|e| {
                LoggerError::file_sink(
                    self.options.path.display().to_string(),
                    format!("Failed to flush on close: {}", e),
                )
            })?;
        }
        Ok(())
    }
}

impl Reloadable for FileSink {
    /// Reopen the configured path, e.g. after an external tool renamed the file
    fn reload(&self) -> Result<()> {
        let mut state = self.state.lock();
        if state.closed {
            return Err(LoggerError::sink_closed(self.name()));
        }
        if let Some(mut writer) = state.writer.take() {
            // Best effort: the old file may already be gone
            let _ = writer.flush();
        }
        *state = Self::open(&self.options)?;
        Ok(())
    }
}

impl Drop for FileSink {
    fn drop(&mut self) {
        // Flush and explicitly drop writer to ensure file handle is released
        if let Some(mut writer) = self.state.get_mut().writer.take() {
            let _ = writer.flush();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Severity;
    use tempfile::tempdir;

    fn segments(dir: &Path, prefix: &str) -> Vec<PathBuf> {
        let mut found: Vec<PathBuf> = fs::read_dir(dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| {
                let name = p.file_name().unwrap().to_str().unwrap();
                name.starts_with(prefix) && name != prefix
            })
            .collect();
        found.sort();
        found
    }

    fn record(i: usize) -> Record {
        Record::new(Severity::Info, format!("Test message number {}", i))
    }

    #[test]
    fn test_options_from_section_defaults() {
        let options =
            FileSinkOptions::from_section(&Section::new(), Path::new("/tmp/x"), OutputFormat::Json)
                .unwrap();

        assert_eq!(options.path, PathBuf::from("/tmp/x/grafana.log"));
        assert!(options.rotate);
        assert_eq!(options.max_lines, 1_000_000);
        assert_eq!(options.max_size, 256 * 1024 * 1024);
        assert!(options.daily);
        assert_eq!(options.max_days, 7);
        assert_eq!(options.format, OutputFormat::Json);
    }

    #[test]
    fn test_options_from_section_overrides() {
        let section = Section::new()
            .with("file_name", "/srv/app.log")
            .with("log_rotate", "false")
            .with("max_lines", "10")
            .with("max_size_shift", "10")
            .with("daily_rotate", "false")
            .with("max_days", "3");
        let options =
            FileSinkOptions::from_section(&section, Path::new("/tmp/x"), OutputFormat::Logfmt)
                .unwrap();

        assert_eq!(options.path, PathBuf::from("/srv/app.log"));
        assert!(!options.rotate);
        assert_eq!(options.max_lines, 10);
        assert_eq!(options.max_size, 1024);
        assert!(!options.daily);
        assert_eq!(options.max_days, 3);
    }

    #[test]
    fn test_options_reject_oversized_shift() {
        let section = Section::new().with("max_size_shift", "64");
        let result =
            FileSinkOptions::from_section(&section, Path::new("/tmp/x"), OutputFormat::Logfmt);
        assert!(matches!(result, Err(LoggerError::InvalidConfiguration { .. })));
    }

    #[test]
    fn test_creates_parent_directories() {
        let dir = tempdir().unwrap();
        let log_path = dir.path().join("nested").join("deeper").join("app.log");

        let sink = FileSink::new(FileSinkOptions::new(&log_path)).unwrap();
        assert!(log_path.exists());
        assert_eq!(sink.current_size(), 0);
    }

    #[test]
    fn test_rotation_at_line_boundary() {
        let dir = tempdir().unwrap();
        let log_path = dir.path().join("lines.log");
        let n = 5;

        let options = FileSinkOptions::new(&log_path)
            .with_max_lines(n - 1)
            .with_daily(false);
        let sink = FileSink::new(options).unwrap();

        for i in 0..n {
            sink.write(&record(i)).unwrap();
        }

        let rotated = segments(dir.path(), "lines.log");
        assert_eq!(rotated.len(), 1);
        assert_eq!(fs::read_to_string(&rotated[0]).unwrap().lines().count(), n - 1);

        let live = fs::read_to_string(&log_path).unwrap();
        assert_eq!(live.lines().count(), 1);
        assert!(live.contains("Test message number 4"));
        assert_eq!(sink.current_lines(), 1);
    }

    #[test]
    fn test_segment_name_format() {
        let dir = tempdir().unwrap();
        let log_path = dir.path().join("named.log");

        let sink =
            FileSink::new(FileSinkOptions::new(&log_path).with_max_lines(1).with_daily(false))
                .unwrap();
        sink.write(&record(0)).unwrap();
        sink.write(&record(1)).unwrap();
        sink.write(&record(2)).unwrap();

        let today = Local::now().date_naive().format("%Y-%m-%d").to_string();
        let rotated = segments(dir.path(), "named.log");
        assert_eq!(rotated.len(), 2);
        assert!(rotated[0].ends_with(format!("named.log.{}.001", today)));
        assert!(rotated[1].ends_with(format!("named.log.{}.002", today)));
    }

    #[test]
    fn test_day_change_triggers_rotation() {
        let dir = tempdir().unwrap();
        let sink = FileSink::new(FileSinkOptions::new(dir.path().join("day.log"))).unwrap();
        let today = Local::now().date_naive();

        let state = sink.state.lock();
        assert!(!sink.should_rotate(&state, today));
        assert!(sink.should_rotate(&state, today.succ_opt().unwrap()));
    }

    #[test]
    fn test_daily_rotation_names_segment_after_open_date() {
        let dir = tempdir().unwrap();
        let log_path = dir.path().join("daily.log");

        let sink = FileSink::new(FileSinkOptions::new(&log_path)).unwrap();
        sink.write(&record(0)).unwrap();

        let yesterday = Local::now().date_naive().pred_opt().unwrap();
        sink.state.lock().open_date = yesterday;
        sink.write(&record(1)).unwrap();

        let rotated = segments(dir.path(), "daily.log");
        assert_eq!(rotated.len(), 1);
        assert!(rotated[0].ends_with(format!(
            "daily.log.{}.001",
            yesterday.format("%Y-%m-%d")
        )));
        assert!(fs::read_to_string(&rotated[0]).unwrap().contains("Test message number 0"));

        let live = fs::read_to_string(&log_path).unwrap();
        assert_eq!(live.lines().count(), 1);
        assert!(live.contains("Test message number 1"));
        assert_ne!(sink.state.lock().open_date, yesterday);
    }

    #[test]
    fn test_rotation_by_size() {
        let dir = tempdir().unwrap();
        let log_path = dir.path().join("size.log");

        let options = FileSinkOptions::new(&log_path)
            .with_max_lines(0)
            .with_max_size(100)
            .with_daily(false);
        let sink = FileSink::new(options).unwrap();

        for i in 0..20 {
            sink.write(&record(i)).unwrap();
        }

        assert!(!segments(dir.path(), "size.log").is_empty());
    }

    #[test]
    fn test_no_rotation_when_disabled() {
        let dir = tempdir().unwrap();
        let log_path = dir.path().join("never.log");

        let options = FileSinkOptions::new(&log_path)
            .with_rotate(false)
            .with_max_lines(2)
            .with_max_size(10);
        let sink = FileSink::new(options).unwrap();

        for i in 0..50 {
            sink.write(&record(i)).unwrap();
        }

        assert!(segments(dir.path(), "never.log").is_empty());
        assert_eq!(fs::read_to_string(&log_path).unwrap().lines().count(), 50);
    }

    #[test]
    fn test_existing_lines_are_counted_on_open() {
        let dir = tempdir().unwrap();
        let log_path = dir.path().join("existing.log");
        fs::write(&log_path, "one\ntwo\nthree\n").unwrap();

        let sink = FileSink::new(FileSinkOptions::new(&log_path)).unwrap();
        assert_eq!(sink.current_lines(), 3);
        assert_eq!(sink.current_size(), 14);
    }

    #[test]
    fn test_write_after_close_fails_cleanly() {
        let dir = tempdir().unwrap();
        let log_path = dir.path().join("closed.log");

        let sink = FileSink::new(FileSinkOptions::new(&log_path)).unwrap();
        sink.write(&record(0)).unwrap();
        sink.close().unwrap();

        let result = sink.write(&record(1));
        assert!(matches!(result, Err(LoggerError::SinkClosed { .. })));
        assert!(sink.is_closed());
        assert_eq!(fs::read_to_string(&log_path).unwrap().lines().count(), 1);

        // Closing twice is harmless
        sink.close().unwrap();
    }

    #[test]
    fn test_reload_after_external_rename() {
        let dir = tempdir().unwrap();
        let log_path = dir.path().join("app.log");
        let moved = dir.path().join("app.log.moved");

        let sink = FileSink::new(FileSinkOptions::new(&log_path)).unwrap();
        sink.write(&record(0)).unwrap();

        fs::rename(&log_path, &moved).unwrap();
        sink.reload().unwrap();
        sink.write(&record(1)).unwrap();

        let fresh = fs::read_to_string(&log_path).unwrap();
        assert_eq!(fresh.lines().count(), 1);
        assert!(fresh.contains("Test message number 1"));
        assert!(fs::read_to_string(&moved).unwrap().contains("Test message number 0"));
    }

    #[test]
    fn test_reload_closed_sink_fails() {
        let dir = tempdir().unwrap();
        let sink = FileSink::new(FileSinkOptions::new(dir.path().join("r.log"))).unwrap();

        sink.close().unwrap();
        assert!(matches!(sink.reload(), Err(LoggerError::SinkClosed { .. })));
    }

    #[test]
    fn test_expired_segments_are_deleted() {
        let dir = tempdir().unwrap();
        let log_path = dir.path().join("old.log");
        let stale = dir.path().join("old.log.2000-01-01.001");
        fs::write(&stale, "ancient\n").unwrap();
        let ancient = SystemTime::UNIX_EPOCH + Duration::from_secs(SECONDS_PER_DAY);
        File::options()
            .write(true)
            .open(&stale)
            .unwrap()
            .set_modified(ancient)
            .unwrap();

        let options = FileSinkOptions::new(&log_path)
            .with_max_lines(1)
            .with_daily(false)
            .with_max_days(7);
        let sink = FileSink::new(options).unwrap();
        sink.write(&record(0)).unwrap();
        sink.write(&record(1)).unwrap();

        assert!(!stale.exists());
        assert!(log_path.exists());
        assert_eq!(segments(dir.path(), "old.log").len(), 1);
    }
}
