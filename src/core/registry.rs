//! Root dispatcher, derived loggers and configuration generations
//!
//! A [`LoggerRegistry`] owns the active *generation*: the ordered set of
//! [`RoutedLogger`]s built by one configuration load. Every log call fans a
//! record out to the routes of the generation that is active when the call
//! starts. Loading a new configuration builds a complete generation first
//! and swaps it in only when every mode was built; the previous generation's
//! sinks are closed after the swap.

use super::config::LoggingConfig;
use super::error::{LoggerError, Result};
use super::fields::{FieldValue, KeyValues};
use super::filter::FilterTable;
use super::format::OutputFormat;
use super::level::{LevelSet, Severity, Threshold};
use super::lifecycle::{Disposable, LifecycleManager, Reloadable};
use super::record::Record;
use super::routed::RoutedLogger;
use super::sink::Sink;
use crate::sinks::{build_sink, ConsoleSink};
use parking_lot::{Mutex, RwLock};
use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Context key carrying a derived logger's name.
pub const LOGGER_KEY: &str = "logger";

/// Configuration state of a registry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryState {
    /// Only the bootstrap stderr logger is installed
    Unconfigured,
    /// A configuration load is building the next generation
    Loading,
    /// A configured generation is installed
    Active,
}

/// One atomically swapped set of routes
struct Generation {
    id: u64,
    routes: Vec<RoutedLogger>,
}

/// Result of building a generation that has not been installed yet
struct Built {
    routes: Vec<RoutedLogger>,
    lifecycle: LifecycleManager,
    filters: FilterTable,
}

struct Dispatcher {
    active: RwLock<Arc<Generation>>,
    lifecycle: Mutex<LifecycleManager>,
    /// Filters accumulated across modes; the first value seen for a name wins
    filters: Mutex<FilterTable>,
    state: Mutex<RegistryState>,
    /// Serializes load, reload and close
    admin: Mutex<()>,
    next_generation: AtomicU64,
    bootstrap: Arc<dyn Sink>,
}

impl Dispatcher {
    fn new(bootstrap: Arc<dyn Sink>) -> Self {
        let generation = Generation {
            id: 0,
            routes: vec![RoutedLogger::new(
                Arc::clone(&bootstrap),
                Threshold::AllowInfo,
                FilterTable::new(),
            )],
        };

        Self {
            active: RwLock::new(Arc::new(generation)),
            lifecycle: Mutex::new(LifecycleManager::new()),
            filters: Mutex::new(FilterTable::new()),
            state: Mutex::new(RegistryState::Unconfigured),
            admin: Mutex::new(()),
            next_generation: AtomicU64::new(1),
            bootstrap,
        }
    }

    fn next_id(&self) -> u64 {
        self.next_generation.fetch_add(1, Ordering::Relaxed)
    }

    /// The stderr generation, filtered by the dispatcher-wide table
    fn bootstrap_generation(&self) -> Generation {
        let filters = self.filters.lock().clone();
        Generation {
            id: self.next_id(),
            routes: vec![RoutedLogger::new(
                Arc::clone(&self.bootstrap),
                Threshold::AllowInfo,
                filters,
            )],
        }
    }

    fn install(&self, generation: Generation) {
        // Waits for in-flight log calls holding the read guard
        let previous = std::mem::replace(&mut *self.active.write(), Arc::new(generation));
        drop(previous);
    }

    /// Log through the installed root routes, ignoring write failures.
    ///
    /// Must not be called while the caller holds the `active` read guard.
    fn report(&self, level: Severity, message: &str, fields: KeyValues) {
        let generation = self.active.read();
        let record = Record::new(level, message).with_fields(fields);
        for route in &generation.routes {
            if route.write(&record).is_err() {
                break;
            }
        }
    }

    fn report_unknown_level(&self, name: &str) {
        self.report(
            Severity::Warn,
            "Unknown log level",
            KeyValues::new().with("level", name),
        );
    }

    fn parse_filters(&self, list: &str) -> FilterTable {
        FilterTable::parse(FilterTable::split_list(list), |name| {
            self.report_unknown_level(name)
        })
    }

    fn load(&self, modes: &[&str], logs_path: &Path, config: &LoggingConfig) -> Result<()> {
        let previous_state = std::mem::replace(&mut *self.state.lock(), RegistryState::Loading);

        match self.build_generation(modes, logs_path, config) {
            Ok(built) => {
                self.activate(built);
                Ok(())
            }
            Err(e) => {
                *self.state.lock() = previous_state;
                Err(e)
            }
        }
    }

    fn build_generation(
        &self,
        modes: &[&str],
        logs_path: &Path,
        config: &LoggingConfig,
    ) -> Result<Built> {
        let root = config.root();
        let default_level = root.string("level", "info").to_lowercase();
        LevelSet::resolve(&default_level, |name| self.report_unknown_level(name));
        let default_filters = self.parse_filters(&root.string("filters", ""));

        let mut lifecycle = LifecycleManager::new();
        let mut accumulated = self.filters.lock().clone();
        let mut routes = Vec::with_capacity(modes.len());

        for mode in modes {
            let built = self.build_route(
                mode,
                &default_level,
                &default_filters,
                logs_path,
                config,
                &mut lifecycle,
            );
            match built {
                Ok(route) => {
                    accumulated.merge_missing(route.filters());
                    routes.push(route);
                }
                Err(e) => {
                    // Nothing from this load is activated
                    if let Err(close_err) = lifecycle.close_all() {
                        self.report(
                            Severity::Error,
                            "Failed to close partially built log sinks",
                            KeyValues::new().with("error", FieldValue::error(&close_err)),
                        );
                    }
                    return Err(e);
                }
            }
        }

        Ok(Built {
            routes,
            lifecycle,
            filters: accumulated,
        })
    }

    fn build_route(
        &self,
        mode: &str,
        default_level: &str,
        default_filters: &FilterTable,
        logs_path: &Path,
        config: &LoggingConfig,
        lifecycle: &mut LifecycleManager,
    ) -> Result<RoutedLogger> {
        let section = config.mode_section(mode).ok_or_else(|| {
            self.report(
                Severity::Error,
                "Unknown log mode",
                KeyValues::new().with("mode", mode),
            );
            LoggerError::unknown_mode(mode)
        })?;

        let level_name = section.string("level", default_level).to_lowercase();
        let threshold = LevelSet::resolve(&level_name, |name| self.report_unknown_level(name));

        let mut filters = self.parse_filters(&section.string("filters", ""));
        filters.merge_missing(default_filters);

        let format = OutputFormat::from_name(&section.string("format", ""));
        let sink = build_sink(mode, section, logs_path, format, lifecycle).map_err(|e| {
            self.report(
                Severity::Error,
                "Failed to initialize log mode",
                KeyValues::new()
                    .with("mode", mode)
                    .with("error", FieldValue::error(&e)),
            );
            LoggerError::mode_load(mode, e)
        })?;

        Ok(RoutedLogger::new(sink, threshold, filters))
    }

    fn activate(&self, built: Built) {
        *self.filters.lock() = built.filters;
        self.install(Generation {
            id: self.next_id(),
            routes: built.routes,
        });

        let mut previous = std::mem::replace(&mut *self.lifecycle.lock(), built.lifecycle);
        *self.state.lock() = RegistryState::Active;

        if let Err(e) = previous.close_all() {
            self.report(
                Severity::Error,
                "Failed to close previous log sinks",
                KeyValues::new().with("error", FieldValue::error(&e)),
            );
        }
    }

    fn close(&self) -> Result<()> {
        self.install(self.bootstrap_generation());
        let mut lifecycle = std::mem::take(&mut *self.lifecycle.lock());
        *self.state.lock() = RegistryState::Unconfigured;
        lifecycle.close_all()
    }
}

/// A named handle for logging through a registry
///
/// The handle keeps its name and context; the routes it writes to are
/// derived from whichever generation is active at call time.
pub struct Logger {
    dispatcher: Arc<Dispatcher>,
    name: Option<String>,
    context: KeyValues,
    routes: Mutex<Option<(u64, Arc<[RoutedLogger]>)>>,
}

impl Logger {
    fn root(dispatcher: Arc<Dispatcher>) -> Self {
        Self {
            dispatcher,
            name: None,
            context: KeyValues::new(),
            routes: Mutex::new(None),
        }
    }

    /// Derive a child logger named `name`.
    ///
    /// The name is added to the context as `logger=<name>` and selects the
    /// filter table entry that overrides each sink's default threshold.
    #[must_use]
    pub fn new_logger(&self, name: impl Into<String>, context: KeyValues) -> Logger {
        let name = name.into();
        let mut merged = self.context.clone();
        merged.push(LOGGER_KEY, name.as_str());
        merged.extend_from(&context);

        Logger {
            dispatcher: Arc::clone(&self.dispatcher),
            name: Some(name),
            context: merged,
            routes: Mutex::new(None),
        }
    }

    /// Same name and thresholds, more context
    #[must_use]
    pub fn with_context(&self, context: KeyValues) -> Logger {
        let mut merged = self.context.clone();
        merged.extend_from(&context);

        Logger {
            dispatcher: Arc::clone(&self.dispatcher),
            name: self.name.clone(),
            context: merged,
            routes: Mutex::new(None),
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn context(&self) -> &KeyValues {
        &self.context
    }

    /// Effective threshold per route in the active generation
    pub fn thresholds(&self) -> Vec<Threshold> {
        let generation = self.dispatcher.active.read();
        self.routes_for(&generation)
            .iter()
            .map(RoutedLogger::threshold)
            .collect()
    }

    fn routes_for(&self, generation: &Generation) -> Arc<[RoutedLogger]> {
        let mut cache = self.routes.lock();
        if let Some((id, routes)) = cache.as_ref() {
            if *id == generation.id {
                return Arc::clone(routes);
            }
        }

        let routes: Arc<[RoutedLogger]> = generation
            .routes
            .iter()
            .map(|route| route.derive(self.name.as_deref()))
            .collect();
        *cache = Some((generation.id, Arc::clone(&routes)));
        routes
    }

    /// Stamp the record and write it to every route in order.
    ///
    /// The first sink error stops the fan-out and is returned.
    pub fn log(&self, level: Severity, message: impl Into<String>, fields: KeyValues) -> Result<()> {
        let generation = self.dispatcher.active.read();
        let routes = self.routes_for(&generation);

        let mut all = self.context.clone();
        all.extend_from(&fields);
        let record = Record::new(level, message).with_fields(all);

        for route in routes.iter() {
            route.write(&record)?;
        }
        Ok(())
    }

    /// Log and report a failure through the installed root routes
    fn log_or_report(&self, level: Severity, message: String, fields: KeyValues) -> Result<()> {
        let result = self.log(level, message, fields);
        if let Err(ref e) = result {
            self.dispatcher.report(
                Severity::Error,
                "Logging error",
                KeyValues::new().with("error", FieldValue::error(e)),
            );
        }
        result
    }

    #[inline]
    pub fn trace(&self, message: impl Into<String>, fields: KeyValues) -> Result<()> {
        self.log_or_report(Severity::Trace, message.into(), fields)
    }

    #[inline]
    pub fn debug(&self, message: impl Into<String>, fields: KeyValues) -> Result<()> {
        self.log_or_report(Severity::Debug, message.into(), fields)
    }

    #[inline]
    pub fn info(&self, message: impl Into<String>, fields: KeyValues) -> Result<()> {
        self.log_or_report(Severity::Info, message.into(), fields)
    }

    #[inline]
    pub fn warn(&self, message: impl Into<String>, fields: KeyValues) -> Result<()> {
        self.log_or_report(Severity::Warn, message.into(), fields)
    }

    #[inline]
    pub fn error(&self, message: impl Into<String>, fields: KeyValues) -> Result<()> {
        self.log_or_report(Severity::Error, message.into(), fields)
    }

    #[inline]
    pub fn crit(&self, message: impl Into<String>, fields: KeyValues) -> Result<()> {
        self.log_or_report(Severity::Critical, message.into(), fields)
    }
}

impl Clone for Logger {
    fn clone(&self) -> Self {
        Self {
            dispatcher: Arc::clone(&self.dispatcher),
            name: self.name.clone(),
            context: self.context.clone(),
            routes: Mutex::new(self.routes.lock().clone()),
        }
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("name", &self.name)
            .field("context", &self.context.format_fields())
            .finish()
    }
}

/// Process-wide logging entry point
///
/// Cloning shares the same dispatcher.
///
/// # Example
///
/// ```no_run
/// use log_router::{KeyValues, LoggerRegistry, LoggingConfig};
///
/// let registry = LoggerRegistry::new();
/// let config = LoggingConfig::new()
///     .set("log", "level", "info")
///     .set("log.file", "format", "json");
/// registry
///     .read_logging_config(&["console", "file"], "/var/log/app", &config)
///     .unwrap();
///
/// let db = registry.new_logger("db", KeyValues::new());
/// db.info("connected", KeyValues::new().with("pool", 8)).unwrap();
/// ```
#[derive(Clone)]
pub struct LoggerRegistry {
    dispatcher: Arc<Dispatcher>,
    root: Logger,
}

impl LoggerRegistry {
    /// Registry with only the bootstrap stderr logger installed
    #[must_use]
    pub fn new() -> Self {
        Self::with_bootstrap(Arc::new(ConsoleSink::stderr(OutputFormat::Logfmt)))
    }

    /// Registry whose bootstrap logger writes to `sink`
    #[must_use]
    pub fn with_bootstrap(sink: Arc<dyn Sink>) -> Self {
        let dispatcher = Arc::new(Dispatcher::new(sink));
        Self {
            root: Logger::root(Arc::clone(&dispatcher)),
            dispatcher,
        }
    }

    #[must_use]
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// The unnamed logger writing at each sink's default threshold
    pub fn root(&self) -> &Logger {
        &self.root
    }

    #[must_use]
    pub fn new_logger(&self, name: impl Into<String>, context: KeyValues) -> Logger {
        self.root.new_logger(name, context)
    }

    pub fn log(&self, level: Severity, message: impl Into<String>, fields: KeyValues) -> Result<()> {
        self.root.log(level, message, fields)
    }

    pub fn trace(&self, message: impl Into<String>, fields: KeyValues) -> Result<()> {
        self.root.trace(message, fields)
    }

    pub fn debug(&self, message: impl Into<String>, fields: KeyValues) -> Result<()> {
        self.root.debug(message, fields)
    }

    pub fn info(&self, message: impl Into<String>, fields: KeyValues) -> Result<()> {
        self.root.info(message, fields)
    }

    pub fn warn(&self, message: impl Into<String>, fields: KeyValues) -> Result<()> {
        self.root.warn(message, fields)
    }

    pub fn error(&self, message: impl Into<String>, fields: KeyValues) -> Result<()> {
        self.root.error(message, fields)
    }

    pub fn crit(&self, message: impl Into<String>, fields: KeyValues) -> Result<()> {
        self.root.crit(message, fields)
    }

    /// Build one route per mode and install them as the next generation.
    ///
    /// Mode names are trimmed and empty names skipped; with no modes left
    /// the active generation stays as it is. Any failure leaves the current
    /// generation installed and closes whatever this call had opened.
    ///
    /// # Errors
    ///
    /// `UnknownMode` when a mode has no `log.<mode>` section, `ModeLoad`
    /// when a sink cannot be built.
    pub fn read_logging_config<S: AsRef<str>>(
        &self,
        modes: &[S],
        logs_path: impl AsRef<Path>,
        config: &LoggingConfig,
    ) -> Result<()> {
        let _admin = self.dispatcher.admin.lock();

        let modes: Vec<&str> = modes
            .iter()
            .map(|mode| mode.as_ref().trim())
            .filter(|mode| !mode.is_empty())
            .collect();
        if modes.is_empty() {
            return Ok(());
        }

        self.dispatcher.load(&modes, logs_path.as_ref(), config)
    }

    /// Reinstall the bootstrap logger and close every disposable sink.
    ///
    /// Every sink is given a chance to close; the first error is returned.
    pub fn close(&self) -> Result<()> {
        let _admin = self.dispatcher.admin.lock();
        self.dispatcher.close()
    }

    /// Reopen every reloadable sink, stopping at the first failure
    pub fn reload(&self) -> Result<()> {
        let _admin = self.dispatcher.admin.lock();
        let lifecycle = self.dispatcher.lifecycle.lock();
        lifecycle.reload_all()
    }

    pub fn state(&self) -> RegistryState {
        *self.dispatcher.state.lock()
    }

    /// Filters accumulated across every loaded mode
    pub fn dispatcher_filters(&self) -> FilterTable {
        self.dispatcher.filters.lock().clone()
    }

    /// Number of routes in the active generation
    pub fn route_count(&self) -> usize {
        self.dispatcher.active.read().routes.len()
    }
}

impl Default for LoggerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for LoggerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoggerRegistry")
            .field("state", &self.state())
            .field("routes", &self.route_count())
            .finish()
    }
}

/// Assemble a registry generation from sinks built in code
///
/// # Example
///
/// ```
/// use log_router::sinks::ConsoleSink;
/// use log_router::{FilterTable, LoggerRegistry, OutputFormat, Threshold};
/// use std::sync::Arc;
///
/// let registry = LoggerRegistry::builder()
///     .route(
///         Arc::new(ConsoleSink::stdout(OutputFormat::Json)),
///         Threshold::AllowWarn,
///         FilterTable::new(),
///     )
///     .build();
/// assert_eq!(registry.route_count(), 1);
/// ```
pub struct RegistryBuilder {
    bootstrap: Option<Arc<dyn Sink>>,
    routes: Vec<RoutedLogger>,
    lifecycle: LifecycleManager,
    filters: FilterTable,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self {
            bootstrap: None,
            routes: Vec::new(),
            lifecycle: LifecycleManager::new(),
            filters: FilterTable::new(),
        }
    }

    /// Sink used before configuration and after `close`
    #[must_use = "builder methods return a new value"]
    pub fn bootstrap(mut self, sink: Arc<dyn Sink>) -> Self {
        self.bootstrap = Some(sink);
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn route(mut self, sink: Arc<dyn Sink>, threshold: Threshold, filters: FilterTable) -> Self {
        self.filters.merge_missing(&filters);
        self.routes.push(RoutedLogger::new(sink, threshold, filters));
        self
    }

    /// Close `sink` when this generation is replaced or the registry closed
    #[must_use = "builder methods return a new value"]
    pub fn disposable(mut self, sink: Arc<dyn Disposable>) -> Self {
        self.lifecycle.register_disposable(sink);
        self
    }

    /// Reopen `sink` on `reload`
    #[must_use = "builder methods return a new value"]
    pub fn reloadable(mut self, sink: Arc<dyn Reloadable>) -> Self {
        self.lifecycle.register_reloadable(sink);
        self
    }

    /// Without routes the registry starts unconfigured.
    pub fn build(self) -> LoggerRegistry {
        let registry = match self.bootstrap {
            Some(sink) => LoggerRegistry::with_bootstrap(sink),
            None => LoggerRegistry::new(),
        };
        if !self.routes.is_empty() {
            registry.dispatcher.activate(Built {
                routes: self.routes,
                lifecycle: self.lifecycle,
                filters: self.filters,
            });
        }
        registry
    }
}

impl Default for RegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}
