//! One sink bound to its thresholds

use super::error::Result;
use super::filter::FilterTable;
use super::level::{Severity, Threshold};
use super::record::Record;
use super::sink::Sink;
use std::fmt;
use std::sync::Arc;

/// A sink bound to its default threshold and per-logger overrides.
///
/// Cloning is cheap: the sink and filter table are shared.
#[derive(Clone)]
pub struct RoutedLogger {
    sink: Arc<dyn Sink>,
    filters: Arc<FilterTable>,
    default_threshold: Threshold,
    threshold: Threshold,
}

impl RoutedLogger {
    pub fn new(sink: Arc<dyn Sink>, default_threshold: Threshold, filters: FilterTable) -> Self {
        Self::with_shared_filters(sink, default_threshold, Arc::new(filters))
    }

    pub fn with_shared_filters(
        sink: Arc<dyn Sink>,
        default_threshold: Threshold,
        filters: Arc<FilterTable>,
    ) -> Self {
        Self {
            sink,
            filters,
            default_threshold,
            threshold: default_threshold,
        }
    }

    /// Route for a named logger.
    ///
    /// An entry for `name` in the filter table replaces the threshold;
    /// otherwise the sink default applies. `self` is left untouched.
    #[must_use]
    pub fn derive(&self, name: Option<&str>) -> RoutedLogger {
        let threshold = name
            .and_then(|name| self.filters.get(name))
            .unwrap_or(self.default_threshold);

        RoutedLogger {
            sink: Arc::clone(&self.sink),
            filters: Arc::clone(&self.filters),
            default_threshold: self.default_threshold,
            threshold,
        }
    }

    #[inline]
    pub fn accepts(&self, level: Severity) -> bool {
        self.threshold.allows(level)
    }

    /// Write the record if its severity passes; dropped records are `Ok`.
    pub fn write(&self, record: &Record) -> Result<()> {
        if !self.accepts(record.level) {
            return Ok(());
        }
        self.sink.write(record)
    }

    pub fn threshold(&self) -> Threshold {
        self.threshold
    }

    pub fn default_threshold(&self) -> Threshold {
        self.default_threshold
    }

    pub fn filters(&self) -> &FilterTable {
        &self.filters
    }

    pub fn sink(&self) -> &Arc<dyn Sink> {
        &self.sink
    }
}

impl fmt::Debug for RoutedLogger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoutedLogger")
            .field("sink", &self.sink.name())
            .field("default_threshold", &self.default_threshold)
            .field("threshold", &self.threshold)
            .field("filters", &self.filters.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::sink::SinkKind;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Collect {
        levels: Mutex<Vec<Severity>>,
    }

    impl Sink for Collect {
        fn write(&self, record: &Record) -> Result<()> {
            self.levels.lock().push(record.level);
            Ok(())
        }

        fn flush(&self) -> Result<()> {
            Ok(())
        }

        fn name(&self) -> &str {
            "collect"
        }

        fn kind(&self) -> SinkKind {
            SinkKind::Console
        }
    }

    #[test]
    fn test_override_beats_default() {
        let filters: FilterTable = [("db", Threshold::AllowDebug)].into_iter().collect();
        let route = RoutedLogger::new(Arc::new(Collect::default()), Threshold::AllowError, filters);

        let db = route.derive(Some("db"));
        assert!(db.accepts(Severity::Debug));
        assert!(!route.accepts(Severity::Debug));
    }

    #[test]
    fn test_unknown_name_falls_back_to_default() {
        let filters: FilterTable = [("db", Threshold::AllowDebug)].into_iter().collect();
        let route = RoutedLogger::new(Arc::new(Collect::default()), Threshold::AllowWarn, filters);

        let api = route.derive(Some("api"));
        assert_eq!(api.threshold(), Threshold::AllowWarn);
        assert_eq!(route.derive(None).threshold(), Threshold::AllowWarn);
    }

    #[test]
    fn test_derive_shares_sink_and_keeps_parent() {
        let filters: FilterTable = [("db", Threshold::AllowDebug)].into_iter().collect();
        let route = RoutedLogger::new(Arc::new(Collect::default()), Threshold::AllowError, filters);

        let db = route.derive(Some("db"));
        assert_eq!(route.threshold(), Threshold::AllowError);
        assert!(Arc::ptr_eq(db.sink(), route.sink()));
        assert_eq!(db.sink().name(), "collect");
    }

    #[test]
    fn test_write_drops_below_threshold() {
        let sink = Arc::new(Collect::default());
        let route = RoutedLogger::new(sink.clone(), Threshold::AllowWarn, FilterTable::new());

        route.write(&Record::new(Severity::Info, "quiet")).unwrap();
        route.write(&Record::new(Severity::Error, "loud")).unwrap();

        assert_eq!(*sink.levels.lock(), vec![Severity::Error]);
    }
}
