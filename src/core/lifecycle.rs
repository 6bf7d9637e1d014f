//! Close and reload bookkeeping for sinks that own OS resources

use super::error::{LoggerError, Result};
use std::sync::Arc;

/// A sink holding a resource that must be released explicitly.
pub trait Disposable: Send + Sync {
    fn close(&self) -> Result<()>;
}

/// A sink that can reopen its destination in place.
pub trait Reloadable: Send + Sync {
    fn reload(&self) -> Result<()>;
}

/// The disposable and reloadable sinks of one generation.
#[derive(Default)]
pub struct LifecycleManager {
    disposables: Vec<Arc<dyn Disposable>>,
    reloadables: Vec<Arc<dyn Reloadable>>,
}

impl LifecycleManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_disposable(&mut self, sink: Arc<dyn Disposable>) {
        self.disposables.push(sink);
    }

    pub fn register_reloadable(&mut self, sink: Arc<dyn Reloadable>) {
        self.reloadables.push(sink);
    }

    pub fn disposable_count(&self) -> usize {
        self.disposables.len()
    }

    pub fn reloadable_count(&self) -> usize {
        self.reloadables.len()
    }

    /// Close every disposable sink, then clear both sets.
    ///
    /// Every sink is given a chance to close; the first error is returned.
    pub fn close_all(&mut self) -> Result<()> {
        let mut first_error: Option<LoggerError> = None;
        for sink in self.disposables.drain(..) {
            if let Err(e) = sink.close() {
                first_error.get_or_insert(e);
            }
        }
        self.reloadables.clear();

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Reload sinks in registration order, stopping at the first failure.
    pub fn reload_all(&self) -> Result<()> {
        for sink in &self.reloadables {
            sink.reload()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Probe {
        closes: AtomicUsize,
        reloads: AtomicUsize,
        fail: bool,
    }

    impl Probe {
        fn new(fail: bool) -> Arc<Self> {
            Arc::new(Self {
                closes: AtomicUsize::new(0),
                reloads: AtomicUsize::new(0),
                fail,
            })
        }
    }

    impl Disposable for Probe {
        fn close(&self) -> Result<()> {
            self.closes.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(LoggerError::writer("close failed"));
            }
            Ok(())
        }
    }

    impl Reloadable for Probe {
        fn reload(&self) -> Result<()> {
            self.reloads.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(LoggerError::writer("reload failed"));
            }
            Ok(())
        }
    }

    #[test]
    fn test_close_attempts_every_sink() {
        let failing = Probe::new(true);
        let healthy = Probe::new(false);

        let mut lifecycle = LifecycleManager::new();
        lifecycle.register_disposable(failing.clone());
        lifecycle.register_disposable(healthy.clone());

        let result = lifecycle.close_all();
        assert!(result.is_err());
        assert_eq!(failing.closes.load(Ordering::SeqCst), 1);
        assert_eq!(healthy.closes.load(Ordering::SeqCst), 1);
        assert_eq!(lifecycle.disposable_count(), 0);
    }

    #[test]
    fn test_close_returns_first_error() {
        let mut lifecycle = LifecycleManager::new();
        lifecycle.register_disposable(Probe::new(true));
        lifecycle.register_disposable(Probe::new(true));

        let err = lifecycle.close_all().unwrap_err();
        assert_eq!(err.to_string(), "Writer error: close failed");
    }

    #[test]
    fn test_reload_stops_at_first_failure() {
        let first = Probe::new(true);
        let second = Probe::new(false);

        let mut lifecycle = LifecycleManager::new();
        lifecycle.register_reloadable(first.clone());
        lifecycle.register_reloadable(second.clone());

        assert!(lifecycle.reload_all().is_err());
        assert_eq!(first.reloads.load(Ordering::SeqCst), 1);
        assert_eq!(second.reloads.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_close_clears_reloadables() {
        let probe = Probe::new(false);
        let mut lifecycle = LifecycleManager::new();
        lifecycle.register_disposable(probe.clone());
        lifecycle.register_reloadable(probe.clone());

        lifecycle.close_all().unwrap();
        lifecycle.reload_all().unwrap();

        assert_eq!(lifecycle.reloadable_count(), 0);
        assert_eq!(probe.reloads.load(Ordering::SeqCst), 0);
    }
}
