//! Named-scope timing hooks around the expensive primitive stages.
//!
//! The profiler is process-global and disabled by default. When disabled a
//! guard costs one atomic load; nothing is recorded.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, OnceLock};
use std::time::{Duration, Instant};

/// Accumulated timing for one named scope.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProfileRecord {
    /// Number of completed scopes
    pub calls: u64,
    /// Total time spent inside the scope
    pub total: Duration,
}

/// Process-wide collection of scope timings.
#[derive(Debug, Default)]
pub struct Profiler {
    enabled: AtomicBool,
    records: Mutex<HashMap<String, ProfileRecord>>,
}

static PROFILER: OnceLock<Profiler> = OnceLock::new();

/// Get the global profiler.
pub fn profiler() -> &'static Profiler {
    PROFILER.get_or_init(Profiler::default)
}

impl Profiler {
    /// Turn recording on or off.
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }

    /// Whether scopes are currently recorded.
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    /// Open a named scope; the time until the guard drops is recorded.
    pub fn profile<S: Into<String>>(&self, name: S) -> ProfileGuard<'_> {
        let start = if self.is_enabled() {
            Some((name.into(), Instant::now()))
        } else {
            None
        };
        ProfileGuard {
            profiler: self,
            start,
        }
    }

    /// Timing recorded so far for `name`.
    pub fn record(&self, name: &str) -> Option<ProfileRecord> {
        self.records.lock().ok()?.get(name).copied()
    }

    /// Snapshot of all recorded scopes, sorted by name.
    pub fn report(&self) -> Vec<(String, ProfileRecord)> {
        let mut report: Vec<_> = match self.records.lock() {
            Ok(records) => records.iter().map(|(k, v)| (k.clone(), *v)).collect(),
            Err(_) => Vec::new(),
        };
        report.sort_by(|a, b| a.0.cmp(&b.0));
        report
    }

    /// Drop all recorded timings.
    pub fn clear(&self) {
        if let Ok(mut records) = self.records.lock() {
            records.clear();
        }
    }

    fn finish(&self, name: String, elapsed: Duration) {
        log::trace!("{} took {:?}", name, elapsed);
        if let Ok(mut records) = self.records.lock() {
            let record = records.entry(name).or_default();
            record.calls += 1;
            record.total += elapsed;
        }
    }
}

/// Guard returned by [`Profiler::profile`].
#[derive(Debug)]
pub struct ProfileGuard<'a> {
    profiler: &'a Profiler,
    start: Option<(String, Instant)>,
}

impl Drop for ProfileGuard<'_> {
    fn drop(&mut self) {
        if let Some((name, start)) = self.start.take() {
            self.profiler.finish(name, start.elapsed());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_profiler_records_nothing() {
        let profiler = Profiler::default();
        {
            let _guard = profiler.profile("Update bins");
        }
        assert!(profiler.record("Update bins").is_none());
        assert!(profiler.report().is_empty());
    }

    #[test]
    fn test_enabled_profiler_accumulates() {
        let profiler = Profiler::default();
        profiler.set_enabled(true);
        for _ in 0..3 {
            let _guard = profiler.profile("Reorder bins");
        }
        let record = profiler.record("Reorder bins").unwrap();
        assert_eq!(record.calls, 3);

        profiler.clear();
        assert!(profiler.record("Reorder bins").is_none());
    }

    #[test]
    fn test_report_is_sorted() {
        let profiler = Profiler::default();
        profiler.set_enabled(true);
        drop(profiler.profile("b"));
        drop(profiler.profile("a"));
        let names: Vec<_> = profiler.report().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["a".to_string(), "b".to_string()]);
    }
}
