use std::sync::Mutex;

/// Counters describing how much of an input log was usable.
pub struct ScanMetrics {
    inner: Mutex<Counters>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counters {
    pub matched: usize,
    pub skipped: usize,
}

impl ScanMetrics {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Counters::default()),
        }
    }

    pub fn record_matched(&self) {
        if let Ok(mut counters) = self.inner.lock() {
            counters.matched += 1;
        }
    }

    pub fn record_skipped(&self) {
        if let Ok(mut counters) = self.inner.lock() {
            counters.skipped += 1;
        }
    }

    pub fn reset(&self) {
        if let Ok(mut counters) = self.inner.lock() {
            *counters = Counters::default();
        }
    }

    pub fn snapshot(&self) -> Counters {
        if let Ok(counters) = self.inner.lock() {
            *counters
        } else {
            Counters::default()
        }
    }
}

impl Default for ScanMetrics {
    fn default() -> Self {
        Self::new()
    }
}
