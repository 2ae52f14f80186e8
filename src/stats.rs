use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug)]
pub struct AnalysisStats {
    analyses: AtomicU64,
    pages: AtomicU64,
    rate_limit_retries: AtomicU64,
    upstream_failures: AtomicU64,
}

impl Default for AnalysisStats {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalysisStats {
    pub const fn new() -> Self {
        Self {
            analyses: AtomicU64::new(0),
            pages: AtomicU64::new(0),
            rate_limit_retries: AtomicU64::new(0),
            upstream_failures: AtomicU64::new(0),
        }
    }

    pub fn inc_analyses(&self, n: u64) {
        self.analyses.fetch_add(n, Ordering::Relaxed);
    }

    pub fn inc_pages(&self, n: u64) {
        self.pages.fetch_add(n, Ordering::Relaxed);
    }

    pub fn inc_rate_limit_retries(&self, n: u64) {
        self.rate_limit_retries.fetch_add(n, Ordering::Relaxed);
    }

    pub fn inc_upstream_failures(&self, n: u64) {
        self.upstream_failures.fetch_add(n, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> AnalysisSnapshot {
        AnalysisSnapshot {
            analyses: self.analyses.load(Ordering::Relaxed),
            pages: self.pages.load(Ordering::Relaxed),
            rate_limit_retries: self.rate_limit_retries.load(Ordering::Relaxed),
            upstream_failures: self.upstream_failures.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct AnalysisSnapshot {
    pub analyses: u64,
    pub pages: u64,
    pub rate_limit_retries: u64,
    pub upstream_failures: u64,
}

pub static ANALYSIS_STATS: AnalysisStats = AnalysisStats::new();
