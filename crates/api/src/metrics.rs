use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

#[derive(Default)]
pub struct Metrics {
    // Counters
    documents_processed: AtomicUsize,
    pattern_triplets: AtomicUsize,
    model_triplets: AtomicUsize,
    merged_triplets: AtomicUsize,
    dropped_chunks: AtomicUsize,
    relationships_imported: AtomicUsize,
    failed_triplets: AtomicUsize,
    failed_batches: AtomicUsize,
    failed_requests: AtomicUsize,

    // Timing (in microseconds)
    total_extract_time_us: AtomicU64,
    total_import_time_us: AtomicU64,
    extract_runs: AtomicUsize,
    import_runs: AtomicUsize,
}

impl Metrics {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn record_extract(&self, duration: Duration, report: &extract::ExtractionReport) {
        self.documents_processed.fetch_add(1, Ordering::Relaxed);
        self.pattern_triplets
            .fetch_add(report.pattern_based, Ordering::Relaxed);
        self.model_triplets.fetch_add(report.llm_based, Ordering::Relaxed);
        self.merged_triplets.fetch_add(report.total, Ordering::Relaxed);
        self.dropped_chunks
            .fetch_add(report.dropped_chunks, Ordering::Relaxed);
        self.total_extract_time_us
            .fetch_add(duration.as_micros() as u64, Ordering::Relaxed);
        self.extract_runs.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_import(&self, duration: Duration, report: &index::ImportReport) {
        self.relationships_imported
            .fetch_add(report.imported, Ordering::Relaxed);
        self.failed_triplets.fetch_add(report.errors, Ordering::Relaxed);
        self.failed_batches
            .fetch_add(report.failed_batches, Ordering::Relaxed);
        self.total_import_time_us
            .fetch_add(duration.as_micros() as u64, Ordering::Relaxed);
        self.import_runs.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.failed_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            documents_processed: self.documents_processed.load(Ordering::Relaxed),
            pattern_triplets: self.pattern_triplets.load(Ordering::Relaxed),
            model_triplets: self.model_triplets.load(Ordering::Relaxed),
            merged_triplets: self.merged_triplets.load(Ordering::Relaxed),
            dropped_chunks: self.dropped_chunks.load(Ordering::Relaxed),
            relationships_imported: self.relationships_imported.load(Ordering::Relaxed),
            failed_triplets: self.failed_triplets.load(Ordering::Relaxed),
            failed_batches: self.failed_batches.load(Ordering::Relaxed),
            failed_requests: self.failed_requests.load(Ordering::Relaxed),
            avg_extract_time_ms: avg_time_ms(&self.total_extract_time_us, &self.extract_runs),
            avg_import_time_ms: avg_time_ms(&self.total_import_time_us, &self.import_runs),
        }
    }
}

fn avg_time_ms(total_us: &AtomicU64, count: &AtomicUsize) -> f64 {
    let total = total_us.load(Ordering::Relaxed) as f64;
    let cnt = count.load(Ordering::Relaxed) as f64;
    if cnt > 0.0 {
        total / cnt / 1000.0 // Convert to ms
    } else {
        0.0
    }
}

#[derive(Debug, Serialize)]
pub struct MetricsSnapshot {
    pub documents_processed: usize,
    pub pattern_triplets: usize,
    pub model_triplets: usize,
    pub merged_triplets: usize,
    pub dropped_chunks: usize,
    pub relationships_imported: usize,
    pub failed_triplets: usize,
    pub failed_batches: usize,
    pub failed_requests: usize,
    pub avg_extract_time_ms: f64,
    pub avg_import_time_ms: f64,
}

pub struct TimedOperation {
    start: Instant,
}

impl TimedOperation {
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}
