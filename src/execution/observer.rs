use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::catalog::DatasetKind;
use crate::error::PipelineError;

use super::pipeline::{DatasetStats, PipelineState};

/// Severity classification used for observer callbacks and alerting thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Informational event.
    Info,
    /// Non-fatal or operator-initiated (e.g. cancellation).
    Warning,
    /// The dataset failed because of its content or shape.
    Error,
    /// Storage or other infrastructure failure.
    Critical,
}

impl Severity {
    /// Classify a pipeline failure.
    pub fn of(e: &PipelineError) -> Self {
        match e {
            PipelineError::SourceUnavailable { .. }
            | PipelineError::DestinationWriteFailure { .. }
            | PipelineError::Io(_)
            | PipelineError::ThreadPool(_) => Severity::Critical,
            PipelineError::Csv(err) => match err.kind() {
                ::csv::ErrorKind::Io(_) => Severity::Critical,
                _ => Severity::Error,
            },
            PipelineError::Parquet(err) => {
                // Parquet errors often wrap IO, but not always in a structured way.
                if error_chain_contains_io(err) {
                    Severity::Critical
                } else {
                    Severity::Error
                }
            }
            PipelineError::Cancelled { .. } => Severity::Warning,
            PipelineError::MalformedRow { .. }
            | PipelineError::CoercionError { .. }
            | PipelineError::SchemaMismatch { .. }
            | PipelineError::Config { .. } => Severity::Error,
        }
    }
}

fn error_chain_contains_io(e: &(dyn StdError + 'static)) -> bool {
    let mut cur: Option<&(dyn StdError + 'static)> = Some(e);
    while let Some(err) = cur {
        if err.is::<std::io::Error>() {
            return true;
        }
        cur = err.source();
    }
    false
}

/// Events emitted while a run progresses.
#[derive(Debug, Clone)]
pub enum PipelineEvent {
    RunStarted {
        datasets: usize,
    },
    StateChanged {
        dataset: DatasetKind,
        from: PipelineState,
        to: PipelineState,
    },
    DatasetFinished {
        dataset: DatasetKind,
        stats: DatasetStats,
        elapsed: Duration,
    },
    DatasetFailed {
        dataset: DatasetKind,
        during: PipelineState,
        severity: Severity,
        error: String,
    },
    RunFinished {
        elapsed: Duration,
        metrics: PipelineMetricsSnapshot,
    },
}

/// Observer hook for pipeline events.
///
/// Implementors can record metrics, logs, or trigger alerts.
pub trait PipelineObserver: Send + Sync {
    fn on_event(&self, event: &PipelineEvent);

    /// Called when a dataset failure meets the configured alert threshold.
    fn on_alert(&self, _dataset: DatasetKind, _severity: Severity, _error: &PipelineError) {}
}

/// Forwards events to `tracing`.
#[derive(Debug, Default)]
pub struct TracingObserver;

impl PipelineObserver for TracingObserver {
    fn on_event(&self, event: &PipelineEvent) {
        match event {
            PipelineEvent::RunStarted { datasets } => info!(datasets, "run started"),
            PipelineEvent::StateChanged { dataset, from, to } => {
                debug!(%dataset, %from, %to, "state changed")
            }
            PipelineEvent::DatasetFinished {
                dataset,
                stats,
                elapsed,
            } => info!(
                %dataset,
                rows_read = stats.rows_read,
                dropped_missing = stats.clean.dropped_missing,
                dropped_duplicates = stats.clean.dropped_duplicates,
                rows_written = stats.rows_written,
                bytes_written = stats.bytes_written,
                elapsed_ms = elapsed.as_millis() as u64,
                "dataset curated"
            ),
            PipelineEvent::DatasetFailed {
                dataset,
                during,
                severity,
                error,
            } => match severity {
                Severity::Info | Severity::Warning => {
                    warn!(%dataset, %during, ?severity, %error, "dataset pipeline stopped")
                }
                Severity::Error | Severity::Critical => {
                    error!(%dataset, %during, ?severity, %error, "dataset pipeline failed")
                }
            },
            PipelineEvent::RunFinished { elapsed, metrics } => info!(
                elapsed_ms = elapsed.as_millis() as u64,
                %metrics,
                "run finished"
            ),
        }
    }

    fn on_alert(&self, dataset: DatasetKind, severity: Severity, error: &PipelineError) {
        error!(alert = true, %dataset, ?severity, %error, "pipeline alert");
    }
}

/// An observer that fans out callbacks to a list of observers.
#[derive(Default)]
pub struct CompositeObserver {
    observers: Vec<Arc<dyn PipelineObserver>>,
}

impl CompositeObserver {
    /// Create a new composite observer from a list of observers.
    pub fn new(observers: Vec<Arc<dyn PipelineObserver>>) -> Self {
        Self { observers }
    }
}

impl fmt::Debug for CompositeObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeObserver")
            .field("observers_len", &self.observers.len())
            .finish()
    }
}

impl PipelineObserver for CompositeObserver {
    fn on_event(&self, event: &PipelineEvent) {
        for o in &self.observers {
            o.on_event(event);
        }
    }

    fn on_alert(&self, dataset: DatasetKind, severity: Severity, error: &PipelineError) {
        for o in &self.observers {
            o.on_alert(dataset, severity, error);
        }
    }
}

/// Real-time counters for a run.
///
/// The runner updates these while pipelines execute; callers can snapshot them at any time.
pub struct PipelineMetrics {
    run_id: AtomicU64,
    elapsed_ns: AtomicU64,

    pipelines_started: AtomicU64,
    pipelines_succeeded: AtomicU64,
    pipelines_failed: AtomicU64,

    rows_read: AtomicU64,
    rows_dropped_missing: AtomicU64,
    rows_dropped_duplicate: AtomicU64,
    rows_written: AtomicU64,
    bytes_written: AtomicU64,

    active_pipelines: AtomicUsize,
    max_active_pipelines: AtomicUsize,
}

impl PipelineMetrics {
    pub fn new() -> Self {
        Self {
            run_id: AtomicU64::new(0),
            elapsed_ns: AtomicU64::new(0),
            pipelines_started: AtomicU64::new(0),
            pipelines_succeeded: AtomicU64::new(0),
            pipelines_failed: AtomicU64::new(0),
            rows_read: AtomicU64::new(0),
            rows_dropped_missing: AtomicU64::new(0),
            rows_dropped_duplicate: AtomicU64::new(0),
            rows_written: AtomicU64::new(0),
            bytes_written: AtomicU64::new(0),
            active_pipelines: AtomicUsize::new(0),
            max_active_pipelines: AtomicUsize::new(0),
        }
    }

    pub fn begin_run(&self) {
        let _ = self.run_id.fetch_add(1, Ordering::SeqCst);
        for counter in [
            &self.elapsed_ns,
            &self.pipelines_started,
            &self.pipelines_succeeded,
            &self.pipelines_failed,
            &self.rows_read,
            &self.rows_dropped_missing,
            &self.rows_dropped_duplicate,
            &self.rows_written,
            &self.bytes_written,
        ] {
            counter.store(0, Ordering::SeqCst);
        }
        self.active_pipelines.store(0, Ordering::SeqCst);
        self.max_active_pipelines.store(0, Ordering::SeqCst);
    }

    pub fn end_run(&self, elapsed: Duration) {
        self.elapsed_ns
            .store(elapsed.as_nanos().min(u64::MAX as u128) as u64, Ordering::SeqCst);
    }

    pub fn on_pipeline_start(&self) {
        let _ = self.pipelines_started.fetch_add(1, Ordering::SeqCst);
        let now = self.active_pipelines.fetch_add(1, Ordering::SeqCst) + 1;
        update_max_usize(&self.max_active_pipelines, now);
    }

    pub fn on_rows_read(&self, rows: usize) {
        let _ = self.rows_read.fetch_add(rows as u64, Ordering::SeqCst);
    }

    pub fn on_pipeline_success(&self, stats: &DatasetStats) {
        let _ = self
            .rows_dropped_missing
            .fetch_add(stats.clean.dropped_missing as u64, Ordering::SeqCst);
        let _ = self
            .rows_dropped_duplicate
            .fetch_add(stats.clean.dropped_duplicates as u64, Ordering::SeqCst);
        let _ = self
            .rows_written
            .fetch_add(stats.rows_written as u64, Ordering::SeqCst);
        let _ = self
            .bytes_written
            .fetch_add(stats.bytes_written as u64, Ordering::SeqCst);
        let _ = self.pipelines_succeeded.fetch_add(1, Ordering::SeqCst);
        let _ = self.active_pipelines.fetch_sub(1, Ordering::SeqCst);
    }

    pub fn on_pipeline_failure(&self) {
        let _ = self.pipelines_failed.fetch_add(1, Ordering::SeqCst);
        let _ = self.active_pipelines.fetch_sub(1, Ordering::SeqCst);
    }

    pub fn snapshot(&self) -> PipelineMetricsSnapshot {
        let elapsed_ns = self.elapsed_ns.load(Ordering::SeqCst);
        PipelineMetricsSnapshot {
            run_id: self.run_id.load(Ordering::SeqCst),
            elapsed: (elapsed_ns > 0).then(|| Duration::from_nanos(elapsed_ns)),
            pipelines_started: self.pipelines_started.load(Ordering::SeqCst),
            pipelines_succeeded: self.pipelines_succeeded.load(Ordering::SeqCst),
            pipelines_failed: self.pipelines_failed.load(Ordering::SeqCst),
            rows_read: self.rows_read.load(Ordering::SeqCst),
            rows_dropped_missing: self.rows_dropped_missing.load(Ordering::SeqCst),
            rows_dropped_duplicate: self.rows_dropped_duplicate.load(Ordering::SeqCst),
            rows_written: self.rows_written.load(Ordering::SeqCst),
            bytes_written: self.bytes_written.load(Ordering::SeqCst),
            max_active_pipelines: self.max_active_pipelines.load(Ordering::SeqCst),
        }
    }
}

impl Default for PipelineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for PipelineMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PipelineMetrics").field(&self.snapshot()).finish()
    }
}

fn update_max_usize(dst: &AtomicUsize, now: usize) {
    loop {
        let cur = dst.load(Ordering::SeqCst);
        if now <= cur {
            break;
        }
        if dst
            .compare_exchange(cur, now, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            break;
        }
    }
}

/// Immutable snapshot of [`PipelineMetrics`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineMetricsSnapshot {
    pub run_id: u64,
    pub elapsed: Option<Duration>,
    pub pipelines_started: u64,
    pub pipelines_succeeded: u64,
    pub pipelines_failed: u64,
    pub rows_read: u64,
    pub rows_dropped_missing: u64,
    pub rows_dropped_duplicate: u64,
    pub rows_written: u64,
    pub bytes_written: u64,
    pub max_active_pipelines: usize,
}

impl fmt::Display for PipelineMetricsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "run_id={}, pipelines={}/{} ok, failed={}, rows_read={}, dropped_missing={}, dropped_duplicate={}, rows_written={}, bytes_written={}, max_active={}, elapsed={:?}",
            self.run_id,
            self.pipelines_succeeded,
            self.pipelines_started,
            self.pipelines_failed,
            self.rows_read,
            self.rows_dropped_missing,
            self.rows_dropped_duplicate,
            self.rows_written,
            self.bytes_written,
            self.max_active_pipelines,
            self.elapsed
        )
    }
}
