//! Running dataset pipelines, one per [`DatasetDescriptor`], sequentially or in parallel.
//!
//! This module sits "above" [`crate::ingestion`], [`crate::processing`] and [`crate::sink`] and
//! provides:
//!
//! - The per-dataset state machine ([`DatasetPipeline`], [`PipelineState`])
//! - Parallel execution across datasets on a dedicated rayon pool
//! - Cancellation, real-time metrics and observer hooks for monitoring
//!
//! A failing pipeline never affects the others: its error is captured in its
//! [`DatasetOutcome`] and the remaining datasets still run to completion.

mod observer;
mod pipeline;

use std::sync::Arc;
use std::time::{Duration, Instant};

use rayon::ThreadPoolBuilder;
use rayon::prelude::*;
use serde::Serialize;

use crate::catalog::{DatasetDescriptor, DatasetKind};
use crate::error::PipelineResult;
use crate::ingestion::ReaderOptions;
use crate::storage::ObjectStore;

pub use observer::{
    CompositeObserver, PipelineEvent, PipelineMetrics, PipelineMetricsSnapshot, PipelineObserver,
    Severity, TracingObserver,
};
pub use pipeline::{
    CancellationToken, DatasetOutcome, DatasetPipeline, DatasetStats, PipelineState,
};

use pipeline::PipelineContext;

/// Configuration for the [`PipelineRunner`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionOptions {
    /// Maximum number of dataset pipelines running at once. `1` runs them sequentially on the
    /// calling thread.
    pub parallelism: usize,
    /// Failures at or above this severity are reported through
    /// [`PipelineObserver::on_alert`].
    pub alert_at_or_above: Severity,
}

impl Default for ExecutionOptions {
    fn default() -> Self {
        Self {
            parallelism: DatasetKind::ALL.len(),
            alert_at_or_above: Severity::Critical,
        }
    }
}

/// Runs a set of dataset pipelines against one object store.
pub struct PipelineRunner {
    store: Arc<dyn ObjectStore>,
    reader: ReaderOptions,
    opts: ExecutionOptions,
    observer: Option<Arc<dyn PipelineObserver>>,
    metrics: Arc<PipelineMetrics>,
    cancel: CancellationToken,
}

impl PipelineRunner {
    pub fn new(store: Arc<dyn ObjectStore>, reader: ReaderOptions, opts: ExecutionOptions) -> Self {
        Self {
            store,
            reader,
            opts,
            observer: None,
            metrics: Arc::new(PipelineMetrics::new()),
            cancel: CancellationToken::new(),
        }
    }

    /// Attach an observer for pipeline events and alerts.
    pub fn with_observer(mut self, observer: Arc<dyn PipelineObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Get a handle to real-time run metrics.
    pub fn metrics(&self) -> Arc<PipelineMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Token that cancels pipelines of this runner before their next stage.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Run every descriptor to a terminal state and collect the outcomes in input order.
    ///
    /// Only a failure to set up the worker pool is returned as an error; pipeline failures are
    /// reported per dataset in the [`RunReport`].
    pub fn run(&self, descriptors: &[DatasetDescriptor]) -> PipelineResult<RunReport> {
        let start = Instant::now();
        self.metrics.begin_run();
        self.emit(PipelineEvent::RunStarted {
            datasets: descriptors.len(),
        });

        let ctx = PipelineContext {
            store: self.store.as_ref(),
            reader: &self.reader,
            observer: self.observer.as_deref(),
            metrics: &self.metrics,
            cancel: &self.cancel,
            alert_at_or_above: self.opts.alert_at_or_above,
        };

        let workers = self.opts.parallelism.min(descriptors.len());
        let outcomes: Vec<DatasetOutcome> = if workers > 1 {
            let pool = ThreadPoolBuilder::new().num_threads(workers).build()?;
            pool.install(|| {
                descriptors
                    .par_iter()
                    .map(|d| DatasetPipeline::new(d).run(&ctx))
                    .collect()
            })
        } else {
            descriptors
                .iter()
                .map(|d| DatasetPipeline::new(d).run(&ctx))
                .collect()
        };

        let elapsed = start.elapsed();
        self.metrics.end_run(elapsed);
        let metrics = self.metrics.snapshot();
        self.emit(PipelineEvent::RunFinished {
            elapsed,
            metrics: metrics.clone(),
        });

        Ok(RunReport {
            outcomes,
            elapsed,
            metrics,
        })
    }

    fn emit(&self, event: PipelineEvent) {
        if let Some(o) = &self.observer {
            o.on_event(&event);
        }
    }
}

/// Aggregated result of [`PipelineRunner::run`].
#[derive(Debug)]
pub struct RunReport {
    pub outcomes: Vec<DatasetOutcome>,
    pub elapsed: Duration,
    pub metrics: PipelineMetricsSnapshot,
}

impl RunReport {
    /// True only if every pipeline reached [`PipelineState::Done`].
    pub fn is_success(&self) -> bool {
        self.outcomes.iter().all(DatasetOutcome::is_done)
    }

    pub fn outcome(&self, kind: DatasetKind) -> Option<&DatasetOutcome> {
        self.outcomes.iter().find(|o| o.kind == kind)
    }

    pub fn failures(&self) -> impl Iterator<Item = &DatasetOutcome> {
        self.outcomes.iter().filter(|o| !o.is_done())
    }

    /// Serializable view of the report.
    pub fn summary(&self) -> RunSummary {
        RunSummary {
            success: self.is_success(),
            elapsed_ms: self.elapsed.as_millis() as u64,
            datasets: self
                .outcomes
                .iter()
                .map(|o| DatasetSummary {
                    dataset: o.kind,
                    state: o.final_state,
                    failed_during: o.failed_during,
                    rows_read: o.stats.map(|s| s.rows_read),
                    rows_dropped: o
                        .stats
                        .map(|s| s.clean.dropped_missing + s.clean.dropped_duplicates),
                    rows_written: o.stats.map(|s| s.rows_written),
                    error: o.error.as_ref().map(ToString::to_string),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub success: bool,
    pub elapsed_ms: u64,
    pub datasets: Vec<DatasetSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DatasetSummary {
    pub dataset: DatasetKind,
    pub state: PipelineState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_during: Option<PipelineState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows_read: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows_dropped: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows_written: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
