use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::catalog::{DatasetDescriptor, DatasetKind};
use crate::error::{PipelineError, PipelineResult};
use crate::ingestion::{ReaderOptions, read_dataset};
use crate::processing::{CleanStats, clean_with_stats, normalize};
use crate::sink::write_dataset;
use crate::storage::ObjectStore;

use super::observer::{PipelineEvent, PipelineMetrics, PipelineObserver, Severity};

/// Lifecycle of a single dataset pipeline.
///
/// `Idle → Reading → Cleaning → Normalizing → Writing → Done`; `Failed` is reachable from every
/// non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    Idle,
    Reading,
    Cleaning,
    Normalizing,
    Writing,
    Done,
    Failed,
}

impl PipelineState {
    pub fn is_terminal(self) -> bool {
        matches!(self, PipelineState::Done | PipelineState::Failed)
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PipelineState::Idle => "idle",
            PipelineState::Reading => "reading",
            PipelineState::Cleaning => "cleaning",
            PipelineState::Normalizing => "normalizing",
            PipelineState::Writing => "writing",
            PipelineState::Done => "done",
            PipelineState::Failed => "failed",
        };
        f.pad(s)
    }
}

/// Shared cancellation flag.
///
/// Pipelines check it before entering each working state. A write that has already started is
/// never interrupted.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Row and byte counts of a pipeline that reached `Done`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DatasetStats {
    pub rows_read: usize,
    pub clean: CleanStats,
    pub rows_written: usize,
    pub bytes_written: usize,
}

/// Final result of one dataset pipeline.
#[derive(Debug)]
pub struct DatasetOutcome {
    pub kind: DatasetKind,
    pub final_state: PipelineState,
    /// State the pipeline was in when it failed.
    pub failed_during: Option<PipelineState>,
    pub stats: Option<DatasetStats>,
    pub error: Option<PipelineError>,
    pub elapsed: Duration,
}

impl DatasetOutcome {
    pub fn is_done(&self) -> bool {
        self.final_state == PipelineState::Done
    }
}

/// Everything a pipeline borrows from the runner for the duration of one run.
pub(crate) struct PipelineContext<'a> {
    pub store: &'a dyn ObjectStore,
    pub reader: &'a ReaderOptions,
    pub observer: Option<&'a dyn PipelineObserver>,
    pub metrics: &'a PipelineMetrics,
    pub cancel: &'a CancellationToken,
    pub alert_at_or_above: Severity,
}

impl PipelineContext<'_> {
    fn emit(&self, event: PipelineEvent) {
        if let Some(o) = self.observer {
            o.on_event(&event);
        }
    }
}

/// One dataset's read → clean → normalize → write chain.
#[derive(Debug)]
pub struct DatasetPipeline<'d> {
    descriptor: &'d DatasetDescriptor,
    state: PipelineState,
}

impl<'d> DatasetPipeline<'d> {
    pub fn new(descriptor: &'d DatasetDescriptor) -> Self {
        Self {
            descriptor,
            state: PipelineState::Idle,
        }
    }

    /// Drive the pipeline to a terminal state. Errors are captured in the outcome, never
    /// propagated.
    pub(crate) fn run(mut self, ctx: &PipelineContext<'_>) -> DatasetOutcome {
        let started = Instant::now();
        let kind = self.descriptor.kind;
        ctx.metrics.on_pipeline_start();

        match self.execute(ctx) {
            Ok(stats) => {
                self.transition(ctx, PipelineState::Done);
                ctx.metrics.on_pipeline_success(&stats);
                let elapsed = started.elapsed();
                ctx.emit(PipelineEvent::DatasetFinished {
                    dataset: kind,
                    stats,
                    elapsed,
                });
                DatasetOutcome {
                    kind,
                    final_state: PipelineState::Done,
                    failed_during: None,
                    stats: Some(stats),
                    error: None,
                    elapsed,
                }
            }
            Err(e) => {
                let during = self.state;
                self.transition(ctx, PipelineState::Failed);
                ctx.metrics.on_pipeline_failure();

                let severity = Severity::of(&e);
                ctx.emit(PipelineEvent::DatasetFailed {
                    dataset: kind,
                    during,
                    severity,
                    error: e.to_string(),
                });
                if severity >= ctx.alert_at_or_above {
                    if let Some(o) = ctx.observer {
                        o.on_alert(kind, severity, &e);
                    }
                }

                DatasetOutcome {
                    kind,
                    final_state: PipelineState::Failed,
                    failed_during: Some(during),
                    stats: None,
                    error: Some(e),
                    elapsed: started.elapsed(),
                }
            }
        }
    }

    fn execute(&mut self, ctx: &PipelineContext<'_>) -> PipelineResult<DatasetStats> {
        let d = self.descriptor;

        self.enter(ctx, PipelineState::Reading)?;
        let raw = read_dataset(ctx.store, &d.source, ctx.reader)?;
        let rows_read = raw.row_count();
        ctx.metrics.on_rows_read(rows_read);

        self.enter(ctx, PipelineState::Cleaning)?;
        let (cleaned, clean) = clean_with_stats(&raw);
        drop(raw);

        self.enter(ctx, PipelineState::Normalizing)?;
        let curated = normalize(&cleaned, &d.schema)?;
        drop(cleaned);

        self.enter(ctx, PipelineState::Writing)?;
        let written = write_dataset(ctx.store, &curated, &d.destination)?;

        Ok(DatasetStats {
            rows_read,
            clean,
            rows_written: written.rows,
            bytes_written: written.bytes,
        })
    }

    fn enter(&mut self, ctx: &PipelineContext<'_>, next: PipelineState) -> PipelineResult<()> {
        if ctx.cancel.is_cancelled() {
            return Err(PipelineError::Cancelled { stage: next });
        }
        self.transition(ctx, next);
        Ok(())
    }

    fn transition(&mut self, ctx: &PipelineContext<'_>, to: PipelineState) {
        let from = std::mem::replace(&mut self.state, to);
        ctx.emit(PipelineEvent::StateChanged {
            dataset: self.descriptor.kind,
            from,
            to,
        });
    }
}
