use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;

use zone_curation::config::PipelineConfig;
use zone_curation::execution::{PipelineRunner, RunReport, TracingObserver};
use zone_curation::storage::LocalObjectStore;

#[derive(Parser)]
#[command(
    name = "zone-curation",
    about = "Curate raw-zone datasets into Parquet partitions"
)]
struct Cli {
    /// Path to the TOML or JSON run configuration.
    #[arg(long, env = "ZONE_CURATION_CONFIG")]
    config: PathBuf,

    /// Print the run summary as JSON on stdout.
    #[arg(long)]
    json: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    tracing::info!(config = %cli.config.display(), "loading configuration");
    let (config, descriptors) = match PipelineConfig::from_path(&cli.config)
        .and_then(|c| c.descriptors().map(|d| (c, d)))
    {
        Ok(loaded) => loaded,
        Err(e) => {
            tracing::error!(error = %e, "failed to load config");
            return ExitCode::from(2);
        }
    };
    let reader = match config.reader_options() {
        Ok(r) => r,
        Err(e) => {
            tracing::error!(error = %e, "invalid reader options");
            return ExitCode::from(2);
        }
    };

    let store = Arc::new(LocalObjectStore::new(&config.storage.root));
    let store_root = store.root().display().to_string();
    let runner = PipelineRunner::new(store, reader, config.execution_options())
        .with_observer(Arc::new(TracingObserver));

    tracing::info!(
        root = %store_root,
        datasets = descriptors.len(),
        partition = %config.partition,
        parallelism = config.execution.parallelism,
        "starting run"
    );
    let report = match runner.run(&descriptors) {
        Ok(r) => r,
        Err(e) => {
            tracing::error!(error = %e, "run could not start");
            return ExitCode::FAILURE;
        }
    };

    if cli.json {
        match serde_json::to_string_pretty(&report.summary()) {
            Ok(s) => println!("{s}"),
            Err(e) => tracing::error!(error = %e, "failed to render summary"),
        }
    } else {
        print_summary(&report);
    }

    if report.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn print_summary(report: &RunReport) {
    for o in &report.outcomes {
        match (&o.stats, &o.error) {
            (Some(s), _) => println!(
                "{:<13} {:<7} read={} dropped={} written={}",
                o.kind,
                o.final_state,
                s.rows_read,
                s.clean.dropped_missing + s.clean.dropped_duplicates,
                s.rows_written
            ),
            (None, Some(e)) => println!("{:<13} {:<7} {e}", o.kind, o.final_state),
            (None, None) => println!("{:<13} {}", o.kind, o.final_state),
        }
    }
    println!("elapsed={:?} {}", report.elapsed, report.metrics);
}
