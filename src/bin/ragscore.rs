#[path = "ragscore/args.rs"]
mod args;

use std::time::Instant;

use anyhow::Context;
use clap::Parser;

use ragscore::config::{AzureOpenAiConfig, SafetyServiceConfig};
use ragscore::dataset::load_dataset;
use ragscore::evaluators::{
    registry, with_retries, CategorySelection, EvaluatorCategory, RetryPolicy,
};
use ragscore::runner::{BatchRunner, ScoreOutcome};
use ragscore::writer::write_records;

use args::{Cli, Command, EvaluateArgs};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match cli.command {
        Command::Evaluate(opts) => evaluate(opts).await,
    }
}

async fn evaluate(opts: EvaluateArgs) -> anyhow::Result<()> {
    let selection: CategorySelection = opts.categories.into();

    // Configuration is resolved up front so a missing credential fails the
    // run before any row is evaluated.
    let quality = selection
        .includes(EvaluatorCategory::Quality)
        .then(AzureOpenAiConfig::from_env)
        .transpose()?;
    let safety = selection
        .includes(EvaluatorCategory::Safety)
        .then(SafetyServiceConfig::from_env)
        .transpose()?;
    let evaluators = with_retries(
        registry(selection, quality, safety)?,
        RetryPolicy::with_attempts(opts.max_attempts),
    );

    let rows = load_dataset(&opts.input, opts.format.into(), opts.limit)
        .context("loading input dataset")?;
    log::info!("loaded {} rows from {}", rows.len(), opts.input.display());

    let runner = BatchRunner::new(evaluators).with_concurrency(opts.concurrency);

    let started = Instant::now();
    let results = runner.run(&rows).await;

    let mut scored = 0usize;
    let mut skipped = 0usize;
    let mut failed = 0usize;
    for outcome in results.iter().flat_map(|record| record.scores.values()) {
        match outcome {
            ScoreOutcome::Scored { .. } => scored += 1,
            ScoreOutcome::Skipped { .. } => skipped += 1,
            ScoreOutcome::Error { .. } => failed += 1,
        }
    }

    write_records(&opts.output, &results).context("writing results")?;
    log::info!(
        "wrote {} records to {} in {:.1}s ({scored} scored, {skipped} skipped, {failed} failed)",
        results.len(),
        opts.output.display(),
        started.elapsed().as_secs_f64()
    );

    Ok(())
}
