//! Batch evaluation of question/answer datasets against hosted evaluators.
//!
//! `ragscore` reads a tabular dataset (CSV or XLSX) whose rows carry
//! `question`, `answer`, `context`, and `ground_truth` fields, scores every
//! row with a configured set of quality evaluators (groundedness, relevance,
//! similarity — an Azure OpenAI chat deployment acting as judge) and safety
//! evaluators (violence, self-harm, hate/unfairness — the project-scoped
//! annotation service), and writes one JSON record per row.
//!
//! The pieces compose sequentially and are usable as a library:
//!
//! ```no_run
//! use std::path::Path;
//!
//! use ragscore::config::AzureOpenAiConfig;
//! use ragscore::dataset::{load_dataset, DatasetFormat};
//! use ragscore::evaluators::{registry, CategorySelection};
//! use ragscore::runner::BatchRunner;
//! use ragscore::writer::write_records;
//!
//! # async fn run() -> Result<(), ragscore::error::EvalError> {
//! let rows = load_dataset(Path::new("questions.csv"), DatasetFormat::Csv, None)?;
//! let evaluators = registry(
//!     CategorySelection::Quality,
//!     Some(AzureOpenAiConfig::from_env()?),
//!     None,
//! )?;
//! let results = BatchRunner::new(evaluators).run(&rows).await;
//! write_records(Path::new("results.jsonl"), &results)?;
//! # Ok(())
//! # }
//! ```
//!
//! Per-row and per-evaluator failures never abort a batch: they become
//! explicit `skipped`/`error` markers in the corresponding record, and a
//! batch of N rows always yields N records.

pub mod config;
pub mod dataset;
pub mod error;
pub mod evaluators;
pub mod runner;
pub mod writer;

pub use config::{AzureOpenAiConfig, ProjectScope, SafetyServiceConfig};
pub use dataset::{load_dataset, DatasetFormat, Row};
pub use error::EvalError;
pub use evaluators::{
    registry, CategorySelection, Evaluator, EvaluatorCategory, FieldMap, Score,
};
pub use runner::{BatchResult, BatchRunner, ResultRecord, ScoreOutcome};
pub use writer::write_records;
