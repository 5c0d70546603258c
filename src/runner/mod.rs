//! The batch evaluation loop.
//!
//! For every row the runner projects out the fields each configured
//! evaluator requires, joins all invocations, and finalizes one result
//! record. Skips and failures degrade to explicit markers in the record so
//! a batch of N rows always yields N records.


use std::collections::BTreeMap;
use std::sync::Arc;

use futures::future::join_all;
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};

use crate::dataset::Row;
use crate::evaluators::{Evaluator, Score};

/// Outcome of one (row, evaluator) invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ScoreOutcome {
    Scored {
        #[serde(flatten)]
        score: Score,
    },
    Skipped {
        missing_fields: Vec<String>,
    },
    Error {
        error: String,
    },
}

impl ScoreOutcome {
    pub fn score(&self) -> Option<&Score> {
        match self {
            ScoreOutcome::Scored { score } => Some(score),
            _ => None,
        }
    }
}

/// Scores for one input row, keyed by evaluator name, plus the source fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub row: usize,
    #[serde(flatten)]
    pub fields: BTreeMap<String, String>,
    pub scores: BTreeMap<String, ScoreOutcome>,
}

/// All row records of a run, in input order.
pub type BatchResult = Vec<ResultRecord>;

/// Drives the configured evaluators over a loaded dataset.
pub struct BatchRunner {
    evaluators: Vec<Arc<dyn Evaluator>>,
    concurrency: usize,
}

impl BatchRunner {
    pub fn new(evaluators: Vec<Arc<dyn Evaluator>>) -> Self {
        Self {
            evaluators,
            concurrency: 1,
        }
    }

    /// Number of rows evaluated in flight at once. 1 keeps runs sequential.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Evaluates every row. The returned batch is in input order regardless
    /// of the concurrency limit, and its length equals the input row count.
    pub async fn run(&self, rows: &[Row]) -> BatchResult {
        stream::iter(rows)
            .map(|row| self.evaluate_row(row))
            .buffered(self.concurrency)
            .collect()
            .await
    }

    async fn evaluate_row(&self, row: &Row) -> ResultRecord {
        let outcomes = join_all(
            self.evaluators
                .iter()
                .map(|evaluator| self.invoke(evaluator.as_ref(), row)),
        )
        .await;

        let scores = self
            .evaluators
            .iter()
            .map(|evaluator| evaluator.name().to_string())
            .zip(outcomes)
            .collect();

        ResultRecord {
            row: row.index,
            fields: row.fields.clone(),
            scores,
        }
    }

    async fn invoke(&self, evaluator: &dyn Evaluator, row: &Row) -> ScoreOutcome {
        let missing: Vec<String> = evaluator
            .required_fields()
            .iter()
            .filter(|name| row.field(name).is_none())
            .map(|name| name.to_string())
            .collect();
        if !missing.is_empty() {
            log::warn!(
                "row {}: skipping {}: missing fields {missing:?}",
                row.index,
                evaluator.name()
            );
            return ScoreOutcome::Skipped {
                missing_fields: missing,
            };
        }

        match evaluator.score(&row.fields).await {
            Ok(score) => ScoreOutcome::Scored { score },
            Err(err) => {
                log::warn!("row {}: {} failed: {err}", row.index, evaluator.name());
                ScoreOutcome::Error {
                    error: err.to_string(),
                }
            }
        }
    }
}
