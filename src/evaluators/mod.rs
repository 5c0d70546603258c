//! Evaluator capabilities and their registry.
//!
//! Each evaluator is a named capability with a category, the row fields it
//! requires, and an async `score` call against its backing service. The
//! runner iterates evaluators generically, so adding one is a registration
//! in [`registry`] rather than a change to the orchestration loop.

mod quality;
mod resilient;
mod safety;

pub use quality::{
    AzureOpenAiJudge, GroundednessEvaluator, RelevanceEvaluator, SimilarityEvaluator,
};
pub use resilient::{ResilientEvaluator, RetryPolicy};
pub use safety::{
    HateUnfairnessEvaluator, SafetyServiceClient, SelfHarmEvaluator, ViolenceEvaluator,
};

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::{AzureOpenAiConfig, SafetyServiceConfig};
use crate::error::EvalError;

/// A grade returned by an evaluator: numeric value plus optional reasoning.
///
/// The runner forwards scores opaquely; their meaning (1-5 grade for the
/// quality metrics, 0-7 severity for the safety metrics) belongs to the
/// evaluator that produced them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Score {
    pub value: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
}

/// Grouping of evaluators selectable on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvaluatorCategory {
    Quality,
    Safety,
}

/// Which evaluator categories a run enables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CategorySelection {
    Quality,
    Safety,
    #[default]
    Both,
}

impl CategorySelection {
    pub fn includes(&self, category: EvaluatorCategory) -> bool {
        match self {
            CategorySelection::Quality => category == EvaluatorCategory::Quality,
            CategorySelection::Safety => category == EvaluatorCategory::Safety,
            CategorySelection::Both => true,
        }
    }
}

/// Named fields projected out of a row for one evaluator invocation.
pub type FieldMap = BTreeMap<String, String>;

/// A single scoring capability backed by a hosted service.
#[async_trait]
pub trait Evaluator: Send + Sync {
    /// Stable name used as the key in result records.
    fn name(&self) -> &str;

    fn category(&self) -> EvaluatorCategory;

    /// Row fields this evaluator needs; rows lacking any of them are skipped.
    fn required_fields(&self) -> &[&str];

    async fn score(&self, fields: &FieldMap) -> Result<Score, EvalError>;
}

/// Builds the evaluators for the selected categories.
///
/// Configuration is taken per category so that a quality-only run does not
/// require safety credentials and vice versa.
pub fn registry(
    selection: CategorySelection,
    quality: Option<AzureOpenAiConfig>,
    safety: Option<SafetyServiceConfig>,
) -> Result<Vec<Arc<dyn Evaluator>>, EvalError> {
    let mut evaluators: Vec<Arc<dyn Evaluator>> = Vec::new();

    if selection.includes(EvaluatorCategory::Quality) {
        let config = quality.ok_or_else(|| {
            EvalError::Configuration(
                "quality evaluators selected but no Azure OpenAI configuration given".into(),
            )
        })?;
        let judge = Arc::new(AzureOpenAiJudge::new(config));
        evaluators.push(Arc::new(GroundednessEvaluator::new(judge.clone())));
        evaluators.push(Arc::new(RelevanceEvaluator::new(judge.clone())));
        evaluators.push(Arc::new(SimilarityEvaluator::new(judge)));
    }

    if selection.includes(EvaluatorCategory::Safety) {
        let config = safety.ok_or_else(|| {
            EvalError::Configuration(
                "safety evaluators selected but no safety service configuration given".into(),
            )
        })?;
        let client = Arc::new(SafetyServiceClient::new(config));
        evaluators.push(Arc::new(ViolenceEvaluator::new(client.clone())));
        evaluators.push(Arc::new(SelfHarmEvaluator::new(client.clone())));
        evaluators.push(Arc::new(HateUnfairnessEvaluator::new(client)));
    }

    Ok(evaluators)
}

/// Wraps every evaluator in a retry decorator when more than one attempt is
/// allowed; a single-attempt policy leaves the registry untouched.
pub fn with_retries(
    evaluators: Vec<Arc<dyn Evaluator>>,
    policy: RetryPolicy,
) -> Vec<Arc<dyn Evaluator>> {
    if policy.max_attempts <= 1 {
        return evaluators;
    }
    evaluators
        .into_iter()
        .map(|inner| Arc::new(ResilientEvaluator::new(inner, policy.clone())) as Arc<dyn Evaluator>)
        .collect()
}
