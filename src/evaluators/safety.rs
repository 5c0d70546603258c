//! Safety annotation client and the content-harm evaluators built on it.
//!
//! Violence, self-harm, and hate/unfairness are scored by the project-scoped
//! annotation service, which returns a 0-7 severity per submitted
//! question/answer pair. All three iterate the dataset row by row exactly
//! like the quality evaluators.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};

use crate::config::SafetyServiceConfig;
use crate::error::EvalError;

use super::{Evaluator, EvaluatorCategory, FieldMap, Score};

const SAFETY_FIELDS: &[&str] = &["question", "answer"];

/// Client for the project-scoped content-harm annotation service.
#[derive(Debug, Clone)]
pub struct SafetyServiceClient {
    config: Arc<SafetyServiceConfig>,
    client: Client,
}

#[derive(Serialize)]
struct AnnotationRequest<'a> {
    metric: &'a str,
    question: &'a str,
    answer: &'a str,
}

#[derive(Deserialize, Debug)]
struct AnnotationResponse {
    severity: f64,
    #[serde(default)]
    label: Option<String>,
    #[serde(default)]
    reasoning: Option<String>,
}

impl SafetyServiceClient {
    pub fn new(config: SafetyServiceConfig) -> Self {
        Self::with_client(Client::new(), config)
    }

    /// Creates a client with a custom HTTP client.
    pub fn with_client(client: Client, config: SafetyServiceConfig) -> Self {
        Self {
            config: Arc::new(config),
            client,
        }
    }

    fn annotation_url(&self) -> String {
        format!(
            "{}/raisvc/v1.0/subscriptions/{}/resourceGroups/{}/providers/Microsoft.MachineLearningServices/workspaces/{}/annotate",
            self.config.endpoint.trim_end_matches('/'),
            self.config.scope.subscription_id,
            self.config.scope.resource_group,
            self.config.scope.project_name,
        )
    }

    /// Submits one question/answer pair for annotation against `metric`.
    pub async fn annotate(
        &self,
        metric: &str,
        question: &str,
        answer: &str,
    ) -> Result<Score, EvalError> {
        if self.config.credential.expose_secret().is_empty() {
            return Err(EvalError::Auth(
                "Missing safety service credential token".to_string(),
            ));
        }

        let body = AnnotationRequest {
            metric,
            question,
            answer,
        };

        let resp = self
            .client
            .post(self.annotation_url())
            .bearer_auth(self.config.credential.expose_secret())
            .json(&body)
            .send()
            .await?;

        log::debug!("annotation HTTP status for {metric}: {}", resp.status());

        let resp = resp.error_for_status()?;
        let parsed: AnnotationResponse = resp.json().await?;

        // Severity runs 0 (safe) to 7; label and reasoning travel with it.
        let reasoning = match (parsed.label, parsed.reasoning) {
            (Some(label), Some(reason)) => Some(format!("{label}: {reason}")),
            (Some(label), None) => Some(label),
            (None, reason) => reason,
        };

        Ok(Score {
            value: parsed.severity,
            reasoning,
        })
    }
}

/// Scores violent-content severity of a question/answer pair.
pub struct ViolenceEvaluator {
    client: Arc<SafetyServiceClient>,
}

impl ViolenceEvaluator {
    pub fn new(client: Arc<SafetyServiceClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Evaluator for ViolenceEvaluator {
    fn name(&self) -> &str {
        "violence"
    }

    fn category(&self) -> EvaluatorCategory {
        EvaluatorCategory::Safety
    }

    fn required_fields(&self) -> &[&str] {
        SAFETY_FIELDS
    }

    async fn score(&self, fields: &FieldMap) -> Result<Score, EvalError> {
        self.client
            .annotate("violence", field(fields, "question"), field(fields, "answer"))
            .await
    }
}

/// Scores self-harm-content severity of a question/answer pair.
pub struct SelfHarmEvaluator {
    client: Arc<SafetyServiceClient>,
}

impl SelfHarmEvaluator {
    pub fn new(client: Arc<SafetyServiceClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Evaluator for SelfHarmEvaluator {
    fn name(&self) -> &str {
        "self_harm"
    }

    fn category(&self) -> EvaluatorCategory {
        EvaluatorCategory::Safety
    }

    fn required_fields(&self) -> &[&str] {
        SAFETY_FIELDS
    }

    async fn score(&self, fields: &FieldMap) -> Result<Score, EvalError> {
        self.client
            .annotate("self_harm", field(fields, "question"), field(fields, "answer"))
            .await
    }
}

/// Scores hateful or unfair content severity of a question/answer pair.
pub struct HateUnfairnessEvaluator {
    client: Arc<SafetyServiceClient>,
}

impl HateUnfairnessEvaluator {
    pub fn new(client: Arc<SafetyServiceClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Evaluator for HateUnfairnessEvaluator {
    fn name(&self) -> &str {
        "hate_unfairness"
    }

    fn category(&self) -> EvaluatorCategory {
        EvaluatorCategory::Safety
    }

    fn required_fields(&self) -> &[&str] {
        SAFETY_FIELDS
    }

    async fn score(&self, fields: &FieldMap) -> Result<Score, EvalError> {
        self.client
            .annotate(
                "hate_unfairness",
                field(fields, "question"),
                field(fields, "answer"),
            )
            .await
    }
}

fn field<'a>(fields: &'a FieldMap, name: &str) -> &'a str {
    fields.get(name).map(String::as_str).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use secrecy::SecretString;

    use crate::config::ProjectScope;

    use super::*;

    fn config(endpoint: &str) -> SafetyServiceConfig {
        SafetyServiceConfig {
            endpoint: endpoint.to_string(),
            scope: ProjectScope {
                subscription_id: "sub-1".into(),
                resource_group: "rg-eval".into(),
                project_name: "proj".into(),
            },
            credential: SecretString::new("token".into()),
        }
    }

    #[test]
    fn annotation_url_is_project_scoped() {
        let client = SafetyServiceClient::new(config("https://eastus.api.azureml.ms/"));
        assert_eq!(
            client.annotation_url(),
            "https://eastus.api.azureml.ms/raisvc/v1.0/subscriptions/sub-1/resourceGroups/rg-eval/providers/Microsoft.MachineLearningServices/workspaces/proj/annotate"
        );
    }

    #[tokio::test]
    async fn annotate_maps_severity_to_score() {
        let mut server = mockito::Server::new_async().await;
        let reply = serde_json::json!({
            "severity": 0.0,
            "label": "Very low",
            "reasoning": "No violent content."
        });
        let mock = server
            .mock(
                "POST",
                "/raisvc/v1.0/subscriptions/sub-1/resourceGroups/rg-eval/providers/Microsoft.MachineLearningServices/workspaces/proj/annotate",
            )
            .match_header("authorization", "Bearer token")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(reply.to_string())
            .create_async()
            .await;

        let client = SafetyServiceClient::new(config(&server.url()));
        let score = client
            .annotate("violence", "What is the capital of France?", "Paris.")
            .await
            .expect("annotate");

        assert_eq!(score.value, 0.0);
        assert_eq!(score.reasoning.as_deref(), Some("Very low: No violent content."));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn annotate_requires_a_credential() {
        let mut cfg = config("https://eastus.api.azureml.ms");
        cfg.credential = SecretString::new(String::new());

        let client = SafetyServiceClient::new(cfg);
        let err = client
            .annotate("violence", "q", "a")
            .await
            .expect_err("no credential");

        assert!(matches!(err, EvalError::Auth(_)));
    }
}
