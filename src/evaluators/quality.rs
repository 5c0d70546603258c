//! Azure OpenAI judge client and the quality evaluators built on it.
//!
//! Groundedness, relevance, and similarity are graded by asking a chat
//! deployment for a 1-5 verdict on the fields projected out of a row.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};

use crate::config::AzureOpenAiConfig;
use crate::error::EvalError;

use super::{Evaluator, EvaluatorCategory, FieldMap, Score};

const JUDGE_SYSTEM_PROMPT: &str = "You are an evaluation assistant. Grade the input exactly as \
instructed and respond with JSON of the form {\"score\": <integer 1-5>, \"reasoning\": \"<one \
sentence>\"}. Do not add any other text.";

const GROUNDEDNESS_PROMPT: &str = r#"Rate how well the answer is grounded in the context, from 1 (contains claims absent from the context) to 5 (every claim follows from the context).

CONTEXT:
{context}

ANSWER:
{answer}"#;

const RELEVANCE_PROMPT: &str = r#"Rate how relevant the answer is to the question given the context, from 1 (off-topic) to 5 (fully addresses the question).

QUESTION:
{question}

CONTEXT:
{context}

ANSWER:
{answer}"#;

const SIMILARITY_PROMPT: &str = r#"Rate how semantically similar the answer is to the ground truth answer for the question, from 1 (unrelated) to 5 (equivalent in meaning).

QUESTION:
{question}

GROUND TRUTH:
{ground_truth}

ANSWER:
{answer}"#;

const MIN_GRADE: f64 = 1.0;
const MAX_GRADE: f64 = 5.0;

/// Client for an Azure OpenAI chat deployment used as a grading judge.
///
/// The client uses `Arc` internally for configuration, making cloning cheap;
/// one judge is shared by all quality evaluators.
#[derive(Debug, Clone)]
pub struct AzureOpenAiJudge {
    config: Arc<AzureOpenAiConfig>,
    client: Client,
}

#[derive(Serialize)]
struct JudgeChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct JudgeChatRequest<'a> {
    messages: Vec<JudgeChatMessage<'a>>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Deserialize, Debug)]
struct JudgeChatResponse {
    choices: Vec<JudgeChatChoice>,
}

#[derive(Deserialize, Debug)]
struct JudgeChatChoice {
    message: JudgeChatMsg,
}

#[derive(Deserialize, Debug)]
struct JudgeChatMsg {
    content: String,
}

#[derive(Deserialize)]
struct JudgeVerdict {
    score: f64,
    #[serde(default)]
    reasoning: Option<String>,
}

impl AzureOpenAiJudge {
    pub fn new(config: AzureOpenAiConfig) -> Self {
        Self::with_client(Client::new(), config)
    }

    /// Creates a judge with a custom HTTP client.
    pub fn with_client(client: Client, config: AzureOpenAiConfig) -> Self {
        Self {
            config: Arc::new(config),
            client,
        }
    }

    fn completions_url(&self) -> String {
        format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            self.config.endpoint.trim_end_matches('/'),
            self.config.deployment,
            self.config.api_version
        )
    }

    /// Asks the deployment to grade `prompt` and parses the verdict.
    pub async fn grade(&self, prompt: &str) -> Result<Score, EvalError> {
        if self.config.api_key.expose_secret().is_empty() {
            return Err(EvalError::Auth("Missing Azure OpenAI API key".to_string()));
        }

        let body = JudgeChatRequest {
            messages: vec![
                JudgeChatMessage {
                    role: "system",
                    content: JUDGE_SYSTEM_PROMPT,
                },
                JudgeChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: 0.0,
            max_tokens: Some(256),
        };

        if log::log_enabled!(log::Level::Trace) {
            if let Ok(json) = serde_json::to_string(&body) {
                log::trace!("judge request payload: {json}");
            }
        }

        let resp = self
            .client
            .post(self.completions_url())
            .header("api-key", self.config.api_key.expose_secret())
            .json(&body)
            .send()
            .await?;

        log::debug!("judge HTTP status: {}", resp.status());

        let resp = resp.error_for_status()?;
        let parsed: JudgeChatResponse = resp.json().await?;

        let content = parsed
            .choices
            .first()
            .map(|choice| choice.message.content.clone())
            .filter(|content| !content.is_empty())
            .ok_or_else(|| EvalError::ResponseFormat {
                message: "judge reply has no content".to_string(),
                raw_response: format!("{parsed:?}"),
            })?;

        parse_verdict(&content)
    }
}

/// Parses the judge reply: the JSON verdict first, a bare leading integer as
/// fallback for models that ignore the format instruction.
fn parse_verdict(content: &str) -> Result<Score, EvalError> {
    if let Ok(verdict) = serde_json::from_str::<JudgeVerdict>(content.trim()) {
        return Ok(Score {
            value: verdict.score.clamp(MIN_GRADE, MAX_GRADE),
            reasoning: verdict.reasoning,
        });
    }

    content
        .split(|c: char| !c.is_ascii_digit())
        .find(|part| !part.is_empty())
        .and_then(|part| part.parse::<f64>().ok())
        .map(|value| Score {
            value: value.clamp(MIN_GRADE, MAX_GRADE),
            reasoning: None,
        })
        .ok_or_else(|| EvalError::ResponseFormat {
            message: "judge reply is neither a JSON verdict nor a grade".to_string(),
            raw_response: content.to_string(),
        })
}

fn render(template: &str, fields: &FieldMap) -> String {
    let mut prompt = template.to_string();
    for (name, value) in fields {
        prompt = prompt.replace(&format!("{{{name}}}"), value);
    }
    prompt
}

/// Grades whether the answer's claims follow from the retrieved context.
pub struct GroundednessEvaluator {
    judge: Arc<AzureOpenAiJudge>,
}

impl GroundednessEvaluator {
    pub fn new(judge: Arc<AzureOpenAiJudge>) -> Self {
        Self { judge }
    }
}

#[async_trait]
impl Evaluator for GroundednessEvaluator {
    fn name(&self) -> &str {
        "groundedness"
    }

    fn category(&self) -> EvaluatorCategory {
        EvaluatorCategory::Quality
    }

    fn required_fields(&self) -> &[&str] {
        &["answer", "context"]
    }

    async fn score(&self, fields: &FieldMap) -> Result<Score, EvalError> {
        self.judge.grade(&render(GROUNDEDNESS_PROMPT, fields)).await
    }
}

/// Grades whether the answer addresses the question given the context.
pub struct RelevanceEvaluator {
    judge: Arc<AzureOpenAiJudge>,
}

impl RelevanceEvaluator {
    pub fn new(judge: Arc<AzureOpenAiJudge>) -> Self {
        Self { judge }
    }
}

#[async_trait]
impl Evaluator for RelevanceEvaluator {
    fn name(&self) -> &str {
        "relevance"
    }

    fn category(&self) -> EvaluatorCategory {
        EvaluatorCategory::Quality
    }

    fn required_fields(&self) -> &[&str] {
        &["question", "answer", "context"]
    }

    async fn score(&self, fields: &FieldMap) -> Result<Score, EvalError> {
        self.judge.grade(&render(RELEVANCE_PROMPT, fields)).await
    }
}

/// Grades semantic similarity between the answer and the ground truth.
pub struct SimilarityEvaluator {
    judge: Arc<AzureOpenAiJudge>,
}

impl SimilarityEvaluator {
    pub fn new(judge: Arc<AzureOpenAiJudge>) -> Self {
        Self { judge }
    }
}

#[async_trait]
impl Evaluator for SimilarityEvaluator {
    fn name(&self) -> &str {
        "similarity"
    }

    fn category(&self) -> EvaluatorCategory {
        EvaluatorCategory::Quality
    }

    fn required_fields(&self) -> &[&str] {
        &["question", "answer", "ground_truth"]
    }

    async fn score(&self, fields: &FieldMap) -> Result<Score, EvalError> {
        self.judge.grade(&render(SIMILARITY_PROMPT, fields)).await
    }
}

#[cfg(test)]
mod tests {
    use secrecy::SecretString;

    use super::*;

    fn config(endpoint: &str) -> AzureOpenAiConfig {
        AzureOpenAiConfig {
            endpoint: endpoint.to_string(),
            api_key: SecretString::new("secret".into()),
            deployment: "judge".into(),
            api_version: "2024-02-01".into(),
        }
    }

    fn fields(pairs: &[(&str, &str)]) -> FieldMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn parse_verdict_reads_json_reply() {
        let score = parse_verdict(r#"{"score": 4, "reasoning": "mostly grounded"}"#).expect("json");
        assert_eq!(score.value, 4.0);
        assert_eq!(score.reasoning.as_deref(), Some("mostly grounded"));
    }

    #[test]
    fn parse_verdict_falls_back_to_first_integer() {
        let score = parse_verdict("Score: 3 out of 5").expect("integer");
        assert_eq!(score.value, 3.0);
        assert!(score.reasoning.is_none());
    }

    #[test]
    fn parse_verdict_clamps_out_of_range_grades() {
        assert_eq!(parse_verdict(r#"{"score": 9}"#).expect("json").value, 5.0);
        assert_eq!(parse_verdict("0").expect("integer").value, 1.0);
    }

    #[test]
    fn parse_verdict_rejects_gradeless_replies() {
        let err = parse_verdict("I cannot grade this.").expect_err("no grade");
        assert!(matches!(err, EvalError::ResponseFormat { .. }));
    }

    #[test]
    fn render_substitutes_row_fields() {
        let prompt = render(
            SIMILARITY_PROMPT,
            &fields(&[
                ("question", "What is the capital of Japan?"),
                ("answer", "Tokyo."),
                ("ground_truth", "Tokyo is Japan's capital."),
            ]),
        );

        assert!(prompt.contains("What is the capital of Japan?"));
        assert!(prompt.contains("GROUND TRUTH:\nTokyo is Japan's capital."));
        assert!(!prompt.contains("{answer}"));
    }

    #[tokio::test]
    async fn grade_parses_deployment_verdict() {
        let mut server = mockito::Server::new_async().await;
        let reply = serde_json::json!({
            "choices": [
                {"message": {"content": "{\"score\": 5, \"reasoning\": \"fully grounded\"}"}}
            ]
        });
        let mock = server
            .mock("POST", "/openai/deployments/judge/chat/completions")
            .match_query(mockito::Matcher::UrlEncoded(
                "api-version".into(),
                "2024-02-01".into(),
            ))
            .match_header("api-key", "secret")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(reply.to_string())
            .create_async()
            .await;

        let judge = AzureOpenAiJudge::new(config(&server.url()));
        let score = judge.grade("rate this").await.expect("grade");

        assert_eq!(score.value, 5.0);
        assert_eq!(score.reasoning.as_deref(), Some("fully grounded"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn grade_surfaces_http_failures() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", mockito::Matcher::Any)
            .with_status(500)
            .create_async()
            .await;

        let judge = AzureOpenAiJudge::new(config(&server.url()));
        let err = judge.grade("rate this").await.expect_err("server error");

        assert!(matches!(err, EvalError::Http(_)));
    }

    #[tokio::test]
    async fn grade_requires_an_api_key() {
        let mut cfg = config("https://example.openai.azure.com");
        cfg.api_key = SecretString::new(String::new());

        let judge = AzureOpenAiJudge::new(cfg);
        let err = judge.grade("rate this").await.expect_err("no key");

        assert!(matches!(err, EvalError::Auth(_)));
    }

    #[tokio::test]
    async fn evaluator_projects_fields_into_prompt() {
        let mut server = mockito::Server::new_async().await;
        let reply = serde_json::json!({
            "choices": [{"message": {"content": "{\"score\": 1}"}}]
        });
        let mock = server
            .mock("POST", "/openai/deployments/judge/chat/completions")
            .match_query(mockito::Matcher::Any)
            .match_body(mockito::Matcher::Regex(
                "Tokyo is Japan's capital".to_string(),
            ))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(reply.to_string())
            .create_async()
            .await;

        let judge = Arc::new(AzureOpenAiJudge::new(config(&server.url())));
        let evaluator = GroundednessEvaluator::new(judge);
        let score = evaluator
            .score(&fields(&[
                ("answer", "The capital of Japan is Tokyo."),
                ("context", "Tokyo is Japan's capital and largest city."),
            ]))
            .await
            .expect("score");

        assert_eq!(score.value, 1.0);
        mock.assert_async().await;
    }
}
