//! Startup configuration for the evaluator backends.
//!
//! All values are externally supplied through the process environment and
//! read once into explicit structs before any row is evaluated; a missing
//! value is a startup error, never a per-row failure.

use secrecy::SecretString;

use crate::error::EvalError;

const ENV_OPENAI_ENDPOINT: &str = "AZURE_OPENAI_ENDPOINT";
const ENV_OPENAI_API_KEY: &str = "AZURE_OPENAI_API_KEY";
const ENV_OPENAI_DEPLOYMENT: &str = "AZURE_OPENAI_DEPLOYMENT_NAME";
const ENV_OPENAI_API_VERSION: &str = "AZURE_OPENAI_API_VERSION";

const ENV_SAFETY_ENDPOINT: &str = "AZURE_AI_SAFETY_ENDPOINT";
const ENV_SUBSCRIPTION_ID: &str = "AZURE_SUBSCRIPTION_ID";
const ENV_RESOURCE_GROUP: &str = "AZURE_RESOURCE_GROUP";
const ENV_PROJECT_NAME: &str = "AZURE_AI_PROJECT_NAME";
const ENV_CREDENTIAL_TOKEN: &str = "AZURE_AI_CREDENTIAL_TOKEN";

/// Connection settings for the Azure OpenAI deployment that backs the
/// quality evaluators.
#[derive(Debug, Clone)]
pub struct AzureOpenAiConfig {
    pub endpoint: String,
    pub api_key: SecretString,
    pub deployment: String,
    pub api_version: String,
}

impl AzureOpenAiConfig {
    pub fn from_env() -> Result<Self, EvalError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup, so tests can
    /// supply values without touching the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, EvalError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            endpoint: require(&lookup, ENV_OPENAI_ENDPOINT)?,
            api_key: SecretString::new(require(&lookup, ENV_OPENAI_API_KEY)?),
            deployment: require(&lookup, ENV_OPENAI_DEPLOYMENT)?,
            api_version: require(&lookup, ENV_OPENAI_API_VERSION)?,
        })
    }
}

/// Cloud coordinates of the project the safety annotation service runs in.
#[derive(Debug, Clone)]
pub struct ProjectScope {
    pub subscription_id: String,
    pub resource_group: String,
    pub project_name: String,
}

/// Connection settings for the safety annotation service.
#[derive(Debug, Clone)]
pub struct SafetyServiceConfig {
    pub endpoint: String,
    pub scope: ProjectScope,
    pub credential: SecretString,
}

impl SafetyServiceConfig {
    pub fn from_env() -> Result<Self, EvalError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, EvalError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            endpoint: require(&lookup, ENV_SAFETY_ENDPOINT)?,
            scope: ProjectScope {
                subscription_id: require(&lookup, ENV_SUBSCRIPTION_ID)?,
                resource_group: require(&lookup, ENV_RESOURCE_GROUP)?,
                project_name: require(&lookup, ENV_PROJECT_NAME)?,
            },
            credential: SecretString::new(require(&lookup, ENV_CREDENTIAL_TOKEN)?),
        })
    }
}

fn require<F>(lookup: &F, key: &str) -> Result<String, EvalError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(EvalError::Configuration(format!(
            "missing required value {key}"
        ))),
    }
}
