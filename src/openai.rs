//! OpenAI-compatible client configuration with sensible defaults.

use crate::error::{KontextError, Result};
use async_openai::{config::OpenAIConfig, Client};
use std::time::Duration;

/// Default timeout for API requests (60 seconds).
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Timeout for connectivity checks.
const CHECK_TIMEOUT_SECS: u64 = 10;

/// Placeholder key for local servers such as Ollama that ignore authentication.
const LOCAL_API_KEY: &str = "ollama";

/// Create a client for an OpenAI-compatible API at `api_base`.
///
/// Uses `OPENAI_API_KEY` when set, otherwise a placeholder key.
pub fn create_client(api_base: &str) -> Client<OpenAIConfig> {
    create_client_with_timeout(api_base, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
}

/// Create a client with a custom timeout.
pub fn create_client_with_timeout(api_base: &str, timeout: Duration) -> Client<OpenAIConfig> {
    let api_key = std::env::var("OPENAI_API_KEY").unwrap_or_else(|_| LOCAL_API_KEY.to_string());
    let config = OpenAIConfig::new()
        .with_api_base(api_base.trim_end_matches('/'))
        .with_api_key(api_key);

    let client = Client::with_config(config);
    match reqwest::Client::builder().timeout(timeout).build() {
        Ok(http_client) => client.with_http_client(http_client),
        Err(e) => {
            tracing::warn!("Failed to build HTTP client with timeout, using default: {}", e);
            client
        }
    }
}

/// List the model IDs served at `api_base`.
///
/// Used as a connectivity check; any transport or API failure is reported
/// as a language model error.
pub async fn list_models(api_base: &str) -> Result<Vec<String>> {
    let client = create_client_with_timeout(api_base, Duration::from_secs(CHECK_TIMEOUT_SECS));
    let response = client
        .models()
        .list()
        .await
        .map_err(|e| KontextError::Llm(format!("Cannot reach {}: {}", api_base, e)))?;

    Ok(response.data.into_iter().map(|model| model.id).collect())
}

/// Whether a served model ID matches a configured model name.
///
/// Ollama reports tags (`mistral:latest`) for models configured by bare name.
pub fn model_matches(served: &str, configured: &str) -> bool {
    served == configured
        || served
            .strip_suffix(":latest")
            .is_some_and(|name| name == configured)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_list_models_unreachable() {
        let result = list_models("http://127.0.0.1:9/v1").await;
        match result {
            Err(KontextError::Llm(msg)) => assert!(msg.contains("127.0.0.1:9")),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_model_matches() {
        assert!(model_matches("mistral", "mistral"));
        assert!(model_matches("mistral:latest", "mistral"));
        assert!(!model_matches("mistral:7b", "mistral"));
        assert!(!model_matches("llama3", "mistral"));
    }
}
