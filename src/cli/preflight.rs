//! Pre-flight checks before operations that call remote models.
//!
//! Catches missing credentials up front instead of failing on the first
//! embedding or chat request.

use crate::config::Settings;
use crate::error::{KontextError, Result};

/// Requirements for different operations.
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    /// Indexing needs the embedding service.
    Index,
    /// Semantic search needs the embedding service.
    Search { semantic: bool },
    /// Asking needs the embedding and chat services.
    Ask,
}

/// Run pre-flight checks for the given operation.
///
/// Returns Ok(()) if all checks pass, or an error describing what's missing.
pub fn check(operation: Operation, settings: &Settings) -> Result<()> {
    let uses_remote_embeddings = settings.embedding.provider.eq_ignore_ascii_case("openai");

    match operation {
        Operation::Index | Operation::Search { semantic: true } => {
            if uses_remote_embeddings {
                check_api_key(&settings.embedding.api_base)?;
            }
        }
        Operation::Search { semantic: false } => {
            // Keyword search stays local
        }
        Operation::Ask => {
            if uses_remote_embeddings {
                check_api_key(&settings.embedding.api_base)?;
            }
            check_api_key(&settings.llm.api_base)?;
        }
    }
    Ok(())
}

/// Whether an API base points at the hosted OpenAI service.
fn requires_api_key(api_base: &str) -> bool {
    url::Url::parse(api_base)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.ends_with("openai.com")))
        .unwrap_or(false)
}

/// Check that an API key is configured when the endpoint needs one.
fn check_api_key(api_base: &str) -> Result<()> {
    if !requires_api_key(api_base) {
        return Ok(());
    }
    match std::env::var("OPENAI_API_KEY") {
        Ok(key) if !key.is_empty() => Ok(()),
        Ok(_) => Err(KontextError::Config(format!(
            "OPENAI_API_KEY is empty but {} requires it",
            api_base
        ))),
        Err(_) => Err(KontextError::Config(format!(
            "OPENAI_API_KEY not set but {} requires it. Set it with: export OPENAI_API_KEY='sk-...'",
            api_base
        ))),
    }
}
