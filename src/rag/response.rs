//! RAG response generation.

use super::citations::{extract_citations, Citation};
use super::retriever::{Retrieval, Retriever};
use crate::config::{LlmSettings, Prompts};
use crate::error::{KontextError, Result};
use crate::openai::create_client;
use crate::vector_store::SearchHit;
use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
};
use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, info, instrument};

/// RAG engine for question answering over indexed documents.
pub struct RagEngine {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: String,
    temperature: f32,
    max_tokens: u32,
    retriever: Retriever,
    prompts: Prompts,
}

impl RagEngine {
    /// Create a new RAG engine.
    pub fn new(retriever: Retriever, llm: &LlmSettings) -> Self {
        Self {
            client: create_client(&llm.api_base),
            model: llm.model.clone(),
            temperature: llm.temperature,
            max_tokens: llm.max_tokens,
            retriever,
            prompts: Prompts::default(),
        }
    }

    /// Set custom prompts (with user-defined variables).
    pub fn with_prompts(mut self, prompts: Prompts) -> Self {
        self.prompts = prompts;
        self
    }

    /// The retriever used for context.
    pub fn retriever(&self) -> &Retriever {
        &self.retriever
    }

    /// Build the user prompt for a question and its retrieved context.
    pub fn build_user_prompt(&self, question: &str, retrieval: &Retrieval) -> String {
        let mut vars = HashMap::new();
        vars.insert("question".to_string(), question.to_string());

        if retrieval.is_empty() {
            self.prompts
                .render_with_custom(&self.prompts.rag.no_context, &vars)
        } else {
            vars.insert("context".to_string(), retrieval.context_text.clone());
            self.prompts.render_with_custom(&self.prompts.rag.user, &vars)
        }
    }

    fn build_messages(&self, user_prompt: String) -> Result<Vec<ChatCompletionRequestMessage>> {
        let system = self
            .prompts
            .render_with_custom(&self.prompts.rag.system, &HashMap::new());

        Ok(vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(system)
                .build()
                .map_err(|e| KontextError::Llm(e.to_string()))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(user_prompt)
                .build()
                .map_err(|e| KontextError::Llm(e.to_string()))?
                .into(),
        ])
    }

    /// Ask a question and get an answer grounded in the indexed documents.
    #[instrument(skip(self), fields(question = %question))]
    pub async fn ask(&self, question: &str) -> Result<RagAnswer> {
        info!("Processing question: {}", question);

        let retrieval = self.retriever.retrieve(question).await?;
        if retrieval.is_empty() {
            info!("No relevant documents found, answering without context");
        }

        let user_prompt = self.build_user_prompt(question, &retrieval);
        let messages = self.build_messages(user_prompt)?;

        #[allow(deprecated)]
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .temperature(self.temperature)
            .max_tokens(self.max_tokens)
            .build()
            .map_err(|e| KontextError::Llm(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| KontextError::Llm(format!("Failed to generate response: {}", e)))?;

        let answer = response
            .choices
            .first()
            .and_then(|c| c.message.content.as_ref())
            .ok_or_else(|| KontextError::Llm("Empty response from LLM".to_string()))?
            .clone();

        let citations = extract_citations(&answer);
        debug!(
            "Generated answer with {} context hits and {} citations",
            retrieval.hits.len(),
            citations.len()
        );

        Ok(RagAnswer {
            answer,
            citations,
            context_hits: retrieval.hits,
        })
    }
}

/// An answer with the sources it cited and the context it was given.
#[derive(Debug, Clone, Serialize)]
pub struct RagAnswer {
    /// The generated answer.
    pub answer: String,
    /// Unique citations found in the answer.
    pub citations: Vec<Citation>,
    /// Hits included in the prompt context.
    pub context_hits: Vec<SearchHit>,
}

impl RagAnswer {
    /// Format the answer for display.
    pub fn format_for_display(&self) -> String {
        let mut output = self.answer.clone();

        if !self.citations.is_empty() {
            output.push_str("\n\n--- Sources ---\n");
            for citation in &self.citations {
                output.push_str(&format!("\n{} (page {})", citation.document, citation.page));
            }
        }

        output
    }
}
