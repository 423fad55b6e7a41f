//! Prompt templates for Kontext.
//!
//! Prompts can be customized by placing a `rag.toml` file in the custom prompts directory.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Collection of all prompt templates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Prompts {
    pub rag: RagPrompts,
    /// Custom variables from config, available in all prompts.
    #[serde(skip)]
    pub variables: HashMap<String, String>,
}

/// Prompts for answer generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RagPrompts {
    /// System prompt sent with every question.
    pub system: String,
    /// User prompt when relevant excerpts were retrieved.
    pub user: String,
    /// User prompt when nothing relevant was found.
    pub no_context: String,
}

impl Default for RagPrompts {
    fn default() -> Self {
        Self {
            system: r#"You are a precise research assistant who answers with accuracy and clarity.

PRIORITY 1: For information found in the provided documents:
- Use EXCLUSIVELY this documented information
- For EVERY piece of information from the documents, you MUST immediately cite the exact source in parentheses
- Format for document citations: (Source: Document name, Page X)
- Be comprehensive and detailed when answering from documents

PRIORITY 2: When no relevant information exists in the documents:
- Clearly state: "I could not find specific information on this question in the available documents."
- Then provide a general answer based on your knowledge, clearly marked with: "[General Knowledge]"

Formatting instructions:
1. Structure your answer in clear, logical paragraphs
2. Place the most important information at the beginning
3. For EVERY piece of document information, cite the source as (Source: Document name, Page X)
4. Never merge information from different documents without clear source attribution
5. Clearly separate documented information from general knowledge"#
                .to_string(),

            user: r#"Answer the following question based on the given document excerpts. Use ONLY information from these excerpts and cite the source with document name and page number for each piece of information.

Question: {{question}}

Here are the relevant document excerpts:

{{context}}"#
                .to_string(),

            no_context: r#"For the following question, no relevant information was found in the documents: "{{question}}"

Please respond as follows:
1. First mention that no specific information was found in the documents
2. Then provide a general answer based on your knowledge, clearly marked with "[General Knowledge]:""#
                .to_string(),
        }
    }
}

impl Prompts {
    /// Load prompts, with optional custom directory and variables.
    pub fn load(
        custom_dir: Option<&str>,
        custom_variables: Option<&HashMap<String, String>>,
    ) -> crate::error::Result<Self> {
        let mut prompts = Prompts::default();

        if let Some(vars) = custom_variables {
            prompts.variables = vars.clone();
        }

        if let Some(dir) = custom_dir {
            let rag_path = PathBuf::from(shellexpand::tilde(dir).to_string()).join("rag.toml");
            if rag_path.exists() {
                let content = std::fs::read_to_string(&rag_path)?;
                prompts.rag = toml::from_str(&content)?;
            }
        }

        Ok(prompts)
    }

    /// Render a prompt template with the given variables.
    pub fn render(template: &str, vars: &HashMap<String, String>) -> String {
        let mut result = template.to_string();
        for (key, value) in vars {
            result = result.replace(&format!("{{{{{}}}}}", key), value);
        }
        result
    }

    /// Render a prompt template with both provided variables and custom config variables.
    /// Provided variables take precedence over custom config variables.
    pub fn render_with_custom(&self, template: &str, vars: &HashMap<String, String>) -> String {
        let mut merged = self.variables.clone();
        for (key, value) in vars {
            merged.insert(key.clone(), value.clone());
        }
        Self::render(template, &merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_prompts() {
        let prompts = Prompts::default();
        assert!(prompts.rag.system.contains("(Source: Document name, Page X)"));
        assert!(prompts.rag.user.contains("{{context}}"));
        assert!(prompts.rag.no_context.contains("{{question}}"));
    }

    #[test]
    fn test_render_template() {
        let template = "Hello {{name}}, you have {{count}} messages.";
        let mut vars = HashMap::new();
        vars.insert("name".to_string(), "Alice".to_string());
        vars.insert("count".to_string(), "5".to_string());

        let result = Prompts::render(template, &vars);
        assert_eq!(result, "Hello Alice, you have 5 messages.");
    }

    #[test]
    fn test_provided_vars_override_custom() {
        let mut prompts = Prompts::default();
        prompts.variables.insert("org".to_string(), "ACME".to_string());
        prompts.variables.insert("question".to_string(), "ignored".to_string());

        let mut vars = HashMap::new();
        vars.insert("question".to_string(), "What?".to_string());

        let rendered = prompts.render_with_custom("{{org}}: {{question}}", &vars);
        assert_eq!(rendered, "ACME: What?");
    }

    #[test]
    fn test_load_custom_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("rag.toml"),
            "system = \"Be brief.\"\n",
        )
        .unwrap();

        let prompts = Prompts::load(dir.path().to_str(), None).unwrap();
        assert_eq!(prompts.rag.system, "Be brief.");
        // Unspecified fields keep their defaults.
        assert!(prompts.rag.user.contains("{{question}}"));
    }
}
