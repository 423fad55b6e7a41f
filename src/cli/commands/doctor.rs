//! Doctor command - verify configuration and model endpoints.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::openai::{list_models, model_matches};
use console::style;
use std::path::PathBuf;

/// Check result for a single item.
#[derive(Debug)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Debug, PartialEq)]
pub enum CheckStatus {
    Ok,
    Warning,
    Error,
}

impl CheckResult {
    fn ok(name: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Ok,
            message: message.to_string(),
            hint: None,
        }
    }

    fn warning(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Warning,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn error(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Error,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn print(&self) {
        let icon = match self.status {
            CheckStatus::Ok => style("✓").green(),
            CheckStatus::Warning => style("!").yellow(),
            CheckStatus::Error => style("✗").red(),
        };

        println!("  {} {} - {}", icon, style(&self.name).bold(), self.message);

        if let Some(hint) = &self.hint {
            println!("    {} {}", style("→").dim(), style(hint).dim());
        }
    }
}

/// Run all diagnostic checks.
pub async fn run_doctor(config_path: Option<PathBuf>, settings: &Settings) -> anyhow::Result<()> {
    Output::header("Kontext Doctor");
    println!();

    let mut checks = Vec::new();

    println!("{}", style("Configuration").bold());
    let config_checks = vec![check_config_file(config_path), check_settings(settings)];
    print_all(&config_checks);
    checks.extend(config_checks);
    println!();

    println!("{}", style("Directories").bold());
    let dir_checks = check_directories(settings);
    print_all(&dir_checks);
    checks.extend(dir_checks);
    println!();

    println!("{}", style("Model endpoints").bold());
    let endpoint_checks = vec![
        check_api_key(settings),
        check_embedding_endpoint(settings).await,
        check_chat_endpoint(settings).await,
    ];
    print_all(&endpoint_checks);
    checks.extend(endpoint_checks);
    println!();

    let errors = checks.iter().filter(|c| c.status == CheckStatus::Error).count();
    let warnings = checks.iter().filter(|c| c.status == CheckStatus::Warning).count();

    if errors > 0 {
        Output::error(&format!("{} error(s) found.", errors));
        anyhow::bail!("{} doctor check(s) failed", errors);
    } else if warnings > 0 {
        Output::warning(&format!("All checks passed with {} warning(s).", warnings));
    } else {
        Output::success("All checks passed! Kontext is ready to use.");
    }

    Ok(())
}

fn print_all(checks: &[CheckResult]) {
    for check in checks {
        check.print();
    }
}

fn check_config_file(config_path: Option<PathBuf>) -> CheckResult {
    let path = config_path.unwrap_or_else(Settings::default_config_path);
    if path.exists() {
        CheckResult::ok("Config file", &path.display().to_string())
    } else {
        CheckResult::warning(
            "Config file",
            &format!("not found at {} (using defaults)", path.display()),
            "Create one with: kontext config init",
        )
    }
}

fn check_settings(settings: &Settings) -> CheckResult {
    match settings.validate() {
        Ok(()) => CheckResult::ok("Settings", "valid"),
        Err(e) => CheckResult::error("Settings", &e.to_string(), "Fix the value in your config file"),
    }
}

fn check_directories(settings: &Settings) -> Vec<CheckResult> {
    let data_dir = settings.data_dir();
    let data = if data_dir.exists() {
        CheckResult::ok("Data directory", &data_dir.display().to_string())
    } else {
        CheckResult::warning(
            "Data directory",
            &format!("{} (will be created)", data_dir.display()),
            "Created on first use",
        )
    };

    let documents_dir = settings.documents_dir();
    let documents = if documents_dir.is_dir() {
        CheckResult::ok("Documents directory", &documents_dir.display().to_string())
    } else {
        CheckResult::warning(
            "Documents directory",
            &format!("{} not found", documents_dir.display()),
            "Pass a directory to `kontext index` or set general.documents_dir",
        )
    };

    vec![data, documents]
}

fn check_api_key(settings: &Settings) -> CheckResult {
    match preflight::check(Operation::Ask, settings) {
        Ok(()) => CheckResult::ok("API key", "not required or configured"),
        Err(e) => CheckResult::error(
            "API key",
            &e.to_string(),
            "Set with: export OPENAI_API_KEY='sk-...'",
        ),
    }
}

async fn check_embedding_endpoint(settings: &Settings) -> CheckResult {
    let embedding = &settings.embedding;
    if !matches!(embedding.provider.to_lowercase().as_str(), "openai" | "ollama") {
        return CheckResult::ok(
            "Embeddings",
            &format!("{} provider (offline)", embedding.provider),
        );
    }
    check_endpoint("Embeddings", &embedding.api_base, &embedding.model).await
}

async fn check_chat_endpoint(settings: &Settings) -> CheckResult {
    check_endpoint("Chat model", &settings.llm.api_base, &settings.llm.model).await
}

/// List the models at an endpoint and look for the configured one.
async fn check_endpoint(name: &str, api_base: &str, model: &str) -> CheckResult {
    match list_models(api_base).await {
        Ok(models) if models.iter().any(|m| model_matches(m, model)) => {
            CheckResult::ok(name, &format!("{} available at {}", model, api_base))
        }
        Ok(models) => CheckResult::warning(
            name,
            &format!("{} not listed at {} ({} models served)", model, api_base, models.len()),
            &format!("Pull it first, e.g. `ollama pull {}`", model),
        ),
        Err(e) => CheckResult::error(
            name,
            &e.to_string(),
            "Start the model server or fix the api_base setting",
        ),
    }
}
