//! Index and add command implementations.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::document::SUPPORTED_EXTENSIONS;
use crate::indexer::discover_documents;
use crate::orchestrator::Orchestrator;
use anyhow::Result;
use std::path::PathBuf;

/// Run the index command: index every supported file in a directory.
pub async fn run_index(dir: Option<String>, reset: bool, orchestrator: &Orchestrator) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Index, orchestrator.settings()) {
        Output::error(&e.to_string());
        return Err(e.into());
    }

    let dir = dir
        .map(PathBuf::from)
        .unwrap_or_else(|| orchestrator.settings().documents_dir());

    if !dir.is_dir() {
        Output::error(&format!("Directory not found: {}", dir.display()));
        anyhow::bail!("directory not found: {}", dir.display());
    }

    if reset {
        Output::info("Resetting vector store...");
        orchestrator.vector_store().reset().await?;
    }

    let files = discover_documents(&dir).await?;
    if files.is_empty() {
        Output::warning(&format!(
            "No supported documents in {} (looked for .{})",
            dir.display(),
            SUPPORTED_EXTENSIONS.join(", .")
        ));
        return Ok(());
    }

    Output::info(&format!("Indexing {} documents from {}", files.len(), dir.display()));

    let spinner = Output::spinner("Chunking, embedding and storing...");
    let report = orchestrator.indexer().index_directory(&dir).await;
    spinner.finish_and_clear();
    let report = report?;

    Output::success(&format!(
        "Indexed {} documents ({} chunks)",
        report.indexed, report.chunks_stored
    ));
    if report.skipped > 0 {
        Output::kv("Skipped (no text)", &report.skipped.to_string());
    }
    if report.failed > 0 {
        Output::warning(&format!("{} documents failed:", report.failed));
        for (name, reason) in &report.failures {
            Output::list_item(&format!("{}: {}", name, reason));
        }
    }

    Ok(())
}

/// Run the add command: index a single file.
pub async fn run_add(file: &str, orchestrator: &Orchestrator) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Index, orchestrator.settings()) {
        Output::error(&e.to_string());
        return Err(e.into());
    }

    let path = PathBuf::from(file);
    let spinner = Output::spinner(&format!("Indexing {}...", path.display()));
    let result = orchestrator.indexer().index_file(&path).await;
    spinner.finish_and_clear();

    match result {
        Ok(report) => {
            if report.chunks_created == 0 {
                Output::warning(&format!("{} contains no text", report.document_name));
                return Ok(());
            }
            Output::success(&format!(
                "Indexed {} ({}/{} chunks)",
                report.document_name, report.chunks_stored, report.chunks_created
            ));
            if report.chunks_replaced > 0 {
                Output::kv("Replaced chunks", &report.chunks_replaced.to_string());
            }
            for error in &report.errors {
                Output::warning(error);
            }
        }
        Err(e) => {
            Output::error(&format!("Failed to index {}: {}", file, e));
            return Err(e.into());
        }
    }

    Ok(())
}
