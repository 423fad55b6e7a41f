//! List, delete and reset command implementations.

use crate::cli::Output;
use crate::orchestrator::Orchestrator;
use anyhow::Result;
use std::io::Write;

/// Run the list command.
pub async fn run_list(orchestrator: &Orchestrator) -> Result<()> {
    match orchestrator.vector_store().list_documents().await {
        Ok(documents) => {
            if documents.is_empty() {
                Output::info("No documents indexed yet. Use 'kontext add <file>' to add content.");
            } else {
                Output::header(&format!("Indexed Documents ({})", documents.len()));
                println!();

                for doc in &documents {
                    Output::document_info(doc);
                }

                let total_chunks: usize = documents.iter().map(|d| d.chunk_count).sum();
                println!();
                Output::kv("Total documents", &documents.len().to_string());
                Output::kv("Total chunks", &total_chunks.to_string());
            }
        }
        Err(e) => {
            Output::error(&format!("Failed to list documents: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}

/// Run the delete command.
pub async fn run_delete(document: &str, orchestrator: &Orchestrator) -> Result<()> {
    let deleted = orchestrator.vector_store().delete_document(document).await?;
    if deleted == 0 {
        Output::warning(&format!("No chunks found for '{}'", document));
    } else {
        Output::success(&format!("Deleted {} chunks of '{}'", deleted, document));
    }
    Ok(())
}

/// Run the reset command.
pub async fn run_reset(yes: bool, orchestrator: &Orchestrator) -> Result<()> {
    let count = orchestrator.vector_store().chunk_count().await?;
    if count == 0 {
        Output::info("The vector store is already empty.");
        return Ok(());
    }

    if !yes && !confirm(&format!("Delete all {} chunks?", count))? {
        Output::info("Aborted.");
        return Ok(());
    }

    orchestrator.vector_store().reset().await?;
    Output::success(&format!("Deleted {} chunks", count));
    Ok(())
}

fn confirm(prompt: &str) -> Result<bool> {
    print!("{} [y/N] ", prompt);
    std::io::stdout().flush()?;
    let mut answer = String::new();
    std::io::stdin().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}
