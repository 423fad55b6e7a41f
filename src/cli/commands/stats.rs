//! Stats command implementation.

use crate::cli::output::format_bytes;
use crate::cli::Output;
use crate::orchestrator::Orchestrator;
use anyhow::Result;

/// Run the stats command.
pub async fn run_stats(orchestrator: &Orchestrator) -> Result<()> {
    let stats = orchestrator.vector_store().stats().await?;
    let documents = orchestrator.vector_store().list_documents().await?;

    Output::header("Vector Store");
    Output::kv("Path", &stats.path);
    Output::kv("Chunks", &stats.count.to_string());
    Output::kv("Documents", &documents.len().to_string());
    Output::kv("Size", &format_bytes(stats.size_bytes));
    Output::kv("Embedding model", &stats.model);
    Output::kv("Dimensions", &stats.dimensions.to_string());

    let retrieval = &orchestrator.settings().retrieval;
    Output::header("Retrieval");
    Output::kv(
        "Mode",
        if retrieval.semantic_search { "semantic" } else { "keyword" },
    );
    Output::kv("Limit", &retrieval.limit.to_string());
    Output::kv("Min score", &format!("{:.2}", retrieval.min_score));
    Output::kv("Context budget", &format!("{} tokens", retrieval.max_context_tokens));

    if stats.count == 0 {
        println!();
        Output::info("The store is empty. Use 'kontext index' or 'kontext add <file>' to add documents.");
    }

    Ok(())
}
