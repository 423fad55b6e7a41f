//! Search command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::orchestrator::Orchestrator;
use crate::vector_store::{SearchMode, SearchOptions};
use anyhow::Result;

/// Run the search command.
pub async fn run_search(
    query: &str,
    limit: Option<usize>,
    min_score: Option<f32>,
    keyword: bool,
    orchestrator: &Orchestrator,
) -> Result<()> {
    let retrieval = &orchestrator.settings().retrieval;
    let semantic = retrieval.semantic_search && !keyword;

    if let Err(e) = preflight::check(Operation::Search { semantic }, orchestrator.settings()) {
        Output::error(&e.to_string());
        return Err(e.into());
    }

    let options = SearchOptions {
        limit: limit.unwrap_or(retrieval.limit),
        min_score: min_score.unwrap_or(retrieval.min_score),
        mode: SearchMode::from_flag(semantic),
    };

    let spinner = Output::spinner("Searching...");
    let results = orchestrator.vector_store().search(query, &options).await;
    spinner.finish_and_clear();

    match results {
        Ok(results) => {
            if results.is_empty() {
                Output::warning("No results found matching your query.");
            } else {
                Output::success(&format!("Found {} results ({} search)", results.count, options.mode));
                for hit in &results.hits {
                    Output::search_hit(hit);
                }
            }
        }
        Err(e) => {
            Output::error(&format!("Search failed: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}
