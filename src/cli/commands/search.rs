//! Search command implementation.

use crate::cli::Output;
use crate::config::Settings;
use crate::search::{SearchEngine, SearchRequest};
use anyhow::Result;

/// Run the search command.
pub async fn run_search(
    description: Option<String>,
    transcript: Option<String>,
    limit: usize,
    settings: &Settings,
) -> Result<()> {
    let request = SearchRequest {
        description,
        transcript,
        audio: None,
    };
    if request.is_empty() {
        anyhow::bail!("Give a description, a --transcript query, or both");
    }

    let engine = SearchEngine::from_settings(settings, super::frame_resolver(settings)?)?;

    let spinner = Output::spinner("Searching...");
    let results = engine.search(&request).await;
    spinner.finish_and_clear();

    match results {
        Ok(mut results) => {
            if results.is_empty() {
                Output::warning("No results found matching your query.");
                return Ok(());
            }

            // Fused results carry no rank, present them in playback order.
            results.sort_by(|a, b| {
                a.hit
                    .video_id
                    .cmp(&b.hit.video_id)
                    .then(a.hit.start_seconds.total_cmp(&b.hit.start_seconds))
            });

            Output::success(&format!("Found {} results", results.len()));
            for result in results.iter().take(limit) {
                Output::search_result(result);
            }
            if results.len() > limit {
                Output::info(&format!("{} more not shown", results.len() - limit));
            }
        }
        Err(e) => {
            Output::error(&format!("Search failed: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}
