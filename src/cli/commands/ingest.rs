//! Transcript ingestion command.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::ingest::{transcript_files, TranscriptIngester};
use crate::search::ElasticTranscriptIndex;
use anyhow::Result;
use std::sync::Arc;

/// Run the ingest command.
pub async fn run_ingest(append: bool, dir: Option<String>, settings: &Settings) -> Result<()> {
    let transcripts_dir = match dir {
        Some(d) => Settings::expand_path(&d),
        None => {
            preflight::check(Operation::Ingest, settings)?;
            settings.transcripts_dir()
        }
    };

    let (maps, rates) = super::keyframe_sources(settings)?;
    let index = ElasticTranscriptIndex::new(&settings.text_search)?;

    let files = transcript_files(&transcripts_dir)?;
    if files.is_empty() {
        Output::warning(&format!("No transcripts found in {}", transcripts_dir.display()));
        return Ok(());
    }

    Output::info(&format!(
        "{} {} transcripts into '{}'",
        if append { "Appending" } else { "Indexing" },
        files.len(),
        settings.text_search.index
    ));

    let ingester = TranscriptIngester::new(Arc::new(index), maps, rates)
        .with_chunk_size(settings.ingest.bulk_chunk_size)
        .with_progress(Output::progress_bar(files.len() as u64, "transcripts"));

    let report = ingester.ingest_directory(&transcripts_dir, append).await?;

    Output::success(&format!(
        "Indexed {} segments from {} files",
        report.documents_indexed, report.files_processed
    ));
    if report.files_skipped > 0 {
        Output::warning(&format!("{} files skipped, run with -v for details", report.files_skipped));
    }
    Ok(())
}
