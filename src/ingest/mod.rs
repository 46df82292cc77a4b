//! Transcript ingestion.
//!
//! Each transcript segment is attached to the keyframe nearest its start
//! time and written to the transcript index, so spoken-word hits share the
//! `(video_id, keyframe_index)` identity of visual hits.

mod transcript;

pub use transcript::{format_timestamp, is_transcript_file, Transcript, TranscriptSegment};

use crate::error::{FramefindError, Result};
use crate::keyframe::{resolve_nearest, FrameRateTable, KeyframeMap, KeyframeMapCache};
use crate::resolver::frame_at;
use async_trait::async_trait;
use indicatif::ProgressBar;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// One indexed transcript segment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TranscriptDocument {
    /// Document ID in the index; not part of the stored body.
    #[serde(skip)]
    pub id: String,
    pub video_id: String,
    pub keyframe_index: i64,
    pub start: f64,
    pub end: f64,
    pub text: String,
}

/// Write side of a transcript index.
#[async_trait]
pub trait TranscriptIndexer: Send + Sync {
    /// Drop the index if present and create it empty.
    async fn recreate(&self) -> Result<()>;

    /// Create the index unless it already exists.
    async fn ensure_exists(&self) -> Result<()>;

    /// Index documents, returning how many were accepted.
    async fn bulk_index(&self, docs: &[TranscriptDocument]) -> Result<usize>;

    /// Make indexed documents visible to search.
    async fn refresh(&self) -> Result<()>;
}

/// Outcome of an ingestion run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub files_processed: usize,
    pub files_skipped: usize,
    pub documents_indexed: usize,
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// Turn a transcript into index documents.
///
/// With a keyframe map every segment is snapped to the keyframe nearest its
/// start and takes that keyframe's time as its start; without one the
/// keyframe index is estimated from the frame rate and the start is kept.
pub fn build_documents(
    transcript: &Transcript,
    map: Option<&KeyframeMap>,
    fps: f64,
) -> Vec<TranscriptDocument> {
    let starts = transcript.starts();
    let snapped: Vec<(i64, f64)> = match resolve_nearest(map, &starts) {
        Some(matches) => matches
            .into_iter()
            .map(|m| (m.keyframe_index, m.resolved_seconds))
            .collect(),
        None => {
            if map.is_none() {
                debug!("No keyframe map for {}, estimating from {} fps", transcript.video_id, fps);
            }
            starts
                .iter()
                .map(|&start| (frame_at(start, fps).max(0), start))
                .collect()
        }
    };

    transcript
        .segments
        .iter()
        .zip(snapped)
        .map(|(segment, (keyframe_index, start))| TranscriptDocument {
            id: format!("{}_{}_{}", transcript.video_id, keyframe_index, segment.id),
            video_id: transcript.video_id.clone(),
            keyframe_index,
            start: round3(start),
            end: round3(segment.end_seconds),
            text: segment.text.clone(),
        })
        .collect()
}

/// Transcript files directly inside a directory, sorted by name.
pub fn transcript_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(FramefindError::Ingest(format!(
            "Transcript directory not found: {}",
            dir.display()
        )));
    }

    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file() && is_transcript_file(path))
        .collect();
    files.sort();
    Ok(files)
}

/// Loads transcripts, assigns keyframes and writes them to an index.
pub struct TranscriptIngester {
    indexer: Arc<dyn TranscriptIndexer>,
    maps: Arc<KeyframeMapCache>,
    frame_rates: Arc<FrameRateTable>,
    bulk_chunk_size: usize,
    progress: ProgressBar,
}

impl TranscriptIngester {
    pub fn new(
        indexer: Arc<dyn TranscriptIndexer>,
        maps: Arc<KeyframeMapCache>,
        frame_rates: Arc<FrameRateTable>,
    ) -> Self {
        Self {
            indexer,
            maps,
            frame_rates,
            bulk_chunk_size: 2000,
            progress: ProgressBar::hidden(),
        }
    }

    pub fn with_chunk_size(mut self, bulk_chunk_size: usize) -> Self {
        self.bulk_chunk_size = bulk_chunk_size.max(1);
        self
    }

    /// Report per-file progress on the given bar.
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    /// Documents for one transcript file.
    pub fn documents_for(&self, path: &Path) -> Result<Vec<TranscriptDocument>> {
        let transcript = Transcript::load(path)?;
        let map = self.maps.get(&transcript.video_id);
        let fps = self.frame_rates.fps(&transcript.video_id);
        Ok(build_documents(&transcript, map.as_deref(), fps))
    }

    /// Ingest every transcript file in a directory.
    ///
    /// The index is recreated first unless `append` is set, in which case it
    /// is only created when missing. Files that cannot be read are skipped.
    #[instrument(skip_all, fields(dir = %dir.display(), append = append))]
    pub async fn ingest_directory(&self, dir: &Path, append: bool) -> Result<IngestReport> {
        let files = transcript_files(dir)?;
        info!("Found {} transcript files", files.len());

        if append {
            self.indexer.ensure_exists().await?;
        } else {
            self.indexer.recreate().await?;
        }

        let mut report = IngestReport::default();
        let mut pending: Vec<TranscriptDocument> = Vec::with_capacity(self.bulk_chunk_size);

        self.progress.set_length(files.len() as u64);
        for path in &files {
            self.progress.inc(1);
            match self.documents_for(path) {
                Ok(docs) => {
                    debug!("{}: {} segments", path.display(), docs.len());
                    report.files_processed += 1;
                    pending.extend(docs);
                }
                Err(e) => {
                    warn!("Skipping {}: {}", path.display(), e);
                    report.files_skipped += 1;
                    continue;
                }
            }

            while pending.len() >= self.bulk_chunk_size {
                let rest = pending.split_off(self.bulk_chunk_size);
                report.documents_indexed += self.indexer.bulk_index(&pending).await?;
                pending = rest;
            }
        }

        if !pending.is_empty() {
            report.documents_indexed += self.indexer.bulk_index(&pending).await?;
        }
        self.indexer.refresh().await?;
        self.progress.finish_and_clear();

        info!(
            "Indexed {} documents from {} files ({} skipped)",
            report.documents_indexed, report.files_processed, report.files_skipped
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::MemoryTranscriptIndex;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn transcript(starts: &[f64]) -> Transcript {
        let segments = starts
            .iter()
            .enumerate()
            .map(|(i, &s)| TranscriptSegment::new(i.to_string(), s, Some(s + 1.0), "words").unwrap())
            .collect();
        Transcript::new("v1", segments)
    }

    #[test]
    fn test_documents_snap_to_nearest_keyframe() {
        let map = KeyframeMap::parse_csv("v1", "FrameID,Seconds\n10,1.0\n11,3.0\n12,5.0\n").unwrap();
        let docs = build_documents(&transcript(&[0.0, 2.0, 2.9, 4.0, 6.0]), Some(&map), 25.0);

        let keyframes: Vec<i64> = docs.iter().map(|d| d.keyframe_index).collect();
        assert_eq!(keyframes, vec![10, 10, 11, 11, 12]);
        assert_eq!(docs[2].id, "v1_11_2");

        let starts: Vec<f64> = docs.iter().map(|d| d.start).collect();
        assert_eq!(starts, vec![1.0, 1.0, 3.0, 3.0, 5.0]);
        // End times stay with the segment.
        assert_eq!(docs[2].end, 3.9);
    }

    #[test]
    fn test_documents_without_map_use_frame_rate() {
        let docs = build_documents(&transcript(&[0.0, 1.0, 2.04, -1.0]), None, 25.0);

        let keyframes: Vec<i64> = docs.iter().map(|d| d.keyframe_index).collect();
        assert_eq!(keyframes, vec![0, 25, 51, 0]);
        assert_eq!(docs[1].id, "v1_25_1");
    }

    #[test]
    fn test_times_rounded_to_milliseconds() {
        let t = Transcript::new(
            "v1",
            vec![TranscriptSegment::new("0", 1.23456, Some(2.98765), "x").unwrap()],
        );
        let docs = build_documents(&t, None, 25.0);
        assert_eq!(docs[0].start, 1.235);
        assert_eq!(docs[0].end, 2.988);
    }

    /// Records batch sizes and the index lifecycle calls.
    #[derive(Default)]
    struct RecordingIndexer {
        batches: std::sync::Mutex<Vec<usize>>,
        recreated: AtomicUsize,
        ensured: AtomicUsize,
        refreshed: AtomicUsize,
    }

    #[async_trait]
    impl TranscriptIndexer for RecordingIndexer {
        async fn recreate(&self) -> Result<()> {
            self.recreated.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn ensure_exists(&self) -> Result<()> {
            self.ensured.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn bulk_index(&self, docs: &[TranscriptDocument]) -> Result<usize> {
            self.batches.lock().unwrap().push(docs.len());
            Ok(docs.len())
        }

        async fn refresh(&self) -> Result<()> {
            self.refreshed.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn write_fixtures(root: &Path) -> (PathBuf, PathBuf) {
        let transcripts = root.join("transcripts");
        let maps = root.join("maps");
        std::fs::create_dir_all(&transcripts).unwrap();
        std::fs::create_dir_all(&maps).unwrap();

        std::fs::write(
            transcripts.join("v1.json"),
            r#"{"segments": [
                {"id": 0, "start": 0.2, "end": 1.0, "text": "first"},
                {"id": 1, "start": 2.1, "end": 3.0, "text": "second"},
                {"id": 2, "start": 4.9, "end": 6.0, "text": "third"}
            ]}"#,
        )
        .unwrap();
        std::fs::write(transcripts.join("v2.csv"), "Start,End,Text\n0.5,1.0,hello\n2.0,3.0,again\n").unwrap();
        std::fs::write(transcripts.join("broken.json"), "{ nope").unwrap();
        std::fs::write(transcripts.join("readme.txt"), "ignored").unwrap();

        std::fs::write(maps.join("v1_map.csv"), "FrameID,Seconds\n1,0.0\n2,2.0\n3,5.0\n").unwrap();
        (transcripts, maps)
    }

    #[tokio::test]
    async fn test_ingest_directory() {
        let dir = tempfile::tempdir().unwrap();
        let (transcripts, maps) = write_fixtures(dir.path());

        let index = Arc::new(MemoryTranscriptIndex::new());
        let mut rates = HashMap::new();
        rates.insert("v2".to_string(), 30.0);
        let ingester = TranscriptIngester::new(
            index.clone(),
            Arc::new(KeyframeMapCache::from_dir(&maps, 8)),
            Arc::new(FrameRateTable::new(rates, 25.0)),
        );

        let report = ingester.ingest_directory(&transcripts, false).await.unwrap();
        assert_eq!(
            report,
            IngestReport {
                files_processed: 2,
                files_skipped: 1,
                documents_indexed: 5,
            }
        );

        let v1: Vec<(i64, f64)> = index
            .documents_for("v1")
            .iter()
            .map(|d| (d.keyframe_index, d.start))
            .collect();
        assert_eq!(v1, vec![(1, 0.0), (2, 2.0), (3, 5.0)]);
        let v2: Vec<i64> = index.documents_for("v2").iter().map(|d| d.keyframe_index).collect();
        assert_eq!(v2, vec![15, 60]);
    }

    #[tokio::test]
    async fn test_ingest_chunks_and_modes() {
        let dir = tempfile::tempdir().unwrap();
        let (transcripts, maps) = write_fixtures(dir.path());

        let indexer = Arc::new(RecordingIndexer::default());
        let ingester = TranscriptIngester::new(
            indexer.clone(),
            Arc::new(KeyframeMapCache::from_dir(&maps, 8)),
            Arc::new(FrameRateTable::default()),
        )
        .with_chunk_size(2);

        let report = ingester.ingest_directory(&transcripts, true).await.unwrap();
        assert_eq!(report.documents_indexed, 5);
        assert_eq!(*indexer.batches.lock().unwrap(), vec![2, 2, 1]);
        assert_eq!(indexer.ensured.load(Ordering::SeqCst), 1);
        assert_eq!(indexer.recreated.load(Ordering::SeqCst), 0);
        assert_eq!(indexer.refreshed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_missing_directory() {
        let ingester = TranscriptIngester::new(
            Arc::new(RecordingIndexer::default()),
            Arc::new(KeyframeMapCache::from_dir(Path::new("/nonexistent"), 8)),
            Arc::new(FrameRateTable::default()),
        );
        let result = ingester.ingest_directory(Path::new("/nonexistent/transcripts"), false).await;
        assert!(matches!(result, Err(FramefindError::Ingest(_))));
    }
}
