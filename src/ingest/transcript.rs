//! Transcript files produced by speech recognition.
//!
//! Two layouts are read: Whisper JSON output and CSV exports with `Start`,
//! `End` and `Text` columns.

use crate::error::{FramefindError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

/// A transcript with its segments in file order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transcript {
    /// Video ID this transcript belongs to.
    pub video_id: String,
    /// Individual transcript segments with timestamps.
    pub segments: Vec<TranscriptSegment>,
}

/// A single segment of a transcript with timestamp information.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptSegment {
    /// Segment ID from the source, or the row number.
    pub id: String,
    /// Start time in seconds.
    pub start_seconds: f64,
    /// End time in seconds, never before the start.
    pub end_seconds: f64,
    /// Spoken text, trimmed.
    pub text: String,
}

impl TranscriptSegment {
    /// Create a normalised segment.
    ///
    /// Returns `None` for blank text. A missing end becomes the start and an
    /// end before the start is clamped to it.
    pub fn new(id: impl Into<String>, start: f64, end: Option<f64>, text: &str) -> Option<Self> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        let start_seconds = if start.is_finite() { start } else { 0.0 };
        let end_seconds = end
            .filter(|e| e.is_finite())
            .unwrap_or(start_seconds)
            .max(start_seconds);

        Some(Self {
            id: id.into(),
            start_seconds,
            end_seconds,
            text: text.to_string(),
        })
    }

    /// Duration of this segment in seconds.
    pub fn duration(&self) -> f64 {
        self.end_seconds - self.start_seconds
    }
}

impl Transcript {
    pub fn new(video_id: impl Into<String>, segments: Vec<TranscriptSegment>) -> Self {
        Self {
            video_id: video_id.into(),
            segments,
        }
    }

    /// Read a transcript file; the file stem is the video ID.
    pub fn load(path: &Path) -> Result<Self> {
        let video_id = path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| FramefindError::Ingest(format!("No video ID in {}", path.display())))?;
        let content = std::fs::read_to_string(path)?;

        match extension(path).as_deref() {
            Some("json") => Self::from_whisper_json(video_id, &content),
            Some("csv") => Self::from_csv(video_id, &content),
            _ => Err(FramefindError::Ingest(format!(
                "Unsupported transcript format: {}",
                path.display()
            ))),
        }
    }

    /// Parse Whisper output: `{"segments": [{"id", "start", "end", "text"}]}`.
    pub fn from_whisper_json(video_id: &str, content: &str) -> Result<Self> {
        let body: Value = serde_json::from_str(content)?;
        let segments = body["segments"].as_array().ok_or_else(|| {
            FramefindError::Ingest(format!("{}: no segments array", video_id))
        })?;

        let segments = segments
            .iter()
            .enumerate()
            .filter_map(|(row, seg)| {
                let id = match &seg["id"] {
                    Value::Number(n) => n.to_string(),
                    Value::String(s) => s.clone(),
                    _ => row.to_string(),
                };
                TranscriptSegment::new(
                    id,
                    json_number(&seg["start"]).unwrap_or(0.0),
                    json_number(&seg["end"]),
                    seg["text"].as_str().unwrap_or_default(),
                )
            })
            .collect();

        Ok(Self::new(video_id, segments))
    }

    /// Parse a CSV export. Column names are matched case-insensitively;
    /// only `Text` is required.
    pub fn from_csv(video_id: &str, content: &str) -> Result<Self> {
        let mut lines = content.lines();
        let header = lines
            .next()
            .ok_or_else(|| FramefindError::Ingest(format!("{}: empty CSV", video_id)))?;
        let columns: Vec<String> = split_csv_line(header)
            .into_iter()
            .map(|c| c.trim_start_matches('\u{feff}').trim().to_lowercase())
            .collect();

        let position = |name: &str| columns.iter().position(|c| c == name);
        let text_col = position("text")
            .ok_or_else(|| FramefindError::Ingest(format!("{}: no Text column", video_id)))?;
        let start_col = position("start");
        let end_col = position("end");

        let number = |fields: &[String], col: Option<usize>| {
            col.and_then(|c| fields.get(c))
                .and_then(|raw| raw.trim().parse::<f64>().ok())
        };

        let segments = lines
            .filter(|line| !line.trim().is_empty())
            .enumerate()
            .filter_map(|(row, line)| {
                let fields = split_csv_line(line);
                TranscriptSegment::new(
                    row.to_string(),
                    number(&fields, start_col).unwrap_or(0.0),
                    number(&fields, end_col),
                    fields.get(text_col).map(String::as_str).unwrap_or_default(),
                )
            })
            .collect();

        Ok(Self::new(video_id, segments))
    }

    /// Segment start times in order.
    pub fn starts(&self) -> Vec<f64> {
        self.segments.iter().map(|s| s.start_seconds).collect()
    }
}

/// A JSON number, or a string holding one.
fn json_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Whether a path looks like a transcript this module can read.
pub fn is_transcript_file(path: &Path) -> bool {
    matches!(extension(path).as_deref(), Some("json" | "csv"))
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
}

/// Split one CSV record, honouring double-quoted fields and `""` escapes.
fn split_csv_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut quoted = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if quoted && chars.peek() == Some(&'"') => {
                field.push('"');
                chars.next();
            }
            '"' => quoted = !quoted,
            ',' if !quoted => fields.push(std::mem::take(&mut field)),
            _ => field.push(c),
        }
    }
    fields.push(field);
    fields
}

/// Format seconds as MM:SS or HH:MM:SS.
pub fn format_timestamp(seconds: f64) -> String {
    let total_seconds = seconds.max(0.0) as u64;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let secs = total_seconds % 60;

    if hours > 0 {
        format!("{:02}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{:02}:{:02}", minutes, secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_normalisation() {
        let seg = TranscriptSegment::new("0", 4.0, Some(2.0), "  hello  ").unwrap();
        assert_eq!(seg.text, "hello");
        assert_eq!(seg.end_seconds, 4.0);
        assert_eq!(seg.duration(), 0.0);

        let open = TranscriptSegment::new("1", 1.5, None, "x").unwrap();
        assert_eq!(open.end_seconds, 1.5);

        assert!(TranscriptSegment::new("2", 0.0, Some(1.0), "   ").is_none());
    }

    #[test]
    fn test_whisper_json() {
        let json = r#"{"text": "ignored", "segments": [
            {"id": 0, "start": 0.0, "end": 2.4, "text": " Good evening."},
            {"id": 1, "start": 2.4, "end": 5.1, "text": "  "},
            {"id": 2, "start": 5.1, "text": "Tonight's news."}
        ]}"#;

        let transcript = Transcript::from_whisper_json("L01_V001", json).unwrap();
        assert_eq!(transcript.segments.len(), 2);
        assert_eq!(transcript.segments[0].text, "Good evening.");
        assert_eq!(transcript.segments[1].id, "2");
        assert_eq!(transcript.segments[1].end_seconds, 5.1);
        assert_eq!(transcript.starts(), vec![0.0, 5.1]);
    }

    #[test]
    fn test_whisper_json_numeric_strings() {
        let json = r#"{"segments": [
            {"id": "a", "start": "12.5", "end": " 14 ", "text": "quoted times"},
            {"id": "b", "start": "soon", "end": null, "text": "bad start"}
        ]}"#;

        let transcript = Transcript::from_whisper_json("v1", json).unwrap();
        assert_eq!(transcript.segments[0].start_seconds, 12.5);
        assert_eq!(transcript.segments[0].end_seconds, 14.0);
        assert_eq!(transcript.segments[1].start_seconds, 0.0);
        assert_eq!(transcript.segments[1].end_seconds, 0.0);
    }

    #[test]
    fn test_whisper_json_without_segments() {
        assert!(Transcript::from_whisper_json("v", r#"{"text": "hi"}"#).is_err());
        assert!(Transcript::from_whisper_json("v", "not json").is_err());
    }

    #[test]
    fn test_csv_columns_and_quoting() {
        let csv = " start , End ,TEXT\n\
                   1.0,2.0,\"Hello, world\"\n\
                   ,3.0,missing start\n\
                   4.0,,\"She said \"\"hi\"\"\"\n\
                   \n\
                   5.0,6.0,\n";

        let transcript = Transcript::from_csv("v1", csv).unwrap();
        let segs = &transcript.segments;

        assert_eq!(segs.len(), 3);
        assert_eq!(segs[0].text, "Hello, world");
        assert_eq!(segs[1].start_seconds, 0.0);
        assert_eq!(segs[1].end_seconds, 3.0);
        assert_eq!(segs[2].text, "She said \"hi\"");
        assert_eq!(segs[2].end_seconds, 4.0);
        assert_eq!(segs[2].id, "2");
    }

    #[test]
    fn test_csv_requires_text_column() {
        assert!(Transcript::from_csv("v1", "Start,End\n1,2\n").is_err());
        assert!(Transcript::from_csv("v1", "").is_err());
    }

    #[test]
    fn test_load_uses_file_stem() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("L02_V007.csv");
        std::fs::write(&path, "Start,End,Text\n0.5,1.0,hi\n").unwrap();

        let transcript = Transcript::load(&path).unwrap();
        assert_eq!(transcript.video_id, "L02_V007");
        assert!(is_transcript_file(&path));
        assert!(!is_transcript_file(Path::new("notes.txt")));
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(0.0), "00:00");
        assert_eq!(format_timestamp(65.0), "01:05");
        assert_eq!(format_timestamp(3665.0), "01:01:05");
    }
}
