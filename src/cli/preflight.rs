//! Pre-flight checks before expensive operations.
//!
//! Validates that required tools and directories are available before
//! starting operations that would otherwise fail midway.

use crate::config::Settings;
use crate::error::{FramefindError, Result};
use std::path::Path;
use std::process::Command;

/// Requirements for different operations.
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    /// Probing frame rates requires ffprobe.
    ProbeFrameRates,
    /// Ingestion requires a transcript directory.
    Ingest,
}

/// Run pre-flight checks for the given operation.
///
/// Returns Ok(()) if all checks pass, or an error describing what's missing.
pub fn check(operation: Operation, settings: &Settings) -> Result<()> {
    match operation {
        Operation::ProbeFrameRates => {
            check_tool("ffprobe")?;
        }
        Operation::Ingest => {
            check_dir(&settings.transcripts_dir(), "transcripts_dir")?;
        }
    }
    Ok(())
}

fn check_dir(path: &Path, key: &str) -> Result<()> {
    if path.is_dir() {
        Ok(())
    } else {
        Err(FramefindError::Config(format!(
            "{} does not exist: {}",
            key,
            path.display()
        )))
    }
}

/// Check if an external tool is available.
fn check_tool(name: &str) -> Result<()> {
    match Command::new(name).arg("-version").output() {
        Ok(output) if output.status.success() => Ok(()),
        Ok(_) => Err(FramefindError::ToolNotFound(format!(
            "{} is installed but not working correctly",
            name
        ))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(FramefindError::ToolNotFound(name.to_string()))
        }
        Err(e) => Err(FramefindError::ToolNotFound(format!("{}: {}", name, e))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_tool() {
        assert!(matches!(
            check_tool("framefind-no-such-tool"),
            Err(FramefindError::ToolNotFound(_))
        ));
    }

    #[test]
    fn test_ingest_needs_transcript_dir() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = Settings::default();

        settings.ingest.transcripts_dir = dir.path().join("missing").display().to_string();
        assert!(check(Operation::Ingest, &settings).is_err());

        settings.ingest.transcripts_dir = dir.path().display().to_string();
        assert!(check(Operation::Ingest, &settings).is_ok());
    }
}
