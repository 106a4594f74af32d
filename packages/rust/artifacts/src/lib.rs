//! Output artifacts for a finished (or interrupted) batch run.
//!
//! Three reports are written per run, all named with the same timestamp:
//! - `<research_prefix>_<stamp>.csv`: one row per prospect, every research field
//! - `<research_prefix>_<stamp>.md`: per-prospect signal tables
//! - `<email_prefix>_<stamp>.txt`: drafted emails
//!
//! plus `manifest_<stamp>.json` with checksums and status counts. Each file is
//! written to a temp name and renamed into place.

pub mod email_text;
pub mod report;
pub mod research_csv;

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use outreach_shared::{OutreachError, OutputConfig, ProcessingResult, ProcessingStatus, Result};
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{debug, info, instrument};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// File name prefixes for the reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPrefixes {
    pub research: String,
    pub email: String,
}

impl From<&OutputConfig> for OutputPrefixes {
    fn from(config: &OutputConfig) -> Self {
        Self {
            research: config.research_prefix.clone(),
            email: config.email_prefix.clone(),
        }
    }
}

/// Metadata about a single written artifact file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactMeta {
    pub filename: String,
    pub path: PathBuf,
    pub sha256: String,
    pub size_bytes: usize,
}

/// Per-status prospect counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub completed: usize,
    pub partial_failure: usize,
    pub failure: usize,
}

impl StatusCounts {
    pub fn tally(results: &[ProcessingResult]) -> Self {
        let mut counts = Self::default();
        for result in results {
            match result.status {
                ProcessingStatus::Completed => counts.completed += 1,
                ProcessingStatus::PartialFailure => counts.partial_failure += 1,
                ProcessingStatus::Failure => counts.failure += 1,
            }
        }
        counts
    }

    pub fn total(&self) -> usize {
        self.completed + self.partial_failure + self.failure
    }
}

/// Describes the run the artifacts belong to.
#[derive(Debug, Clone)]
pub struct RunInfo {
    pub run_id: String,
    pub model_id: String,
    /// Prospects in the input, including any not yet processed.
    pub total_prospects: usize,
}

#[derive(Debug, Serialize)]
struct RunManifest<'a> {
    run_id: &'a str,
    model_id: &'a str,
    tool_version: &'static str,
    generated_at: DateTime<Utc>,
    total_prospects: usize,
    processed: usize,
    counts: StatusCounts,
    artifacts: &'a [ArtifactMeta],
}

// ---------------------------------------------------------------------------
// Writing
// ---------------------------------------------------------------------------

/// Timestamp used in artifact names, e.g. `20250114_093012`.
pub fn timestamp(now: DateTime<Utc>) -> String {
    now.format("%Y%m%d_%H%M%S").to_string()
}

/// Render and write every report plus the manifest into `dir`.
///
/// `results` must already be in input order.
#[instrument(skip_all, fields(dir = %dir.display(), stamp = %stamp, results = results.len()))]
pub fn write_outputs(
    dir: &Path,
    stamp: &str,
    prefixes: &OutputPrefixes,
    run: &RunInfo,
    results: &[ProcessingResult],
) -> Result<Vec<ArtifactMeta>> {
    std::fs::create_dir_all(dir).map_err(|e| OutreachError::io(dir, e))?;

    let files = [
        (format!("{}_{stamp}.csv", prefixes.research), research_csv::render(results)?),
        (format!("{}_{stamp}.md", prefixes.research), report::render(results)),
        (format!("{}_{stamp}.txt", prefixes.email), email_text::render(results)),
    ];

    let mut metas = Vec::with_capacity(files.len() + 1);
    for (filename, content) in &files {
        metas.push(write_atomic(dir, filename, content)?);
    }

    let manifest = RunManifest {
        run_id: &run.run_id,
        model_id: &run.model_id,
        tool_version: env!("CARGO_PKG_VERSION"),
        generated_at: Utc::now(),
        total_prospects: run.total_prospects,
        processed: results.len(),
        counts: StatusCounts::tally(results),
        artifacts: &metas,
    };
    let manifest_json = serde_json::to_string_pretty(&manifest)
        .map_err(|e| OutreachError::validation(format!("JSON serialization failed: {e}")))?;
    let manifest_meta = write_atomic(dir, &format!("manifest_{stamp}.json"), &manifest_json)?;
    metas.push(manifest_meta);

    info!(count = metas.len(), "artifacts written");
    Ok(metas)
}

/// Write `content` to `dir/filename` via a temp file and rename.
fn write_atomic(dir: &Path, filename: &str, content: &str) -> Result<ArtifactMeta> {
    let target = dir.join(filename);
    let temp = dir.join(format!(".{filename}.tmp"));

    std::fs::write(&temp, content).map_err(|e| OutreachError::io(&temp, e))?;
    std::fs::rename(&temp, &target).map_err(|e| OutreachError::io(&target, e))?;

    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let sha256 = format!("{:x}", hasher.finalize());

    debug!(file = %filename, size = content.len(), "wrote artifact");

    Ok(ArtifactMeta {
        filename: filename.to_string(),
        path: target,
        sha256,
        size_bytes: content.len(),
    })
}
