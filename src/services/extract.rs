//! Artifact extraction from generation responses.
//!
//! A response is expected to carry two delimited blocks, one per
//! [`ArtifactKind`]. Each block found is trimmed and written over the
//! previous iteration's file. A kind whose markers are absent is skipped --
//! partial output is tolerated. A start marker without its end marker is an
//! explicit error: silently taking the remainder of the text would hand the
//! simulator garbage.

use std::path::PathBuf;

use crate::domain::models::{ArtifactConfig, ArtifactKind};

/// Error types for artifact extraction.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("{kind} block opened with {start:?} but never closed")]
    Unterminated {
        kind: ArtifactKind,
        start: &'static str,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Which artifacts a response carried and where they were written.
#[derive(Debug, Clone, Default)]
pub struct ExtractionReport {
    pub written: Vec<(ArtifactKind, PathBuf)>,
}

impl ExtractionReport {
    pub fn contains(&self, kind: ArtifactKind) -> bool {
        self.written.iter().any(|(k, _)| *k == kind)
    }

    pub fn is_empty(&self) -> bool {
        self.written.is_empty()
    }
}

/// Writes delimited response blocks to their designated artifact files.
#[derive(Debug, Clone)]
pub struct ArtifactExtractor {
    work_dir: PathBuf,
    config: ArtifactConfig,
}

impl ArtifactExtractor {
    pub fn new(work_dir: impl Into<PathBuf>, config: ArtifactConfig) -> Self {
        Self {
            work_dir: work_dir.into(),
            config,
        }
    }

    /// Target path for an artifact kind.
    pub fn target_path(&self, kind: ArtifactKind) -> PathBuf {
        let name = match kind {
            ArtifactKind::Design => &self.config.design_file,
            ArtifactKind::Testbench => &self.config.testbench_file,
        };
        self.work_dir.join(name)
    }

    /// Extract every present block from `response` and persist it.
    ///
    /// Files for absent kinds are left untouched. Each write fully replaces
    /// the previous content.
    pub fn extract(&self, response: &str) -> Result<ExtractionReport, ExtractError> {
        let mut report = ExtractionReport::default();

        for kind in ArtifactKind::ALL {
            let Some(content) = slice_block(response, kind)? else {
                tracing::debug!(artifact = %kind, "No delimited block in response");
                continue;
            };

            let path = self.target_path(kind);
            std::fs::write(&path, content).map_err(|source| ExtractError::Write {
                path: path.display().to_string(),
                source,
            })?;

            tracing::info!(artifact = %kind, path = %path.display(), "Saved artifact");
            report.written.push((kind, path));
        }

        Ok(report)
    }
}

/// Locate `kind`'s delimited block in `text`.
///
/// Returns `Ok(None)` when the start marker is absent, the trimmed
/// inter-marker content when both markers are present, and an error when the
/// block is opened but never closed.
fn slice_block(text: &str, kind: ArtifactKind) -> Result<Option<&str>, ExtractError> {
    let start = kind.start_marker();
    let Some(open) = text.find(start) else {
        return Ok(None);
    };
    let body = &text[open + start.len()..];

    let Some(close) = body.find(kind.end_marker()) else {
        return Err(ExtractError::Unterminated { kind, start });
    };

    Ok(Some(body[..close].trim()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
