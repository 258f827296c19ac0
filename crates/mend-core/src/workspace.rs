//! Per-run workspace management.
//!
//! Each run owns a workspace directory derived from its unique run id, so
//! concurrent runs never share a working tree. The workspace also owns the
//! run's on-disk artifacts: the detection report committed to the healing
//! branch and the `results.json` summary that survives cleanup.

use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::{info, warn};

use crate::domain::{ClassifiedFailure, Result};
use crate::report::ResultSummary;

/// Name of the summary artifact kept after cleanup.
pub const RESULTS_FILE: &str = "results.json";

/// Name of the detection report committed to the healing branch.
pub const DETECTION_REPORT_FILE: &str = "DETECTED_FAILURES.md";

/// A run's exclusively-owned working directory.
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    /// Compute the workspace path `<work_dir>/<repo-name>_<run_id>`.
    /// The directory itself (and any missing parents) is created by the
    /// clone.
    pub fn for_run(work_dir: &Path, repo_url: &str, run_id: &str) -> Self {
        let root = work_dir.join(format!("{}_{}", repo_name_from_url(repo_url), run_id));
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Read a bounded window of source around the reported line.
    ///
    /// Returns `context` lines either side of the 1-indexed `line`, or an
    /// empty string if the file is unreadable.
    pub fn context_window(&self, file: &str, line: u32, context: usize) -> String {
        let path = self.root.join(file);
        let Ok(content) = std::fs::read_to_string(&path) else {
            return String::new();
        };
        let lines: Vec<&str> = content.lines().collect();
        let idx = line.saturating_sub(1) as usize;
        let start = idx.saturating_sub(context);
        let end = (idx + context + 1).min(lines.len());
        if start >= end {
            return String::new();
        }
        lines[start..end].join("\n")
    }

    /// Write `DETECTED_FAILURES.md` documenting the classified failures.
    pub fn write_detection_report(&self, failures: &[ClassifiedFailure]) -> Result<()> {
        let mut doc = String::new();
        doc.push_str("# Mend Detection Report\n\n");
        doc.push_str(&format!(
            "Detected {} failures in automated test run:\n\n",
            failures.len()
        ));
        for (i, failure) in failures.iter().enumerate() {
            doc.push_str(&format!(
                "{}. **{}** in `{}`:{}\n   - Error: {}\n   - Description: {}\n",
                i + 1,
                failure.bug_type,
                failure.file,
                failure.line,
                failure.message,
                failure.description
            ));
        }
        doc.push_str(&format!(
            "\n---\nGenerated by Mend on {}\n",
            Utc::now().to_rfc3339()
        ));

        std::fs::write(self.root.join(DETECTION_REPORT_FILE), doc)?;
        Ok(())
    }

    /// Write the `results.json` summary artifact.
    pub fn write_results(&self, summary: &ResultSummary) -> Result<()> {
        let json = serde_json::to_vec_pretty(summary)?;
        std::fs::write(self.root.join(RESULTS_FILE), json)?;
        Ok(())
    }

    /// Delete every workspace artifact except `results.json`.
    ///
    /// Deletion errors are logged per item and never propagated; returns
    /// the number of items removed.
    pub fn cleanup_keep_results(&self) -> usize {
        let entries = match std::fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(root = %self.root.display(), error = %e, "cleanup skipped: workspace unreadable");
                return 0;
            }
        };

        let mut deleted = 0;
        for entry in entries.flatten() {
            if entry.file_name() == RESULTS_FILE {
                continue;
            }
            let path = entry.path();
            let result = if path.is_dir() {
                std::fs::remove_dir_all(&path)
            } else {
                std::fs::remove_file(&path)
            };
            match result {
                Ok(()) => deleted += 1,
                Err(e) => warn!(path = %path.display(), error = %e, "failed to delete workspace item"),
            }
        }
        info!(root = %self.root.display(), deleted, "workspace cleaned up");
        deleted
    }
}

/// Repository directory name from its clone URL.
fn repo_name_from_url(repo_url: &str) -> String {
    repo_url
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or("repo")
        .trim_end_matches(".git")
        .to_string()
}
