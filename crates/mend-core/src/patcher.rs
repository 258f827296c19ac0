//! Patch application.
//!
//! Applies suggested fixes as literal substring replacements on the
//! workspace's local copy. Each fix is applied independently; one fix
//! failing never blocks its siblings in the same batch, and nothing here
//! commits or pushes.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::domain::BugType;

/// A suggested textual replacement for one classified failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixSuggestion {
    /// File path relative to the repository root.
    pub file: String,

    /// 1-indexed line the failure was reported at.
    pub line: u32,

    pub bug_type: BugType,

    /// Snippet expected verbatim in the file's current contents.
    pub original_snippet: String,

    /// Replacement text for the snippet.
    pub replacement_snippet: String,

    /// Commit message recorded when the fix is confirmed.
    pub commit_message: String,

    /// Short human-readable description.
    pub description: String,
}

/// Result of one fix application attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatchOutcome {
    /// The snippet was found and replaced; the file was rewritten.
    Applied,
    /// The snippet was not present verbatim (e.g. already modified by a
    /// prior fix in the same pass); the file was left untouched.
    SnippetNotFound,
    /// The file could not be read or written.
    FileError,
}

impl PatchOutcome {
    pub fn applied(&self) -> bool {
        matches!(self, PatchOutcome::Applied)
    }
}

/// Apply a batch of fixes, returning one outcome per fix in input order.
pub fn apply_fixes(fixes: &[FixSuggestion], workspace_root: &Path) -> Vec<PatchOutcome> {
    fixes
        .iter()
        .map(|fix| apply_fix(fix, workspace_root))
        .collect()
}

/// Apply one fix as a literal substring replacement.
fn apply_fix(fix: &FixSuggestion, workspace_root: &Path) -> PatchOutcome {
    let path = workspace_root.join(&fix.file);

    let content = match std::fs::read_to_string(&path) {
        Ok(content) => content,
        Err(e) => {
            warn!(file = %fix.file, error = %e, "failed to read file for patch");
            return PatchOutcome::FileError;
        }
    };

    if !content.contains(&fix.original_snippet) {
        warn!(
            file = %fix.file,
            line = fix.line,
            "original snippet not found; skipping fix"
        );
        return PatchOutcome::SnippetNotFound;
    }

    let patched = content.replacen(&fix.original_snippet, &fix.replacement_snippet, 1);
    if let Err(e) = std::fs::write(&path, patched) {
        warn!(file = %fix.file, error = %e, "failed to write patched file");
        return PatchOutcome::FileError;
    }

    info!(file = %fix.file, line = fix.line, "applied fix");
    PatchOutcome::Applied
}

#[cfg(test)]
mod tests {
    use super::*;

    fn suggestion(file: &str, original: &str, replacement: &str) -> FixSuggestion {
        FixSuggestion {
            file: file.to_string(),
            line: 1,
            bug_type: BugType::Logic,
            original_snippet: original.to_string(),
            replacement_snippet: replacement.to_string(),
            commit_message: format!("[AI-AGENT] Fix logic error in {}:1", file),
            description: "fix logic error".to_string(),
        }
    }

    #[test]
    fn applies_literal_replacement() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("sum.js"), "const total = a - b;").unwrap();

        let outcomes = apply_fixes(
            &[suggestion("sum.js", "a - b", "a + b")],
            dir.path(),
        );
        assert_eq!(outcomes, vec![PatchOutcome::Applied]);
        assert_eq!(
            std::fs::read_to_string(dir.path().join("sum.js")).unwrap(),
            "const total = a + b;"
        );
    }

    #[test]
    fn missing_snippet_leaves_file_unmodified() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("sum.js"), "const total = a + b;").unwrap();

        let outcomes = apply_fixes(
            &[suggestion("sum.js", "a - b", "a * b")],
            dir.path(),
        );
        assert_eq!(outcomes, vec![PatchOutcome::SnippetNotFound]);
        assert_eq!(
            std::fs::read_to_string(dir.path().join("sum.js")).unwrap(),
            "const total = a + b;"
        );
    }

    #[test]
    fn one_failure_does_not_block_siblings() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.js"), "let x = 1;").unwrap();
        std::fs::write(dir.path().join("b.js"), "let y = 2;").unwrap();

        let outcomes = apply_fixes(
            &[
                suggestion("missing.js", "x", "z"),
                suggestion("a.js", "not present", "z"),
                suggestion("b.js", "y = 2", "y = 3"),
            ],
            dir.path(),
        );
        assert_eq!(
            outcomes,
            vec![
                PatchOutcome::FileError,
                PatchOutcome::SnippetNotFound,
                PatchOutcome::Applied,
            ]
        );
        assert_eq!(
            std::fs::read_to_string(dir.path().join("b.js")).unwrap(),
            "let y = 3;"
        );
    }

    #[test]
    fn only_first_occurrence_is_replaced() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("dup.js"), "a - b; a - b;").unwrap();

        apply_fixes(&[suggestion("dup.js", "a - b", "a + b")], dir.path());
        assert_eq!(
            std::fs::read_to_string(dir.path().join("dup.js")).unwrap(),
            "a + b; a - b;"
        );
    }
}
