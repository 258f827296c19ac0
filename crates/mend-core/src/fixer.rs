//! Fix generation.
//!
//! Asks the suggestion provider for replacement code per open failure,
//! bounded per iteration. A provider error skips that entry only; an
//! empty result tells the orchestrator to stop the retry loop.

use tracing::{debug, warn};

use mend_state::FixId;

use crate::domain::ClassifiedFailure;
use crate::patcher::FixSuggestion;
use crate::providers::suggest::SuggestionProvider;
use crate::workspace::Workspace;

/// Open failures treated per iteration.
pub const FIXES_PER_ITERATION: usize = 10;

/// Source lines fetched either side of the reported line for fix prompts.
const FIX_CONTEXT_LINES: usize = 20;

/// A classified failure still open in the current iteration, carrying the
/// identifier of its persisted fix record.
#[derive(Debug, Clone)]
pub struct OpenFailure {
    pub fix_id: FixId,
    pub failure: ClassifiedFailure,
}

/// A generated fix tied back to its persisted record.
#[derive(Debug, Clone)]
pub struct GeneratedFix {
    pub fix_id: FixId,
    pub suggestion: FixSuggestion,
}

/// Generate fixes for the current iteration's open failures.
pub async fn generate_fixes(
    open: &[OpenFailure],
    provider: &dyn SuggestionProvider,
    workspace: &Workspace,
) -> Vec<GeneratedFix> {
    let mut fixes = Vec::new();

    for entry in open.iter().take(FIXES_PER_ITERATION) {
        let failure = &entry.failure;
        let context = workspace.context_window(&failure.file, failure.line, FIX_CONTEXT_LINES);
        if context.is_empty() {
            warn!(file = %failure.file, line = failure.line, "no source context; skipping fix");
            continue;
        }

        let prompt = fix_prompt(failure, &context);
        let replacement = match provider.suggest_fix(&prompt).await {
            Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
            Ok(_) => {
                warn!(file = %failure.file, line = failure.line, "empty fix suggestion; skipping");
                continue;
            }
            Err(e) => {
                warn!(file = %failure.file, line = failure.line, error = %e, "fix generation failed; skipping");
                continue;
            }
        };

        debug!(file = %failure.file, line = failure.line, "generated fix");
        fixes.push(GeneratedFix {
            fix_id: entry.fix_id.clone(),
            suggestion: FixSuggestion {
                file: failure.file.clone(),
                line: failure.line,
                bug_type: failure.bug_type,
                original_snippet: context,
                replacement_snippet: replacement,
                commit_message: format!(
                    "[AI-AGENT] Fix {} error in {}:{}",
                    failure.bug_type.as_str().to_lowercase(),
                    failure.file,
                    failure.line
                ),
                description: failure.description.clone(),
            },
        });
    }

    fixes
}

fn fix_prompt(failure: &ClassifiedFailure, context: &str) -> String {
    format!(
        "You are an expert code fixer. Fix this {} error.\n\
         \n\
         File: {}\n\
         Line: {}\n\
         Bug Type: {}\n\
         Error: {}\n\
         \n\
         Current code:\n\
         {}\n\
         \n\
         Provide ONLY the fixed code for the problematic section. Do not include explanations.",
        failure.bug_type, failure.file, failure.line, failure.bug_type, failure.message, context
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use crate::domain::{BugType, MendError, Result};

    struct FixedProvider(&'static str);

    #[async_trait]
    impl SuggestionProvider for FixedProvider {
        async fn classify(&self, _prompt: &str) -> Result<String> {
            Ok(self.0.to_string())
        }
        async fn suggest_fix(&self, _prompt: &str) -> Result<String> {
            Ok(self.0.to_string())
        }
    }

    struct DeadProvider;

    #[async_trait]
    impl SuggestionProvider for DeadProvider {
        async fn classify(&self, _prompt: &str) -> Result<String> {
            Err(MendError::Suggestion("provider unreachable".to_string()))
        }
        async fn suggest_fix(&self, _prompt: &str) -> Result<String> {
            Err(MendError::Suggestion("provider unreachable".to_string()))
        }
    }

    fn open_failure(file: &str, line: u32) -> OpenFailure {
        OpenFailure {
            fix_id: FixId::new(),
            failure: ClassifiedFailure {
                file: file.to_string(),
                line,
                message: "Expected: 5".to_string(),
                bug_type: BugType::Logic,
                description: "fix expected value".to_string(),
            },
        }
    }

    fn seeded_workspace(files: &[(&str, &str)]) -> (tempfile::TempDir, Workspace) {
        let dir = tempfile::tempdir().unwrap();
        let workspace = Workspace::for_run(dir.path(), "https://github.com/a/b.git", "r1");
        std::fs::create_dir_all(workspace.root()).unwrap();
        for (file, content) in files {
            std::fs::write(workspace.root().join(file), content).unwrap();
        }
        (dir, workspace)
    }

    #[tokio::test]
    async fn generates_fix_with_context_as_original_snippet() {
        let (_dir, workspace) = seeded_workspace(&[("sum.js", "const x = 4;\n")]);
        let provider = FixedProvider("const x = 5;");

        let fixes = generate_fixes(&[open_failure("sum.js", 1)], &provider, &workspace).await;
        assert_eq!(fixes.len(), 1);
        assert_eq!(fixes[0].suggestion.original_snippet, "const x = 4;");
        assert_eq!(fixes[0].suggestion.replacement_snippet, "const x = 5;");
        assert!(fixes[0]
            .suggestion
            .commit_message
            .contains("Fix logic error in sum.js:1"));
    }

    #[tokio::test]
    async fn per_iteration_cap_is_enforced() {
        let files: Vec<(String, String)> = (0..12)
            .map(|i| (format!("f{i}.js"), format!("let v{i} = {i};\n")))
            .collect();
        let file_refs: Vec<(&str, &str)> = files
            .iter()
            .map(|(f, c)| (f.as_str(), c.as_str()))
            .collect();
        let (_dir, workspace) = seeded_workspace(&file_refs);
        let provider = FixedProvider("patched");

        let open: Vec<OpenFailure> = (0..12)
            .map(|i| open_failure(&format!("f{i}.js"), 1))
            .collect();
        let fixes = generate_fixes(&open, &provider, &workspace).await;
        assert_eq!(fixes.len(), FIXES_PER_ITERATION);
    }

    #[tokio::test]
    async fn dead_provider_yields_no_fixes() {
        let (_dir, workspace) = seeded_workspace(&[("a.js", "let a = 1;\n")]);
        let fixes = generate_fixes(&[open_failure("a.js", 1)], &DeadProvider, &workspace).await;
        assert!(fixes.is_empty());
    }

    #[tokio::test]
    async fn unreadable_file_is_skipped() {
        let (_dir, workspace) = seeded_workspace(&[]);
        let provider = FixedProvider("patched");
        let fixes = generate_fixes(&[open_failure("gone.js", 1)], &provider, &workspace).await;
        assert!(fixes.is_empty());
    }
}
