//! Failure classification.
//!
//! Prefers the AI suggestion provider and falls back to deterministic
//! keyword matching when the provider is unavailable or answers outside
//! the fixed taxonomy. The fallback never fails, so classification as a
//! whole never fails.

use tracing::{debug, warn};

use crate::domain::{BugType, ClassifiedFailure, Failure};
use crate::providers::suggest::SuggestionProvider;
use crate::workspace::Workspace;

/// Failures processed per classification pass; the excess is dropped and
/// resurfaces on the next re-test if still present.
pub const CLASSIFY_CAP: usize = 20;

/// Source lines fetched either side of the reported line.
const CONTEXT_LINES: usize = 10;

/// Classify a batch of failures.
pub async fn classify(
    failures: &[Failure],
    provider: &dyn SuggestionProvider,
    workspace: &Workspace,
) -> Vec<ClassifiedFailure> {
    let mut classified = Vec::with_capacity(failures.len().min(CLASSIFY_CAP));

    for failure in failures.iter().take(CLASSIFY_CAP) {
        let context = workspace.context_window(&failure.file, failure.line, CONTEXT_LINES);
        let prompt = classification_prompt(failure, &context);

        let (bug_type, description) = match provider.classify(&prompt).await {
            Ok(answer) => match parse_answer(&answer) {
                Some(parsed) => parsed,
                None => {
                    warn!(
                        file = %failure.file,
                        line = failure.line,
                        answer = %answer.chars().take(60).collect::<String>(),
                        "provider answered outside taxonomy; using keyword fallback"
                    );
                    classify_by_keywords(&failure.message)
                }
            },
            Err(e) => {
                warn!(
                    file = %failure.file,
                    line = failure.line,
                    error = %e,
                    "classification call failed; using keyword fallback"
                );
                classify_by_keywords(&failure.message)
            }
        };

        debug!(file = %failure.file, line = failure.line, bug_type = %bug_type, "classified failure");
        classified.push(ClassifiedFailure {
            file: failure.file.clone(),
            line: failure.line,
            message: failure.message.clone(),
            bug_type,
            description,
        });
    }

    classified
}

/// Deterministic keyword fallback over the failure message.
pub fn classify_by_keywords(message: &str) -> (BugType, String) {
    let msg = message.to_lowercase();

    let (bug_type, description) = if msg.contains("import")
        || msg.contains("cannot find module")
        || msg.contains("is not defined")
    {
        (BugType::Import, "fix missing import")
    } else if msg.contains("type") || msg.contains("expected") || msg.contains("received") {
        (BugType::TypeError, "fix type mismatch")
    } else if msg.contains("syntax") || msg.contains("unexpected token") {
        (BugType::Syntax, "fix syntax error")
    } else if msg.contains("lint") || msg.contains("unused") {
        (BugType::Linting, "fix linting issue")
    } else if msg.contains("logic") || msg.contains("assert") || msg.contains("expect") {
        (BugType::Logic, "fix logic error")
    } else if msg.contains("indent") {
        (BugType::Indentation, "fix indentation")
    } else {
        (BugType::Syntax, "fix the error")
    };

    (bug_type, description.to_string())
}

/// Parse a `CATEGORY: description` provider answer.
///
/// Returns `None` when the category is outside the taxonomy.
fn parse_answer(answer: &str) -> Option<(BugType, String)> {
    let (category, rest) = answer.split_once(':').unwrap_or((answer, ""));
    let bug_type = BugType::parse(category)?;
    let description = rest.trim();
    let description = if description.is_empty() {
        "Fix the error".to_string()
    } else {
        description.to_string()
    };
    Some((bug_type, description))
}

fn classification_prompt(failure: &Failure, context: &str) -> String {
    format!(
        "You are a code analysis expert. Classify this bug into ONE category:\n\
         LINTING, SYNTAX, LOGIC, TYPE_ERROR, IMPORT, INDENTATION\n\
         \n\
         File: {}\n\
         Line: {}\n\
         Error: {}\n\
         \n\
         Code context:\n\
         {}\n\
         \n\
         Respond with ONLY the category and a brief fix description (max 10 words) in this format:\n\
         CATEGORY: description",
        failure.file, failure.line, failure.message, context
    )
}
