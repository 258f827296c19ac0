//! Failure records and the bug taxonomy.

use serde::{Deserialize, Serialize};

/// Line sentinel when the check output carried no usable location.
pub const UNKNOWN_LINE: u32 = 0;

/// Language family a check run's raw output is parsed as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    JavaScript,
    Python,
}

/// A single detected test or lint problem, before classification.
///
/// Transient: produced by the output parser, consumed by the classifier,
/// superseded by [`ClassifiedFailure`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Failure {
    /// File path relative to the repository root.
    pub file: String,

    /// 1-indexed line number ([`UNKNOWN_LINE`] if unknown).
    pub line: u32,

    /// Free-text message from the check output.
    pub message: String,

    /// Originating check name (e.g. "jest-test", "pytest", "linting").
    pub check: String,
}

/// Fixed bug taxonomy used by the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BugType {
    Linting,
    Syntax,
    Logic,
    TypeError,
    Import,
    Indentation,
}

impl BugType {
    /// All taxonomy members, in prompt order.
    pub const ALL: [BugType; 6] = [
        BugType::Linting,
        BugType::Syntax,
        BugType::Logic,
        BugType::TypeError,
        BugType::Import,
        BugType::Indentation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BugType::Linting => "LINTING",
            BugType::Syntax => "SYNTAX",
            BugType::Logic => "LOGIC",
            BugType::TypeError => "TYPE_ERROR",
            BugType::Import => "IMPORT",
            BugType::Indentation => "INDENTATION",
        }
    }

    /// Parse a taxonomy tag. Returns `None` for anything outside the
    /// fixed set, which callers treat as a provider miss.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "LINTING" => Some(BugType::Linting),
            "SYNTAX" => Some(BugType::Syntax),
            "LOGIC" => Some(BugType::Logic),
            "TYPE_ERROR" => Some(BugType::TypeError),
            "IMPORT" => Some(BugType::Import),
            "INDENTATION" => Some(BugType::Indentation),
            _ => None,
        }
    }
}

impl std::fmt::Display for BugType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A failure plus its taxonomy tag and a short fix description.
///
/// Lifetime: one iteration of the retry loop; regenerated on every re-test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifiedFailure {
    pub file: String,
    pub line: u32,
    pub message: String,
    pub bug_type: BugType,
    pub description: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bug_type_round_trips_through_strings() {
        for bug_type in BugType::ALL {
            assert_eq!(BugType::parse(bug_type.as_str()), Some(bug_type));
        }
    }

    #[test]
    fn bug_type_rejects_out_of_taxonomy() {
        assert_eq!(BugType::parse("RUNTIME"), None);
        assert_eq!(BugType::parse(""), None);
    }

    #[test]
    fn bug_type_parse_trims_whitespace() {
        assert_eq!(BugType::parse(" IMPORT "), Some(BugType::Import));
    }

    #[test]
    fn bug_type_serde_matches_wire_strings() {
        let json = serde_json::to_string(&BugType::TypeError).unwrap();
        assert_eq!(json, "\"TYPE_ERROR\"");
    }
}
