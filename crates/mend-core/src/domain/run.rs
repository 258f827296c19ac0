//! Healing run request and pipeline phase types.

use serde::{Deserialize, Serialize};

use crate::domain::error::{MendError, Result};

/// One incoming request to heal a repository.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealRequest {
    /// Repository URL (https clone URL).
    pub repo_url: String,

    /// Requesting team name.
    pub team_name: String,

    /// Team leader name.
    pub leader_name: String,
}

impl HealRequest {
    pub fn new(
        repo_url: impl Into<String>,
        team_name: impl Into<String>,
        leader_name: impl Into<String>,
    ) -> Self {
        Self {
            repo_url: repo_url.into(),
            team_name: team_name.into(),
            leader_name: leader_name.into(),
        }
    }

    /// Reject empty fields before any external work starts.
    pub fn validate(&self) -> Result<()> {
        if self.repo_url.trim().is_empty() {
            return Err(MendError::InvalidRequest("empty repository URL".to_string()));
        }
        if self.team_name.trim().is_empty() {
            return Err(MendError::InvalidRequest("empty team name".to_string()));
        }
        if self.leader_name.trim().is_empty() {
            return Err(MendError::InvalidRequest("empty leader name".to_string()));
        }
        Ok(())
    }

    /// Healing branch name: `TEAM_NAME_LEADER_NAME_AI_Fix`.
    pub fn branch_name(&self) -> String {
        format!(
            "{}_{}_AI_Fix",
            sanitize_branch_part(&self.team_name),
            sanitize_branch_part(&self.leader_name)
        )
    }
}

/// Uppercase, strip everything but letters/digits/spaces, spaces → `_`.
fn sanitize_branch_part(part: &str) -> String {
    let upper = part.to_uppercase();
    let cleaned: String = upper
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || c.is_whitespace())
        .collect();
    cleaned
        .trim()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
}

/// Pipeline phases, in execution order.
///
/// Used for tracing and for attributing an aborting error to the step
/// that raised it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    Clone,
    Analyze,
    Test,
    Classify,
    Branch,
    DetectionCommit,
    Iterate,
    Push,
    Finalize,
    Cleanup,
}

impl RunPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunPhase::Clone => "clone",
            RunPhase::Analyze => "analyze",
            RunPhase::Test => "test",
            RunPhase::Classify => "classify",
            RunPhase::Branch => "branch",
            RunPhase::DetectionCommit => "detection_commit",
            RunPhase::Iterate => "iterate",
            RunPhase::Push => "push",
            RunPhase::Finalize => "finalize",
            RunPhase::Cleanup => "cleanup",
        }
    }
}

impl std::fmt::Display for RunPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn branch_name_uppercases_and_joins() {
        let request = HealRequest::new(
            "https://github.com/acme/widget.git",
            "Code Crusaders",
            "Riley O'Shea",
        );
        assert_eq!(request.branch_name(), "CODE_CRUSADERS_RILEY_OSHEA_AI_Fix");
    }

    #[test]
    fn branch_name_strips_symbols() {
        let request = HealRequest::new("url", "team-42!", "lead@dev");
        assert_eq!(request.branch_name(), "TEAM42_LEADDEV_AI_Fix");
    }

    #[test]
    fn branch_name_collapses_whitespace() {
        let request = HealRequest::new("url", "  wide   gap  ", "solo");
        assert_eq!(request.branch_name(), "WIDE_GAP_SOLO_AI_Fix");
    }

    #[test]
    fn validate_rejects_blank_fields() {
        assert!(HealRequest::new("", "t", "l").validate().is_err());
        assert!(HealRequest::new("u", " ", "l").validate().is_err());
        assert!(HealRequest::new("u", "t", "").validate().is_err());
        assert!(HealRequest::new("u", "t", "l").validate().is_ok());
    }
}
