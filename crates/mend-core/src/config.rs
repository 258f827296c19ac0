//! Explicit orchestrator configuration.
//!
//! Every knob the pipeline needs is carried here and passed into the
//! orchestrator at construction; nothing reads process environment at
//! call sites.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Commit identity configured on every clone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitIdentity {
    pub name: String,
    pub email: String,
}

impl Default for CommitIdentity {
    fn default() -> Self {
        Self {
            name: "mend-agent".to_string(),
            email: "agent@stevedores.org".to_string(),
        }
    }
}

/// Per-call timeouts for the long-running external operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealTimeouts {
    /// `git clone` timeout in seconds.
    pub clone_secs: u64,

    /// Dependency install timeout in seconds.
    pub install_secs: u64,

    /// Test suite execution timeout in seconds.
    pub test_secs: u64,

    /// Lint pass timeout in seconds.
    pub lint_secs: u64,

    /// Single suggestion-provider round-trip timeout in seconds.
    pub suggest_secs: u64,

    /// `git push` timeout in seconds.
    pub push_secs: u64,
}

impl Default for HealTimeouts {
    fn default() -> Self {
        Self {
            clone_secs: 120,
            install_secs: 120,
            test_secs: 60,
            lint_secs: 30,
            suggest_secs: 30,
            push_secs: 60,
        }
    }
}

/// Configuration for one healing orchestrator instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealConfig {
    /// Maximum fix-apply-retest iterations per run.
    pub retry_limit: u32,

    /// Parent directory for per-run workspaces.
    pub work_dir: PathBuf,

    /// Identity used for commits on the healing branch.
    pub identity: CommitIdentity,

    /// Token for authenticated clone/push. `None` degrades to
    /// unauthenticated clone and local-commit-only.
    pub push_token: Option<String>,

    /// External-call timeouts.
    pub timeouts: HealTimeouts,
}

impl Default for HealConfig {
    fn default() -> Self {
        Self {
            retry_limit: 5,
            work_dir: PathBuf::from(".mend/workspaces"),
            identity: CommitIdentity::default(),
            push_token: None,
            timeouts: HealTimeouts::default(),
        }
    }
}

impl HealConfig {
    /// Build a config from environment variables, falling back to defaults.
    ///
    /// Reads `MEND_RETRY_LIMIT`, `MEND_WORK_DIR`, `MEND_COMMIT_NAME`,
    /// `MEND_COMMIT_EMAIL`, and `GITHUB_TOKEN`.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(limit) = std::env::var("MEND_RETRY_LIMIT") {
            if let Ok(parsed) = limit.parse::<u32>() {
                config.retry_limit = parsed;
            }
        }
        if let Ok(dir) = std::env::var("MEND_WORK_DIR") {
            config.work_dir = PathBuf::from(dir);
        }
        if let Ok(name) = std::env::var("MEND_COMMIT_NAME") {
            config.identity.name = name;
        }
        if let Ok(email) = std::env::var("MEND_COMMIT_EMAIL") {
            config.identity.email = email;
        }
        config.push_token = std::env::var("GITHUB_TOKEN").ok().filter(|t| !t.is_empty());
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heal_config_default() {
        let config = HealConfig::default();
        assert_eq!(config.retry_limit, 5);
        assert!(config.push_token.is_none());
        assert_eq!(config.timeouts.test_secs, 60);
        assert_eq!(config.identity.name, "mend-agent");
    }

    #[test]
    fn test_heal_config_serde_roundtrip() {
        let config = HealConfig::default();
        let json = serde_json::to_string(&config).expect("serialize");
        let deserialized: HealConfig = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(config.retry_limit, deserialized.retry_limit);
        assert_eq!(config.work_dir, deserialized.work_dir);
    }
}
