//! Mend Core Library
//!
//! The healing orchestrator core: output parsing, failure classification,
//! patch application, scoring, and the bounded fix/retest control loop,
//! plus the provider traits it drives (version control, test execution,
//! AI suggestions) and their production backends.

pub mod analysis;
pub mod classifier;
pub mod config;
pub mod domain;
pub mod fixer;
pub mod orchestrator;
pub mod parser;
pub mod patcher;
pub mod providers;
pub mod report;
pub mod scoring;
pub mod telemetry;
pub mod workspace;

pub use config::{CommitIdentity, HealConfig, HealTimeouts};
pub use domain::{
    BugType, ClassifiedFailure, Failure, HealRequest, Language, MendError, Result, RunPhase,
    UNKNOWN_LINE,
};
pub use fixer::{GeneratedFix, OpenFailure};
pub use orchestrator::{HealOrchestrator, HealOutcome};
pub use patcher::{FixSuggestion, PatchOutcome};
pub use providers::{
    CheckOutput, DetectedStack, GitCli, OpenAiConfig, OpenAiSuggestions, ProcessTestExecutor,
    SuggestionProvider, TestExecutor, VcsProvider,
};
pub use report::{FixSummary, ResultSummary, ScoreBreakdown, TimelineEntry};
pub use scoring::{score, Score};
pub use telemetry::init_tracing;
pub use workspace::{Workspace, DETECTION_REPORT_FILE, RESULTS_FILE};

/// Mend version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
