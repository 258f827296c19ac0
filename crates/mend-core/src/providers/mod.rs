//! External collaborator interfaces and their production backends.
//!
//! Each provider is an async trait consumed by the orchestrator, with a
//! process- or HTTP-backed implementation here and in-memory fakes in the
//! integration tests.

pub mod suggest;
pub mod testrun;
pub mod vcs;

pub use suggest::{OpenAiConfig, OpenAiSuggestions, SuggestionProvider};
pub use testrun::{CheckOutput, DetectedStack, ProcessTestExecutor, TestExecutor};
pub use vcs::{GitCli, VcsProvider};
