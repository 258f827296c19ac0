//! Core domain types for the healing orchestrator.

pub mod error;
pub mod failure;
pub mod run;

pub use error::{MendError, Result};
pub use failure::{BugType, ClassifiedFailure, Failure, Language, UNKNOWN_LINE};
pub use run::{HealRequest, RunPhase};
