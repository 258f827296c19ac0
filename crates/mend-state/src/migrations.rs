//! SurrealDB schema migrations and initialization
//!
//! This module provides initialization functions to set up all tables
//! with proper constraints and indexes.

use crate::Result;
use surrealdb::engine::any::Any;
use surrealdb::Surreal;
use tracing::{debug, info};

/// Initialize all Mend tables in SurrealDB
///
/// This should be called once on first connection to set up the schema.
/// Safe to call multiple times (idempotent).
pub async fn init_schema(db: &Surreal<Any>) -> Result<()> {
    info!("Initializing Mend SurrealDB schema");

    init_heal_runs_table(db).await?;
    init_fixes_table(db).await?;
    init_iterations_table(db).await?;

    info!("Mend schema initialization complete");
    Ok(())
}

/// Initialize `heal_runs` table with constraints and indexes
///
/// Schema:
/// ```text
/// TABLE heal_runs {
///   run_id:          STRING (primary key, unique)
///   request_digest:  STRING (indexed)
///   repo_url:        STRING (indexed)
///   team_name:       STRING
///   leader_name:     STRING
///   branch_name:     STRING
///   status:          STRING (enum: RUNNING | PASSED | FAILED | FAILED_RUN)
///   counts/score:    INT fields
///   error_message:   STRING?
///   created_at:      DATETIME (indexed)
///   finished_at:     DATETIME?
/// }
/// ```
///
/// Constraints:
/// - `run_id` is unique (prevents duplicate runs)
/// - status transitions: RUNNING → PASSED | FAILED | FAILED_RUN
///   (enforced via app logic; terminal runs are immutable)
async fn init_heal_runs_table(db: &Surreal<Any>) -> Result<()> {
    debug!("Initializing heal_runs table");

    let sql = r#"
        DEFINE TABLE heal_runs
            SCHEMALESS
            PERMISSIONS
                FOR create FULL
                FOR select FULL
                FOR update FULL
                FOR delete NONE;

        -- Ensure run_id is unique
        DEFINE INDEX idx_run_id ON TABLE heal_runs COLUMNS run_id UNIQUE;

        -- Index request_digest for correlating runs with identical requests
        DEFINE INDEX idx_request_digest ON TABLE heal_runs COLUMNS request_digest;

        -- Index repo_url for finding runs by repository
        DEFINE INDEX idx_repo_url ON TABLE heal_runs COLUMNS repo_url;

        -- Index created_at for time-range queries
        DEFINE INDEX idx_created_at ON TABLE heal_runs COLUMNS created_at;

        -- Composite index (run_id, status) for state queries
        DEFINE INDEX idx_run_id_status ON TABLE heal_runs COLUMNS run_id, status;
    "#;

    db.query(sql).await?;
    info!("✓ heal_runs table initialized");
    Ok(())
}

/// Initialize `fixes` table with constraints and indexes
///
/// Schema:
/// ```text
/// TABLE fixes {
///   fix_id:          STRING (primary key, unique)
///   run_id:          STRING (foreign key to heal_runs.run_id)
///   file:            STRING
///   line:            INT
///   bug_type:        STRING
///   commit_message:  STRING
///   status:          STRING (enum: DETECTED | FIXED | FAILED)
///   description:     STRING
///   created_at:      DATETIME
///   updated_at:      DATETIME
/// }
/// ```
///
/// Constraints:
/// - `fix_id` is unique; status updates address rows by fix_id only
/// - status transitions: DETECTED → FIXED | FAILED (enforced via app logic)
async fn init_fixes_table(db: &Surreal<Any>) -> Result<()> {
    debug!("Initializing fixes table");

    let sql = r#"
        DEFINE TABLE fixes
            SCHEMALESS
            PERMISSIONS
                FOR create FULL
                FOR select FULL
                FOR update FULL
                FOR delete NONE;

        -- Ensure fix_id is unique
        DEFINE INDEX idx_fix_id ON TABLE fixes COLUMNS fix_id UNIQUE;

        -- Index run_id for fast fix retrieval by run
        DEFINE INDEX idx_fixes_run_id ON TABLE fixes COLUMNS run_id;

        -- Index (run_id, status) for counting applied fixes at finalization
        DEFINE INDEX idx_fixes_run_id_status ON TABLE fixes COLUMNS run_id, status;

        -- Index (run_id, created_at) for creation-ordered retrieval
        DEFINE INDEX idx_fixes_run_id_created_at ON TABLE fixes COLUMNS run_id, created_at;
    "#;

    db.query(sql).await?;
    info!("✓ fixes table initialized");
    Ok(())
}

/// Initialize `iterations` table with constraints and indexes
///
/// Schema:
/// ```text
/// TABLE iterations {
///   run_id:      STRING (foreign key to heal_runs.run_id)
///   number:      INT (1-indexed within run)
///   status:      STRING (enum: RUNNING | PASSED | FAILED_RUN)
///   started_at:  DATETIME
///   finished_at: DATETIME?
/// }
/// ```
///
/// Constraints:
/// - `(run_id, number)` is unique (one row per loop pass)
async fn init_iterations_table(db: &Surreal<Any>) -> Result<()> {
    debug!("Initializing iterations table");

    let sql = r#"
        DEFINE TABLE iterations
            SCHEMALESS
            PERMISSIONS
                FOR create FULL
                FOR select FULL
                FOR update FULL
                FOR delete NONE;

        -- Composite unique index: one row per (run_id, number)
        DEFINE INDEX idx_iter_run_id_number ON TABLE iterations COLUMNS run_id, number UNIQUE;

        -- Index run_id for fast timeline retrieval by run
        DEFINE INDEX idx_iter_run_id ON TABLE iterations COLUMNS run_id;
    "#;

    db.query(sql).await?;
    info!("✓ iterations table initialized");
    Ok(())
}

#[cfg(test)]
mod tests {
    // Note: Full integration tests for migrations are in mend-state/tests/
    // These tests verify actual schema creation and constraints
}
