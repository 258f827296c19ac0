//! Integration tests for SurrealDB schema initialization
//!
//! These tests verify that the row types serialize cleanly (required for
//! SurrealDB persistence) and that `init_schema` is idempotent against the
//! in-memory engine.

use mend_state::{init_schema, FixRow, HealRunRow, IterationRow};

#[test]
fn test_heal_run_row_serialization() {
    // Verify HealRunRow can be serialized to JSON (needed for SurrealDB)
    let row = HealRunRow::new(
        "run-123".to_string(),
        "digest-abc".to_string(),
        "https://github.com/acme/widget.git".to_string(),
        "Acme".to_string(),
        "Casey".to_string(),
        "ACME_CASEY_AI_Fix".to_string(),
    );

    let json = serde_json::to_string(&row).expect("Failed to serialize");
    assert!(json.contains("run-123"));
    assert!(json.contains("RUNNING"));
    assert!(json.contains("\"failures_detected\":0"));
}

#[test]
fn test_fix_row_serialization() {
    let row = FixRow::new(
        "fix-1".to_string(),
        "run-123".to_string(),
        "src/__tests__/sum.test.ts".to_string(),
        6,
        "LOGIC".to_string(),
        "[DETECTED] LOGIC error in src/__tests__/sum.test.ts:6".to_string(),
        "fix incorrect expected value".to_string(),
    );

    let json = serde_json::to_string(&row).expect("Failed to serialize");
    assert!(json.contains("fix-1"));
    assert!(json.contains("DETECTED"));
    assert!(json.contains("\"line\":6"));
}

#[test]
fn test_iteration_row_serialization() {
    let row = IterationRow::new("run-123".to_string(), 2);

    let json = serde_json::to_string(&row).expect("Failed to serialize");
    assert!(json.contains("run-123"));
    assert!(json.contains("\"number\":2"));
    assert!(json.contains("RUNNING"));
}

#[tokio::test]
async fn test_init_schema_idempotent() {
    let db = surrealdb::engine::any::connect("mem://")
        .await
        .expect("connect failed");
    db.use_ns("mend").use_db("main").await.expect("ns failed");

    init_schema(&db).await.expect("first init failed");
    init_schema(&db).await.expect("second init failed");
}
