use std::sync::Arc;

use serde_json::{json, Map};
use syncstage::{
    DuckdbEntityRepository, DuckdbLedgerRepository, DuckdbRawRecordRepository, DuckdbStorage,
    Entity, EntityRepository, EntitySchema, FieldDef, FieldKind, LedgerRepository,
    RawRecordRepository, SyncState,
};
use syncstage::domain::NewRawRecord;
use tempfile::tempdir;

fn state(cursor: u64) -> SyncState {
    let mut state = Map::new();
    state.insert("cursor".to_string(), json!(cursor));
    state
}

fn build_schema() -> EntitySchema {
    EntitySchema::new(
        "CiBuild",
        "_tool_ci_builds",
        vec![
            FieldDef::key("id", FieldKind::Integer),
            FieldDef::key("branch", FieldKind::Text),
            FieldDef::new("success", FieldKind::Boolean),
            FieldDef::new("duration", FieldKind::Float),
            FieldDef::new("started_at", FieldKind::Timestamp),
            FieldDef::new("labels", FieldKind::Json),
        ],
    )
    .expect("schema")
}

#[tokio::test]
async fn duckdb_ledger_start_checkpoint_complete() {
    let storage = DuckdbStorage::in_memory().expect("duckdb init");
    let ledger = DuckdbLedgerRepository::new(&storage).await.expect("ledger init");

    let entry = ledger.start("collectCiPipelines", 1).await.expect("start");
    assert!(!entry.is_completed());
    assert!(entry.state().is_empty());

    ledger.checkpoint(entry.id(), &state(5)).await.expect("checkpoint");
    let stored = ledger
        .find_by_id(entry.id())
        .await
        .expect("find_by_id")
        .expect("entry exists");
    assert_eq!(stored.state(), &state(5));
    assert!(!stored.is_completed());
    assert!(ledger
        .last_completed("collectCiPipelines", 1)
        .await
        .expect("last_completed")
        .is_none());

    ledger.complete(entry.id(), &state(9)).await.expect("complete");
    let last = ledger
        .last_completed("collectCiPipelines", 1)
        .await
        .expect("last_completed")
        .expect("completed entry");
    assert_eq!(last.id(), entry.id());
    assert_eq!(last.state(), &state(9));
    assert_eq!(last.connection_id(), 1);
}

#[tokio::test]
async fn duckdb_ledger_resumes_from_most_recent_completed_entry() {
    let storage = DuckdbStorage::in_memory().expect("duckdb init");
    let ledger = DuckdbLedgerRepository::new(&storage).await.expect("ledger init");

    let first = ledger.start("extractCiPipelines", 3).await.expect("start");
    ledger.complete(first.id(), &state(1)).await.expect("complete");
    let second = ledger.start("extractCiPipelines", 3).await.expect("start");
    ledger.complete(second.id(), &state(2)).await.expect("complete");
    let abandoned = ledger.start("extractCiPipelines", 3).await.expect("start");
    ledger.checkpoint(abandoned.id(), &state(3)).await.expect("checkpoint");

    let last = ledger
        .last_completed("extractCiPipelines", 3)
        .await
        .expect("last_completed")
        .expect("completed entry");
    assert_eq!(last.id(), second.id());
    assert_eq!(last.state(), &state(2));

    // Other connections and tasks are separate histories.
    assert!(ledger.last_completed("extractCiPipelines", 4).await.unwrap().is_none());
    assert!(ledger.last_completed("convertCiPipelines", 3).await.unwrap().is_none());

    let all = ledger.list("extractCiPipelines", 3).await.expect("list");
    let ids: Vec<i64> = all.iter().map(|e| e.id()).collect();
    assert_eq!(ids, vec![first.id(), second.id(), abandoned.id()]);
}

#[tokio::test]
async fn duckdb_ledger_survives_reopen() {
    let dir = tempdir().expect("tempdir");
    let db_path = dir.path().join("sync.duckdb");

    {
        let storage = DuckdbStorage::open_file(&db_path).expect("duckdb init");
        let ledger = DuckdbLedgerRepository::new(&storage).await.expect("ledger init");
        let entry = ledger.start("collectCiPipelines", 1).await.expect("start");
        ledger.complete(entry.id(), &state(42)).await.expect("complete");
    }

    let storage = DuckdbStorage::open_file(&db_path).expect("duckdb reopen");
    let ledger = DuckdbLedgerRepository::new(&storage).await.expect("ledger init");
    let last = ledger
        .last_completed("collectCiPipelines", 1)
        .await
        .expect("last_completed")
        .expect("completed entry");
    assert_eq!(last.state(), &state(42));

    let next = ledger.start("collectCiPipelines", 1).await.expect("start");
    assert!(next.id() > last.id());
}

#[tokio::test]
async fn duckdb_ledger_rejects_unknown_entry() {
    let storage = DuckdbStorage::in_memory().expect("duckdb init");
    let ledger = DuckdbLedgerRepository::new(&storage).await.expect("ledger init");

    assert!(ledger.checkpoint(999, &state(1)).await.is_err());
    assert!(ledger.find_by_id(999).await.expect("find_by_id").is_none());
}

#[tokio::test]
async fn duckdb_raw_relation_is_append_only() {
    let storage = DuckdbStorage::in_memory().expect("duckdb init");
    let raw = DuckdbRawRecordRepository::new(&storage);
    let table = "_raw_ci_pipelines";
    raw.ensure_relation(table).await.expect("ensure");
    raw.ensure_relation(table).await.expect("ensure is idempotent");

    let first = NewRawRecord::from_payload(&json!({"id": 1, "name": "build"}))
        .expect("payload")
        .with_params(&json!({"connection_id": 1}))
        .with_url("file:///pipelines.jsonl");
    let second = NewRawRecord::from_payload(&json!({"id": 1, "name": "build (retried)"}))
        .expect("payload")
        .with_params(&json!({"connection_id": 1}))
        .with_input(b"{\"id\":7}".to_vec());

    let id1 = raw.append(table, &first).await.expect("append");
    let before = raw.scan(table).await.expect("scan");
    let id2 = raw.append(table, &second).await.expect("append");
    assert!(id2 > id1);

    let rows = raw.scan(table).await.expect("scan");
    assert_eq!(rows.len(), 2);
    // Appending never rewrites what was already there.
    assert_eq!(rows[0], before[0]);
    assert_eq!(rows[0].payload().unwrap()["name"], "build");
    assert_eq!(rows[0].url(), "file:///pipelines.jsonl");
    assert_eq!(rows[0].params(), r#"{"connection_id":1}"#);
    assert!(rows[0].input().is_empty());
    assert_eq!(rows[1].input(), b"{\"id\":7}");
    assert_eq!(raw.count(table).await.expect("count"), 2);
}

#[tokio::test]
async fn duckdb_raw_relation_rejects_bad_identifiers() {
    let storage = DuckdbStorage::in_memory().expect("duckdb init");
    let raw = DuckdbRawRecordRepository::new(&storage);

    assert!(raw.ensure_relation("raw; DROP TABLE x").await.is_err());
}

#[tokio::test]
async fn duckdb_entity_upsert_replaces_by_key() {
    let storage = DuckdbStorage::in_memory().expect("duckdb init");
    let entities = DuckdbEntityRepository::new(&storage);
    let schema = build_schema();
    entities.ensure_relation(&schema).await.expect("ensure");

    let build = Entity::new("CiBuild")
        .with("id", 1)
        .with("branch", "main")
        .with("success", false)
        .with("duration", 12.5)
        .with("started_at", "2024-01-01T00:00:00Z")
        .with("labels", json!({"team": "infra", "tags": ["nightly"]}));
    entities.upsert(&schema, &build).await.expect("upsert");

    let mut rebuilt = build.clone();
    rebuilt.set("success", true);
    entities.upsert(&schema, &rebuilt).await.expect("upsert");

    let other_branch = Entity::new("CiBuild")
        .with("id", 1)
        .with("branch", "release")
        .with("success", serde_json::Value::Null);
    entities.upsert(&schema, &other_branch).await.expect("upsert");

    assert_eq!(entities.count(&schema).await.expect("count"), 2);

    let rows = entities.scan(&schema).await.expect("scan");
    let main = rows
        .iter()
        .find(|e| e.get_str("branch") == Some("main"))
        .expect("main build");
    assert_eq!(main.get("success"), Some(&json!(true)));
    assert_eq!(main.get("duration"), Some(&json!(12.5)));
    assert_eq!(main.get("labels"), Some(&json!({"team": "infra", "tags": ["nightly"]})));

    let release = rows
        .iter()
        .find(|e| e.get_str("branch") == Some("release"))
        .expect("release build");
    assert!(release.get("success").unwrap().is_null());
    assert!(release.get("labels").unwrap().is_null());
}

#[tokio::test]
async fn duckdb_repositories_share_one_connection() {
    let dir = tempdir().expect("tempdir");
    let storage = DuckdbStorage::open_file(&dir.path().join("nested").join("sync.duckdb"))
        .expect("duckdb init");

    let ledger = Arc::new(DuckdbLedgerRepository::new(&storage).await.expect("ledger"));
    let raw = Arc::new(DuckdbRawRecordRepository::new(&storage));
    raw.ensure_relation("_raw_ci_pipelines").await.expect("ensure");

    ledger.start("collectCiPipelines", 1).await.expect("start");
    raw.append(
        "_raw_ci_pipelines",
        &NewRawRecord::from_payload(&json!({"id": 1})).expect("payload"),
    )
    .await
    .expect("append");

    assert_eq!(ledger.list("collectCiPipelines", 1).await.unwrap().len(), 1);
    assert_eq!(raw.count("_raw_ci_pipelines").await.unwrap(), 1);
}
