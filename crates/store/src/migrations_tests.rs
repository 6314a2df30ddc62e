use super::*;
use rusqlite::Connection;

fn open_conn() -> Connection {
    Connection::open_in_memory().unwrap()
}

#[test]
fn fresh_database_advances_to_target_version() {
    let mut conn = open_conn();
    run(&mut conn).unwrap();
    let version: i64 = conn
        .query_row("SELECT MAX(version) FROM schema_migrations", [], |r| r.get(0))
        .unwrap();
    assert_eq!(version, TARGET_VERSION);
}

#[test]
fn schema_migrations_records_every_version_with_increasing_applied_at() {
    let mut conn = open_conn();
    run(&mut conn).unwrap();
    let mut stmt = conn
        .prepare("SELECT version, applied_at FROM schema_migrations ORDER BY version")
        .unwrap();
    let rows: Vec<(i64, String)> = stmt
        .query_map([], |r| Ok((r.get(0)?, r.get(1)?)))
        .unwrap()
        .collect::<rusqlite::Result<_>>()
        .unwrap();
    let versions: Vec<i64> = rows.iter().map(|(v, _)| *v).collect();
    let expected: Vec<i64> = (1..=TARGET_VERSION).collect();
    assert_eq!(versions, expected);
    for pair in rows.windows(2) {
        assert!(pair[0].1 <= pair[1].1);
    }
}

#[test]
fn re_running_migrations_is_a_no_op() {
    let mut conn = open_conn();
    run(&mut conn).unwrap();
    run(&mut conn).unwrap();
    let version: i64 = conn
        .query_row("SELECT MAX(version) FROM schema_migrations", [], |r| r.get(0))
        .unwrap();
    assert_eq!(version, TARGET_VERSION);
}

#[test]
fn scan_status_lookup_is_seeded_with_every_status() {
    let mut conn = open_conn();
    run(&mut conn).unwrap();
    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM scan_status_lookup", [], |r| r.get(0))
        .unwrap();
    assert_eq!(count as usize, sw_core::ScanStatus::ALL.len());
}

#[test]
fn partial_prior_schema_only_applies_remaining_migrations() {
    let mut conn = open_conn();
    let tx = conn.transaction().unwrap();
    create_images(&tx).unwrap();
    tx.execute_batch(
        "CREATE TABLE schema_migrations (version INTEGER PRIMARY KEY, name TEXT NOT NULL, applied_at TEXT NOT NULL);
         INSERT INTO schema_migrations VALUES (1, 'create_images', '2024-01-01T00:00:00Z');",
    )
    .unwrap();
    tx.commit().unwrap();

    run(&mut conn).unwrap();
    let version: i64 = conn
        .query_row("SELECT MAX(version) FROM schema_migrations", [], |r| r.get(0))
        .unwrap();
    assert_eq!(version, TARGET_VERSION);
}
