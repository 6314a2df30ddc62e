//! The compiled-in migration chain. Append-only: a migration already shipped
//! is never edited, only superseded by a later one.

use rusqlite::Transaction;

use crate::error::{Result, StoreError};

pub struct Migration {
    pub version: i64,
    pub name: &'static str,
    pub apply: fn(&Transaction) -> rusqlite::Result<()>,
}

/// The target schema version this binary compiles in.
pub const TARGET_VERSION: i64 = MIGRATIONS[MIGRATIONS.len() - 1].version;

pub const MIGRATIONS: &[Migration] = &[
    Migration { version: 1, name: "create_images", apply: create_images },
    Migration { version: 2, name: "create_scan_status_lookup", apply: create_scan_status_lookup },
    Migration { version: 3, name: "create_container_instances", apply: create_container_instances },
    Migration { version: 4, name: "create_packages", apply: create_packages },
    Migration { version: 5, name: "create_package_details", apply: create_package_details },
    Migration { version: 6, name: "create_vulnerabilities", apply: create_vulnerabilities },
    Migration { version: 7, name: "create_vulnerability_details", apply: create_vulnerability_details },
    Migration { version: 8, name: "create_scheduler_job_runs", apply: create_scheduler_job_runs },
];

fn create_images(tx: &Transaction) -> rusqlite::Result<()> {
    tx.execute_batch(
        "CREATE TABLE images (
            digest              TEXT PRIMARY KEY,
            status              TEXT NOT NULL,
            status_error        TEXT,
            sbom_json           TEXT,
            vulnerabilities_json TEXT,
            sbom_scanned_at     TEXT,
            vulns_scanned_at    TEXT,
            os_name             TEXT,
            os_version          TEXT,
            grype_db_built      TEXT,
            created_at          TEXT NOT NULL,
            updated_at          TEXT NOT NULL
        );
        CREATE INDEX idx_images_created_at ON images(created_at);
        CREATE INDEX idx_images_status ON images(status);",
    )
}

fn create_scan_status_lookup(tx: &Transaction) -> rusqlite::Result<()> {
    tx.execute_batch(
        "CREATE TABLE scan_status_lookup (
            status      TEXT PRIMARY KEY,
            display     TEXT NOT NULL,
            sort_order  INTEGER NOT NULL
        );",
    )?;
    for status in sw_core::ScanStatus::ALL {
        tx.execute(
            "INSERT INTO scan_status_lookup (status, display, sort_order) VALUES (?1, ?2, ?3)",
            rusqlite::params![status.to_string(), status.to_string(), status.sort_order()],
        )?;
    }
    Ok(())
}

fn create_container_instances(tx: &Transaction) -> rusqlite::Result<()> {
    tx.execute_batch(
        "CREATE TABLE container_instances (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            namespace       TEXT NOT NULL,
            pod             TEXT NOT NULL,
            container_name  TEXT NOT NULL,
            reference       TEXT NOT NULL,
            image_digest    TEXT NOT NULL REFERENCES images(digest),
            node            TEXT,
            runtime_kind    TEXT,
            created_at      TEXT NOT NULL,
            UNIQUE(namespace, pod, container_name)
        );
        CREATE INDEX idx_instances_namespace ON container_instances(namespace);
        CREATE INDEX idx_instances_image_digest ON container_instances(image_digest);
        CREATE INDEX idx_instances_created_at ON container_instances(created_at);",
    )
}

fn create_packages(tx: &Transaction) -> rusqlite::Result<()> {
    tx.execute_batch(
        "CREATE TABLE packages (
            id                      INTEGER PRIMARY KEY AUTOINCREMENT,
            image_digest            TEXT NOT NULL REFERENCES images(digest),
            name                    TEXT NOT NULL,
            version                 TEXT NOT NULL,
            type                    TEXT NOT NULL,
            number_of_instances     INTEGER NOT NULL,
            UNIQUE(image_digest, name, version, type)
        );
        CREATE INDEX idx_packages_digest_type ON packages(image_digest, type);",
    )
}

fn create_package_details(tx: &Transaction) -> rusqlite::Result<()> {
    tx.execute_batch(
        "CREATE TABLE package_details (
            package_id      INTEGER PRIMARY KEY REFERENCES packages(id) ON DELETE CASCADE,
            details_json    TEXT NOT NULL
        );",
    )
}

fn create_vulnerabilities(tx: &Transaction) -> rusqlite::Result<()> {
    tx.execute_batch(
        "CREATE TABLE vulnerabilities (
            id                  INTEGER PRIMARY KEY AUTOINCREMENT,
            image_digest        TEXT NOT NULL REFERENCES images(digest),
            cve_id              TEXT NOT NULL,
            package_name        TEXT NOT NULL,
            package_version     TEXT NOT NULL,
            package_type        TEXT NOT NULL,
            severity            TEXT NOT NULL,
            fix_state           TEXT NOT NULL,
            fixed_version       TEXT,
            count               INTEGER NOT NULL,
            risk_score          REAL,
            epss_score          REAL,
            epss_percentile     REAL,
            known_exploited     INTEGER NOT NULL,
            UNIQUE(image_digest, cve_id, package_name, package_version, package_type)
        );
        CREATE INDEX idx_vulns_digest_severity ON vulnerabilities(image_digest, severity);",
    )
}

fn create_vulnerability_details(tx: &Transaction) -> rusqlite::Result<()> {
    tx.execute_batch(
        "CREATE TABLE vulnerability_details (
            vulnerability_id    INTEGER PRIMARY KEY REFERENCES vulnerabilities(id) ON DELETE CASCADE,
            details_json        TEXT NOT NULL
        );",
    )
}

fn create_scheduler_job_runs(tx: &Transaction) -> rusqlite::Result<()> {
    tx.execute_batch(
        "CREATE TABLE scheduler_job_runs (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            job_name        TEXT NOT NULL,
            started_at      TEXT NOT NULL,
            finished_at     TEXT,
            outcome         TEXT,
            error           TEXT
        );
        CREATE INDEX idx_job_runs_name_started ON scheduler_job_runs(job_name, started_at);",
    )
}

/// Advance `conn` from its recorded schema version to [`TARGET_VERSION`].
///
/// Each migration runs in its own transaction; a failure leaves the schema
/// at the last successfully applied version (the failing transaction is
/// rolled back, and we stop — we never attempt a later migration on top of
/// a half-applied one).
pub fn run(conn: &mut rusqlite::Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version     INTEGER PRIMARY KEY,
            name        TEXT NOT NULL,
            applied_at  TEXT NOT NULL
        );",
    )?;

    let current: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )?;

    for migration in MIGRATIONS.iter().filter(|m| m.version > current) {
        let tx = conn.transaction()?;
        (migration.apply)(&tx).map_err(|source| StoreError::Migration {
            version: migration.version,
            name: migration.name,
            source,
        })?;
        tx.execute(
            "INSERT INTO schema_migrations (version, name, applied_at) VALUES (?1, ?2, ?3)",
            rusqlite::params![migration.version, migration.name, chrono::Utc::now().to_rfc3339()],
        )
        .map_err(|source| StoreError::Migration {
            version: migration.version,
            name: migration.name,
            source,
        })?;
        tx.commit().map_err(|source| StoreError::Migration {
            version: migration.version,
            name: migration.name,
            source,
        })?;
        tracing::info!(version = migration.version, name = migration.name, "applied migration");
    }

    Ok(())
}

#[cfg(test)]
#[path = "migrations_tests.rs"]
mod tests;
