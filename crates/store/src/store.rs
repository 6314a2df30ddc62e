use std::path::Path;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, Connection, OptionalExtension, Row};

use sw_core::{ContainerInstance, Digest, Image, InstanceIdentity, Package, RuntimeKind, ScanStatus, Severity, Vulnerability};

use crate::error::{Result, StoreError};
use crate::migrations;
use crate::projection;
use crate::sql_guard;
use crate::types::{DebugQueryResult, ImageFilter, JobRun, LastUpdatedKind, PageResult, Pagination};

/// Durable, single-host, ACID storage of every core entity.
///
/// Writers are serialized through a single connection guarded by `writer`,
/// matching SQLite's own single-writer discipline; readers go through a
/// pooled set of connections and never block each other. Callers never see
/// a raw `rusqlite::Connection` and so can never start a nested transaction.
pub struct Store {
    writer: Mutex<Connection>,
    readers: r2d2::Pool<SqliteConnectionManager>,
}

fn parse_ts(s: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e)))
}

fn parse_ts_opt(s: Option<String>) -> rusqlite::Result<Option<DateTime<Utc>>> {
    s.map(|s| parse_ts(&s)).transpose()
}

fn image_from_row(row: &Row) -> rusqlite::Result<Image> {
    let status: String = row.get("status")?;
    Ok(Image {
        digest: Digest::new(row.get::<_, String>("digest")?),
        status: status.parse().map_err(|_| {
            rusqlite::Error::InvalidColumnType(0, "status".into(), rusqlite::types::Type::Text)
        })?,
        status_error: row.get("status_error")?,
        sbom_json: row.get("sbom_json")?,
        vulnerabilities_json: row.get("vulnerabilities_json")?,
        sbom_scanned_at: parse_ts_opt(row.get("sbom_scanned_at")?)?,
        vulns_scanned_at: parse_ts_opt(row.get("vulns_scanned_at")?)?,
        os_name: row.get("os_name")?,
        os_version: row.get("os_version")?,
        grype_db_built: parse_ts_opt(row.get("grype_db_built")?)?,
        created_at: parse_ts(&row.get::<_, String>("created_at")?)?,
        updated_at: parse_ts(&row.get::<_, String>("updated_at")?)?,
    })
}

/// `RuntimeKind`'s `Display` collapses `Other(_)` to the literal `"other"`,
/// which loses the payload on a storage round-trip, so persistence uses its
/// own encoding instead of `to_string()`/`FromStr`.
fn runtime_kind_to_db(kind: &RuntimeKind) -> String {
    match kind {
        RuntimeKind::Docker => "docker".to_string(),
        RuntimeKind::Kubernetes => "kubernetes".to_string(),
        RuntimeKind::Other(name) => format!("other:{name}"),
    }
}

fn runtime_kind_from_db(s: &str) -> RuntimeKind {
    match s {
        "docker" => RuntimeKind::Docker,
        "kubernetes" => RuntimeKind::Kubernetes,
        other => RuntimeKind::Other(other.strip_prefix("other:").unwrap_or(other).to_string()),
    }
}

fn instance_from_row(row: &Row) -> rusqlite::Result<ContainerInstance> {
    let runtime_kind: Option<String> = row.get("runtime_kind")?;
    Ok(ContainerInstance {
        identity: InstanceIdentity {
            namespace: row.get("namespace")?,
            pod: row.get("pod")?,
            container_name: row.get("container_name")?,
        },
        reference: row.get("reference")?,
        digest: Digest::new(row.get::<_, String>("image_digest")?),
        node: row.get("node")?,
        runtime_kind: runtime_kind.as_deref().map(runtime_kind_from_db),
        created_at: parse_ts(&row.get::<_, String>("created_at")?)?,
    })
}

fn package_from_row(row: &Row) -> rusqlite::Result<Package> {
    Ok(Package {
        id: row.get("id")?,
        image_digest: Digest::new(row.get::<_, String>("image_digest")?),
        name: row.get("name")?,
        version: row.get("version")?,
        package_type: row.get("type")?,
        number_of_instances: row.get("number_of_instances")?,
    })
}

fn vulnerability_from_row(row: &Row) -> rusqlite::Result<Vulnerability> {
    let severity: String = row.get("severity")?;
    Ok(Vulnerability {
        id: row.get("id")?,
        image_digest: Digest::new(row.get::<_, String>("image_digest")?),
        cve_id: row.get("cve_id")?,
        package_name: row.get("package_name")?,
        package_version: row.get("package_version")?,
        package_type: row.get("package_type")?,
        severity: severity.parse::<Severity>().unwrap_or(Severity::Unknown),
        fix_state: row.get("fix_state")?,
        fixed_version: row.get("fixed_version")?,
        count: row.get("count")?,
        risk_score: row.get("risk_score")?,
        epss_score: row.get("epss_score")?,
        epss_percentile: row.get("epss_percentile")?,
        known_exploited: row.get::<_, i64>("known_exploited")? != 0,
    })
}

fn upsert_instance_tx(
    tx: &rusqlite::Transaction,
    instance: &ContainerInstance,
    now: DateTime<Utc>,
) -> rusqlite::Result<()> {
    tx.execute(
        "INSERT INTO container_instances (namespace, pod, container_name, reference, image_digest, node, runtime_kind, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
         ON CONFLICT(namespace, pod, container_name) DO UPDATE SET
            reference = excluded.reference,
            image_digest = excluded.image_digest,
            node = excluded.node,
            runtime_kind = excluded.runtime_kind",
        params![
            instance.identity.namespace,
            instance.identity.pod,
            instance.identity.container_name,
            instance.reference,
            instance.digest.as_str(),
            instance.node,
            instance.runtime_kind.as_ref().map(runtime_kind_to_db),
            now.to_rfc3339(),
        ],
    )?;
    Ok(())
}

impl Store {
    /// Opens (creating if absent) the on-disk store at `path` and runs
    /// migrations up to the compiled-in target version.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut writer = Connection::open(path).map_err(|source| StoreError::Open {
            path: path.display().to_string(),
            source,
        })?;
        writer.pragma_update(None, "journal_mode", "WAL")?;
        writer.pragma_update(None, "foreign_keys", true)?;
        migrations::run(&mut writer)?;

        let manager = SqliteConnectionManager::file(path).with_init(|c| {
            c.pragma_update(None, "foreign_keys", true)?;
            Ok(())
        });
        let readers = r2d2::Pool::builder().max_size(8).build(manager)?;

        Ok(Self { writer: Mutex::new(writer), readers })
    }

    // --- writes ---

    /// Upserts the Image in `pending` status if new; a no-op if it already exists.
    pub fn upsert_image(&self, digest: &Digest, now: DateTime<Utc>) -> Result<()> {
        let writer = self.writer.lock();
        writer.execute(
            "INSERT INTO images (digest, status, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?3)
             ON CONFLICT(digest) DO NOTHING",
            params![digest.as_str(), ScanStatus::Pending.to_string(), now.to_rfc3339()],
        )?;
        Ok(())
    }

    /// Atomic CAS acquire: moves `digest` into `generating_sbom` from any
    /// non-active status. Returns `false` if another worker already holds it.
    pub fn try_acquire_for_scan(&self, digest: &Digest, now: DateTime<Utc>) -> Result<bool> {
        let writer = self.writer.lock();
        let rows = writer.execute(
            "UPDATE images SET status = ?2, status_error = NULL, updated_at = ?3
             WHERE digest = ?1 AND status NOT IN (?4, ?5)",
            params![
                digest.as_str(),
                ScanStatus::GeneratingSbom.to_string(),
                now.to_rfc3339(),
                ScanStatus::GeneratingSbom.to_string(),
                ScanStatus::ScanningVulnerabilities.to_string(),
            ],
        )?;
        Ok(rows == 1)
    }

    /// Startup sweep (spec §8, S6): demotes every image stuck in
    /// `generating_sbom` or `scanning_vulnerabilities` back to `pending`.
    /// These are rows a prior process was actively scanning when it was
    /// killed; since the status column is the sole de-dup primitive, a
    /// stale active row would otherwise block the digest from ever being
    /// picked up again. Must run before the queue worker starts.
    pub fn demote_stale_scans(&self, now: DateTime<Utc>) -> Result<u64> {
        let writer = self.writer.lock();
        let rows = writer.execute(
            "UPDATE images SET status = ?1, updated_at = ?2 WHERE status IN (?3, ?4)",
            params![
                ScanStatus::Pending.to_string(),
                now.to_rfc3339(),
                ScanStatus::GeneratingSbom.to_string(),
                ScanStatus::ScanningVulnerabilities.to_string(),
            ],
        )?;
        Ok(rows as u64)
    }

    /// CAS a digest from an expected status to a new one, recording an optional error.
    pub fn compare_and_set_status(
        &self,
        digest: &Digest,
        expected: ScanStatus,
        new_status: ScanStatus,
        error_msg: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let writer = self.writer.lock();
        let rows = writer.execute(
            "UPDATE images SET status = ?2, status_error = ?3, updated_at = ?4
             WHERE digest = ?1 AND status = ?5",
            params![
                digest.as_str(),
                new_status.to_string(),
                error_msg,
                now.to_rfc3339(),
                expected.to_string(),
            ],
        )?;
        Ok(rows == 1)
    }

    /// Atomic unit: write the SBOM blob, derived OS fields, reproject Packages
    /// and Package Details, and transition to `scanning_vulnerabilities`.
    pub fn store_sbom(
        &self,
        digest: &Digest,
        sbom_json: &str,
        os_name: Option<&str>,
        os_version: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let mut writer = self.writer.lock();
        let tx = writer.transaction()?;
        tx.execute(
            "UPDATE images SET sbom_json = ?2, os_name = ?3, os_version = ?4,
                sbom_scanned_at = ?5, status = ?6, status_error = NULL, updated_at = ?5
             WHERE digest = ?1",
            params![
                digest.as_str(),
                sbom_json,
                os_name,
                os_version,
                now.to_rfc3339(),
                ScanStatus::ScanningVulnerabilities.to_string(),
            ],
        )?;
        projection::reproject_packages(&tx, digest.as_str(), sbom_json)?;
        tx.commit()?;
        Ok(())
    }

    /// Atomic unit: write the vuln report, reproject Vulnerabilities and
    /// Vulnerability Details, record the DB build timestamp, transition to `completed`.
    pub fn store_vulnerabilities(
        &self,
        digest: &Digest,
        vuln_json: &str,
        grype_db_built: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let mut writer = self.writer.lock();
        let tx = writer.transaction()?;
        tx.execute(
            "UPDATE images SET vulnerabilities_json = ?2, vulns_scanned_at = ?3,
                grype_db_built = ?4, status = ?5, status_error = NULL, updated_at = ?3
             WHERE digest = ?1",
            params![
                digest.as_str(),
                vuln_json,
                now.to_rfc3339(),
                grype_db_built.to_rfc3339(),
                ScanStatus::Completed.to_string(),
            ],
        )?;
        projection::reproject_vulnerabilities(&tx, digest.as_str(), vuln_json)?;
        tx.commit()?;
        Ok(())
    }

    pub fn upsert_instance(&self, instance: &ContainerInstance, now: DateTime<Utc>) -> Result<()> {
        let mut writer = self.writer.lock();
        let tx = writer.transaction()?;
        upsert_instance_tx(&tx, instance, now)?;
        tx.commit()?;
        Ok(())
    }

    /// Replaces the live container set transactionally: any instance not in
    /// `instances` is removed, the rest are upserted.
    pub fn replace_instance_snapshot(&self, instances: &[ContainerInstance], now: DateTime<Utc>) -> Result<()> {
        let mut writer = self.writer.lock();
        let tx = writer.transaction()?;

        let keep: std::collections::HashSet<(String, String, String)> = instances
            .iter()
            .map(|i| (i.identity.namespace.clone(), i.identity.pod.clone(), i.identity.container_name.clone()))
            .collect();

        let stale: Vec<i64> = {
            let mut stmt = tx.prepare("SELECT id, namespace, pod, container_name FROM container_instances")?;
            stmt.query_map([], |r| {
                Ok((r.get::<_, i64>(0)?, r.get::<_, String>(1)?, r.get::<_, String>(2)?, r.get::<_, String>(3)?))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?
            .into_iter()
            .filter(|(_, ns, pod, cname)| !keep.contains(&(ns.clone(), pod.clone(), cname.clone())))
            .map(|(id, ..)| id)
            .collect()
        };
        for id in stale {
            tx.execute("DELETE FROM container_instances WHERE id = ?1", [id])?;
        }
        for instance in instances {
            upsert_instance_tx(&tx, instance, now)?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Removes Images with no referencing instances and no activity newer
    /// than `retention_threshold`; cascades package/vulnerability rows.
    /// Returns the number of images removed.
    pub fn delete_orphan_images(&self, retention_threshold: DateTime<Utc>) -> Result<u64> {
        let mut writer = self.writer.lock();
        let tx = writer.transaction()?;
        let orphans: Vec<String> = {
            let mut stmt = tx.prepare(
                "SELECT digest FROM images
                 WHERE updated_at < ?1
                   AND digest NOT IN (SELECT DISTINCT image_digest FROM container_instances)",
            )?;
            stmt.query_map([retention_threshold.to_rfc3339()], |r| r.get(0))?
                .collect::<rusqlite::Result<_>>()?
        };
        for digest in &orphans {
            tx.execute(
                "DELETE FROM vulnerability_details WHERE vulnerability_id IN
                    (SELECT id FROM vulnerabilities WHERE image_digest = ?1)",
                [digest],
            )?;
            tx.execute("DELETE FROM vulnerabilities WHERE image_digest = ?1", [digest])?;
            tx.execute(
                "DELETE FROM package_details WHERE package_id IN
                    (SELECT id FROM packages WHERE image_digest = ?1)",
                [digest],
            )?;
            tx.execute("DELETE FROM packages WHERE image_digest = ?1", [digest])?;
            tx.execute("DELETE FROM images WHERE digest = ?1", [digest])?;
        }
        tx.commit()?;
        Ok(orphans.len() as u64)
    }

    // --- scheduler execution history ---

    pub fn record_job_run_started(&self, job_name: &str, started_at: DateTime<Utc>) -> Result<i64> {
        let writer = self.writer.lock();
        writer.execute(
            "INSERT INTO scheduler_job_runs (job_name, started_at) VALUES (?1, ?2)",
            params![job_name, started_at.to_rfc3339()],
        )?;
        Ok(writer.last_insert_rowid())
    }

    pub fn record_job_run_finished(
        &self,
        run_id: i64,
        finished_at: DateTime<Utc>,
        outcome: &str,
        error: Option<&str>,
    ) -> Result<()> {
        let writer = self.writer.lock();
        writer.execute(
            "UPDATE scheduler_job_runs SET finished_at = ?2, outcome = ?3, error = ?4 WHERE id = ?1",
            params![run_id, finished_at.to_rfc3339(), outcome, error],
        )?;
        Ok(())
    }

    pub fn job_history(&self, job_name: &str, limit: u32) -> Result<Vec<JobRun>> {
        let reader = self.readers.get()?;
        let mut stmt = reader.prepare(
            "SELECT id, job_name, started_at, finished_at, outcome, error
             FROM scheduler_job_runs WHERE job_name = ?1 ORDER BY started_at DESC LIMIT ?2",
        )?;
        let rows = stmt
            .query_map(params![job_name, limit], |row| {
                Ok(JobRun {
                    id: row.get(0)?,
                    job_name: row.get(1)?,
                    started_at: parse_ts(&row.get::<_, String>(2)?)?,
                    finished_at: parse_ts_opt(row.get(3)?)?,
                    outcome: row.get(4)?,
                    error: row.get(5)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    // --- reads ---

    pub fn get_image_status(&self, digest: &Digest) -> Result<Option<ScanStatus>> {
        let reader = self.readers.get()?;
        let status: Option<String> = reader
            .query_row("SELECT status FROM images WHERE digest = ?1", [digest.as_str()], |r| r.get(0))
            .optional()?;
        Ok(status.map(|s| s.parse()).transpose()?)
    }

    pub fn get_image(&self, digest: &Digest) -> Result<Option<Image>> {
        let reader = self.readers.get()?;
        reader
            .query_row("SELECT * FROM images WHERE digest = ?1", [digest.as_str()], image_from_row)
            .optional()
            .map_err(Into::into)
    }

    /// Images list, sorted first by `scan_status.sort_order ASC` (spec §6),
    /// then by digest as a stable tie-break.
    pub fn list_images(&self, pagination: Pagination, filter: &ImageFilter) -> Result<PageResult<Image>> {
        let pagination = pagination.normalize();
        let reader = self.readers.get()?;

        let mut where_clauses = Vec::new();
        let mut args: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();
        if let Some(search) = &filter.search {
            where_clauses.push("i.digest LIKE ?".to_string());
            args.push(Box::new(format!("%{search}%")));
        }
        if !filter.os_names.is_empty() {
            let placeholders = vec!["?"; filter.os_names.len()].join(",");
            where_clauses.push(format!("i.os_name IN ({placeholders})"));
            for name in &filter.os_names {
                args.push(Box::new(name.clone()));
            }
        }
        if !filter.namespaces.is_empty() {
            let placeholders = vec!["?"; filter.namespaces.len()].join(",");
            where_clauses.push(format!(
                "EXISTS (SELECT 1 FROM container_instances ci WHERE ci.image_digest = i.digest AND ci.namespace IN ({placeholders}))"
            ));
            for namespace in &filter.namespaces {
                args.push(Box::new(namespace.clone()));
            }
        }
        if !filter.vuln_statuses.is_empty() {
            let placeholders = vec!["?"; filter.vuln_statuses.len()].join(",");
            where_clauses.push(format!(
                "EXISTS (SELECT 1 FROM vulnerabilities v WHERE v.image_digest = i.digest AND v.fix_state IN ({placeholders}))"
            ));
            for status in &filter.vuln_statuses {
                args.push(Box::new(status.clone()));
            }
        }
        if !filter.package_types.is_empty() {
            let placeholders = vec!["?"; filter.package_types.len()].join(",");
            where_clauses.push(format!(
                "EXISTS (SELECT 1 FROM packages p WHERE p.image_digest = i.digest AND p.type IN ({placeholders}))"
            ));
            for package_type in &filter.package_types {
                args.push(Box::new(package_type.clone()));
            }
        }
        let where_sql = if where_clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", where_clauses.join(" AND "))
        };

        let count_sql = format!("SELECT COUNT(*) FROM images i {where_sql}");
        let total_count: i64 = reader.query_row(
            &count_sql,
            rusqlite::params_from_iter(args.iter()),
            |r| r.get(0),
        )?;

        let list_sql = format!(
            "SELECT i.* FROM images i
             JOIN scan_status_lookup s ON s.status = i.status
             {where_sql}
             ORDER BY s.sort_order ASC, i.digest ASC
             LIMIT ?{n} OFFSET ?{n2}",
            n = args.len() + 1,
            n2 = args.len() + 2,
        );
        let mut stmt = reader.prepare(&list_sql)?;
        let mut all_args = args;
        all_args.push(Box::new(pagination.page_size as i64));
        all_args.push(Box::new(pagination.offset() as i64));
        let items = stmt
            .query_map(rusqlite::params_from_iter(all_args.iter()), image_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(PageResult::new(items, &pagination, total_count as u64))
    }

    pub fn list_instances_for(&self, digest: &Digest) -> Result<Vec<ContainerInstance>> {
        let reader = self.readers.get()?;
        let mut stmt = reader.prepare(
            "SELECT * FROM container_instances WHERE image_digest = ?1 ORDER BY created_at ASC",
        )?;
        let rows = stmt
            .query_map([digest.as_str()], instance_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn list_packages(&self, digest: &Digest, pagination: Pagination) -> Result<PageResult<Package>> {
        let pagination = pagination.normalize();
        let reader = self.readers.get()?;
        let total_count: i64 = reader.query_row(
            "SELECT COUNT(*) FROM packages WHERE image_digest = ?1",
            [digest.as_str()],
            |r| r.get(0),
        )?;
        let mut stmt = reader.prepare(
            "SELECT * FROM packages WHERE image_digest = ?1 ORDER BY name ASC, version ASC LIMIT ?2 OFFSET ?3",
        )?;
        let items = stmt
            .query_map(
                params![digest.as_str(), pagination.page_size, pagination.offset()],
                package_from_row,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(PageResult::new(items, &pagination, total_count as u64))
    }

    /// Vulnerabilities for an image, sorted by severity (worst first) then
    /// vulnerability id, matching the sort discipline in spec §6.
    pub fn list_vulnerabilities(&self, digest: &Digest, pagination: Pagination) -> Result<PageResult<Vulnerability>> {
        let pagination = pagination.normalize();
        let reader = self.readers.get()?;
        let total_count: i64 = reader.query_row(
            "SELECT COUNT(*) FROM vulnerabilities WHERE image_digest = ?1",
            [digest.as_str()],
            |r| r.get(0),
        )?;
        let mut stmt = reader.prepare(
            "SELECT * FROM vulnerabilities WHERE image_digest = ?1
             ORDER BY CASE severity
                WHEN 'Critical' THEN 0 WHEN 'High' THEN 1 WHEN 'Medium' THEN 2
                WHEN 'Low' THEN 3 WHEN 'Negligible' THEN 4 ELSE 5 END ASC,
                id ASC
             LIMIT ?2 OFFSET ?3",
        )?;
        let items = stmt
            .query_map(
                params![digest.as_str(), pagination.page_size, pagination.offset()],
                vulnerability_from_row,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(PageResult::new(items, &pagination, total_count as u64))
    }

    /// Returns the newest `grype_db_built` value across images in `completed`
    /// status — used by `RescanDatabase` to decide whether a mass rescan is needed.
    pub fn newest_completed_grype_db_built(&self) -> Result<Option<DateTime<Utc>>> {
        let reader = self.readers.get()?;
        let ts: Option<String> = reader.query_row(
            "SELECT MAX(grype_db_built) FROM images WHERE status = ?1",
            [ScanStatus::Completed.to_string()],
            |r| r.get(0),
        )?;
        Ok(parse_ts_opt(ts)?)
    }

    /// Digests of every image currently in a terminal state, ascending by
    /// last-scan time (spec §4.5: staler data is refreshed first).
    pub fn terminal_digests_by_staleness(&self) -> Result<Vec<Digest>> {
        let reader = self.readers.get()?;
        let mut stmt = reader.prepare(
            "SELECT digest FROM images WHERE status IN (?1, ?2, ?3)
             ORDER BY COALESCE(vulns_scanned_at, sbom_scanned_at, created_at) ASC",
        )?;
        let rows = stmt
            .query_map(
                params![
                    ScanStatus::Completed.to_string(),
                    ScanStatus::SbomUnavailable.to_string(),
                    ScanStatus::VulnScanFailed.to_string(),
                ],
                |r| r.get::<_, String>(0),
            )?
            .map(|r| r.map(Digest::new))
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn execute_read_only_query(&self, sql: &str) -> Result<DebugQueryResult> {
        sql_guard::validate_read_only_query(sql)?;
        let reader = self.readers.get()?;
        let mut stmt = reader.prepare(sql)?;
        let columns: Vec<String> = stmt.column_names().into_iter().map(str::to_string).collect();
        let rows = stmt
            .query_map([], |row| {
                (0..columns.len())
                    .map(|i| sql_value_to_json(row, i))
                    .collect::<rusqlite::Result<Vec<_>>>()
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        let row_count = rows.len();
        Ok(DebugQueryResult { columns, rows, row_count })
    }

    pub fn schema_version(&self) -> Result<i64> {
        let reader = self.readers.get()?;
        Ok(reader.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_migrations", [], |r| r.get(0))?)
    }

    pub fn last_updated_timestamp(&self, kind: LastUpdatedKind) -> Result<Option<DateTime<Utc>>> {
        let reader = self.readers.get()?;
        let sql = match kind {
            LastUpdatedKind::Image => "SELECT MAX(updated_at) FROM images",
            LastUpdatedKind::Instance => "SELECT MAX(created_at) FROM container_instances",
            LastUpdatedKind::Vulnerability => {
                "SELECT MAX(i.updated_at) FROM images i JOIN vulnerabilities v ON v.image_digest = i.digest"
            }
        };
        let ts: Option<String> = reader.query_row(sql, [], |r| r.get(0))?;
        Ok(parse_ts_opt(ts)?)
    }
}

fn sql_value_to_json(row: &Row, idx: usize) -> rusqlite::Result<serde_json::Value> {
    use rusqlite::types::ValueRef;
    Ok(match row.get_ref(idx)? {
        ValueRef::Null => serde_json::Value::Null,
        ValueRef::Integer(i) => serde_json::Value::from(i),
        ValueRef::Real(f) => serde_json::Number::from_f64(f).map(serde_json::Value::Number).unwrap_or(serde_json::Value::Null),
        ValueRef::Text(t) => serde_json::Value::String(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => serde_json::Value::String(format!("<{} bytes>", b.len())),
    })
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
