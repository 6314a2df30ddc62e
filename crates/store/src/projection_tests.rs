use super::*;
use crate::migrations;
use rusqlite::Connection;

fn seed_image(tx: &Transaction, digest: &str) {
    tx.execute(
        "INSERT INTO images (digest, status, created_at, updated_at) VALUES (?1, 'pending', '2024-01-01T00:00:00Z', '2024-01-01T00:00:00Z')",
        [digest],
    )
    .unwrap();
}

#[test]
fn s1_sbom_projects_one_package() {
    let mut conn = Connection::open_in_memory().unwrap();
    migrations::run(&mut conn).unwrap();
    let tx = conn.transaction().unwrap();
    seed_image(&tx, "sha256:aaa");

    let sbom = r#"{"artifacts":[{"name":"zlib","version":"1.2.11","type":"apk"}]}"#;
    reproject_packages(&tx, "sha256:aaa", sbom).unwrap();
    tx.commit().unwrap();

    let count: i64 = conn.query_row("SELECT COUNT(*) FROM packages", [], |r| r.get(0)).unwrap();
    assert_eq!(count, 1);
    let (name, version, package_type, n): (String, String, String, i64) = conn
        .query_row(
            "SELECT name, version, type, number_of_instances FROM packages",
            [],
            |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?)),
        )
        .unwrap();
    assert_eq!((name.as_str(), version.as_str(), package_type.as_str(), n), ("zlib", "1.2.11", "apk", 1));
}

#[test]
fn repeated_artifacts_aggregate_into_number_of_instances() {
    let mut conn = Connection::open_in_memory().unwrap();
    migrations::run(&mut conn).unwrap();
    let tx = conn.transaction().unwrap();
    seed_image(&tx, "sha256:aaa");

    let sbom = r#"{"artifacts":[
        {"name":"zlib","version":"1.2.11","type":"apk"},
        {"name":"zlib","version":"1.2.11","type":"apk"}
    ]}"#;
    reproject_packages(&tx, "sha256:aaa", sbom).unwrap();
    tx.commit().unwrap();

    let n: i64 = conn
        .query_row("SELECT number_of_instances FROM packages", [], |r| r.get(0))
        .unwrap();
    assert_eq!(n, 2);
}

#[test]
fn reprojection_is_idempotent_and_clears_stale_rows() {
    let mut conn = Connection::open_in_memory().unwrap();
    migrations::run(&mut conn).unwrap();

    let sbom_a = r#"{"artifacts":[{"name":"zlib","version":"1.2.11","type":"apk"}]}"#;
    let sbom_b = r#"{"artifacts":[{"name":"openssl","version":"3.0.0","type":"apk"}]}"#;

    {
        let tx = conn.transaction().unwrap();
        seed_image(&tx, "sha256:aaa");
        reproject_packages(&tx, "sha256:aaa", sbom_a).unwrap();
        tx.commit().unwrap();
    }
    {
        let tx = conn.transaction().unwrap();
        reproject_packages(&tx, "sha256:aaa", sbom_b).unwrap();
        tx.commit().unwrap();
    }

    let count: i64 = conn.query_row("SELECT COUNT(*) FROM packages", [], |r| r.get(0)).unwrap();
    assert_eq!(count, 1, "stale package from previous SBOM must not remain");
    let name: String = conn.query_row("SELECT name FROM packages", [], |r| r.get(0)).unwrap();
    assert_eq!(name, "openssl");
}

#[test]
fn unrecognized_artifact_shape_is_skipped_not_fatal() {
    let mut conn = Connection::open_in_memory().unwrap();
    migrations::run(&mut conn).unwrap();
    let tx = conn.transaction().unwrap();
    seed_image(&tx, "sha256:aaa");

    let sbom = r#"{"artifacts":[{"no-name-field":true},{"name":"zlib","version":"1.2.11","type":"apk"}]}"#;
    reproject_packages(&tx, "sha256:aaa", sbom).unwrap();
    tx.commit().unwrap();

    let count: i64 = conn.query_row("SELECT COUNT(*) FROM packages", [], |r| r.get(0)).unwrap();
    assert_eq!(count, 1);
}

#[test]
fn s1_vuln_report_projects_one_critical_vulnerability() {
    let mut conn = Connection::open_in_memory().unwrap();
    migrations::run(&mut conn).unwrap();
    let tx = conn.transaction().unwrap();
    seed_image(&tx, "sha256:aaa");

    let report = r#"{"matches":[{"vulnerability":{"id":"CVE-2022-37434","severity":"Critical"},"artifact":{"name":"zlib","version":"1.2.11","type":"apk"}}]}"#;
    reproject_vulnerabilities(&tx, "sha256:aaa", report).unwrap();
    tx.commit().unwrap();

    let (cve, severity): (String, String) = conn
        .query_row("SELECT cve_id, severity FROM vulnerabilities", [], |r| Ok((r.get(0)?, r.get(1)?)))
        .unwrap();
    assert_eq!(cve, "CVE-2022-37434");
    assert_eq!(severity, "Critical");
}

#[test]
fn vulnerability_details_preserves_full_fidelity_json() {
    let mut conn = Connection::open_in_memory().unwrap();
    migrations::run(&mut conn).unwrap();
    let tx = conn.transaction().unwrap();
    seed_image(&tx, "sha256:aaa");

    let report = r#"{"matches":[{"vulnerability":{"id":"CVE-2022-37434","severity":"Critical","cvss":9.8,"custom_field":"kept"},"artifact":{"name":"zlib","version":"1.2.11","type":"apk"}}]}"#;
    reproject_vulnerabilities(&tx, "sha256:aaa", report).unwrap();
    tx.commit().unwrap();

    let details: String = conn
        .query_row("SELECT details_json FROM vulnerability_details", [], |r| r.get(0))
        .unwrap();
    assert!(details.contains("custom_field"));
    assert!(details.contains("cvss"));
}
