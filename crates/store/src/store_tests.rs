use chrono::{Duration, Utc};
use sw_core::{ContainerInstance, Digest, InstanceIdentity, RuntimeKind, ScanStatus};
use tempfile::tempdir;

use super::*;
use crate::types::{ImageFilter, Pagination};

fn open_store() -> (tempfile::TempDir, Store) {
    let dir = tempdir().unwrap();
    let store = Store::open(dir.path().join("scanwatch.db")).unwrap();
    (dir, store)
}

#[test]
fn open_runs_migrations_to_target() {
    let (_dir, store) = open_store();
    assert_eq!(store.schema_version().unwrap(), migrations::TARGET_VERSION);
}

#[test]
fn upsert_image_is_idempotent_and_starts_pending() {
    let (_dir, store) = open_store();
    let digest = Digest::new("sha256:aaa");
    let now = Utc::now();
    store.upsert_image(&digest, now).unwrap();
    store.upsert_image(&digest, now + Duration::seconds(5)).unwrap();

    assert_eq!(store.get_image_status(&digest).unwrap(), Some(ScanStatus::Pending));
}

#[test]
fn try_acquire_for_scan_is_single_winner() {
    let (_dir, store) = open_store();
    let digest = Digest::new("sha256:aaa");
    let now = Utc::now();
    store.upsert_image(&digest, now).unwrap();

    assert!(store.try_acquire_for_scan(&digest, now).unwrap());
    assert!(!store.try_acquire_for_scan(&digest, now).unwrap(), "second acquire must lose");
    assert_eq!(store.get_image_status(&digest).unwrap(), Some(ScanStatus::GeneratingSbom));
}

#[test]
fn demote_stale_scans_resets_active_rows_to_pending() {
    let (_dir, store) = open_store();
    let generating = Digest::new("sha256:aaa");
    let completed = Digest::new("sha256:bbb");
    let now = Utc::now();
    store.upsert_image(&generating, now).unwrap();
    store.upsert_image(&completed, now).unwrap();
    assert!(store.try_acquire_for_scan(&generating, now).unwrap());
    assert!(store.compare_and_set_status(&completed, ScanStatus::Pending, ScanStatus::Completed, None, now).unwrap());

    let demoted = store.demote_stale_scans(now).unwrap();

    assert_eq!(demoted, 1);
    assert_eq!(store.get_image_status(&generating).unwrap(), Some(ScanStatus::Pending));
    assert_eq!(store.get_image_status(&completed).unwrap(), Some(ScanStatus::Completed));
}

#[test]
fn full_pipeline_transitions_to_completed_with_projections() {
    let (_dir, store) = open_store();
    let digest = Digest::new("sha256:aaa");
    let now = Utc::now();
    store.upsert_image(&digest, now).unwrap();
    assert!(store.try_acquire_for_scan(&digest, now).unwrap());

    let sbom = r#"{"artifacts":[{"name":"zlib","version":"1.2.11","type":"apk"}]}"#;
    store.store_sbom(&digest, sbom, Some("alpine"), Some("3.19"), now).unwrap();
    assert_eq!(store.get_image_status(&digest).unwrap(), Some(ScanStatus::ScanningVulnerabilities));

    let report = r#"{"matches":[{"vulnerability":{"id":"CVE-2022-37434","severity":"Critical"},"artifact":{"name":"zlib","version":"1.2.11","type":"apk"}}]}"#;
    store.store_vulnerabilities(&digest, report, now, now).unwrap();

    let image = store.get_image(&digest).unwrap().unwrap();
    assert_eq!(image.status, ScanStatus::Completed);
    assert_eq!(image.os_name.as_deref(), Some("alpine"));

    let packages = store.list_packages(&digest, Pagination::default()).unwrap();
    assert_eq!(packages.total_count, 1);

    let vulns = store.list_vulnerabilities(&digest, Pagination::default()).unwrap();
    assert_eq!(vulns.total_count, 1);
    assert_eq!(vulns.items[0].cve_id, "CVE-2022-37434");
}

#[test]
fn compare_and_set_status_rejects_stale_expectation() {
    let (_dir, store) = open_store();
    let digest = Digest::new("sha256:aaa");
    let now = Utc::now();
    store.upsert_image(&digest, now).unwrap();

    assert!(!store
        .compare_and_set_status(&digest, ScanStatus::Completed, ScanStatus::Pending, None, now)
        .unwrap());
    assert!(store
        .compare_and_set_status(&digest, ScanStatus::Pending, ScanStatus::SbomUnavailable, Some("no local image"), now)
        .unwrap());
    let image = store.get_image(&digest).unwrap().unwrap();
    assert_eq!(image.status, ScanStatus::SbomUnavailable);
    assert_eq!(image.status_error.as_deref(), Some("no local image"));
}

fn instance(ns: &str, pod: &str, container: &str, digest: &str) -> ContainerInstance {
    ContainerInstance {
        identity: InstanceIdentity::new(ns, pod, container),
        reference: format!("{container}:latest"),
        digest: Digest::new(digest),
        node: Some("node-a".to_string()),
        runtime_kind: Some(RuntimeKind::Kubernetes),
        created_at: Utc::now(),
    }
}

#[test]
fn replace_instance_snapshot_drops_stale_rows() {
    let (_dir, store) = open_store();
    let now = Utc::now();
    store.upsert_image(&Digest::new("sha256:aaa"), now).unwrap();
    store.upsert_image(&Digest::new("sha256:bbb"), now).unwrap();

    store
        .replace_instance_snapshot(&[instance("ns", "pod-a", "web", "sha256:aaa")], now)
        .unwrap();
    store
        .replace_instance_snapshot(&[instance("ns", "pod-b", "web", "sha256:bbb")], now)
        .unwrap();

    let aaa = store.list_instances_for(&Digest::new("sha256:aaa")).unwrap();
    assert!(aaa.is_empty(), "pod-a's instance should have been dropped by the second snapshot");
    let bbb = store.list_instances_for(&Digest::new("sha256:bbb")).unwrap();
    assert_eq!(bbb.len(), 1);
}

#[test]
fn runtime_kind_other_round_trips_through_storage() {
    let (_dir, store) = open_store();
    let now = Utc::now();
    store.upsert_image(&Digest::new("sha256:aaa"), now).unwrap();
    let mut inst = instance("ns", "pod-a", "web", "sha256:aaa");
    inst.runtime_kind = Some(RuntimeKind::Other("containerd".to_string()));
    store.upsert_instance(&inst, now).unwrap();

    let rows = store.list_instances_for(&Digest::new("sha256:aaa")).unwrap();
    assert_eq!(rows[0].runtime_kind, Some(RuntimeKind::Other("containerd".to_string())));
}

#[test]
fn delete_orphan_images_only_removes_images_with_no_instances() {
    let (_dir, store) = open_store();
    let old = Utc::now() - Duration::days(30);
    let recent = Utc::now();

    store.upsert_image(&Digest::new("sha256:orphan"), old).unwrap();
    store.upsert_image(&Digest::new("sha256:referenced"), old).unwrap();
    store
        .replace_instance_snapshot(&[instance("ns", "pod-a", "web", "sha256:referenced")], recent)
        .unwrap();

    let removed = store.delete_orphan_images(Utc::now() - Duration::days(7)).unwrap();
    assert_eq!(removed, 1);
    assert!(store.get_image(&Digest::new("sha256:orphan")).unwrap().is_none());
    assert!(store.get_image(&Digest::new("sha256:referenced")).unwrap().is_some());
}

#[test]
fn list_images_sorts_by_status_then_digest() {
    let (_dir, store) = open_store();
    let now = Utc::now();
    let failing = Digest::new("sha256:zzz");
    let pending = Digest::new("sha256:aaa");
    store.upsert_image(&pending, now).unwrap();
    store.upsert_image(&failing, now).unwrap();
    store
        .compare_and_set_status(&failing, ScanStatus::Pending, ScanStatus::VulnScanFailed, Some("boom"), now)
        .unwrap();

    let page = store.list_images(Pagination::default(), &ImageFilter::default()).unwrap();
    assert_eq!(page.items[0].digest, failing, "failed images sort ahead of pending ones");
    assert_eq!(page.items[1].digest, pending);
}

#[test]
fn list_images_filters_by_namespace_vuln_status_and_package_type() {
    let (_dir, store) = open_store();
    let now = Utc::now();
    let scanned = Digest::new("sha256:scanned");
    let clean = Digest::new("sha256:clean");
    store.upsert_image(&scanned, now).unwrap();
    store.upsert_image(&clean, now).unwrap();

    store
        .upsert_instance(
            &ContainerInstance {
                identity: InstanceIdentity {
                    namespace: "prod".into(),
                    pod: "web-0".into(),
                    container_name: "app".into(),
                },
                reference: "app:latest".into(),
                image_digest: scanned.clone(),
                node: None,
                runtime_kind: RuntimeKind::Docker,
                created_at: now,
            },
            now,
        )
        .unwrap();
    store
        .upsert_instance(
            &ContainerInstance {
                identity: InstanceIdentity {
                    namespace: "staging".into(),
                    pod: "web-0".into(),
                    container_name: "app".into(),
                },
                reference: "app:latest".into(),
                image_digest: clean.clone(),
                node: None,
                runtime_kind: RuntimeKind::Docker,
                created_at: now,
            },
            now,
        )
        .unwrap();

    store
        .store_sbom(
            &scanned,
            r#"{"artifacts":[{"name":"openssl","version":"1.1","type":"deb"}]}"#,
            Some("debian"),
            Some("12"),
            now,
        )
        .unwrap();
    store
        .store_vulnerabilities(
            &scanned,
            r#"{"matches":[{"vulnerability":{"id":"CVE-2024-1","severity":"High","fix_state":"fixed"},
                "artifact":{"name":"openssl","version":"1.1","type":"deb"}}]}"#,
            now,
            now,
        )
        .unwrap();

    store
        .store_sbom(&clean, r#"{"artifacts":[{"name":"musl","version":"1.2","type":"apk"}]}"#, Some("alpine"), Some("3.19"), now)
        .unwrap();
    store.store_vulnerabilities(&clean, r#"{"matches":[]}"#, now, now).unwrap();

    let by_namespace = store
        .list_images(Pagination::default(), &ImageFilter { namespaces: vec!["prod".into()], ..Default::default() })
        .unwrap();
    assert_eq!(by_namespace.items.iter().map(|i| &i.digest).collect::<Vec<_>>(), vec![&scanned]);

    let by_vuln_status = store
        .list_images(Pagination::default(), &ImageFilter { vuln_statuses: vec!["fixed".into()], ..Default::default() })
        .unwrap();
    assert_eq!(by_vuln_status.items.iter().map(|i| &i.digest).collect::<Vec<_>>(), vec![&scanned]);

    let by_package_type = store
        .list_images(Pagination::default(), &ImageFilter { package_types: vec!["apk".into()], ..Default::default() })
        .unwrap();
    assert_eq!(by_package_type.items.iter().map(|i| &i.digest).collect::<Vec<_>>(), vec![&clean]);

    let none_match = store
        .list_images(Pagination::default(), &ImageFilter { namespaces: vec!["nonexistent".into()], ..Default::default() })
        .unwrap();
    assert!(none_match.items.is_empty());
}

#[test]
fn execute_read_only_query_rejects_mutations() {
    let (_dir, store) = open_store();
    assert!(store.execute_read_only_query("DELETE FROM images").is_err());
    assert!(store.execute_read_only_query("SELECT digest FROM images").is_ok());
}

#[test]
fn job_history_round_trips_outcome() {
    let (_dir, store) = open_store();
    let started = Utc::now();
    let run_id = store.record_job_run_started("cleanup", started).unwrap();
    store
        .record_job_run_finished(run_id, started + Duration::seconds(2), "success", None)
        .unwrap();

    let history = store.job_history("cleanup", 10).unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].outcome.as_deref(), Some("success"));
}
