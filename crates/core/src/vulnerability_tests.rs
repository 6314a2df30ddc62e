use super::*;

#[test]
fn severity_ordering_matches_spec_case_expression() {
    assert!(Severity::Critical < Severity::High);
    assert!(Severity::High < Severity::Medium);
    assert!(Severity::Medium < Severity::Low);
    assert!(Severity::Low < Severity::Negligible);
    assert!(Severity::Negligible < Severity::Unknown);
}

#[test]
fn severity_sort_order_is_dense_from_zero() {
    let mut orders: Vec<i32> = [
        Severity::Critical,
        Severity::High,
        Severity::Medium,
        Severity::Low,
        Severity::Negligible,
        Severity::Unknown,
    ]
    .iter()
    .map(|s| s.sort_order())
    .collect();
    orders.sort_unstable();
    assert_eq!(orders, vec![0, 1, 2, 3, 4, 5]);
}

#[test]
fn severity_from_str_falls_back_to_unknown() {
    assert_eq!("Critical".parse::<Severity>().unwrap(), Severity::Critical);
    assert_eq!("not-a-severity".parse::<Severity>().unwrap(), Severity::Unknown);
}

#[test]
fn identity_key_is_the_cve_package_triple() {
    let vuln = Vulnerability {
        id: 1,
        image_digest: Digest::new("sha256:aaa"),
        cve_id: "CVE-2022-37434".into(),
        package_name: "zlib".into(),
        package_version: "1.2.11".into(),
        package_type: "apk".into(),
        severity: Severity::Critical,
        fix_state: "not-fixed".into(),
        fixed_version: None,
        count: 1,
        risk_score: None,
        epss_score: None,
        epss_percentile: None,
        known_exploited: false,
    };
    assert_eq!(
        vuln.identity_key(),
        ("CVE-2022-37434", "zlib", "1.2.11", "apk")
    );
}
