use super::*;

#[test]
fn runtime_kind_display() {
    assert_eq!(RuntimeKind::Docker.to_string(), "docker");
    assert_eq!(RuntimeKind::Kubernetes.to_string(), "kubernetes");
    assert_eq!(RuntimeKind::Other("kubelet".into()).to_string(), "other");
}

#[test]
fn instance_identity_equality_is_by_tuple() {
    let a = InstanceIdentity::new("host1", "c1", "app");
    let b = InstanceIdentity::new("host1", "c1", "app");
    let c = InstanceIdentity::new("host1", "c2", "app");
    assert_eq!(a, b);
    assert_ne!(a, c);
}

#[test]
fn discovery_event_serde_round_trip() {
    let event = DiscoveryEvent {
        instance_identity: InstanceIdentity::new("h", "c1", "app"),
        reference: "nginx:1.25".into(),
        digest: Digest::new("sha256:aaa"),
        node: Some("node-a".into()),
        runtime_kind: RuntimeKind::Docker,
    };
    let json = serde_json::to_string(&event).unwrap();
    let back: DiscoveryEvent = serde_json::from_str(&json).unwrap();
    assert_eq!(event, back);
}

#[test]
fn watch_event_snapshot_variant_carries_all_instances() {
    let events = vec![
        DiscoveryEvent {
            instance_identity: InstanceIdentity::new("h", "a", "app"),
            reference: "nginx:1.25".into(),
            digest: Digest::new("sha256:aaa"),
            node: None,
            runtime_kind: RuntimeKind::Docker,
        },
        DiscoveryEvent {
            instance_identity: InstanceIdentity::new("h", "c", "app"),
            reference: "redis:7".into(),
            digest: Digest::new("sha256:ccc"),
            node: None,
            runtime_kind: RuntimeKind::Docker,
        },
    ];
    let snapshot = WatchEvent::Snapshot(events.clone());
    match snapshot {
        WatchEvent::Snapshot(list) => assert_eq!(list, events),
        WatchEvent::ContainerSeen(_) => panic!("expected Snapshot variant"),
    }
}
