use k8s_openapi::api::core::v1::{ContainerStatus, Pod, PodSpec, PodStatus};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

use super::*;

#[test]
fn digest_from_image_id_extracts_digest_after_last_at_sign() {
    assert_eq!(
        digest_from_image_id("docker-pullable://example.com/app@sha256:abc123"),
        Some("sha256:abc123".to_string())
    );
}

#[test]
fn digest_from_image_id_is_none_without_an_at_sign() {
    assert_eq!(digest_from_image_id("example.com/app:latest"), None);
}

fn pod_with_container(namespace: &str, pod_name: &str, node: &str, container: ContainerStatus) -> Pod {
    Pod {
        metadata: ObjectMeta {
            name: Some(pod_name.to_string()),
            namespace: Some(namespace.to_string()),
            ..Default::default()
        },
        spec: Some(PodSpec { node_name: Some(node.to_string()), ..Default::default() }),
        status: Some(PodStatus { container_statuses: Some(vec![container]), ..Default::default() }),
    }
}

#[test]
fn discovery_events_for_pod_emits_one_event_per_container_with_a_resolvable_digest() {
    let container = ContainerStatus {
        name: "app".to_string(),
        image: "example.com/app:v1".to_string(),
        image_id: "docker-pullable://example.com/app@sha256:deadbeef".to_string(),
        ..Default::default()
    };
    let pod = pod_with_container("prod", "app-7d8f", "node-a", container);

    let events = discovery_events_for_pod(&pod);

    assert_eq!(events.len(), 1);
    assert_eq!(events[0].digest.as_str(), "sha256:deadbeef");
    assert_eq!(events[0].instance_identity.namespace, "prod");
    assert_eq!(events[0].instance_identity.pod, "app-7d8f");
    assert_eq!(events[0].instance_identity.container_name, "app");
    assert_eq!(events[0].node.as_deref(), Some("node-a"));
    assert_eq!(events[0].runtime_kind, RuntimeKind::Kubernetes);
}

#[test]
fn discovery_events_for_pod_skips_containers_with_no_digest_yet() {
    let container = ContainerStatus {
        name: "app".to_string(),
        image: "example.com/app:v1".to_string(),
        image_id: String::new(),
        ..Default::default()
    };
    let pod = pod_with_container("prod", "app-7d8f", "node-a", container);

    assert!(discovery_events_for_pod(&pod).is_empty());
}

#[test]
fn discovery_events_for_pod_is_empty_without_a_name() {
    let pod = Pod { metadata: ObjectMeta::default(), spec: None, status: None };
    assert!(discovery_events_for_pod(&pod).is_empty());
}
