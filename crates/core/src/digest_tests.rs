use super::*;
use std::collections::HashMap;

#[test]
fn display_round_trips_the_string() {
    let d = Digest::new("sha256:abc");
    assert_eq!(d.to_string(), "sha256:abc");
}

#[test]
fn algorithm_splits_on_first_colon() {
    let d = Digest::from("sha256:abc");
    assert_eq!(d.algorithm(), Some("sha256"));
}

#[test]
fn algorithm_is_none_without_a_colon() {
    let d = Digest::from("not-a-digest");
    assert_eq!(d.algorithm(), None);
}

#[test]
fn borrow_str_supports_hashmap_lookup_by_str() {
    let mut map: HashMap<Digest, u32> = HashMap::new();
    map.insert(Digest::new("sha256:abc"), 1);
    assert_eq!(map.get("sha256:abc"), Some(&1));
}

#[test]
fn equality_is_by_value() {
    assert_eq!(Digest::new("sha256:abc"), Digest::new("sha256:abc"));
    assert_ne!(Digest::new("sha256:abc"), Digest::new("sha256:def"));
}
