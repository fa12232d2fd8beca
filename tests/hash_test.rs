use leaseq::hash::item_key;

#[test]
fn key_is_stable_across_calls() {
    let item = b"WorkItem-7";
    assert_eq!(item_key(item), item_key(item));
}

#[test]
fn key_matches_sha224_reference_vectors() {
    assert_eq!(
        item_key(b""),
        "d14a028c2a3a2bc9476102bb288234c415a2b01f828ea62ac5b3e42f"
    );
    assert_eq!(
        item_key(b"abc"),
        "23097d223405d8228642a477bda255b32aadbce4bda0b3f7e36c9da7"
    );
}

#[test]
fn distinct_items_get_distinct_keys() {
    let keys: std::collections::HashSet<String> = (1..=1000)
        .map(|i| item_key(format!("WorkItem-{i}").as_bytes()))
        .collect();
    assert_eq!(keys.len(), 1000);
}

#[test]
fn key_length_does_not_depend_on_item_length() {
    let small = item_key(b"x");
    let large = item_key(&vec![0xAB; 1 << 20]);
    assert_eq!(small.len(), 56);
    assert_eq!(large.len(), 56);
    assert!(large.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
}
