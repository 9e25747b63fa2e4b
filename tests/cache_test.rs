//! Tests for `CacheStore`: TTL expiry, prefix invalidation and sharing.

use std::sync::Arc;
use std::time::Duration;

use eventide::cache::{CacheConfig, CacheStore, ManualClock, RequestSignature};
use eventide::SearchParams;

fn store_with_clock(ttl: Duration) -> (CacheStore<Vec<String>>, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new());
    let store = CacheStore::with_clock(&CacheConfig::new().ttl(ttl), clock.clone());
    (store, clock)
}

fn search_sig(query: &str, page: u32) -> RequestSignature {
    SearchParams::new(40.7, -74.0).query(query).signature(page, 20)
}

#[test]
fn miss_then_hit() {
    let (store, _clock) = store_with_clock(Duration::from_secs(60));
    let key = search_sig("jazz", 1);

    assert!(store.get(&key).is_none());
    store.set(key.clone(), vec!["e1".to_string()]);

    let entry = store.get(&key).unwrap();
    assert_eq!(entry.payload, vec!["e1"]);
    assert_eq!(entry.key, key);
}

#[test]
fn expired_entry_is_absent_and_evicted() {
    let (store, clock) = store_with_clock(Duration::from_secs(60));
    let key = search_sig("jazz", 1);
    store.set(key.clone(), vec!["e1".to_string()]);

    clock.advance(Duration::from_secs(30));
    assert!(store.get(&key).is_some());

    clock.advance(Duration::from_secs(31));
    assert!(store.get(&key).is_none());
    assert!(store.is_empty());
}

#[test]
fn overwrite_restamps_entry() {
    let (store, clock) = store_with_clock(Duration::from_secs(60));
    let key = search_sig("jazz", 1);
    store.set(key.clone(), vec!["old".to_string()]);

    clock.advance(Duration::from_secs(50));
    store.set(key.clone(), vec!["new".to_string()]);
    clock.advance(Duration::from_secs(50));

    assert_eq!(store.get(&key).unwrap().payload, vec!["new"]);
}

#[test]
fn pages_are_cached_independently() {
    let (store, _clock) = store_with_clock(Duration::from_secs(60));
    store.set(search_sig("jazz", 1), vec!["p1".to_string()]);

    assert!(store.get(&search_sig("jazz", 2)).is_none());
    assert!(store.get(&search_sig("jazz", 1)).is_some());
}

#[test]
fn invalidate_by_prefix() {
    let (store, _clock) = store_with_clock(Duration::from_secs(60));
    store.set(search_sig("jazz", 1), vec![]);
    store.set(search_sig("jazz", 2), vec![]);
    store.set(search_sig("blues", 1), vec![]);
    let lookup = RequestSignature::builder("events/get").param("id", "e1").build();
    store.set(lookup.clone(), vec![]);

    assert_eq!(store.invalidate("events/search"), 3);
    assert!(store.get(&search_sig("jazz", 1)).is_none());
    assert!(store.get(&lookup).is_some());
    assert_eq!(store.len(), 1);
}

#[test]
fn remove_and_clear() {
    let (store, _clock) = store_with_clock(Duration::from_secs(60));
    store.set(search_sig("jazz", 1), vec![]);
    store.set(search_sig("blues", 1), vec![]);

    store.remove(&search_sig("jazz", 1));
    assert!(store.get(&search_sig("jazz", 1)).is_none());
    assert!(store.get(&search_sig("blues", 1)).is_some());

    store.clear();
    assert!(store.is_empty());
}

#[test]
fn shared_store_is_seen_by_every_holder() {
    let store: Arc<CacheStore<Vec<String>>> = Arc::new(CacheStore::new(&CacheConfig::new()));
    let writer = Arc::clone(&store);
    let reader = Arc::clone(&store);

    writer.set(search_sig("jazz", 1), vec!["e1".to_string()]);
    assert_eq!(reader.get(&search_sig("jazz", 1)).unwrap().payload, vec!["e1"]);
}

#[test]
fn equivalent_params_share_a_signature() {
    let a = SearchParams::new(40.7, -74.0)
        .categories(["music", "art"])
        .query(" jazz ");
    let b = SearchParams::new(40.7, -74.0)
        .query("jazz")
        .categories(["art", "music"]);
    assert_eq!(a.signature(1, 20), b.signature(1, 20));
    assert_ne!(a.signature(1, 20), a.signature(2, 20));
}
