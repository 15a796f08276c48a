use std::sync::Arc;
use seedstore::control::Controller;
use seedstore::core::config::Config;
use seedstore::core::error::ErrorKind;
use seedstore::core::types::{Record, RecordId};
use seedstore::generation::data::{AlphanumericGenerator, DataGenerator};
use seedstore::search::engine::QueryEngine;
use seedstore::search::request::SearchParams;
use seedstore::storage::handle::StoreHandle;
use seedstore::storage::store::{RecordStore, Store};
use tempfile::TempDir;

fn open_with(data: Vec<String>) -> (TempDir, QueryEngine, Arc<Store>) {
    let dir = tempfile::tempdir().unwrap();
    let config = Config::default().with_storage_path(dir.path());
    let store = Arc::new(Store::open(&config).unwrap());
    for chunk in data.chunks(100) {
        store.insert_batch(chunk.to_vec()).unwrap();
    }
    let engine = QueryEngine::new(StoreHandle::from_store(config, store.clone()));
    (dir, engine, store)
}

fn random_data(n: usize, symbols: usize) -> Vec<String> {
    let generator = AlphanumericGenerator::seeded(42);
    (0..n).map(|_| generator.generate(symbols)).collect()
}

#[tokio::test]
async fn results_only_match_the_prefix() {
    let data = random_data(2000, 4);
    let (_dir, engine, _store) = open_with(data.clone());

    for prefix in ["", "a", "Z", "7", "ab", "Qx9"] {
        let page = engine.search(prefix, 0, 10_000).await.unwrap();
        assert!(page.records.iter().all(|r| r.data.starts_with(prefix)), "prefix {}", prefix);

        let expected = data.iter().filter(|d| d.starts_with(prefix)).count();
        assert_eq!(page.len(), expected, "prefix {}", prefix);
        assert!(!page.has_more);
    }
}

#[tokio::test]
async fn results_follow_index_order() {
    let data = ["b2", "a1", "b1", "b2", "c"].iter().map(|s| s.to_string()).collect();
    let (_dir, engine, _store) = open_with(data);

    let page = engine.search("b", 0, 10).await.unwrap();
    assert_eq!(
        page.records,
        vec![
            Record::new(RecordId(3), "b1"),
            Record::new(RecordId(1), "b2"),
            Record::new(RecordId(4), "b2"),
        ]
    );
}

#[tokio::test]
async fn consecutive_pages_partition_the_results() {
    let (_dir, engine, _store) = open_with(random_data(1500, 3));

    for (offset, limit) in [(0u64, 7usize), (13, 20), (100, 50)] {
        let first = engine.search("", offset, limit).await.unwrap();
        let second = engine.search("", offset + limit as u64, limit).await.unwrap();
        let both = engine.search("", offset, 2 * limit).await.unwrap();

        assert!(first.records.iter().all(|r| !second.records.contains(r)));
        let joined: Vec<Record> = first.records.iter().chain(&second.records).cloned().collect();
        assert_eq!(joined, both.records);
    }
}

#[tokio::test]
async fn walking_pages_visits_every_match_once() {
    let data = random_data(300, 2);
    let (_dir, engine, _store) = open_with(data.clone());
    let expected = data.iter().filter(|d| d.starts_with('a')).count();

    let mut seen = Vec::new();
    let mut offset = 0;
    loop {
        let page = engine.search("a", offset, 3).await.unwrap();
        offset += page.len() as u64;
        seen.extend(page.records.into_iter().map(|r| r.id));
        if !page.has_more {
            break;
        }
    }

    assert_eq!(seen.len(), expected);
    seen.sort();
    seen.dedup();
    assert_eq!(seen.len(), expected);
}

#[tokio::test]
async fn empty_store_returns_empty_page() {
    let (_dir, engine, _store) = open_with(Vec::new());
    let page = engine.search("", 0, 20).await.unwrap();
    assert!(!page.has_more);
    assert!(page.is_empty());
    assert_eq!(serde_json::to_string(&page).unwrap(), "[0,[]]");
}

#[tokio::test]
async fn has_more_only_when_another_match_exists() {
    let data = ["k1", "k2", "k3", "k4", "z"].iter().map(|s| s.to_string()).collect();
    let (_dir, engine, _store) = open_with(data);

    assert!(engine.search("k", 0, 3).await.unwrap().has_more);
    assert!(!engine.search("k", 0, 4).await.unwrap().has_more);
    assert!(!engine.search("k", 1, 3).await.unwrap().has_more);

    let beyond = engine.search("k", 10, 3).await.unwrap();
    assert!(!beyond.has_more);
    assert!(beyond.is_empty());
}

#[tokio::test]
async fn zero_limit_is_rejected() {
    let (_dir, engine, _store) = open_with(Vec::new());
    let err = engine.search("", 0, 0).await.unwrap_err();
    assert!(err.is(ErrorKind::InvalidArgument));
}

#[tokio::test]
async fn search_sees_a_cleared_store_as_empty() {
    let (_dir, engine, store) = open_with(random_data(50, 5));
    assert_eq!(engine.search("", 0, 100).await.unwrap().len(), 50);

    store.clear().unwrap();
    let page = engine.search("", 0, 100).await.unwrap();
    assert!(page.is_empty());
    assert!(!page.has_more);
}

#[tokio::test]
async fn controller_coerces_request_parameters() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config::default().with_storage_path(dir.path());
    {
        let store = Store::open(&config).unwrap();
        store.insert_batch(random_data(60, 3)).unwrap();
    }

    // The first search opens the store lazily.
    let controller = Controller::new(config).unwrap();
    assert!(!controller.store().is_ready());

    let page = controller
        .handle_search(&SearchParams::from_pairs([("limit", "0")]))
        .await
        .unwrap();
    assert_eq!(page.len(), 20);
    assert!(page.has_more);
    assert!(controller.store().is_ready());

    let page = controller
        .handle_search(&SearchParams::from_pairs([("offset", "50"), ("limit", "99999")]))
        .await
        .unwrap();
    assert_eq!(page.len(), 10);
    assert!(!page.has_more);

    let err = controller
        .handle_search(&SearchParams::from_pairs([("offset", "-3")]))
        .await
        .unwrap_err();
    assert!(err.is(ErrorKind::InvalidArgument));
}
