//! Address Book Integration Tests
//!
//! Covers contiguous allocation and batch discovery during restoration.
//!
//! Run with: cargo test --test address_discovery_test -- --nocapture

mod common;

use std::sync::Arc;

use common::*;
use wallet_sync::{
    AddressBook, Chain, IndexerService, KeyDeriver, MemoryStore, WalletError, WalletStore,
};

fn new_book(
    indexer: &Arc<MockIndexer>,
    deriver: &Arc<TestDeriver>,
    addresses_limit: usize,
) -> (AddressBook, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let book = AddressBook::new(
        store.clone() as Arc<dyn WalletStore>,
        deriver.clone() as Arc<dyn KeyDeriver>,
        indexer.clone() as Arc<dyn IndexerService>,
        0,
        addresses_limit,
    );
    (book, store)
}

#[test]
fn test_create_next_is_contiguous_per_chain() {
    init_logging();
    let indexer = MockIndexer::new(10);
    let deriver = TestDeriver::new();
    let (book, _store) = new_book(&indexer, &deriver, 50);

    let e0 = book.create_next(Chain::External).unwrap();
    let i0 = book.create_next(Chain::Internal).unwrap();
    let e1 = book.create_next(Chain::External).unwrap();

    assert_eq!((e0.chain, e0.index), (Chain::External, 0));
    assert_eq!((i0.chain, i0.index), (Chain::Internal, 0));
    assert_eq!((e1.chain, e1.index), (Chain::External, 1));
    assert_eq!(e1.address, derived(Chain::External, 1));

    let all = book.all().unwrap();
    assert_eq!(all, vec![e0, i0, e1]);
    assert_eq!(book.address_set().unwrap().len(), 3);
}

#[test]
fn test_failed_derivation_persists_nothing() {
    init_logging();
    let indexer = MockIndexer::new(10);
    let deriver = TestDeriver::failing_from(1);
    let (book, _store) = new_book(&indexer, &deriver, 50);

    book.create_next(Chain::External).unwrap();
    let err = book.create_next(Chain::External).unwrap_err();

    assert!(matches!(err, WalletError::Key(_)), "got {:?}", err);
    assert_eq!(book.all().unwrap().len(), 1);
}

#[tokio::test]
async fn test_discovery_stops_after_unused_batch() {
    init_logging();
    let indexer = MockIndexer::new(10);
    for index in [0, 1, 2, 5] {
        indexer.mark_used(&derived(Chain::External, index));
    }
    let deriver = TestDeriver::new();
    let (book, _store) = new_book(&indexer, &deriver, 50);

    let discovered = book.discover(Chain::External, 3).await.unwrap();

    let indices: Vec<u32> = discovered.iter().map(|r| r.index).collect();
    assert_eq!(indices, vec![0, 1, 2, 3, 4, 5]);
    // [0,3) -> [3,6) -> [6,9) unused, nothing past index 8
    assert_eq!(deriver.highest_derived(), Some(8));
    assert_eq!(indexer.filter_used_chunks(), vec![3, 3, 3]);
}

#[tokio::test]
async fn test_discovery_checks_in_address_limit_chunks() {
    init_logging();
    let indexer = MockIndexer::new(10);
    indexer.mark_used(&derived(Chain::External, 4));
    let deriver = TestDeriver::new();
    let (book, _store) = new_book(&indexer, &deriver, 2);

    let discovered = book.discover(Chain::External, 5).await.unwrap();

    assert_eq!(discovered.len(), 5);
    // Two batches of five, each split into 2 + 2 + 1
    assert_eq!(indexer.filter_used_chunks(), vec![2, 2, 1, 2, 2, 1]);
}

#[tokio::test]
async fn test_restore_persists_discovered_addresses() {
    init_logging();
    let indexer = MockIndexer::new(10);
    for index in [0, 3] {
        indexer.mark_used(&derived(Chain::External, index));
    }
    let deriver = TestDeriver::new();
    let (book, _store) = new_book(&indexer, &deriver, 50);

    let restored = book.restore(Chain::External, 3).await.unwrap();

    assert_eq!(restored.len(), 4);
    let persisted: Vec<u32> = book.all().unwrap().iter().map(|r| r.index).collect();
    assert_eq!(persisted, vec![0, 1, 2, 3]);

    // Allocation continues after the discovered range
    let next = book.create_next(Chain::External).unwrap();
    assert_eq!(next.index, 4);
}

#[tokio::test]
async fn test_restore_without_history_allocates_one_address() {
    init_logging();
    let indexer = MockIndexer::new(10);
    let deriver = TestDeriver::new();
    let (book, _store) = new_book(&indexer, &deriver, 50);

    let restored = book.restore(Chain::External, 3).await.unwrap();

    assert_eq!(restored.len(), 1);
    assert_eq!(restored[0].index, 0);
    assert_eq!(book.all().unwrap().len(), 1);
}

#[tokio::test]
async fn test_restore_refuses_non_empty_book() {
    init_logging();
    let indexer = MockIndexer::new(10);
    let deriver = TestDeriver::new();
    let (book, _store) = new_book(&indexer, &deriver, 50);
    book.create_next(Chain::External).unwrap();

    let err = book.restore(Chain::External, 3).await.unwrap_err();

    assert!(matches!(err, WalletError::InvalidInput(_)), "got {:?}", err);
}

#[tokio::test]
async fn test_discovery_failures_are_typed_and_persist_nothing() {
    init_logging();
    let indexer = MockIndexer::new(10);
    indexer.mark_used(&derived(Chain::External, 0));
    indexer.mark_used(&derived(Chain::External, 2));
    // Second batch [3, 6) cannot be derived
    let deriver = TestDeriver::failing_from(4);
    let (book, _store) = new_book(&indexer, &deriver, 50);

    let err = book.restore(Chain::External, 3).await.unwrap_err();
    assert!(matches!(err, WalletError::DiscoveryFailure(_)), "got {:?}", err);
    assert!(book.all().unwrap().is_empty());

    let indexer = MockIndexer::new(10);
    indexer.fail(|f| f.filter_used = true);
    let deriver = TestDeriver::new();
    let (book, _store) = new_book(&indexer, &deriver, 50);

    let err = book.restore(Chain::External, 3).await.unwrap_err();
    assert!(matches!(err, WalletError::DiscoveryFailure(_)), "got {:?}", err);
    assert!(book.all().unwrap().is_empty());
}

#[tokio::test]
async fn test_oversized_discovery_batch_is_refused() {
    init_logging();
    let indexer = MockIndexer::new(10);
    indexer.mark_used(&derived(Chain::External, 0));
    let deriver = TestDeriver::new();
    let (book, _store) = new_book(&indexer, &deriver, 50);

    let err = book.discover(Chain::External, u32::MAX).await.unwrap_err();

    assert!(matches!(err, WalletError::InvalidInput(_)), "got {:?}", err);
    assert_eq!(deriver.highest_derived(), None);
    assert!(indexer.filter_used_chunks().is_empty());
}
