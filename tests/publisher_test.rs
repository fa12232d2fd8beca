use leaseq::model::Wait;
use leaseq::publisher::{item_label, publish_sequence};
use leaseq::queue::LeaseQueue;
use leaseq::store::{MemoryStore, Store};
use std::time::Duration;
use tokio::time::Instant;

#[test]
fn labels_are_sequential() {
    assert_eq!(item_label(1), "WorkItem-1");
    assert_eq!(item_label(42), "WorkItem-42");
}

#[tokio::test(start_paused = true)]
async fn publishes_count_minus_one_items_in_order() {
    let store = MemoryStore::new();
    let queue = LeaseQueue::new("jobs", store.clone());

    let published = publish_sequence(&queue, 6, Duration::from_secs(1))
        .await
        .unwrap();

    assert_eq!(published, 5);
    let main: Vec<String> = store
        .range("jobs")
        .await
        .unwrap()
        .into_iter()
        .map(|v| String::from_utf8(v).unwrap())
        .collect();
    assert_eq!(
        main,
        vec!["WorkItem-1", "WorkItem-2", "WorkItem-3", "WorkItem-4", "WorkItem-5"]
    );
}

#[tokio::test(start_paused = true)]
async fn publishes_one_item_per_interval() {
    let store = MemoryStore::new();
    let queue = LeaseQueue::new("jobs", store);

    let started = Instant::now();
    publish_sequence(&queue, 4, Duration::from_secs(1))
        .await
        .unwrap();

    // Three items: at 0s, 1s and 2s.
    assert_eq!(started.elapsed(), Duration::from_secs(2));
}

#[tokio::test(start_paused = true)]
async fn tiny_counts_publish_nothing() {
    let store = MemoryStore::new();
    let queue = LeaseQueue::new("jobs", store);
    assert_eq!(publish_sequence(&queue, 0, Duration::from_secs(1)).await.unwrap(), 0);
    assert_eq!(publish_sequence(&queue, 1, Duration::from_secs(1)).await.unwrap(), 0);
    assert!(queue.empty().await.unwrap());
}

#[tokio::test(start_paused = true)]
async fn last_published_is_first_leased() {
    let store = MemoryStore::new();
    let queue = LeaseQueue::new("jobs", store);
    publish_sequence(&queue, 6, Duration::from_millis(10))
        .await
        .unwrap();

    let first = queue
        .lease(Duration::from_secs(5), Wait::NonBlocking)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(first.to_string(), "WorkItem-5");
}
