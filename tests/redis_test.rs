//! Protocol tests against a live Redis server.
//!
//! Reads REDIS_HOST / REDIS_PORT (default localhost:6379). Each test uses a
//! fresh queue name so runs do not interfere.

use leaseq::model::{Wait, WorkItem};
use leaseq::queue::LeaseQueue;
use leaseq::store::{RedisStore, Store};
use std::time::{Duration, Instant};

async fn test_store() -> RedisStore {
    let host = std::env::var("REDIS_HOST").unwrap_or_else(|_| "localhost".to_string());
    let port = std::env::var("REDIS_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(6379);
    RedisStore::connect(&host, port, 0, None).await.unwrap()
}

fn fresh_name() -> String {
    format!("leaseq-test-{}", uuid::Uuid::new_v4())
}

#[tokio::test]
#[ignore] // Requires running Redis
async fn connects_and_pings() {
    test_store().await.health_check().await.unwrap();
}

#[tokio::test]
#[ignore] // Requires running Redis
async fn lease_complete_round_trip_newest_first() {
    let q = LeaseQueue::new(&fresh_name(), test_store().await);
    for i in 1..=5 {
        q.publish(&WorkItem::from(format!("WorkItem-{i}")))
            .await
            .unwrap();
    }

    let item = q
        .lease(Duration::from_secs(5), Wait::NonBlocking)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(item.to_string(), "WorkItem-5");
    assert!(q.store().exists(&q.lease_key(&item)).await.unwrap());

    q.complete(&item).await.unwrap();
    q.complete(&item).await.unwrap();
    assert!(!q.store().exists(&q.lease_key(&item)).await.unwrap());
    assert_eq!(q.in_flight().await.unwrap(), 0);
    assert_eq!(q.pending().await.unwrap(), 4);

    while let Some(item) = q
        .lease(Duration::from_secs(5), Wait::NonBlocking)
        .await
        .unwrap()
    {
        q.complete(&item).await.unwrap();
    }
    assert!(q.empty().await.unwrap());
}

#[tokio::test]
#[ignore] // Requires running Redis
async fn lease_expires_leaving_item_in_processing() {
    let q = LeaseQueue::new(&fresh_name(), test_store().await);
    q.publish(&"x".into()).await.unwrap();
    let item = q
        .lease(Duration::from_millis(300), Wait::NonBlocking)
        .await
        .unwrap()
        .unwrap();
    assert!(q.is_leased(&item).await.unwrap());

    tokio::time::sleep(Duration::from_millis(500)).await;
    assert!(!q.is_leased(&item).await.unwrap());
    assert_eq!(q.orphans().await.unwrap(), vec![item.clone()]);

    q.complete(&item).await.unwrap();
}

#[tokio::test]
#[ignore] // Requires running Redis
async fn blocking_lease_times_out_on_empty_queue() {
    let q = LeaseQueue::new(&fresh_name(), test_store().await);
    let timeout = Duration::from_secs(1);

    let started = Instant::now();
    let item = q
        .lease(Duration::from_secs(5), Wait::up_to(timeout))
        .await
        .unwrap();
    let elapsed = started.elapsed();

    assert!(item.is_none());
    assert!(elapsed >= timeout, "returned after {elapsed:?}");
    assert!(elapsed < timeout + Duration::from_millis(500), "returned after {elapsed:?}");
}

#[tokio::test]
#[ignore] // Requires running Redis
async fn concurrent_sessions_claim_a_single_item_once() {
    let name = fresh_name();
    let publisher = LeaseQueue::new(&name, test_store().await);
    publisher.publish(&"only".into()).await.unwrap();

    let mut handles = Vec::new();
    for _ in 0..4 {
        let q = LeaseQueue::new(&name, test_store().await);
        handles.push(tokio::spawn(async move {
            q.lease(Duration::from_secs(5), Wait::up_to(Duration::from_secs(1)))
                .await
        }));
    }

    let mut winners = Vec::new();
    for handle in handles {
        if let Some(item) = handle.await.unwrap().unwrap() {
            winners.push(item);
        }
    }
    assert_eq!(winners.len(), 1);
    publisher.complete(&winners[0]).await.unwrap();
    assert!(publisher.empty().await.unwrap());
}

#[tokio::test]
#[ignore] // Requires running Redis
async fn blocking_leases_on_one_shared_store_wait_side_by_side() {
    let q = std::sync::Arc::new(LeaseQueue::new(&fresh_name(), test_store().await));
    let timeout = Duration::from_secs(1);

    let started = Instant::now();
    let handles: Vec<_> = (0..3)
        .map(|_| {
            let q = std::sync::Arc::clone(&q);
            tokio::spawn(async move { q.lease(Duration::from_secs(5), Wait::up_to(timeout)).await })
        })
        .collect();
    for handle in handles {
        assert!(handle.await.unwrap().unwrap().is_none());
    }
    let elapsed = started.elapsed();

    // Serialized waits would take a multiple of the timeout.
    assert!(elapsed < timeout + Duration::from_millis(500), "returned after {elapsed:?}");
}

#[tokio::test]
#[ignore] // Requires running Redis
async fn oversized_ttl_is_rejected_by_the_store() {
    let store = test_store().await;
    let key = fresh_name();
    let err = store.set_ex(&key, Duration::MAX, "v").await.unwrap_err();
    assert!(matches!(err, leaseq::Error::InvalidLeaseDuration(_)), "got {err:?}");
    assert!(!store.exists(&key).await.unwrap());
}
