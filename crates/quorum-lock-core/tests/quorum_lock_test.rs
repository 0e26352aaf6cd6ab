//! Quorum Lock Integration Tests
//!
//! End-to-end lock scenarios against an in-process cluster. Every lock built from the
//! same `InMemoryCluster` and node list contends on the same nodes, the way separate
//! processes would against shared Redis servers.

use std::time::Duration;

use quorum_lock_common::logging::init_test_tracing;
use quorum_lock_common::{CLOCK_DRIFT_FACTOR, LockOptions, NodeConfig};
use quorum_lock_core::{LockError, QuorumLock, ReentrantLock};
use quorum_lock_store::InMemoryCluster;

const RESOURCE: &str = "pants";

fn build(cluster: &InMemoryCluster, nodes: Vec<NodeConfig>, ttl_ms: u64) -> QuorumLock {
    QuorumLock::builder(RESOURCE)
        .nodes(nodes)
        .ttl(Duration::from_millis(ttl_ms))
        .retry_delay(Duration::from_millis(20))
        .connector(cluster.clone())
        .build()
        .expect("valid lock options")
}

fn local(cluster: &InMemoryCluster, ttl_ms: u64) -> QuorumLock {
    build(cluster, vec![NodeConfig::default()], ttl_ms)
}

fn three_backends() -> Vec<NodeConfig> {
    vec![
        NodeConfig::address("localhost", 6379).with_socket_timeout_ms(100),
        NodeConfig::address("localhost", 6380).with_socket_timeout_ms(100),
        NodeConfig::address("localhost", 6381).with_socket_timeout_ms(100),
    ]
}

// ============== Engine Tests ==============

#[tokio::test]
async fn test_default_options_construct() -> anyhow::Result<()> {
    let lock = QuorumLock::new(RESOURCE, LockOptions::default())?;
    assert_eq!(lock.node_count(), 1);
    assert_eq!(lock.quorum(), 1);
    Ok(())
}

#[tokio::test]
async fn test_simple_lock() {
    init_test_tracing();
    let cluster = InMemoryCluster::new();

    let mut first = local(&cluster, 1000);
    assert!(first.acquire().await);
    first.release().await;

    let mut second = local(&cluster, 1000);
    assert!(second.acquire().await);
    second.release().await;
}

#[tokio::test]
async fn test_is_locked() {
    let cluster = InMemoryCluster::new();
    let mut lock = local(&cluster, 1000);

    assert!(!lock.locked().await);
    assert!(lock.acquire().await);
    assert!(lock.locked().await);
    lock.release().await;
    assert!(!lock.locked().await);
}

#[tokio::test]
async fn test_locked_span_lock_instances() {
    let cluster = InMemoryCluster::new();
    let mut first = local(&cluster, 1000);
    let second = local(&cluster, 1000);

    assert!(first.acquire().await);
    assert_eq!(first.locked().await, second.locked().await);
    first.release().await;
    assert_eq!(first.locked().await, second.locked().await);
}

#[tokio::test]
async fn test_lock_with_validity() {
    let cluster = InMemoryCluster::new();
    let ttl = Duration::from_millis(1000);
    let mut lock = local(&cluster, 1000);

    let result = lock.acquire_with_validity().await;
    assert!(result.acquired);
    assert!(result.validity > Duration::ZERO);
    assert!(result.validity < ttl - ttl.mul_f64(CLOCK_DRIFT_FACTOR));
    lock.release().await;
}

#[tokio::test]
async fn test_from_url() {
    let cluster = InMemoryCluster::new();
    let mut by_url = build(
        &cluster,
        vec![NodeConfig::url("redis://localhost/0")],
        1000,
    );
    let mut by_address = local(&cluster, 1000);

    assert!(by_url.acquire().await);
    // Same node, reached through the other configuration form
    assert!(by_address.locked().await);
    assert!(!by_address.acquire().await);
    by_url.release().await;
}

#[tokio::test]
async fn test_fail_to_lock_acquired() {
    let cluster = InMemoryCluster::new();
    let mut first = local(&cluster, 1000);
    let mut second = local(&cluster, 1000);

    assert!(first.acquire().await);
    assert!(!second.acquire().await);
    first.release().await;
    assert!(second.acquire().await);
    second.release().await;
}

#[tokio::test]
async fn test_lock_expire() {
    let cluster = InMemoryCluster::new();

    let mut first = local(&cluster, 500);
    assert!(first.acquire().await);
    tokio::time::sleep(Duration::from_millis(1000)).await;

    // The first lock lapsed without a release
    let mut second = local(&cluster, 1000);
    assert!(second.acquire().await);

    // The first holder's stale release leaves the new holder in place
    first.release().await;
    assert!(second.locked().await);

    let mut third = local(&cluster, 1000);
    assert!(!third.acquire().await);

    second.release().await;
    assert!(third.acquire().await);
    third.release().await;
}

#[tokio::test]
async fn test_multi_backend_quorum_tolerance() -> anyhow::Result<()> {
    let cluster = InMemoryCluster::new();
    let nodes = three_backends();
    let mut lock = build(&cluster, nodes.clone(), 1000);

    cluster.node(&nodes[1])?.set_available(false);
    assert!(lock.acquire().await);
    lock.release().await;

    cluster.node(&nodes[2])?.set_available(false);
    assert!(!lock.acquire().await);
    assert!(!lock.locked().await);
    Ok(())
}

// ============== Reentrant Tests ==============

#[tokio::test]
async fn test_reentrant_lock_blocks_others_until_outermost_release() {
    let cluster = InMemoryCluster::new();
    let mut lock = ReentrantLock::new(local(&cluster, 1000));
    let mut other = local(&cluster, 1000);

    for _ in 0..3 {
        assert!(lock.acquire().await);
    }
    for _ in 0..2 {
        lock.release().await;
        assert!(!other.acquire().await);
    }

    lock.release().await;
    assert!(other.acquire().await);
    other.release().await;
}

// ============== Scoped Tests ==============

#[tokio::test]
async fn test_context_manager() -> anyhow::Result<()> {
    let cluster = InMemoryCluster::new();
    let ttl = Duration::from_millis(1000);
    let mut lock = local(&cluster, 1000);

    let validity = lock.with_lock(|validity| async move { validity }).await?;
    assert!(validity > Duration::ZERO);
    assert!(validity < ttl - ttl.mul_f64(CLOCK_DRIFT_FACTOR));

    let mut other = local(&cluster, 1000);
    assert!(other.acquire().await);
    other.release().await;
    Ok(())
}

#[tokio::test]
async fn test_context_manager_fails_when_held() {
    let cluster = InMemoryCluster::new();
    let mut holder = local(&cluster, 1000);
    let mut contender = local(&cluster, 1000);

    assert!(holder.acquire().await);
    let err = contender.with_lock(|_| async {}).await.unwrap_err();
    assert!(matches!(err, LockError::Acquisition { ref resource, .. } if resource == RESOURCE));
    holder.release().await;
}
