//! Quorum Lock Store - the per-node storage capability
//!
//! This crate provides:
//! - `LockStore`: the atomic primitives a lock node must offer
//! - `StoreConnector`: factory turning resolved node descriptors into stores
//! - `NodeDescriptor` / `StoreNode`: uniform node identity and timeout-bounded calls
//! - `RedisStore`: Redis-backed node
//! - `MemoryStore`, `FaultyStore`, `InMemoryCluster`: in-process nodes with fault injection

pub mod cluster;
pub mod error;
pub mod fault_store;
pub mod memory_store;
pub mod node;
pub mod redis_store;
pub mod traits;

pub use cluster::InMemoryCluster;
pub use error::StoreError;
pub use fault_store::FaultyStore;
pub use memory_store::MemoryStore;
pub use node::{NodeDescriptor, StoreNode};
pub use redis_store::{RedisConnector, RedisStore};
pub use traits::{LockStore, StoreConnector};
