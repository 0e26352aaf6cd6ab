//! In-process cluster of lock nodes.
//!
//! `InMemoryCluster` is a [`StoreConnector`] that maps every node label to one shared
//! in-process node, so independent locks configured with the same node list contend on
//! the same "servers" just as they would against real Redis instances. Each node is a
//! [`FaultyStore`] over a [`MemoryStore`] and can be taken down or slowed down.

use std::sync::Arc;

use dashmap::DashMap;
use quorum_lock_common::NodeConfig;
use tracing::debug;

use crate::error::StoreError;
use crate::fault_store::FaultyStore;
use crate::memory_store::MemoryStore;
use crate::node::NodeDescriptor;
use crate::traits::{LockStore, StoreConnector};

/// A set of in-process lock nodes keyed by node label
#[derive(Clone, Default)]
pub struct InMemoryCluster {
    nodes: Arc<DashMap<String, Arc<FaultyStore>>>,
}

impl InMemoryCluster {
    pub fn new() -> Self {
        Self::default()
    }

    /// The node a configuration resolves to, created on first use
    pub fn node(&self, config: &NodeConfig) -> Result<Arc<FaultyStore>, StoreError> {
        let descriptor = NodeDescriptor::resolve(config)?;
        Ok(self.node_for_label(descriptor.label()))
    }

    /// Labels of every node created so far
    pub fn labels(&self) -> Vec<String> {
        self.nodes
            .iter()
            .map(|entry| entry.value().label().to_string())
            .collect()
    }

    fn node_for_label(&self, label: &str) -> Arc<FaultyStore> {
        self.nodes
            .entry(label.to_string())
            .or_insert_with(|| {
                debug!(node = %label, "Creating in-memory lock node");
                Arc::new(FaultyStore::new(label, Arc::new(MemoryStore::new())))
            })
            .clone()
    }
}

impl StoreConnector for InMemoryCluster {
    fn connect(&self, node: &NodeDescriptor) -> Result<Arc<dyn LockStore>, StoreError> {
        Ok(self.node_for_label(node.label()))
    }
}
