use crate::common::ids::NodeId;
use crate::common::index::IndexVec;
use crate::engine::gres::GresHandle;
use crate::Error;
use serde::{Deserialize, Serialize};

/// Additive `node_state` contribution of an exclusively-held node. Any
/// value at or above this marks the node as reserved regardless of how
/// many sharing jobs also sit on it.
pub const EXCLUSIVE_WEIGHT: u32 = 1 << 16;

/// Sharing classification a job imposes on every node it is allocated.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub enum SharingRequirement {
    /// The job tolerates any number of sharing lanes.
    #[default]
    Shareable,
    /// The job tolerates sharing only within a single row.
    OneRow,
    /// The job requires its nodes whole.
    Exclusive,
}

impl SharingRequirement {
    #[inline]
    pub fn weight(self) -> u32 {
        match self {
            SharingRequirement::Shareable => 0,
            SharingRequirement::OneRow => 1,
            SharingRequirement::Exclusive => EXCLUSIVE_WEIGHT,
        }
    }
}

/// Classification of a node derived from its summed sharing counter.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum NodeSharingState {
    Free,
    OneRow,
    Reserved,
}

/// Static per-node hardware capacity. Read-only after initialization.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct NodeResourceRecord {
    pub cores: u16,
    pub sockets: u16,
    pub threads: u16,
    pub real_memory: u64,
}

impl NodeResourceRecord {
    #[inline]
    pub fn total_cores(&self) -> u32 {
        self.cores as u32 * self.sockets as u32
    }
}

pub type NodeResourceTable = IndexVec<NodeId, NodeResourceRecord>;

/// Builds the static table, rejecting nodes that would have no schedulable
/// cores.
pub fn build_node_resources(records: Vec<NodeResourceRecord>) -> crate::Result<NodeResourceTable> {
    for (idx, record) in records.iter().enumerate() {
        if record.total_cores() == 0 {
            return Err(Error::InvalidConfig(format!(
                "node {idx} has cores*sockets == 0"
            )));
        }
    }
    Ok(records.into())
}

/// Mutable per-node state maintained by the allocator. Cloning a record
/// clones the GRES handle, never the GRES state behind it.
#[derive(Clone, Debug, Default)]
pub struct NodeUsageRecord {
    pub allocated_memory: u64,
    /// Sum of the sharing-level weights of all jobs assigned to this node.
    pub node_state: u32,
    pub gres: GresHandle,
}

impl NodeUsageRecord {
    #[inline]
    pub fn sharing_state(&self) -> NodeSharingState {
        if self.node_state >= EXCLUSIVE_WEIGHT {
            NodeSharingState::Reserved
        } else if self.node_state > 0 {
            NodeSharingState::OneRow
        } else {
            NodeSharingState::Free
        }
    }

    pub fn add_memory(&mut self, node: NodeId, amount: u64, real_memory: u64) {
        self.allocated_memory += amount;
        if self.allocated_memory > real_memory {
            log::error!(
                "node {} memory overcommitted: {} allocated of {}",
                node,
                self.allocated_memory,
                real_memory
            );
        }
    }

    pub fn remove_memory(&mut self, node: NodeId, amount: u64) {
        if self.allocated_memory < amount {
            log::error!(
                "node {} memory underflow: releasing {} of {}",
                node,
                amount,
                self.allocated_memory
            );
            self.allocated_memory = 0;
        } else {
            self.allocated_memory -= amount;
        }
    }

    pub fn add_sharing(&mut self, weight: u32) {
        self.node_state += weight;
    }

    pub fn remove_sharing(&mut self, node: NodeId, weight: u32) {
        if self.node_state < weight {
            log::error!(
                "node {} sharing counter underflow: removing {} of {}",
                node,
                weight,
                self.node_state
            );
            self.node_state = 0;
        } else {
            self.node_state -= weight;
        }
    }
}

pub type NodeUsageTable = IndexVec<NodeId, NodeUsageRecord>;

pub fn fresh_usage_table(node_count: usize) -> NodeUsageTable {
    (0..node_count)
        .map(|_| NodeUsageRecord::default())
        .collect::<Vec<_>>()
        .into()
}
