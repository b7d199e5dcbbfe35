use crate::common::ids::PartitionId;
use crate::engine::addressing::CoreAddressing;
use crate::engine::node::{
    build_node_resources, fresh_usage_table, NodeResourceRecord, NodeResourceTable, NodeUsageTable,
};
use crate::engine::row::PartitionOccupancy;
use crate::Map;
use std::rc::Rc;

/// Partition definition supplied by the configuration loader. `num_rows`
/// derives from the partition's max-share; it is clamped to at least one.
#[derive(Clone, Debug)]
pub struct PartitionConfig {
    pub id: PartitionId,
    pub num_rows: usize,
}

/// All mutable scheduling state, passed explicitly into every engine call.
/// The caller serializes access under its own job/node locks; the engine
/// itself never locks.
///
/// `snapshot()` forks the mutable parts for what-if exploration: usage
/// records and rows are cloned structurally while job plans and GRES
/// handles stay shared by `Rc`. A snapshot is an ordinary value; dropping
/// it cannot free anything the live state still references.
#[derive(Clone, Debug)]
pub struct SchedulerState {
    resources: Rc<NodeResourceTable>,
    addressing: Rc<CoreAddressing>,
    pub usage: NodeUsageTable,
    pub partitions: Map<PartitionId, PartitionOccupancy>,
}

impl SchedulerState {
    pub fn new(
        records: Vec<NodeResourceRecord>,
        partitions: &[PartitionConfig],
    ) -> crate::Result<Self> {
        let resources = build_node_resources(records)?;
        let addressing = CoreAddressing::from_table(&resources);
        let total_cores = addressing.total_cores() as usize;
        let usage = fresh_usage_table(resources.len());
        let partitions = partitions
            .iter()
            .map(|config| {
                (
                    config.id,
                    PartitionOccupancy::new(config.id, config.num_rows, total_cores),
                )
            })
            .collect();
        Ok(SchedulerState {
            resources: Rc::new(resources),
            addressing: Rc::new(addressing),
            usage,
            partitions,
        })
    }

    #[inline]
    pub fn resources(&self) -> &NodeResourceTable {
        &self.resources
    }

    #[inline]
    pub fn addressing(&self) -> &CoreAddressing {
        &self.addressing
    }

    pub(crate) fn addressing_handle(&self) -> Rc<CoreAddressing> {
        self.addressing.clone()
    }

    #[inline]
    pub fn node_count(&self) -> usize {
        self.resources.len()
    }

    pub fn partition(&self, id: PartitionId) -> Option<&PartitionOccupancy> {
        self.partitions.get(&id)
    }

    pub fn partition_mut(&mut self, id: PartitionId) -> Option<&mut PartitionOccupancy> {
        self.partitions.get_mut(&id)
    }

    /// Forks the mutable state for a single planning call.
    pub fn snapshot(&self) -> SchedulerState {
        self.clone()
    }
}
