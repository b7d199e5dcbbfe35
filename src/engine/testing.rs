//! Shared builders for the engine's unit tests.

use crate::common::ids::{JobId, NodeId};
use crate::engine::addressing::CoreAddressing;
use crate::engine::bitmap::from_indices;
use crate::engine::job::{JobDescriptor, JobState, PreemptMode, ResourceRequest};
use crate::engine::node::{build_node_resources, NodeResourceRecord, NodeResourceTable};
use crate::engine::plan::JobResourcePlan;
use crate::engine::state::{PartitionConfig, SchedulerState};
use crate::SharingRequirement;
use smallvec::smallvec;

/// Routes engine logs into the test harness output, so the error logs of
/// drift/fallback paths show up next to the failing assertion.
pub fn init_test_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn node_records(widths: &[u32]) -> Vec<NodeResourceRecord> {
    widths
        .iter()
        .map(|&cores| NodeResourceRecord {
            cores: cores as u16,
            sockets: 1,
            threads: 1,
            real_memory: 4096,
        })
        .collect()
}

pub fn node_table(widths: &[u32]) -> NodeResourceTable {
    build_node_resources(node_records(widths)).unwrap()
}

pub fn addressing(table: &NodeResourceTable) -> CoreAddressing {
    CoreAddressing::from_table(table)
}

/// State with one partition (id 0) spanning all nodes.
pub fn single_partition_state(widths: &[u32], num_rows: usize) -> SchedulerState {
    SchedulerState::new(
        node_records(widths),
        &[PartitionConfig {
            id: 0.into(),
            num_rows,
        }],
    )
    .unwrap()
}

/// Plan holding the given local cores of a single node.
pub fn plan_on_node(
    job: JobId,
    node: NodeId,
    node_width: usize,
    cores: &[usize],
) -> JobResourcePlan {
    JobResourcePlan::new(
        job,
        from_indices(usize::from(node) + 1, &[usize::from(node)]),
        from_indices(node_width, cores),
        smallvec![cores.len() as u32],
        smallvec![0],
        SharingRequirement::Shareable,
    )
}

/// Single-node plan on node 0.
pub fn plan_with_cores(job: JobId, node_width: usize, cores: &[usize]) -> JobResourcePlan {
    plan_on_node(job, 0.into(), node_width, cores)
}

pub fn pending_job(id: u32, cores: u32) -> JobDescriptor {
    JobDescriptor {
        id: id.into(),
        partition: 0.into(),
        state: JobState::Pending,
        end_time: 0,
        preempt_mode: PreemptMode::Off,
        request: ResourceRequest::simple(cores),
        plan: None,
    }
}
