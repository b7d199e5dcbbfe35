use crate::common::ids::NodeId;
use crate::engine::bitmap::{self, CoreBitmap, NodeBitmap};
use crate::engine::job::JobDescriptor;
use crate::engine::node::{NodeSharingState, SharingRequirement};
use crate::engine::plan::JobResourcePlan;
use crate::engine::selector::SelectMode;
use crate::engine::state::SchedulerState;
use bitvec::prelude::BitSlice;
use smallvec::SmallVec;

/// Bit-level feasibility test: given a job and a candidate node set, finds
/// a concrete core placement or reports that none exists. Must not mutate
/// the scheduling state; committing a successful plan is the allocator's
/// business.
///
/// A `None` result is an ordinary negative outcome ("cannot place"), never
/// an error.
pub trait CoreFitTester {
    fn test(
        &self,
        state: &SchedulerState,
        job: &JobDescriptor,
        candidates: &NodeBitmap,
        mode: SelectMode,
    ) -> Option<JobResourcePlan>;
}

/// Default placement strategy: walk candidate nodes in index order, take
/// the lowest free cores of each eligible node, row by row. `TestOnly`
/// ignores current occupancy and answers "could this ever run".
#[derive(Debug, Default)]
pub struct FirstFit;

struct NodePick {
    node: NodeId,
    local_cores: CoreBitmap,
    taken: u32,
}

impl FirstFit {
    /// Free-core masks to try, one per sharing lane. An exclusive job
    /// conflicts with every row at once, so it gets a single union mask.
    fn occupancy_masks(
        state: &SchedulerState,
        job: &JobDescriptor,
        mode: SelectMode,
    ) -> Option<Vec<CoreBitmap>> {
        let total = state.addressing().total_cores() as usize;
        if mode == SelectMode::TestOnly {
            return Some(vec![bitmap::zeroes(total)]);
        }
        let part = match state.partition(job.partition) {
            Some(part) => part,
            None => {
                log::error!(
                    "job {} targets partition {} which has no occupancy data",
                    job.id,
                    job.partition
                );
                return None;
            }
        };
        if job.request.sharing == SharingRequirement::Exclusive {
            Some(vec![part.all_row_cores()])
        } else {
            Some(part.rows().iter().map(|row| row.cores.clone()).collect())
        }
    }

    fn node_eligible(
        state: &SchedulerState,
        job: &JobDescriptor,
        node: NodeId,
        mode: SelectMode,
    ) -> bool {
        let record = match state.resources().get_record(node) {
            Some(record) => record,
            None => return false,
        };
        if mode == SelectMode::TestOnly {
            return job.request.memory_per_node <= record.real_memory;
        }
        let usage = &state.usage[node];
        if usage.sharing_state() == NodeSharingState::Reserved {
            return false;
        }
        if job.request.sharing == SharingRequirement::Exclusive && usage.node_state > 0 {
            return false;
        }
        let headroom = record.real_memory.saturating_sub(usage.allocated_memory);
        job.request.memory_per_node <= headroom
    }

    fn attempt(
        state: &SchedulerState,
        job: &JobDescriptor,
        candidates: &BitSlice,
        occupied: &CoreBitmap,
        mode: SelectMode,
    ) -> Option<JobResourcePlan> {
        let addressing = state.addressing();
        let request = &job.request;
        let exclusive = request.sharing == SharingRequirement::Exclusive;
        let max_nodes = request.max_nodes.max(1) as usize;

        let mut remaining = request.cores;
        let mut picks: Vec<NodePick> = Vec::new();

        for idx in candidates.iter_ones() {
            if idx >= state.node_count() {
                break;
            }
            if picks.len() == max_nodes {
                break;
            }
            let node = NodeId::new(idx as u32);
            if !Self::node_eligible(state, job, node, mode) {
                continue;
            }

            let span = addressing.node_span(node);
            let width = span.len();
            let free: Vec<usize> = span
                .clone()
                .filter(|&core| !occupied[core])
                .map(|core| core - span.start)
                .collect();

            let take = if exclusive {
                // whole node or nothing
                if free.len() != width {
                    continue;
                }
                width as u32
            } else if remaining > 0 {
                (free.len() as u32).min(remaining)
            } else if picks.len() < request.min_nodes as usize && !free.is_empty() {
                // cores satisfied but the node-count floor is not;
                // spread one core onto each extra node
                1
            } else {
                0
            };
            if take == 0 {
                continue;
            }

            let mut local_cores = bitmap::zeroes(width);
            for &core in free.iter().take(take as usize) {
                local_cores.set(core, true);
            }
            picks.push(NodePick {
                node,
                local_cores,
                taken: take,
            });
            remaining = remaining.saturating_sub(take);
            if remaining == 0 && picks.len() >= request.min_nodes as usize {
                break;
            }
        }

        if remaining > 0 || picks.len() < request.min_nodes as usize || picks.is_empty() {
            return None;
        }

        let mut node_bitmap = bitmap::zeroes(state.node_count());
        let mut core_bitmap = CoreBitmap::new();
        let mut cpus: SmallVec<[u32; 8]> = SmallVec::new();
        let mut memory: SmallVec<[u64; 8]> = SmallVec::new();
        for pick in &picks {
            node_bitmap.set(usize::from(pick.node), true);
            core_bitmap.extend_from_bitslice(&pick.local_cores);
            cpus.push(pick.taken);
            memory.push(request.memory_per_node);
        }

        let mut plan = JobResourcePlan::new(
            job.id,
            node_bitmap,
            core_bitmap,
            cpus,
            memory,
            request.sharing,
        );
        plan.gres_request = request.gres.clone();
        Some(plan)
    }
}

impl CoreFitTester for FirstFit {
    fn test(
        &self,
        state: &SchedulerState,
        job: &JobDescriptor,
        candidates: &NodeBitmap,
        mode: SelectMode,
    ) -> Option<JobResourcePlan> {
        let masks = Self::occupancy_masks(state, job, mode)?;
        masks
            .iter()
            .find_map(|occupied| Self::attempt(state, job, candidates, occupied, mode))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::allocator::{AllocMode, Allocator};
    use crate::engine::bitmap::from_indices;
    use crate::engine::gres::NullGres;
    use crate::engine::testing::{pending_job, single_partition_state};
    use std::rc::Rc;

    #[test]
    fn test_basic_placement() {
        let state = single_partition_state(&[4, 4], 1);
        let job = pending_job(1, 6);
        let candidates = from_indices(2, &[0, 1]);

        let plan = FirstFit
            .test(&state, &job, &candidates, SelectMode::RunNow)
            .unwrap();
        assert_eq!(plan.nhosts(), 2);
        assert_eq!(plan.cpus.as_slice(), &[4, 2]);
        assert_eq!(plan.total_cores(), 6);
    }

    #[test]
    fn test_placement_respects_rows() {
        let mut state = single_partition_state(&[4], 1);
        let alloc = Allocator::new(&NullGres);
        let job_a = pending_job(1, 3);
        let candidates = from_indices(1, &[0]);

        let plan_a = Rc::new(
            FirstFit
                .test(&state, &job_a, &candidates, SelectMode::RunNow)
                .unwrap(),
        );
        alloc
            .add_job(&mut state, &plan_a, 0.into(), AllocMode::Full)
            .unwrap();

        // two more cores do not exist, one does
        let job_b = pending_job(2, 2);
        assert!(FirstFit
            .test(&state, &job_b, &candidates, SelectMode::RunNow)
            .is_none());
        let job_c = pending_job(3, 1);
        let plan_c = FirstFit
            .test(&state, &job_c, &candidates, SelectMode::RunNow)
            .unwrap();
        assert_eq!(plan_c.core_bitmap, from_indices(4, &[3]));

        // but the job that cannot run now could run eventually
        assert!(FirstFit
            .test(&state, &job_b, &candidates, SelectMode::TestOnly)
            .is_some());
    }

    #[test]
    fn test_shared_partition_second_row() {
        let mut state = single_partition_state(&[4], 2);
        let alloc = Allocator::new(&NullGres);
        let candidates = from_indices(1, &[0]);

        let job_a = pending_job(1, 4);
        let plan_a = Rc::new(
            FirstFit
                .test(&state, &job_a, &candidates, SelectMode::RunNow)
                .unwrap(),
        );
        alloc
            .add_job(&mut state, &plan_a, 0.into(), AllocMode::Full)
            .unwrap();

        // row 0 is full, the second sharing lane still has room
        let job_b = pending_job(2, 2);
        let plan_b = Rc::new(
            FirstFit
                .test(&state, &job_b, &candidates, SelectMode::RunNow)
                .unwrap(),
        );
        alloc
            .add_job(&mut state, &plan_b, 0.into(), AllocMode::Full)
            .unwrap();
        let part = state.partition(0.into()).unwrap();
        assert_eq!(part.find_job(2.into()), Some(1));
        part.validate(state.addressing());
    }

    #[test]
    fn test_memory_limits_node_choice() {
        let mut state = single_partition_state(&[2, 2], 2);
        state.usage[crate::NodeId::new(0)].allocated_memory = 4096;

        let mut job = pending_job(1, 2);
        job.request.memory_per_node = 1024;
        let candidates = from_indices(2, &[0, 1]);

        let plan = FirstFit
            .test(&state, &job, &candidates, SelectMode::RunNow)
            .unwrap();
        // node 0 has no memory headroom left
        assert_eq!(plan.nodes().collect::<Vec<_>>(), vec![crate::NodeId::new(1)]);
    }

    #[test]
    fn test_exclusive_needs_idle_whole_nodes() {
        let mut state = single_partition_state(&[2, 2], 2);
        let alloc = Allocator::new(&NullGres);
        let candidates = from_indices(2, &[0, 1]);

        let job_a = pending_job(1, 1);
        let plan_a = Rc::new(
            FirstFit
                .test(&state, &job_a, &candidates, SelectMode::RunNow)
                .unwrap(),
        );
        alloc
            .add_job(&mut state, &plan_a, 0.into(), AllocMode::Full)
            .unwrap();

        let mut job_b = pending_job(2, 2);
        job_b.request.sharing = crate::SharingRequirement::Exclusive;
        let plan_b = FirstFit
            .test(&state, &job_b, &candidates, SelectMode::RunNow)
            .unwrap();
        // node 0 is partly busy; the exclusive job takes node 1 whole
        assert_eq!(plan_b.nodes().collect::<Vec<_>>(), vec![crate::NodeId::new(1)]);
        assert_eq!(plan_b.cpus.as_slice(), &[2]);
    }

    #[test]
    fn test_min_nodes_spreads_allocation() {
        let state = single_partition_state(&[4, 4, 4], 1);
        let mut job = pending_job(1, 2);
        job.request.min_nodes = 3;
        let candidates = from_indices(3, &[0, 1, 2]);

        let plan = FirstFit
            .test(&state, &job, &candidates, SelectMode::RunNow)
            .unwrap();
        assert_eq!(plan.nhosts(), 3);

        job.request.max_nodes = 2;
        job.request.min_nodes = 3;
        assert!(FirstFit
            .test(&state, &job, &candidates, SelectMode::RunNow)
            .is_none());
    }
}
