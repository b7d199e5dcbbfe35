use crate::common::ids::PartitionId;
use crate::engine::gres::GresAllocator;
use crate::engine::packer;
use crate::engine::plan::JobResourcePlan;
use crate::engine::state::SchedulerState;
use crate::Error;
use std::rc::Rc;

/// Which half of the accounting an add/remove touches. Suspension releases
/// memory while keeping the core reservation, resumption does the inverse,
/// so each half must be addressable on its own.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum AllocMode {
    Full,
    CoresOnly,
    MemoryOnly,
}

impl AllocMode {
    #[inline]
    fn touches_memory(self) -> bool {
        self != AllocMode::CoresOnly
    }

    #[inline]
    fn touches_cores(self) -> bool {
        self != AllocMode::MemoryOnly
    }
}

/// Commits and releases job resource plans against the usage table and
/// partition rows. Works equally on live state and on snapshots; the
/// planners rely on that to simulate removals.
pub struct Allocator<'a> {
    gres: &'a dyn GresAllocator,
}

impl<'a> Allocator<'a> {
    pub fn new(gres: &'a dyn GresAllocator) -> Self {
        Allocator { gres }
    }

    pub fn add_job(
        &self,
        state: &mut SchedulerState,
        plan: &Rc<JobResourcePlan>,
        partition: PartitionId,
        mode: AllocMode,
    ) -> crate::Result<()> {
        let addressing = state.addressing_handle();
        for (position, node) in plan.nodes().enumerate() {
            let Some(record) = state.resources().get_record(node).cloned() else {
                log::error!(
                    "job {} allocated to node {} which has no resource record",
                    plan.job_id,
                    node
                );
                continue;
            };
            self.gres.reserve(node, &state.usage[node].gres, plan);
            if mode.touches_memory() {
                let amount = plan.memory_allocated[position];
                state.usage[node].add_memory(node, amount, record.real_memory);
            }
        }

        if mode.touches_cores() {
            let global = plan.global_cores(&addressing);
            let part = state
                .partition_mut(partition)
                .ok_or(Error::NoPartitionData(partition))?;
            let row_idx = match part.rows.iter().position(|row| row.can_fit(&global)) {
                Some(idx) => idx,
                None => {
                    // never lose a job: overcommit the last row instead
                    log::error!(
                        "job {} does not fit into any row of partition {}, forcing into the last row",
                        plan.job_id,
                        partition
                    );
                    part.rows.len() - 1
                }
            };
            part.rows[row_idx].insert(plan.clone(), &global);
            let weight = plan.node_req.weight();
            for node in plan.nodes() {
                if let Some(usage) = state.usage.get_record_mut(node) {
                    usage.add_sharing(weight);
                }
            }
        }
        Ok(())
    }

    pub fn remove_job(
        &self,
        state: &mut SchedulerState,
        plan: &Rc<JobResourcePlan>,
        partition: PartitionId,
        mode: AllocMode,
    ) -> crate::Result<()> {
        let addressing = state.addressing_handle();
        for (position, node) in plan.nodes().enumerate() {
            if state.usage.get_record(node).is_none() {
                log::error!(
                    "job {} releases node {} which has no usage record",
                    plan.job_id,
                    node
                );
                continue;
            }
            self.gres.release(node, &state.usage[node].gres, plan);
            if mode.touches_memory() {
                let amount = plan.memory_allocated[position];
                state.usage[node].remove_memory(node, amount);
            }
        }

        if mode.touches_cores() {
            let part = state
                .partition_mut(partition)
                .ok_or(Error::NoPartitionData(partition))?;
            let mut found = false;
            for row in part.rows.iter_mut() {
                if row.take(plan.job_id).is_some() {
                    found = true;
                    break;
                }
            }
            if !found {
                log::error!(
                    "job {} not found in any row of partition {} during removal",
                    plan.job_id,
                    partition
                );
            }
            packer::rebuild_rows(part, &addressing, Some(plan.as_ref()));
            let weight = plan.node_req.weight();
            for node in plan.nodes() {
                if let Some(usage) = state.usage.get_record_mut(node) {
                    usage.remove_sharing(node, weight);
                }
            }
        }
        Ok(())
    }
}
