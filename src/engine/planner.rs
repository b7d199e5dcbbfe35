use crate::common::ids::JobId;
use crate::engine::allocator::{AllocMode, Allocator};
use crate::engine::bitmap::{self, NodeBitmap};
use crate::engine::fit::CoreFitTester;
use crate::engine::gres::NullGres;
use crate::engine::job::JobDescriptor;
use crate::engine::plan::JobResourcePlan;
use crate::engine::selector::SelectMode;
use crate::engine::state::SchedulerState;
use crate::Set;
use std::cmp::Reverse;
use std::rc::Rc;

/// Result of an immediate-allocation attempt. `preemptees` lists the jobs
/// whose removal the placement depends on; the caller sends the actual
/// cancel/requeue signals and then commits the plan.
#[derive(Debug)]
pub struct RunNowOutcome {
    pub plan: Rc<JobResourcePlan>,
    pub preemptees: Vec<JobId>,
}

/// Predicted start of a job that cannot run yet. `start_time == now` means
/// it could start immediately once the listed preemptions happen.
#[derive(Debug)]
pub struct WillRunEstimate {
    pub start_time: u64,
    pub plan: Rc<JobResourcePlan>,
    pub preemptees: Vec<JobId>,
}

fn plan_of(job: &JobDescriptor) -> Option<&Rc<JobResourcePlan>> {
    match &job.plan {
        Some(plan) => Some(plan),
        None => {
            log::error!("active job {} has no resource plan", job.id);
            None
        }
    }
}

fn overlapping_ids(removed: &[&JobDescriptor], plan: &JobResourcePlan) -> Vec<JobId> {
    removed
        .iter()
        .filter(|job| {
            job.plan
                .as_ref()
                .map(|other| bitmap::overlap_count(&plan.node_bitmap, &other.node_bitmap) > 0)
                .unwrap_or(false)
        })
        .map(|job| job.id)
        .collect()
}

/// Tries to place the job right now, simulating preemptions on a snapshot
/// when the live state has no room. All mutation happens on the snapshot;
/// failure leaves no trace and simply means "cannot run now".
pub fn run_now(
    state: &SchedulerState,
    fit: &dyn CoreFitTester,
    job: &JobDescriptor,
    candidates: &NodeBitmap,
    preempt_candidates: &[&JobDescriptor],
) -> Option<RunNowOutcome> {
    if let Some(plan) = fit.test(state, job, candidates, SelectMode::RunNow) {
        return Some(RunNowOutcome {
            plan: Rc::new(plan),
            preemptees: Vec::new(),
        });
    }

    let mut order: Vec<&JobDescriptor> = preempt_candidates
        .iter()
        .copied()
        .filter(|candidate| {
            candidate.is_active()
                && candidate.preempt_mode.releases_resources()
                && candidate.plan.is_some()
        })
        .collect();
    if order.is_empty() {
        return None;
    }

    // snapshots fork cores and memory but share the device handles, so
    // simulated removals must stay off the GRES books
    let alloc = Allocator::new(&NullGres);
    let mut pass = 0;
    loop {
        let mut snapshot = state.snapshot();
        let mut removed: Vec<&JobDescriptor> = Vec::new();
        let mut found: Option<JobResourcePlan> = None;
        for candidate in order.iter().copied() {
            let Some(plan) = plan_of(candidate) else {
                continue;
            };
            if let Err(e) =
                alloc.remove_job(&mut snapshot, plan, candidate.partition, AllocMode::Full)
            {
                log::error!(
                    "cannot remove job {} in preemption simulation: {}",
                    candidate.id,
                    e
                );
            }
            removed.push(candidate);
            if let Some(plan) = fit.test(&snapshot, job, candidates, SelectMode::RunNow) {
                found = Some(plan);
                break;
            }
        }

        // removing every candidate did not help: a normal negative outcome
        let plan = found?;

        if pass > 0 || order.len() == 1 {
            let preemptees = overlapping_ids(&removed, &plan);
            return Some(RunNowOutcome {
                plan: Rc::new(plan),
                preemptees,
            });
        }

        // reorder candidates by how much of the chosen node set they
        // actually cover, then retry once from scratch
        order.sort_by_key(|candidate| {
            Reverse(
                candidate
                    .plan
                    .as_ref()
                    .map(|other| bitmap::overlap_count(&plan.node_bitmap, &other.node_bitmap))
                    .unwrap_or(0),
            )
        });
        pass += 1;
    }
}

/// Predicts when the job could start by simulating preemptions and then
/// job completions in end-time order on a snapshot.
#[allow(clippy::too_many_arguments)]
pub fn will_run(
    state: &SchedulerState,
    fit: &dyn CoreFitTester,
    job: &JobDescriptor,
    candidates: &NodeBitmap,
    active_jobs: &[&JobDescriptor],
    preemptable: &Set<JobId>,
    now: u64,
    immediate_only: bool,
) -> Option<WillRunEstimate> {
    if let Some(plan) = fit.test(state, job, candidates, SelectMode::WillRun) {
        return Some(WillRunEstimate {
            start_time: now,
            plan: Rc::new(plan),
            preemptees: Vec::new(),
        });
    }
    if immediate_only {
        return None;
    }

    // same rule as run_now: the snapshot shares GRES handles, so the
    // what-if removals use a no-op device allocator
    let alloc = Allocator::new(&NullGres);
    let mut snapshot = state.snapshot();
    let mut preempted: Vec<&JobDescriptor> = Vec::new();
    let mut waiting: Vec<&JobDescriptor> = Vec::new();

    for active in active_jobs.iter().copied() {
        if active.id == job.id || !active.is_active() {
            continue;
        }
        let Some(plan) = plan_of(active) else {
            continue;
        };
        if preemptable.contains(&active.id) && active.preempt_mode.releases_resources() {
            if let Err(e) = alloc.remove_job(&mut snapshot, plan, active.partition, AllocMode::Full)
            {
                log::error!(
                    "cannot remove job {} in will-run simulation: {}",
                    active.id,
                    e
                );
            }
            preempted.push(active);
        } else {
            waiting.push(active);
        }
    }

    if !preempted.is_empty() {
        if let Some(plan) = fit.test(&snapshot, job, candidates, SelectMode::WillRun) {
            let preemptees = overlapping_ids(&preempted, &plan);
            return Some(WillRunEstimate {
                start_time: now,
                plan: Rc::new(plan),
                preemptees,
            });
        }
    }

    // discrete-event simulation: release the remaining jobs in completion
    // order until the pending job fits
    waiting.sort_by_key(|job| job.end_time);
    for finishing in waiting {
        let Some(plan) = plan_of(finishing) else {
            continue;
        };
        if !bitmap::overlaps(&plan.node_bitmap, candidates) {
            continue;
        }
        if let Err(e) = alloc.remove_job(&mut snapshot, plan, finishing.partition, AllocMode::Full)
        {
            log::error!(
                "cannot release job {} in will-run simulation: {}",
                finishing.id,
                e
            );
        }
        if let Some(plan) = fit.test(&snapshot, job, candidates, SelectMode::WillRun) {
            let preemptees = overlapping_ids(&preempted, &plan);
            return Some(WillRunEstimate {
                start_time: finishing.end_time.max(now + 1),
                plan: Rc::new(plan),
                preemptees,
            });
        }
    }
    None
}
