use crate::common::ids::JobId;
use crate::engine::allocator::{AllocMode, Allocator};
use crate::engine::bitmap::NodeBitmap;
use crate::engine::fit::{CoreFitTester, FirstFit};
use crate::engine::gres::{GresAllocator, NullGres};
use crate::engine::job::{JobDescriptor, JobState};
use crate::engine::node::NodeResourceRecord;
use crate::engine::plan::JobResourcePlan;
use crate::engine::planner;
use crate::engine::state::{PartitionConfig, SchedulerState};
use crate::{Error, Set};
use std::rc::Rc;

/// What the scheduler core is asking for.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SelectMode {
    /// "Can this job ever run" against bare hardware capacity.
    TestOnly,
    /// Place the job immediately, preempting if allowed and needed.
    RunNow,
    /// Predict when the job will be able to start.
    WillRun,
}

/// Caller-supplied surroundings of a single planning call.
pub struct PlanningContext<'a> {
    /// All currently running/suspended jobs, with their plans attached.
    pub active_jobs: &'a [&'a JobDescriptor],
    /// Jobs the caller is willing to preempt for this request.
    pub preemptable: &'a Set<JobId>,
    /// Current time, seconds.
    pub now: u64,
    /// Restrict `WillRun` to an immediate-fit check with no simulation.
    pub immediate_only: bool,
}

#[derive(Debug)]
pub struct JobTestOutcome {
    pub plan: Rc<JobResourcePlan>,
    pub start_time: u64,
    pub preemptees: Vec<JobId>,
}

/// Node/core selection strategy, fixed at configuration time. A `None`
/// outcome from `job_test` is the ordinary "does not fit (yet)" answer.
pub trait ResourceSelector {
    fn job_test(
        &self,
        state: &SchedulerState,
        job: &JobDescriptor,
        candidates: &NodeBitmap,
        mode: SelectMode,
        ctx: &PlanningContext,
    ) -> Option<JobTestOutcome>;

    /// Rebuilds all scheduling state from a fresh configuration and
    /// replays the allocations of every job that survived it.
    fn reinitialize(
        &self,
        records: Vec<NodeResourceRecord>,
        partitions: &[PartitionConfig],
        jobs: &[&JobDescriptor],
    ) -> crate::Result<SchedulerState>;
}

/// The consumable-resources strategy: cores and memory are counted
/// resources, sharing happens through partition rows.
pub struct ConsumableResources {
    fit: Box<dyn CoreFitTester>,
    gres: Box<dyn GresAllocator>,
}

impl ConsumableResources {
    pub fn new(fit: Box<dyn CoreFitTester>, gres: Box<dyn GresAllocator>) -> Self {
        ConsumableResources { fit, gres }
    }

    pub fn allocator(&self) -> Allocator {
        Allocator::new(self.gres.as_ref())
    }
}

impl Default for ConsumableResources {
    fn default() -> Self {
        ConsumableResources::new(Box::new(FirstFit), Box::new(NullGres))
    }
}

impl ResourceSelector for ConsumableResources {
    fn job_test(
        &self,
        state: &SchedulerState,
        job: &JobDescriptor,
        candidates: &NodeBitmap,
        mode: SelectMode,
        ctx: &PlanningContext,
    ) -> Option<JobTestOutcome> {
        match mode {
            SelectMode::TestOnly => self
                .fit
                .test(state, job, candidates, SelectMode::TestOnly)
                .map(|plan| JobTestOutcome {
                    plan: Rc::new(plan),
                    start_time: ctx.now,
                    preemptees: Vec::new(),
                }),
            SelectMode::RunNow => {
                let preempt_candidates: Vec<&JobDescriptor> = ctx
                    .active_jobs
                    .iter()
                    .copied()
                    .filter(|candidate| ctx.preemptable.contains(&candidate.id))
                    .collect();
                planner::run_now(
                    state,
                    self.fit.as_ref(),
                    job,
                    candidates,
                    &preempt_candidates,
                )
                .map(|outcome| JobTestOutcome {
                    plan: outcome.plan,
                    start_time: ctx.now,
                    preemptees: outcome.preemptees,
                })
            }
            SelectMode::WillRun => planner::will_run(
                state,
                self.fit.as_ref(),
                job,
                candidates,
                ctx.active_jobs,
                ctx.preemptable,
                ctx.now,
                ctx.immediate_only,
            )
            .map(|estimate| JobTestOutcome {
                plan: estimate.plan,
                start_time: estimate.start_time,
                preemptees: estimate.preemptees,
            }),
        }
    }

    fn reinitialize(
        &self,
        records: Vec<NodeResourceRecord>,
        partitions: &[PartitionConfig],
        jobs: &[&JobDescriptor],
    ) -> crate::Result<SchedulerState> {
        let mut state = SchedulerState::new(records, partitions)?;
        let alloc = self.allocator();
        for job in jobs.iter().copied() {
            let mode = match job.state {
                JobState::Running => AllocMode::Full,
                // suspension released memory, the cores stayed reserved
                JobState::Suspended => AllocMode::CoresOnly,
                JobState::Pending => continue,
            };
            let Some(plan) = &job.plan else {
                log::error!("job {} survived reconfiguration without a plan", job.id);
                continue;
            };
            if plan
                .nodes()
                .any(|node| usize::from(node) >= state.node_count())
            {
                return Err(Error::InvalidConfig(format!(
                    "job {} references nodes beyond the new node table",
                    job.id
                )));
            }
            alloc.add_job(&mut state, plan, job.partition, mode)?;
        }
        Ok(state)
    }
}
