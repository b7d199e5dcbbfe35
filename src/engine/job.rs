use crate::common::ids::{JobId, PartitionId};
use crate::engine::gres::GresRequest;
use crate::engine::node::SharingRequirement;
use crate::engine::plan::JobResourcePlan;
use std::rc::Rc;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum JobState {
    Pending,
    Running,
    Suspended,
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum PreemptMode {
    #[default]
    Off,
    Suspend,
    Requeue,
    Checkpoint,
    Cancel,
}

impl PreemptMode {
    /// Whether preempting the job frees its allocation. Suspension keeps
    /// the core reservation, so it cannot make room for another job.
    #[inline]
    pub fn releases_resources(self) -> bool {
        matches!(
            self,
            PreemptMode::Requeue | PreemptMode::Checkpoint | PreemptMode::Cancel
        )
    }
}

/// What a pending job asks for. Node counts bound the placement search;
/// `cores` is the total core demand across all selected nodes.
#[derive(Clone, Debug)]
pub struct ResourceRequest {
    pub cores: u32,
    pub min_nodes: u32,
    pub max_nodes: u32,
    pub memory_per_node: u64,
    pub sharing: SharingRequirement,
    pub gres: Vec<GresRequest>,
}

impl ResourceRequest {
    pub fn simple(cores: u32) -> Self {
        ResourceRequest {
            cores,
            min_nodes: 1,
            max_nodes: u32::MAX,
            memory_per_node: 0,
            sharing: SharingRequirement::default(),
            gres: Vec::new(),
        }
    }
}

/// Engine-side view of a job record. The scheduler core owns the real job
/// object; this carries exactly what planning and accounting need.
#[derive(Clone, Debug)]
pub struct JobDescriptor {
    pub id: JobId,
    pub partition: PartitionId,
    pub state: JobState,
    /// Absolute expected completion time, seconds. Meaningful for
    /// running/suspended jobs only.
    pub end_time: u64,
    pub preempt_mode: PreemptMode,
    pub request: ResourceRequest,
    pub plan: Option<Rc<JobResourcePlan>>,
}

impl JobDescriptor {
    #[inline]
    pub fn is_active(&self) -> bool {
        matches!(self.state, JobState::Running | JobState::Suspended)
    }
}
