#[macro_use]
pub mod common;

pub mod engine;

pub use crate::common::data_structures::{Map, Set};
pub use crate::common::ids::{JobId, NodeId, PartitionId};
pub use crate::common::index::IndexVec;
pub use crate::common::wrapped::WrappedRcRefCell;

pub use crate::engine::addressing::CoreAddressing;
pub use crate::engine::allocator::{AllocMode, Allocator};
pub use crate::engine::fit::{CoreFitTester, FirstFit};
pub use crate::engine::gres::{GresAllocator, NullGres};
pub use crate::engine::job::{JobDescriptor, JobState, PreemptMode, ResourceRequest};
pub use crate::engine::node::{
    NodeResourceRecord, NodeResourceTable, NodeUsageRecord, NodeUsageTable, SharingRequirement,
};
pub use crate::engine::plan::JobResourcePlan;
pub use crate::engine::row::{PartitionOccupancy, Row};
pub use crate::engine::selector::{
    ConsumableResources, JobTestOutcome, PlanningContext, ResourceSelector, SelectMode,
};
pub use crate::engine::state::{PartitionConfig, SchedulerState};

pub type Error = common::error::SelectError;
pub type Result<T> = std::result::Result<T, Error>;
