use crate::common::ids::PartitionId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SelectError {
    /// A partition referenced by a job has no occupancy record.
    /// Reported, not fatal; other partitions keep working.
    #[error("partition {0} has no occupancy data")]
    NoPartitionData(PartitionId),
    /// Node or partition descriptors rejected at (re)initialization.
    /// The only error family a caller may treat as fatal, and only at
    /// process start.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
