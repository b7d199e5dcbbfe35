pub mod addressing;
pub mod allocator;
pub mod bitmap;
pub mod fit;
pub mod gres;
pub mod job;
pub mod node;
pub mod packer;
pub mod plan;
pub mod planner;
pub mod row;
pub mod selector;
pub mod state;

#[cfg(test)]
pub(crate) mod testing;
