use crate::common::ids::{JobId, NodeId};
use crate::engine::addressing::CoreAddressing;
use crate::engine::bitmap::{self, CoreBitmap, NodeBitmap};
use crate::engine::gres::GresRequest;
use crate::engine::node::SharingRequirement;
use smallvec::SmallVec;

/// Concrete allocation result for one job: which nodes, which cores on
/// those nodes, and how much memory per node.
///
/// `core_bitmap` is local to the allocated nodes: it is the concatenation
/// of one node-width slice per allocated node, in ascending node order.
/// `global_cores` expands it to the flat cluster-wide numbering. Plans are
/// shared by `Rc` between the job record, partition rows and simulation
/// snapshots; nothing clones them by value.
#[derive(Clone, Debug)]
pub struct JobResourcePlan {
    pub job_id: JobId,
    pub node_bitmap: NodeBitmap,
    pub core_bitmap: CoreBitmap,
    /// Cores allocated on each node, indexed by position among the
    /// allocated nodes.
    pub cpus: SmallVec<[u32; 8]>,
    pub memory_allocated: SmallVec<[u64; 8]>,
    pub node_req: SharingRequirement,
    pub gres_request: Vec<GresRequest>,
}

impl JobResourcePlan {
    pub fn new(
        job_id: JobId,
        node_bitmap: NodeBitmap,
        core_bitmap: CoreBitmap,
        cpus: SmallVec<[u32; 8]>,
        memory_allocated: SmallVec<[u64; 8]>,
        node_req: SharingRequirement,
    ) -> Self {
        debug_assert_eq!(node_bitmap.count_ones(), cpus.len());
        debug_assert_eq!(cpus.len(), memory_allocated.len());
        JobResourcePlan {
            job_id,
            node_bitmap,
            core_bitmap,
            cpus,
            memory_allocated,
            node_req,
            gres_request: Vec::new(),
        }
    }

    #[inline]
    pub fn nhosts(&self) -> usize {
        self.cpus.len()
    }

    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.node_bitmap
            .iter_ones()
            .map(|idx| NodeId::new(idx as u32))
    }

    /// Position of `node` among the allocated nodes, usable to index
    /// `cpus`/`memory_allocated`.
    pub fn node_position(&self, node: NodeId) -> Option<usize> {
        self.nodes().position(|n| n == node)
    }

    /// Expands the node-local core bitmap into the flat global numbering.
    pub fn global_cores(&self, addressing: &CoreAddressing) -> CoreBitmap {
        let mut global = bitmap::zeroes(addressing.total_cores() as usize);
        let mut local = 0usize;
        for node in self.nodes() {
            let width = addressing.node_cores(node) as usize;
            let offset = addressing.offset(node) as usize;
            for i in 0..width {
                if self
                    .core_bitmap
                    .get(local + i)
                    .map(|bit| *bit)
                    .unwrap_or(false)
                {
                    global.set(offset + i, true);
                }
            }
            local += width;
        }
        global
    }

    pub fn first_global_core(&self, addressing: &CoreAddressing) -> Option<usize> {
        let mut local = 0usize;
        for node in self.nodes() {
            let width = addressing.node_cores(node) as usize;
            let offset = addressing.offset(node) as usize;
            for i in 0..width {
                if self
                    .core_bitmap
                    .get(local + i)
                    .map(|bit| *bit)
                    .unwrap_or(false)
                {
                    return Some(offset + i);
                }
            }
            local += width;
        }
        None
    }

    pub fn total_cores(&self) -> u32 {
        self.core_bitmap.count_ones() as u32
    }
}
