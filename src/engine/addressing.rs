use crate::common::ids::NodeId;
use crate::engine::node::NodeResourceTable;
use std::ops::Range;

/// Translates per-node core indices into the flat global core numbering
/// used by row bitmaps. Built once from the static node table and injected
/// wherever the translation is needed.
#[derive(Debug, Clone)]
pub struct CoreAddressing {
    // offsets[n] = first global core of node n; offsets[node_count] = total
    offsets: Vec<u32>,
}

impl CoreAddressing {
    pub fn from_table(resources: &NodeResourceTable) -> Self {
        let mut offsets = Vec::with_capacity(resources.len() + 1);
        let mut total = 0u32;
        for record in resources.iter() {
            offsets.push(total);
            total += record.total_cores();
        }
        offsets.push(total);
        CoreAddressing { offsets }
    }

    #[inline]
    pub fn node_count(&self) -> usize {
        self.offsets.len() - 1
    }

    #[inline]
    pub fn offset(&self, node: NodeId) -> u32 {
        self.offsets[usize::from(node)]
    }

    #[inline]
    pub fn node_cores(&self, node: NodeId) -> u32 {
        let idx = usize::from(node);
        self.offsets[idx + 1] - self.offsets[idx]
    }

    /// Global core range `[offset, offset + cores)` of the given node.
    #[inline]
    pub fn node_span(&self, node: NodeId) -> Range<usize> {
        let idx = usize::from(node);
        self.offsets[idx] as usize..self.offsets[idx + 1] as usize
    }

    #[inline]
    pub fn total_cores(&self) -> u32 {
        *self.offsets.last().unwrap_or(&0)
    }
}
