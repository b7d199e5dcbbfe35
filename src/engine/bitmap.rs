use bitvec::prelude::*;

/// One bit per core across all nodes of the cluster, in the flat global
/// numbering defined by `CoreAddressing`.
pub type CoreBitmap = BitVec;

/// One bit per node.
pub type NodeBitmap = BitVec;

#[inline]
pub fn zeroes(len: usize) -> BitVec {
    bitvec![0; len]
}

pub fn from_indices(len: usize, indices: &[usize]) -> BitVec {
    let mut bits = zeroes(len);
    for &i in indices {
        bits.set(i, true);
    }
    bits
}

/// True when `a` and `b` share at least one set bit.
pub fn overlaps(a: &BitSlice, b: &BitSlice) -> bool {
    a.iter_ones().any(|i| b.get(i).map(|bit| *bit).unwrap_or(false))
}

/// Number of bits set in both `a` and `b`.
pub fn overlap_count(a: &BitSlice, b: &BitSlice) -> usize {
    a.iter_ones()
        .filter(|&i| b.get(i).map(|bit| *bit).unwrap_or(false))
        .count()
}

pub fn union_into(dst: &mut BitSlice, src: &BitSlice) {
    for i in src.iter_ones() {
        dst.set(i, true);
    }
}

pub fn subtract_into(dst: &mut BitSlice, src: &BitSlice) {
    for i in src.iter_ones() {
        if i >= dst.len() {
            break;
        }
        dst.set(i, false);
    }
}
