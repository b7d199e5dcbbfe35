use crate::common::ids::{JobId, PartitionId};
use crate::engine::bitmap::{self, CoreBitmap};
use crate::engine::plan::JobResourcePlan;
use bitvec::prelude::BitSlice;
use std::rc::Rc;

/// One sharing lane of a partition: a flat global core bitmap plus the
/// jobs packed into it. Jobs in the same row never overlap in cores.
#[derive(Clone, Debug)]
pub struct Row {
    pub cores: CoreBitmap,
    jobs: Vec<Rc<JobResourcePlan>>,
}

impl Row {
    pub fn empty(total_cores: usize) -> Self {
        Row {
            cores: bitmap::zeroes(total_cores),
            jobs: Vec::new(),
        }
    }

    #[inline]
    pub fn can_fit(&self, cores: &BitSlice) -> bool {
        !bitmap::overlaps(cores, &self.cores)
    }

    pub fn insert(&mut self, plan: Rc<JobResourcePlan>, global_cores: &BitSlice) {
        bitmap::union_into(&mut self.cores, global_cores);
        self.jobs.push(plan);
    }

    /// Removes the job from this row's member list. The bitmap is left to
    /// the row packer, which rebuilds it from the survivors.
    pub fn take(&mut self, job: JobId) -> Option<Rc<JobResourcePlan>> {
        let idx = self.jobs.iter().position(|plan| plan.job_id == job)?;
        Some(self.jobs.remove(idx))
    }

    #[inline]
    pub fn jobs(&self) -> &[Rc<JobResourcePlan>] {
        &self.jobs
    }

    #[inline]
    pub fn occupied(&self) -> usize {
        self.cores.count_ones()
    }

    pub fn clear(&mut self) {
        self.cores.fill(false);
        self.jobs.clear();
    }
}

/// Per-partition occupancy: `num_rows` parallel lanes. One row means an
/// exclusive partition, more rows mean oversubscription up to the
/// partition's configured max-share.
#[derive(Clone, Debug)]
pub struct PartitionOccupancy {
    pub partition: PartitionId,
    pub(crate) rows: Vec<Row>,
}

impl PartitionOccupancy {
    pub fn new(partition: PartitionId, num_rows: usize, total_cores: usize) -> Self {
        let num_rows = num_rows.max(1);
        PartitionOccupancy {
            partition,
            rows: (0..num_rows).map(|_| Row::empty(total_cores)).collect(),
        }
    }

    #[inline]
    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    #[inline]
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn job_count(&self) -> usize {
        self.rows.iter().map(|row| row.jobs.len()).sum()
    }

    /// Row index holding the given job, if any.
    pub fn find_job(&self, job: JobId) -> Option<usize> {
        self.rows
            .iter()
            .position(|row| row.jobs.iter().any(|plan| plan.job_id == job))
    }

    /// Union of all row bitmaps; the cores an exclusive job would conflict
    /// with.
    pub fn all_row_cores(&self) -> CoreBitmap {
        let mut union = bitmap::zeroes(self.rows[0].cores.len());
        for row in &self.rows {
            bitmap::union_into(&mut union, &row.cores);
        }
        union
    }

    /// Asserts row-bitmap consistency and member disjointness.
    #[cfg(any(test, debug_assertions))]
    pub fn validate(&self, addressing: &crate::engine::addressing::CoreAddressing) {
        for row in &self.rows {
            let mut rebuilt = bitmap::zeroes(row.cores.len());
            for plan in &row.jobs {
                let global = plan.global_cores(addressing);
                assert!(
                    !bitmap::overlaps(&global, &rebuilt),
                    "jobs overlap within a row of partition {}",
                    self.partition
                );
                bitmap::union_into(&mut rebuilt, &global);
            }
            assert_eq!(
                rebuilt, row.cores,
                "row bitmap of partition {} is not the union of its jobs",
                self.partition
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::bitmap::from_indices;
    use crate::engine::testing::{addressing, node_table, plan_on_node};
    use std::rc::Rc;

    #[test]
    fn test_row_fit_and_membership() {
        let table = node_table(&[4]);
        let addr = addressing(&table);
        let mut part = PartitionOccupancy::new(0.into(), 1, 4);

        let a = Rc::new(plan_on_node(1.into(), 0.into(), 4, &[0, 1]));
        let b = Rc::new(plan_on_node(2.into(), 0.into(), 4, &[2, 3]));

        let ga = a.global_cores(&addr);
        assert!(part.rows[0].can_fit(&ga));
        part.rows[0].insert(a.clone(), &ga);

        let gb = b.global_cores(&addr);
        assert!(part.rows[0].can_fit(&gb));
        part.rows[0].insert(b.clone(), &gb);
        assert!(!part.rows[0].can_fit(&ga));

        assert_eq!(part.rows[0].cores, from_indices(4, &[0, 1, 2, 3]));
        assert_eq!(part.find_job(1.into()), Some(0));
        assert_eq!(part.job_count(), 2);
        part.validate(&addr);

        let taken = part.rows[0].take(1.into()).unwrap();
        assert_eq!(taken.job_id, a.job_id);
        assert_eq!(part.find_job(1.into()), None);
    }

    #[test]
    fn test_num_rows_floor() {
        let part = PartitionOccupancy::new(3.into(), 0, 8);
        assert_eq!(part.num_rows(), 1);
    }
}
