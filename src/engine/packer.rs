use crate::engine::addressing::CoreAddressing;
use crate::engine::bitmap::{self, CoreBitmap};
use crate::engine::plan::JobResourcePlan;
use crate::engine::row::PartitionOccupancy;
use std::cmp::Reverse;
use std::rc::Rc;

/// Re-optimizes row assignment after a job leaves the partition. Removing
/// one job can leave its row sparse while other rows stay over-full;
/// repacking keeps the sharing lanes dense, which matters for throughput
/// of wide shared partitions.
///
/// Best-effort only: if the greedy pass cannot place every job, the
/// original layout is restored verbatim.
pub fn rebuild_rows(
    part: &mut PartitionOccupancy,
    addressing: &CoreAddressing,
    removed: Option<&JobResourcePlan>,
) {
    if part.num_rows() == 1 {
        let row = &mut part.rows[0];
        match removed {
            Some(plan) => {
                // cheap path: the leaver's bits are known exactly
                let global = plan.global_cores(addressing);
                bitmap::subtract_into(&mut row.cores, &global);
            }
            None => {
                let survivors: Vec<Rc<JobResourcePlan>> = row.jobs().to_vec();
                row.cores.fill(false);
                for plan in &survivors {
                    let global = plan.global_cores(addressing);
                    bitmap::union_into(&mut row.cores, &global);
                }
            }
        }
        return;
    }

    // gather every job of every row, keyed by its first allocated core
    // (ties: wider job first)
    let mut members: Vec<(Rc<JobResourcePlan>, CoreBitmap)> = part
        .rows
        .iter()
        .flat_map(|row| row.jobs().iter().cloned())
        .map(|plan| {
            let global = plan.global_cores(addressing);
            (plan, global)
        })
        .collect();
    members.sort_by_key(|(plan, global)| {
        (
            plan.first_global_core(addressing).unwrap_or(usize::MAX),
            Reverse(global.count_ones()),
        )
    });

    let saved = part.rows.clone();
    for row in &mut part.rows {
        row.clear();
    }

    for (plan, global) in members {
        let target = part.rows.iter_mut().find(|row| row.can_fit(&global));
        match target {
            Some(row) => row.insert(plan, &global),
            None => {
                // dangling job: the heuristic found no valid layout, keep
                // the original packing
                log::debug!(
                    "row repack of partition {} left job {} dangling, keeping original layout",
                    part.partition,
                    plan.job_id
                );
                part.rows = saved;
                return;
            }
        }
        // bias future placements toward the heaviest rows
        part.rows.sort_by_key(|row| Reverse(row.occupied()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::bitmap::from_indices;
    use crate::engine::testing::{addressing, init_test_logging, node_table, plan_with_cores};
    use crate::JobId;
    use std::rc::Rc;

    fn occupancy_with(
        num_rows: usize,
        total_cores: usize,
        jobs: &[(u32, &[usize])],
        addr: &CoreAddressing,
    ) -> PartitionOccupancy {
        let mut part = PartitionOccupancy::new(0.into(), num_rows, total_cores);
        for (id, cores) in jobs {
            let plan = Rc::new(plan_with_cores((*id).into(), total_cores, *cores));
            let global = plan.global_cores(addr);
            let row = part
                .rows
                .iter_mut()
                .find(|row| row.can_fit(&global))
                .expect("test job does not fit");
            row.insert(plan, &global);
        }
        part
    }

    #[test]
    fn test_single_row_subtract_path() {
        let table = node_table(&[8]);
        let addr = addressing(&table);
        let mut part = occupancy_with(1, 8, &[(1, &[0, 1]), (2, &[2, 3])], &addr);

        let leaver = part.rows[0].take(1.into()).unwrap();
        rebuild_rows(&mut part, &addr, Some(leaver.as_ref()));
        assert_eq!(part.rows[0].cores, from_indices(8, &[2, 3]));
        part.validate(&addr);
    }

    #[test]
    fn test_single_row_replay_path() {
        let table = node_table(&[8]);
        let addr = addressing(&table);
        let mut part = occupancy_with(1, 8, &[(1, &[0, 1]), (2, &[4, 5])], &addr);

        part.rows[0].take(2.into()).unwrap();
        rebuild_rows(&mut part, &addr, None);
        assert_eq!(part.rows[0].cores, from_indices(8, &[0, 1]));
        part.validate(&addr);
    }

    #[test]
    fn test_repack_consolidates_rows() {
        let table = node_table(&[8]);
        let addr = addressing(&table);
        // row 0: job 1 on {0,1} and job 3 on {4,5};
        // row 1: job 2 on {0,1} (collides with job 1)
        let mut part = occupancy_with(
            2,
            8,
            &[(1, &[0, 1]), (2, &[0, 1]), (3, &[4, 5])],
            &addr,
        );
        assert_eq!(part.find_job(3.into()), Some(0));
        assert_eq!(part.find_job(2.into()), Some(1));

        // job 1 leaves; 2 and 3 can now share a single row
        part.rows[0].take(1.into()).unwrap();
        rebuild_rows(&mut part, &addr, Some(&plan_with_cores(1.into(), 8, &[0, 1])));

        let jobs_in_row0 = part.rows[0].jobs().len();
        assert_eq!(jobs_in_row0, 2);
        assert_eq!(part.rows[1].jobs().len(), 0);
        assert_eq!(part.rows[0].cores, from_indices(8, &[0, 1, 4, 5]));
        assert_eq!(part.job_count(), 2);
        part.validate(&addr);
    }

    #[test]
    fn test_failed_repack_restores_layout() {
        init_test_logging();
        let table = node_table(&[2]);
        let addr = addressing(&table);
        let mut part = PartitionOccupancy::new(0.into(), 2, 2);

        // three jobs all holding cores {0,1}: the third was forced in by
        // the allocator's last-row overcommit fallback, so no two-row
        // layout can hold all of them without overlap
        let plans: Vec<Rc<JobResourcePlan>> = (1..=3u32)
            .map(|id| Rc::new(plan_with_cores(id.into(), 2, &[0, 1])))
            .collect();
        let global = plans[0].global_cores(&addr);
        part.rows[0].insert(plans[0].clone(), &global);
        part.rows[1].insert(plans[1].clone(), &global);
        part.rows[1].insert(plans[2].clone(), &global);

        let members_before: Vec<Vec<JobId>> = part
            .rows
            .iter()
            .map(|row| row.jobs().iter().map(|plan| plan.job_id).collect())
            .collect();
        let cores_before: Vec<_> = part.rows.iter().map(|row| row.cores.clone()).collect();

        rebuild_rows(&mut part, &addr, None);

        let members_after: Vec<Vec<JobId>> = part
            .rows
            .iter()
            .map(|row| row.jobs().iter().map(|plan| plan.job_id).collect())
            .collect();
        let cores_after: Vec<_> = part.rows.iter().map(|row| row.cores.clone()).collect();
        assert_eq!(members_before, members_after);
        assert_eq!(cores_before, cores_after);
    }

    #[test]
    fn test_repack_preserves_job_set() {
        let table = node_table(&[8]);
        let addr = addressing(&table);
        let mut part = occupancy_with(
            3,
            8,
            &[(1, &[0, 1, 2]), (2, &[0, 1]), (3, &[2, 3]), (4, &[0, 3])],
            &addr,
        );
        let before = part.job_count();
        rebuild_rows(&mut part, &addr, None);
        assert_eq!(part.job_count(), before);
        for id in 1..=4u32 {
            assert!(part.find_job(id.into()).is_some());
        }
        part.validate(&addr);
    }
}
