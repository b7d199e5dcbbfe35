use crate::common::ids::NodeId;
use crate::common::wrapped::WrappedRcRefCell;
use crate::engine::plan::JobResourcePlan;
use crate::Map;

/// One requested generic resource (device) type, counted per allocated node.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct GresRequest {
    pub name: String,
    pub per_node: u64,
}

/// Opaque per-node device usage state. Owned by the GRES subsystem; the
/// engine only holds a handle to it. Snapshots share the handle instead of
/// duplicating the state.
#[derive(Debug, Default)]
pub struct GresNodeUsage {
    pub reserved: Map<String, u64>,
}

pub type GresHandle = WrappedRcRefCell<GresNodeUsage>;

/// Device-share accounting seam. Implementations log their own failures;
/// the engine never treats a GRES problem as fatal.
pub trait GresAllocator {
    fn reserve(&self, node: NodeId, usage: &GresHandle, plan: &JobResourcePlan);
    fn release(&self, node: NodeId, usage: &GresHandle, plan: &JobResourcePlan);

    /// Device-detail string for accounting records.
    fn job_details(&self, _plan: &JobResourcePlan) -> Option<String> {
        None
    }
}

/// Used when the cluster tracks no generic resources.
#[derive(Debug, Default)]
pub struct NullGres;

impl GresAllocator for NullGres {
    fn reserve(&self, _node: NodeId, _usage: &GresHandle, _plan: &JobResourcePlan) {}
    fn release(&self, _node: NodeId, _usage: &GresHandle, _plan: &JobResourcePlan) {}
}

/// Simple per-name share counter, enough for clusters whose devices need no
/// topology awareness.
#[derive(Debug, Default)]
pub struct CountingGres;

impl GresAllocator for CountingGres {
    fn reserve(&self, _node: NodeId, usage: &GresHandle, plan: &JobResourcePlan) {
        let mut state = usage.get_mut();
        for req in &plan.gres_request {
            *state.reserved.entry(req.name.clone()).or_insert(0) += req.per_node;
        }
    }

    fn release(&self, node: NodeId, usage: &GresHandle, plan: &JobResourcePlan) {
        let mut state = usage.get_mut();
        for req in &plan.gres_request {
            match state.reserved.get_mut(&req.name) {
                Some(count) if *count >= req.per_node => *count -= req.per_node,
                Some(count) => {
                    log::error!(
                        "gres {} underflow on node {}: releasing {} of {}",
                        req.name,
                        node,
                        req.per_node,
                        count
                    );
                    *count = 0;
                }
                None => {
                    log::error!("gres {} not reserved on node {}", req.name, node);
                }
            }
        }
    }

    fn job_details(&self, plan: &JobResourcePlan) -> Option<String> {
        if plan.gres_request.is_empty() {
            return None;
        }
        Some(
            plan.gres_request
                .iter()
                .map(|req| format!("{}:{}", req.name, req.per_node))
                .collect::<Vec<_>>()
                .join(","),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::testing::plan_on_node;

    #[test]
    fn test_counting_gres_roundtrip() {
        let gres = CountingGres;
        let handle = GresHandle::default();
        let mut plan = plan_on_node(1.into(), 0.into(), 4, &[0, 1]);
        plan.gres_request.push(GresRequest {
            name: "gpu".into(),
            per_node: 2,
        });

        gres.reserve(0.into(), &handle, &plan);
        assert_eq!(handle.get().reserved.get("gpu"), Some(&2));
        assert_eq!(gres.job_details(&plan).as_deref(), Some("gpu:2"));

        gres.release(0.into(), &handle, &plan);
        assert_eq!(handle.get().reserved.get("gpu"), Some(&0));

        // releasing more than reserved clamps instead of wrapping
        gres.release(0.into(), &handle, &plan);
        assert_eq!(handle.get().reserved.get("gpu"), Some(&0));
    }
}
