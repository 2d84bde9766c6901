use std::collections::HashMap;

use tether_ids::NodeID;
use tether_structs::Transform3D;

/// Resolves a constraint's target handle to that node's current transform.
///
/// Returning `None` means the handle is nil or stale; constraints treat that the
/// same as having no target.
pub trait TargetLookup {
    fn target_transform(&self, id: NodeID) -> Option<Transform3D>;
}

impl TargetLookup for HashMap<NodeID, Transform3D> {
    fn target_transform(&self, id: NodeID) -> Option<Transform3D> {
        self.get(&id).copied()
    }
}

