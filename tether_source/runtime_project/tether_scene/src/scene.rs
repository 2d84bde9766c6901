use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use tether_constraints::{
    Constraint, ConstraintKind, ConstraintStack, RecapturePolicy, SkippedEntry, decode_stack,
};
use tether_ids::NodeID;
use tether_structs::Transform3D;

use crate::SceneError;
use crate::node_3d::Node3D;
use crate::node_arena::{InsertAtError, NodeArena};

//
// ---------------- SceneData ----------------
//

#[derive(Serialize)]
struct NodeRecord<'a> {
    id: NodeID,
    #[serde(flatten)]
    node: &'a Node3D,
}

#[derive(Serialize)]
struct SceneRecord<'a> {
    nodes: Vec<NodeRecord<'a>>,
}

#[derive(Deserialize)]
struct RawNode {
    id: NodeID,
    name: String,
    #[serde(default)]
    transform: Transform3D,
    #[serde(default = "default_enabled")]
    enabled: bool,
    #[serde(default)]
    constraints: Vec<Value>,
}

fn default_enabled() -> bool {
    true
}

/// Highest slot index a scene file with `node_count` nodes may use. Saved ids
/// keep the gaps left by removed nodes, so some sparseness is expected.
fn max_slot_index(node_count: usize) -> u32 {
    let count = u32::try_from(node_count).unwrap_or(u32::MAX);
    count.saturating_mul(4).max(MIN_SLOT_LIMIT)
}

const MIN_SLOT_LIMIT: u32 = 4096;

#[derive(Deserialize)]
struct RawScene {
    #[serde(default)]
    nodes: Vec<RawNode>,
}

/// Constraint records dropped while loading, per node.
#[derive(Clone, Debug, Default)]
pub struct LoadReport {
    pub skipped: Vec<(NodeID, SkippedEntry)>,
}

impl LoadReport {
    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty()
    }
}

//
// ---------------- Scene ----------------
//

/// Flat set of nodes, each optionally driven by a constraint stack.
///
/// Lifecycle follows the node's `enabled` flag: enabling activates the stack
/// (baselines captured from the live transform), disabling deactivates it
/// (transform restored), and [`Scene::update`] ticks every enabled node once.
pub struct Scene {
    nodes: NodeArena,
    policy: RecapturePolicy,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene {
    pub fn new() -> Self {
        Self::with_policy(RecapturePolicy::Manual)
    }

    pub fn with_policy(policy: RecapturePolicy) -> Self {
        Self {
            nodes: NodeArena::new(),
            policy,
        }
    }

    pub fn policy(&self) -> RecapturePolicy {
        self.policy
    }

    /// Applies to every existing and future stack.
    pub fn set_policy(&mut self, policy: RecapturePolicy) {
        self.policy = policy;
        for id in self.nodes.ids() {
            if let Some(node) = self.nodes.get_mut(id) {
                node.constraints.set_policy(policy);
            }
        }
    }

    pub fn nodes(&self) -> &NodeArena {
        &self.nodes
    }

    pub fn node(&self, id: NodeID) -> Option<&Node3D> {
        self.nodes.get(id)
    }

    pub fn node_mut(&mut self, id: NodeID) -> Option<&mut Node3D> {
        self.nodes.get_mut(id)
    }

    /// First node with this name, in slot order.
    pub fn find(&self, name: &str) -> Option<NodeID> {
        self.nodes
            .iter()
            .find(|(_, node)| node.name == name)
            .map(|(id, _)| id)
    }

    /// Resolve a node by name or by handle string.
    pub fn resolve(&self, name_or_id: &str) -> Result<NodeID, SceneError> {
        if let Some(id) = self.find(name_or_id) {
            return Ok(id);
        }
        match NodeID::parse_str(name_or_id) {
            Ok(id) if self.nodes.contains(id) => Ok(id),
            _ => Err(SceneError::UnknownName(name_or_id.to_string())),
        }
    }

    /// Insert a node. An enabled node's stack is activated right away.
    pub fn add_node(&mut self, mut node: Node3D) -> NodeID {
        node.constraints.set_policy(self.policy);
        if node.enabled {
            let t = node.transform;
            node.constraints.activate(&t);
        }
        let id = self.nodes.insert(node);
        log::debug!("added node {id}");
        id
    }

    /// Remove a node. Stacks targeting it treat the handle as missing from now on.
    pub fn remove_node(&mut self, id: NodeID) -> Option<Node3D> {
        let node = self.nodes.remove(id)?;
        log::debug!("removed node {id} ({})", node.name);
        Some(node)
    }

    pub fn set_enabled(&mut self, id: NodeID, enabled: bool) -> Result<(), SceneError> {
        let node = self.nodes.get_mut(id).ok_or(SceneError::UnknownNode(id))?;
        if node.enabled == enabled {
            return Ok(());
        }
        node.enabled = enabled;
        let Node3D {
            transform,
            constraints,
            ..
        } = node;
        if enabled {
            constraints.activate(transform);
        } else {
            constraints.deactivate(transform);
        }
        Ok(())
    }

    /// Tick every enabled node's stack once, in slot order. Targets are read
    /// from the arena as it stands, so a node ticked earlier this frame is seen
    /// at its constrained transform.
    pub fn update(&mut self) {
        for id in self.nodes.ids() {
            let Some(node) = self.nodes.get_mut(id) else {
                continue;
            };
            if !node.enabled || node.constraints.is_empty() {
                continue;
            }
            let stack = std::mem::take(&mut node.constraints);
            let mut transform = node.transform;

            stack.tick(&mut transform, &self.nodes);

            if let Some(node) = self.nodes.get_mut(id) {
                node.transform = transform;
                node.constraints = stack;
            }
        }
    }

    /// Manual fix for stale baselines: re-capture every baseline of the node's
    /// stack from its current transform.
    pub fn recapture(&mut self, id: NodeID) -> Result<(), SceneError> {
        let node = self.nodes.get_mut(id).ok_or(SceneError::UnknownNode(id))?;
        let t = node.transform;
        node.constraints.recapture(&t);
        log::debug!("recaptured baselines on {id}");
        Ok(())
    }

    /// Append a constraint to `id`'s stack. Returns its index.
    pub fn append_constraint(
        &mut self,
        id: NodeID,
        kind: ConstraintKind,
        target: Option<NodeID>,
    ) -> Result<usize, SceneError> {
        if let Some(target) = target {
            if !self.nodes.contains(target) {
                return Err(SceneError::UnknownNode(target));
            }
        }
        let node = self.nodes.get_mut(id).ok_or(SceneError::UnknownNode(id))?;
        let t = node.transform;
        node.constraints.append(kind, target, &t);
        Ok(node.constraints.len() - 1)
    }

    /// Remove the last constraint of `id`'s stack, restoring its baseline.
    pub fn remove_last_constraint(&mut self, id: NodeID) -> Result<Option<Constraint>, SceneError> {
        let node = self.nodes.get_mut(id).ok_or(SceneError::UnknownNode(id))?;
        let Node3D {
            transform,
            constraints,
            ..
        } = node;
        Ok(constraints.remove_last(transform))
    }

    pub fn set_constraint_active(
        &mut self,
        id: NodeID,
        index: usize,
        active: bool,
    ) -> Result<(), SceneError> {
        let node = self.nodes.get_mut(id).ok_or(SceneError::UnknownNode(id))?;
        let t = node.transform;
        if node.constraints.set_active(index, active, &t) {
            Ok(())
        } else {
            Err(SceneError::ConstraintIndex { node: id, index })
        }
    }

    pub fn set_constraint_fac(&mut self, id: NodeID, index: usize, fac: f32) -> Result<(), SceneError> {
        let node = self.nodes.get_mut(id).ok_or(SceneError::UnknownNode(id))?;
        if node.constraints.set_fac(index, fac) {
            Ok(())
        } else {
            Err(SceneError::ConstraintIndex { node: id, index })
        }
    }

    // ---------------- persistence ----------------

    pub fn to_json(&self) -> Result<String, SceneError> {
        let record = SceneRecord {
            nodes: self
                .nodes
                .iter()
                .map(|(id, node)| NodeRecord { id, node })
                .collect(),
        };
        Ok(serde_json::to_string_pretty(&record)?)
    }

    /// Rebuild a scene. Node handles are kept so constraint targets still
    /// resolve. Saved baselines are kept too: enabled stacks resume instead of
    /// re-capturing from the (possibly constrained) saved transform.
    pub fn from_json(src: &str, policy: RecapturePolicy) -> Result<(Self, LoadReport), SceneError> {
        let raw: RawScene = serde_json::from_str(src)?;
        let mut scene = Self::with_policy(policy);
        let mut report = LoadReport::default();
        let max = max_slot_index(raw.nodes.len());

        for raw_node in raw.nodes {
            let id = raw_node.id;
            if id.index() > max {
                return Err(SceneError::NodeIdOutOfRange { id, max });
            }

            let decoded = decode_stack(&raw_node.constraints);
            report
                .skipped
                .extend(decoded.skipped.into_iter().map(|entry| (id, entry)));

            let mut constraints: ConstraintStack = decoded.stack;
            constraints.set_policy(policy);
            if raw_node.enabled {
                constraints.resume();
            }
            let node = Node3D {
                name: raw_node.name,
                transform: raw_node.transform,
                enabled: raw_node.enabled,
                constraints,
            };
            match scene.nodes.insert_at(id, node) {
                Ok(()) => {}
                Err(InsertAtError::InvalidId) => return Err(SceneError::InvalidNodeId(id)),
                Err(InsertAtError::Occupied) => return Err(SceneError::DuplicateNode(id)),
            }
        }

        if !report.is_clean() {
            log::warn!(
                "scene loaded with {} constraint record(s) skipped",
                report.skipped.len()
            );
        }
        Ok((scene, report))
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), SceneError> {
        let path = path.as_ref();
        fs::write(path, self.to_json()?).map_err(|source| SceneError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn load(
        path: impl AsRef<Path>,
        policy: RecapturePolicy,
    ) -> Result<(Self, LoadReport), SceneError> {
        let path = path.as_ref();
        let src = fs::read_to_string(path).map_err(|source| SceneError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&src, policy)
    }

    /// Text listing of every node, its transform and its constraint stack.
    pub fn describe(&self) -> String {
        let mut out = String::new();
        for (id, node) in self.nodes.iter() {
            let state = if node.enabled { "" } else { " [disabled]" };
            let _ = writeln!(out, "{} ({id}){state}", node.name);
            let _ = writeln!(out, "    {}", node.transform);
            for (index, constraint) in node.constraints.iter().enumerate() {
                let target = match constraint.target() {
                    Some(target) => match self.nodes.get(target) {
                        Some(t) => t.name.clone(),
                        None => format!("{target} (missing)"),
                    },
                    None => "none".to_string(),
                };
                let active = if constraint.is_active() { "on" } else { "off" };
                let _ = writeln!(
                    out,
                    "    [{index}] {:<13} fac {:.2} {active:<3} target {target}",
                    constraint.kind().display_name(),
                    constraint.fac(),
                );
            }
        }
        out
    }
}
