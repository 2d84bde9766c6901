//! Scene host for constraint stacks: a generational node arena, the per-frame
//! update loop and JSON scene files.

use std::path::PathBuf;

use tether_ids::NodeID;
use thiserror::Error;

pub mod node_3d;
pub mod node_arena;
pub mod scene;

pub use node_3d::Node3D;
pub use node_arena::{InsertAtError, NodeArena};
pub use scene::{LoadReport, Scene};

#[derive(Debug, Error)]
pub enum SceneError {
    #[error("failed to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("scene JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("no node {0} in scene")]
    UnknownNode(NodeID),
    #[error("no node named `{0}` in scene")]
    UnknownName(String),
    #[error("node {0} appears twice in scene file")]
    DuplicateNode(NodeID),
    #[error("node id {0} does not name a slot")]
    InvalidNodeId(NodeID),
    #[error("node id {id} is past slot {max} allowed for this scene file")]
    NodeIdOutOfRange { id: NodeID, max: u32 },
    #[error("node {node} has no constraint at index {index}")]
    ConstraintIndex { node: NodeID, index: usize },
}
