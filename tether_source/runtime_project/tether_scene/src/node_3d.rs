use serde::Serialize;

use tether_constraints::ConstraintStack;
use tether_structs::Transform3D;

fn is_enabled(enabled: &bool) -> bool {
    *enabled
}

/// A scene node: a transform plus the constraint stack that drives it.
/// Serialized as part of a scene record; loading goes through [`crate::Scene::from_json`].
#[derive(Clone, Debug, Serialize)]
pub struct Node3D {
    pub name: String,
    #[serde(skip_serializing_if = "Transform3D::is_default")]
    pub transform: Transform3D,
    #[serde(skip_serializing_if = "is_enabled")]
    pub enabled: bool,
    #[serde(skip_serializing_if = "ConstraintStack::is_empty")]
    pub constraints: ConstraintStack,
}

impl Node3D {
    /// Enabled node at the identity transform with an empty stack.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            transform: Transform3D::IDENTITY,
            enabled: true,
            constraints: ConstraintStack::new(),
        }
    }

    pub fn with_transform(mut self, transform: Transform3D) -> Self {
        self.transform = transform;
        self
    }
}
