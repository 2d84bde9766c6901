use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{Quaternion, Vector3};

fn default_position() -> Vector3 {
    Vector3::ZERO
}
fn is_default_position(v: &Vector3) -> bool {
    *v == default_position()
}

fn default_rotation() -> Quaternion {
    Quaternion::IDENTITY
}
fn is_default_rotation(q: &Quaternion) -> bool {
    *q == default_rotation()
}

fn default_scale() -> Vector3 {
    Vector3::ONE
}
fn is_default_scale(v: &Vector3) -> bool {
    *v == default_scale()
}

/// Position, rotation and scale of one node. Scenes are flat, so these are
/// also the world values.
#[derive(Clone, Debug, Serialize, Deserialize, Copy, PartialEq)]
pub struct Transform3D {
    #[serde(
        default = "default_position",
        skip_serializing_if = "is_default_position"
    )]
    pub position: Vector3,

    #[serde(
        default = "default_rotation",
        skip_serializing_if = "is_default_rotation"
    )]
    pub rotation: Quaternion,

    #[serde(default = "default_scale", skip_serializing_if = "is_default_scale")]
    pub scale: Vector3,
}

impl fmt::Display for Transform3D {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (pitch, yaw, roll) = self.rotation.to_euler_degrees();
        write!(
            f,
            "position:{} rotation:({:.2}°, {:.2}°, {:.2}°) scale:{}",
            self.position, pitch, yaw, roll, self.scale
        )
    }
}

impl Transform3D {
    pub const IDENTITY: Self = Self {
        position: Vector3::ZERO,
        rotation: Quaternion::IDENTITY,
        scale: Vector3::ONE,
    };

    pub fn new(position: Vector3, rotation: Quaternion, scale: Vector3) -> Self {
        Self {
            position,
            rotation,
            scale,
        }
    }

    pub fn from_position(position: Vector3) -> Self {
        Self {
            position,
            ..Self::IDENTITY
        }
    }

    pub fn is_default(&self) -> bool {
        is_default_position(&self.position)
            && is_default_rotation(&self.rotation)
            && is_default_scale(&self.scale)
    }

    /// Local +Z in world space.
    pub fn forward(&self) -> Vector3 {
        self.rotation.rotate_vec3(Vector3::FORWARD)
    }
}

impl Default for Transform3D {
    fn default() -> Self {
        Self::IDENTITY
    }
}
