use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use crate::Vector3;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Quaternion {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

impl Serialize for Quaternion {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        [self.x, self.y, self.z, self.w].serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Quaternion {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let [x, y, z, w] = <[f32; 4]>::deserialize(deserializer)?;
        Ok(Quaternion::new(x, y, z, w))
    }
}

impl fmt::Display for Quaternion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Quaternion({}, {}, {}, {})",
            self.x, self.y, self.z, self.w
        )
    }
}

impl Quaternion {
    pub const IDENTITY: Self = Self::new(0.0, 0.0, 0.0, 1.0);

    pub const fn new(x: f32, y: f32, z: f32, w: f32) -> Self {
        Self { x, y, z, w }
    }

    #[inline(always)]
    pub fn to_glam(self) -> glam::Quat {
        glam::Quat::from_xyzw(self.x, self.y, self.z, self.w)
    }

    #[inline(always)]
    pub fn from_glam(q: glam::Quat) -> Self {
        Self::new(q.x, q.y, q.z, q.w)
    }

    /// Create quaternion from Euler angles in **degrees** (pitch, yaw, roll).
    pub fn from_euler_degrees(pitch_deg: f32, yaw_deg: f32, roll_deg: f32) -> Self {
        Self::from_glam(glam::Quat::from_euler(
            glam::EulerRot::YXZ,
            yaw_deg.to_radians(),
            pitch_deg.to_radians(),
            roll_deg.to_radians(),
        ))
    }

    /// Euler angles in **degrees** (pitch, yaw, roll).
    pub fn to_euler_degrees(&self) -> (f32, f32, f32) {
        let (yaw, pitch, roll) = self.to_glam().to_euler(glam::EulerRot::YXZ);
        (pitch.to_degrees(), yaw.to_degrees(), roll.to_degrees())
    }

    pub fn from_axis_angle_degrees(axis: Vector3, angle_deg: f32) -> Self {
        Self::from_glam(glam::Quat::from_axis_angle(
            axis.to_glam().normalize(),
            angle_deg.to_radians(),
        ))
    }

    pub fn rotate_vec3(&self, v: Vector3) -> Vector3 {
        Vector3::from_glam(self.to_glam() * v.to_glam())
    }

    /// Spherical interpolation along the shortest arc.
    /// `t == 0` returns `self` and `t == 1` returns `end` exactly.
    pub fn slerp(self, end: Self, t: f32) -> Self {
        if t == 0.0 {
            return self;
        }
        if t == 1.0 {
            return end;
        }
        Self::from_glam(self.to_glam().slerp(end.to_glam(), t))
    }

    /// Rotation whose local +Z points along `forward`, with local +Y kept as close
    /// to `up` as possible. `None` when `forward` is zero-length or parallel to `up`.
    pub fn look_rotation(forward: Vector3, up: Vector3) -> Option<Self> {
        let z = forward.to_glam().try_normalize()?;
        let x = up.to_glam().cross(z).try_normalize()?;
        let y = z.cross(x);
        let basis = glam::Mat3::from_cols(x, y, z);
        Some(Self::from_glam(glam::Quat::from_mat3(&basis).normalize()))
    }

    /// Angle in radians between the two orientations (q and -q are the same rotation).
    pub fn angle_to(&self, other: Self) -> f32 {
        self.to_glam().angle_between(other.to_glam())
    }
}

impl Default for Quaternion {
    fn default() -> Self {
        Self::IDENTITY
    }
}
