pub mod quaternion;
pub mod transform_3d;
pub mod vector3;

pub use quaternion::Quaternion;
pub use transform_3d::Transform3D;
pub use vector3::Vector3;
