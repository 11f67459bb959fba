/// Vector helpers, angle decomposition and rotation matrices
use nalgebra::{Matrix3, Rotation3, Vector3};

/// Lengths at or below this are treated as zero when normalizing
pub const NORMALIZE_EPSILON: f32 = 1e-8;

pub fn dot(a: &Vector3<f32>, b: &Vector3<f32>) -> f32 {
    a.dot(b)
}

pub fn cross(a: &Vector3<f32>, b: &Vector3<f32>) -> Vector3<f32> {
    a.cross(b)
}

/// Normalize `v`, returning `fallback` when `v` is (near) zero length
pub fn normalize_or(v: &Vector3<f32>, fallback: Vector3<f32>) -> Vector3<f32> {
    let len = v.norm();
    if len > NORMALIZE_EPSILON {
        v / len
    } else {
        fallback
    }
}

/// Azimuth and elevation of a direction, in degrees.
///
/// Elevation is measured from the XY plane towards +Z. Azimuth is zero along
/// +Y and grows clockwise when looking down the Z axis.
pub fn azimuth_elevation(dir: &Vector3<f32>) -> (f32, f32) {
    let elevation = dir.z.atan2((dir.x * dir.x + dir.y * dir.y).sqrt()).to_degrees();
    let azimuth = -dir.y.atan2(dir.x).to_degrees() + 90.0;
    (azimuth, elevation)
}

/// Wrap an angle in degrees into `[-180, 180)`
pub fn wrap_degrees(angle: f32) -> f32 {
    (angle + 180.0).rem_euclid(360.0) - 180.0
}

/// Rotation matrix from Euler angles in radians (roll about X, pitch about Y,
/// yaw about Z), applied in the order X, Y, Z
pub fn rotation_matrix(roll: f32, pitch: f32, yaw: f32) -> Matrix3<f32> {
    Rotation3::from_euler_angles(roll, pitch, yaw).into_inner()
}

/// Orthonormal camera frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Basis {
    pub forward: Vector3<f32>,
    pub right: Vector3<f32>,
    pub up: Vector3<f32>,
}

/// Build a camera basis around `forward`, flipping it once if `to_point`
/// lies behind it.
///
/// World up is +Z unless `forward` is nearly parallel to it, in which case +Y
/// is used instead.
pub fn build_basis(forward: &Vector3<f32>, to_point: &Vector3<f32>) -> Basis {
    let mut world_up = Vector3::z();
    let mut forward = normalize_or(forward, Vector3::zeros());
    if forward.dot(&world_up).abs() > 0.999 {
        world_up = Vector3::y();
    }
    if to_point.dot(&forward) < 0.0 {
        forward = -forward;
    }
    let right = normalize_or(&forward.cross(&world_up), Vector3::zeros());
    let up = right.cross(&forward);
    Basis { forward, right, up }
}
