//! Angle wrapping, quaternion helpers and nalgebra extensions

use core::f32::consts::{PI, TAU};

use nalgebra::{Quaternion, UnitQuaternion, Vector3};

use crate::error::FusionError;

/// Mathematical constants
pub const DEG_TO_RAD: f32 = PI / 180.0;
pub const RAD_TO_DEG: f32 = 180.0 / PI;

/// Aircraft attitude as Euler angles in radians
///
/// Angles follow the aerospace yaw-pitch-roll (intrinsic Z-Y-X) sequence.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EulerAngles {
    /// Rotation about the body X axis
    pub roll: f32,
    /// Rotation about the body Y axis
    pub pitch: f32,
    /// Rotation about the body Z axis
    pub yaw: f32,
}

impl EulerAngles {
    pub const fn new(roll: f32, pitch: f32, yaw: f32) -> Self {
        Self { roll, pitch, yaw }
    }

    /// Angles converted to degrees as a `(roll, pitch, yaw)` vector
    pub fn to_degrees(&self) -> Vector3<f32> {
        Vector3::new(self.roll, self.pitch, self.yaw) * RAD_TO_DEG
    }
}

/// Wraps an angle into `[0, 2π)`.
///
/// Defined for every finite input, however many turns away from the range.
pub fn wrap_two_pi(angle: f32) -> f32 {
    let wrapped = angle.rem_euclid(TAU);
    // rem_euclid rounds tiny negative inputs up to exactly TAU
    if wrapped >= TAU { 0.0 } else { wrapped }
}

/// Wraps an angle into `(-π, π]`, the shortest signed distance form.
pub fn wrap_pi(angle: f32) -> f32 {
    let wrapped = wrap_two_pi(angle);
    if wrapped > PI { wrapped - TAU } else { wrapped }
}

/// Normalizes a quaternion to unit length.
///
/// A zero (or non-finite) norm has no orientation and is reported as
/// [`FusionError::DegenerateOrientation`] instead of producing NaN components.
///
/// # Example
/// ```
/// use nalgebra::Quaternion;
/// use vario_ahrs::math::normalize;
///
/// let unit = normalize(Quaternion::new(2.0, 0.0, 0.0, 0.0)).unwrap();
/// assert!((unit.w - 1.0).abs() < 1e-6);
///
/// assert!(normalize(Quaternion::new(0.0, 0.0, 0.0, 0.0)).is_err());
/// ```
pub fn normalize(quaternion: Quaternion<f32>) -> Result<UnitQuaternion<f32>, FusionError> {
    let norm = quaternion.norm();
    if norm == 0.0 || !norm.is_finite() {
        return Err(FusionError::DegenerateOrientation);
    }
    Ok(UnitQuaternion::new_unchecked(quaternion / norm))
}

/// Rotates a vector by `rotation` using the sandwich product `q · v · q*`.
///
/// The vector is embedded as the pure quaternion `(0, v)`; the returned
/// quaternion keeps whatever scalar part the products leave behind.
pub fn sandwich(rotation: &UnitQuaternion<f32>, vector: Vector3<f32>) -> Quaternion<f32> {
    let q = rotation.quaternion();
    let pure = Quaternion::from_imag(vector);
    q * (pure * q.conjugate())
}

/// Extension trait for UnitQuaternion operations
pub trait QuaternionExt {
    /// Convert quaternion to Euler angles in radians
    fn to_euler(&self) -> EulerAngles;

    /// Convert quaternion to Euler angles in degrees as `(roll, pitch, yaw)`
    fn to_euler_degrees(&self) -> Vector3<f32>;

    /// Create quaternion from Euler angles in radians
    fn from_euler(euler: EulerAngles) -> UnitQuaternion<f32>;
}

impl QuaternionExt for UnitQuaternion<f32> {
    fn to_euler(&self) -> EulerAngles {
        let (roll, pitch, yaw) = self.euler_angles();
        EulerAngles::new(roll, pitch, yaw)
    }

    fn to_euler_degrees(&self) -> Vector3<f32> {
        self.to_euler().to_degrees()
    }

    fn from_euler(euler: EulerAngles) -> UnitQuaternion<f32> {
        UnitQuaternion::from_euler_angles(euler.roll, euler.pitch, euler.yaw)
    }
}
