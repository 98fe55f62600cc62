//! Tilt-compensated magnetic heading

use nalgebra::{Quaternion, UnitQuaternion, Vector3};

use crate::error::FusionError;
use crate::math::{sandwich, wrap_two_pi};

/// Rotate a magnetometer reading into the horizontal plane
///
/// `tilt` carries only roll and pitch (zero yaw). Rotating the body-frame
/// field by it with the sandwich product `tilt · m · tilt*` removes the
/// attitude, leaving the field's horizontal direction in `x`/`y`.
pub fn tilt_compensate(tilt: &UnitQuaternion<f32>, magnetometer: Vector3<f32>) -> Quaternion<f32> {
    sandwich(tilt, magnetometer)
}

/// Magnetic yaw in radians, wrapped to `[0, 2π)`
///
/// Computed as `-atan2(y, x)` of the tilt-compensated field.
///
/// # Errors
/// [`FusionError::DegenerateMagneticVector`] when the heading is NaN.
///
/// # Example
/// ```
/// use core::f32::consts::FRAC_PI_2;
/// use nalgebra::{UnitQuaternion, Vector3};
/// use vario_ahrs::compass::magnetic_yaw;
///
/// let level = UnitQuaternion::identity();
/// let yaw = magnetic_yaw(&level, Vector3::new(0.0, -100.0, 0.0)).unwrap();
/// assert!((yaw - FRAC_PI_2).abs() < 1e-6);
/// ```
pub fn magnetic_yaw(
    tilt: &UnitQuaternion<f32>,
    magnetometer: Vector3<f32>,
) -> Result<f32, FusionError> {
    let horizontal = tilt_compensate(tilt, magnetometer);
    let yaw = -horizontal.j.atan2(horizontal.i);

    if yaw.is_nan() {
        return Err(FusionError::DegenerateMagneticVector);
    }

    Ok(wrap_two_pi(yaw))
}
