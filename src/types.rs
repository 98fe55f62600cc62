//! Core sample, state and attitude types

use nalgebra::{Quaternion, UnitQuaternion, Vector3};

use crate::math::EulerAngles;

/// Full-scale value calibrated magnetometer readings are scaled to
pub const MAG_SENSOR_RANGE: i32 = 4096;

/// Full-scale value calibrated accelerometer readings are scaled to
pub const ACCEL_SENSOR_RANGE: i32 = 32000;

/// Sensor a calibration profile belongs to
///
/// # Example
/// ```
/// use vario_ahrs::{SensorKind, MAG_SENSOR_RANGE};
///
/// assert_eq!(SensorKind::Magnetometer.full_range(), MAG_SENSOR_RANGE);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SensorKind {
    Accelerometer,
    Magnetometer,
}

impl SensorKind {
    /// Full-scale constant for this sensor, also the upper clamp of a
    /// profile's range
    pub const fn full_range(self) -> i32 {
        match self {
            SensorKind::Accelerometer => ACCEL_SENSOR_RANGE,
            SensorKind::Magnetometer => MAG_SENSOR_RANGE,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            SensorKind::Accelerometer => "accel",
            SensorKind::Magnetometer => "mag",
        }
    }
}

/// One sample as delivered by the device transport
///
/// The quaternion is the motion co-processor's fixed-point output in
/// `(w, x, y, z)` order. Only its direction matters, so it is normalized
/// during fusion rather than rescaled.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RawSample {
    /// Device quaternion `(w, x, y, z)`
    pub quaternion: [i32; 4],
    /// Raw accelerometer reading
    pub accelerometer: Vector3<i16>,
    /// Raw magnetometer reading
    pub magnetometer: Vector3<i16>,
}

impl RawSample {
    /// Device quaternion as floating point, not yet normalized
    pub fn device_quaternion(&self) -> Quaternion<f32> {
        let [w, x, y, z] = self.quaternion;
        Quaternion::new(w as f32, x as f32, y as f32, z as f32)
    }
}

/// Fused attitude for one sample
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FusedAttitude {
    /// Roll, pitch and magnetic yaw in radians; yaw in `(-π, π]`
    pub euler: EulerAngles,
    /// The same attitude as a unit quaternion
    pub quaternion: UnitQuaternion<f32>,
}

impl FusedAttitude {
    /// Attitude in degrees as `(roll, pitch, heading)`
    pub fn degrees(&self) -> Vector3<f32> {
        self.euler.to_degrees()
    }
}

impl Default for FusedAttitude {
    fn default() -> Self {
        Self {
            euler: EulerAngles::default(),
            quaternion: UnitQuaternion::identity(),
        }
    }
}

/// Yaw memory carried between samples
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FusionState {
    /// Last fused yaw in radians, wrapped to `[0, 2π)`
    pub previous_fused_yaw: f32,
    /// Last yaw reported by the device, in radians
    pub previous_raw_device_yaw: f32,
}
