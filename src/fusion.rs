//! Magnetometer-aided yaw fusion
//!
//! The motion co-processor fuses gyroscope and accelerometer on-chip and
//! reports an orientation quaternion whose roll and pitch are trustworthy but
//! whose yaw slowly drifts. [`FusionEngine`] keeps roll and pitch, integrates
//! the change in device yaw, and pulls the result toward the tilt-compensated
//! magnetic heading with a single-pole complementary filter.

use core::f32::consts::{PI, TAU};

use nalgebra::{Quaternion, UnitQuaternion, Vector3};
use tracing::{debug, trace};

use crate::compass::magnetic_yaw;
use crate::config::FusionConfig;
use crate::error::FusionError;
use crate::math::{EulerAngles, QuaternionExt, normalize, wrap_pi, wrap_two_pi};
use crate::types::{FusedAttitude, FusionState};

/// Largest accepted yaw mixing factor
pub const MAX_YAW_MIX_FACTOR: u32 = 100;

/// Lifecycle of the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FusionPhase {
    /// No sample fused yet; yaw memory holds its zero start values
    #[default]
    Uninitialized,
    /// At least one sample fused
    Running,
}

/// Yaw fusion engine
///
/// Owns the yaw memory and is driven one sample at a time. A failed sample
/// commits nothing: state and last output stay as they were.
///
/// # Example
/// ```
/// use nalgebra::{Quaternion, Vector3};
/// use vario_ahrs::FusionEngine;
///
/// let mut engine = FusionEngine::new(4);
/// let attitude = engine
///     .update(Quaternion::identity(), Vector3::new(0, -200, 0))
///     .unwrap();
///
/// // a quarter of the way to the magnetic heading of 90°
/// assert!((attitude.degrees().z - 22.5).abs() < 1e-3);
/// ```
#[derive(Debug, Clone)]
pub struct FusionEngine {
    /// Damping divisor for the magnetic correction; 0 disables it
    yaw_mix_factor: u32,
    state: FusionState,
    phase: FusionPhase,
    last_output: FusedAttitude,
}

impl FusionEngine {
    /// Create an engine with the given yaw mixing factor (clamped to 0..=100)
    ///
    /// * `0` ignores the magnetometer; yaw follows the gyro alone
    /// * `1` snaps yaw to the magnetic heading every sample
    /// * `k > 1` applies `1/k` of the heading error per sample
    pub fn new(yaw_mix_factor: u32) -> Self {
        Self {
            yaw_mix_factor: yaw_mix_factor.min(MAX_YAW_MIX_FACTOR),
            state: FusionState::default(),
            phase: FusionPhase::Uninitialized,
            last_output: FusedAttitude::default(),
        }
    }

    pub fn from_config(config: &FusionConfig) -> Self {
        Self::new(config.yaw_mix_factor)
    }

    /// Reset yaw memory to its start-up values
    pub fn reset(&mut self) {
        self.state = FusionState::default();
        self.phase = FusionPhase::Uninitialized;
        self.last_output = FusedAttitude::default();
    }

    pub fn yaw_mix_factor(&self) -> u32 {
        self.yaw_mix_factor
    }

    /// Change the mixing factor between samples
    pub fn set_yaw_mix_factor(&mut self, yaw_mix_factor: u32) {
        self.yaw_mix_factor = yaw_mix_factor.min(MAX_YAW_MIX_FACTOR);
    }

    pub fn state(&self) -> FusionState {
        self.state
    }

    pub fn phase(&self) -> FusionPhase {
        self.phase
    }

    /// Attitude from the last successful sample
    pub fn last_output(&self) -> FusedAttitude {
        self.last_output
    }

    /// Fuse one sample
    ///
    /// # Arguments
    /// * `device_quaternion` - co-processor orientation, any nonzero scale
    /// * `magnetometer` - calibrated magnetometer reading in body axes
    ///
    /// # Errors
    /// * [`FusionError::DegenerateOrientation`] for a zero-norm quaternion
    /// * [`FusionError::DegenerateMagneticVector`] when the heading is NaN
    pub fn update(
        &mut self,
        device_quaternion: Quaternion<f32>,
        magnetometer: Vector3<i16>,
    ) -> Result<FusedAttitude, FusionError> {
        let device = normalize(device_quaternion).inspect_err(|_| {
            debug!(quaternion = ?device_quaternion, "zero-norm device quaternion");
        })?;
        let raw = device.to_euler();

        // The device's pitch axis points the opposite way to the aircraft's
        let roll = raw.roll;
        let pitch = -raw.pitch;
        let tilt = UnitQuaternion::from_euler(EulerAngles::new(roll, pitch, 0.0));

        let delta_device_yaw = self.state.previous_raw_device_yaw - raw.yaw;

        let field = magnetometer.cast::<f32>();
        let mag_yaw = magnetic_yaw(&tilt, field).inspect_err(|_| {
            debug!(field = ?magnetometer, "magnetic heading is NaN");
        })?;

        let corrected = self.blend_yaw(delta_device_yaw, mag_yaw);

        self.state = FusionState {
            previous_fused_yaw: corrected,
            previous_raw_device_yaw: raw.yaw,
        };
        self.phase = FusionPhase::Running;

        let yaw = if corrected > PI { corrected - TAU } else { corrected };
        let euler = EulerAngles::new(roll, pitch, yaw);
        self.last_output = FusedAttitude {
            euler,
            quaternion: UnitQuaternion::from_euler(euler),
        };

        trace!(
            roll,
            pitch,
            yaw,
            magnetic_yaw = mag_yaw,
            delta_device_yaw,
            "fused sample"
        );

        Ok(self.last_output)
    }

    /// Predict yaw from the device's yaw change and correct it toward the
    /// magnetic heading. Returns the corrected yaw in `[0, 2π)`.
    fn blend_yaw(&self, delta_device_yaw: f32, magnetic_yaw: f32) -> f32 {
        let predicted = wrap_two_pi(self.state.previous_fused_yaw + delta_device_yaw);

        if self.yaw_mix_factor == 0 {
            return predicted;
        }

        let error = wrap_pi(magnetic_yaw - predicted);
        wrap_two_pi(predicted + error / self.yaw_mix_factor as f32)
    }
}

impl Default for FusionEngine {
    fn default() -> Self {
        Self::from_config(&FusionConfig::default())
    }
}
