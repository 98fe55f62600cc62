//! Construction-time settings

use core::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::orientation::Mounting;

/// Slowest supported sample rate in Hz
pub const MIN_SAMPLE_RATE_HZ: u32 = 2;
/// Fastest supported sample rate in Hz
pub const MAX_SAMPLE_RATE_HZ: u32 = 50;

/// Fusion settings
///
/// Deserializes from any serde format; missing fields take their defaults.
///
/// # Example
/// ```
/// use vario_ahrs::{FusionConfig, Mounting};
///
/// let config = FusionConfig {
///     sample_rate_hz: 20,
///     yaw_mix_factor: 10,
///     ..Default::default()
/// };
/// config.validate().unwrap();
/// assert_eq!(config.mounting(), Mounting::Landscape);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionConfig {
    /// Device sample rate, 2-50 Hz
    pub sample_rate_hz: u32,
    /// Yaw mixing factor, 0-100
    ///
    /// 0 uses the gyro only, 1 the compass only, larger values damp the
    /// magnetic correction more.
    pub yaw_mix_factor: u32,
    /// Mounting id 0-3; anything else is treated as 0
    pub mounting: u8,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            sample_rate_hz: 10,
            yaw_mix_factor: 4,
            mounting: 0,
        }
    }
}

impl FusionConfig {
    /// Check ranges; an unknown mounting id is not an error
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(MIN_SAMPLE_RATE_HZ..=MAX_SAMPLE_RATE_HZ).contains(&self.sample_rate_hz) {
            return Err(ConfigError::SampleRate(self.sample_rate_hz));
        }
        if self.yaw_mix_factor > crate::fusion::MAX_YAW_MIX_FACTOR {
            return Err(ConfigError::YawMixFactor(self.yaw_mix_factor));
        }
        Ok(())
    }

    pub fn mounting(&self) -> Mounting {
        Mounting::from_id(self.mounting)
    }

    /// Pause between polls: one sample period less 2 ms of processing slack
    pub fn loop_delay(&self) -> Duration {
        let period_ms = 1000 / u64::from(self.sample_rate_hz.max(1));
        Duration::from_millis(period_ms.saturating_sub(2))
    }
}
