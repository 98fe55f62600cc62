//! Sample-by-sample driver tying calibration and fusion together
//!
//! The caller owns the loop: it polls [`Ahrs::step`] once per sample period
//! and decides when to stop. Each step either finds no sample ready, fuses
//! one, or reports why it could not.

use nalgebra::Vector3;
use tracing::{debug, warn};

use crate::calibration::CalibrationTransform;
use crate::config::FusionConfig;
use crate::error::{ConfigError, FusionError, SampleError};
use crate::fusion::FusionEngine;
use crate::orientation::Mounting;
use crate::types::{FusedAttitude, RawSample};

/// Consecutive failed samples after which a warning is logged
const FAILURE_WARNING_THRESHOLD: u32 = 50;

/// Source of raw samples, typically the device transport
pub trait SampleSource {
    type Error: std::error::Error + 'static;

    /// Fetch the next sample
    ///
    /// `Ok(None)` means no new sample is available yet; the engine is not
    /// run for that tick.
    fn poll(&mut self) -> Result<Option<RawSample>, Self::Error>;
}

/// Accelerometer and magnetometer readings in calibrated body axes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CalibratedSample {
    pub accelerometer: Vector3<i16>,
    pub magnetometer: Vector3<i16>,
}

/// Calibration plus fusion for one device
#[derive(Debug, Clone)]
pub struct Ahrs {
    config: FusionConfig,
    mounting: Mounting,
    calibration: CalibrationTransform,
    engine: FusionEngine,
    consecutive_failures: u32,
}

impl Ahrs {
    /// Create a pipeline with uncalibrated sensors, rejecting out-of-range
    /// settings
    ///
    /// An unknown mounting id is not an error; it falls back to landscape.
    ///
    /// # Errors
    /// * [`ConfigError::SampleRate`] outside 2-50 Hz
    /// * [`ConfigError::YawMixFactor`] above 100
    pub fn try_new(config: FusionConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::new(config))
    }

    /// Create a pipeline with uncalibrated sensors
    ///
    /// Settings are not validated: a mixing factor above 100 is clamped and
    /// the sample rate is kept as given. Use [`Ahrs::try_new`] to reject them.
    pub fn new(config: FusionConfig) -> Self {
        if let Err(err) = config.validate() {
            warn!(error = %err, "out-of-range fusion settings");
        }
        Self {
            mounting: config.mounting(),
            engine: FusionEngine::from_config(&config),
            calibration: CalibrationTransform::new(),
            consecutive_failures: 0,
            config,
        }
    }

    pub fn with_calibration(config: FusionConfig, calibration: CalibrationTransform) -> Self {
        Self {
            calibration,
            ..Self::new(config)
        }
    }

    pub fn config(&self) -> &FusionConfig {
        &self.config
    }

    /// Mounting resolved from the configured id
    pub fn mounting(&self) -> Mounting {
        self.mounting
    }

    pub fn calibration(&self) -> &CalibrationTransform {
        &self.calibration
    }

    /// Calibration access for profile swaps between samples
    pub fn calibration_mut(&mut self) -> &mut CalibrationTransform {
        &mut self.calibration
    }

    pub fn engine(&self) -> &FusionEngine {
        &self.engine
    }

    /// Failed samples since the last success
    ///
    /// A long run of failures is a health problem for the caller to surface.
    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    /// Attitude from the last successful sample
    pub fn attitude(&self) -> FusedAttitude {
        self.engine.last_output()
    }

    /// Calibrated vectors for a raw sample
    pub fn calibrate(&self, sample: &RawSample) -> CalibratedSample {
        CalibratedSample {
            accelerometer: self.calibration.accelerometer(sample.accelerometer),
            magnetometer: self.calibration.magnetometer(sample.magnetometer),
        }
    }

    /// Calibrate and fuse one ready sample
    pub fn process(&mut self, sample: &RawSample) -> Result<FusedAttitude, FusionError> {
        let calibrated = self.calibrate(sample);

        match self
            .engine
            .update(sample.device_quaternion(), calibrated.magnetometer)
        {
            Ok(attitude) => {
                if self.consecutive_failures > 0 {
                    debug!(
                        failures = self.consecutive_failures,
                        "fusion recovered"
                    );
                }
                self.consecutive_failures = 0;
                Ok(attitude)
            }
            Err(err) => {
                self.consecutive_failures = self.consecutive_failures.saturating_add(1);
                if self.consecutive_failures == FAILURE_WARNING_THRESHOLD {
                    warn!(
                        failures = self.consecutive_failures,
                        error = %err,
                        "fusion failing repeatedly"
                    );
                }
                Err(err)
            }
        }
    }

    /// Poll `source` once and fuse whatever it delivers
    ///
    /// Transport errors are returned untouched and leave the engine as it
    /// was; fusion errors keep the previous attitude.
    pub fn step<S: SampleSource>(
        &mut self,
        source: &mut S,
    ) -> Result<Option<FusedAttitude>, SampleError<S::Error>> {
        let Some(sample) = source.poll().map_err(SampleError::Transport)? else {
            return Ok(None);
        };

        Ok(Some(self.process(&sample)?))
    }
}

impl Default for Ahrs {
    fn default() -> Self {
        Self::new(FusionConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SensorKind;
    use std::collections::VecDeque;

    #[derive(Debug, thiserror::Error)]
    #[error("bus fault")]
    struct BusFault;

    struct Scripted(VecDeque<Result<Option<RawSample>, BusFault>>);

    impl SampleSource for Scripted {
        type Error = BusFault;

        fn poll(&mut self) -> Result<Option<RawSample>, BusFault> {
            self.0.pop_front().unwrap_or(Ok(None))
        }
    }

    fn level_sample(magnetometer: Vector3<i16>) -> RawSample {
        RawSample {
            quaternion: [1 << 30, 0, 0, 0],
            magnetometer,
            ..Default::default()
        }
    }

    #[test]
    fn test_try_new_rejects_out_of_range_settings() {
        let config = FusionConfig {
            sample_rate_hz: 0,
            ..Default::default()
        };
        assert!(matches!(
            Ahrs::try_new(config),
            Err(ConfigError::SampleRate(0))
        ));

        let config = FusionConfig {
            yaw_mix_factor: 500,
            ..Default::default()
        };
        assert!(matches!(
            Ahrs::try_new(config),
            Err(ConfigError::YawMixFactor(500))
        ));
    }

    #[test]
    fn test_try_new_accepts_unknown_mounting() {
        let config = FusionConfig {
            mounting: 9,
            ..Default::default()
        };
        let ahrs = Ahrs::try_new(config).unwrap();

        assert_eq!(ahrs.mounting(), Mounting::Landscape);
        assert_eq!(ahrs.config().mounting, 9);
        assert_eq!(ahrs.engine().yaw_mix_factor(), 4);
    }

    #[test]
    fn test_with_calibration_uses_given_profiles() {
        let mut calibration = CalibrationTransform::new();
        calibration
            .load(SensorKind::Magnetometer, &[-100, 300, -200, 200, -50, 50])
            .unwrap();
        let ahrs = Ahrs::with_calibration(FusionConfig::default(), calibration.clone());

        assert_eq!(ahrs.calibration(), &calibration);
        // x offset 100, range 200: raw x 300 is +full range, remapped onto -y
        let calibrated = ahrs.calibrate(&level_sample(Vector3::new(300, 0, 0)));
        assert_eq!(calibrated.magnetometer.y, -4096);
    }

    #[test]
    fn test_not_ready_skips_engine() {
        let mut ahrs = Ahrs::default();
        let mut source = Scripted(VecDeque::from([Ok(None)]));

        assert!(matches!(ahrs.step(&mut source), Ok(None)));
        assert_eq!(ahrs.engine().phase(), crate::FusionPhase::Uninitialized);
    }

    #[test]
    fn test_transport_error_leaves_engine_untouched() {
        let mut ahrs = Ahrs::default();
        let mut source = Scripted(VecDeque::from([
            Ok(Some(level_sample(Vector3::new(-300, 0, 0)))),
            Err(BusFault),
        ]));

        ahrs.step(&mut source).unwrap();
        let state = ahrs.engine().state();

        assert!(matches!(
            ahrs.step(&mut source),
            Err(SampleError::Transport(BusFault))
        ));
        assert_eq!(ahrs.engine().state(), state);
        assert_eq!(ahrs.consecutive_failures(), 0);
    }

    #[test]
    fn test_raw_magnetometer_is_remapped() {
        // raw (0, 300) becomes body (300, 0): heading 0
        let config = FusionConfig {
            yaw_mix_factor: 1,
            ..Default::default()
        };
        let mut ahrs = Ahrs::new(config);
        let attitude = ahrs.process(&level_sample(Vector3::new(0, 300, 0))).unwrap();
        assert!(attitude.euler.yaw.abs() < 1e-5);

        // raw (300, 0) becomes body (0, -300): heading 90°
        let attitude = ahrs.process(&level_sample(Vector3::new(300, 0, 0))).unwrap();
        assert!((attitude.degrees().z - 90.0).abs() < 1e-3);
    }

    #[test]
    fn test_failures_counted_and_reset() {
        let mut ahrs = Ahrs::default();
        let bad = RawSample::default();

        for expected in 1..=3 {
            assert_eq!(
                ahrs.process(&bad),
                Err(FusionError::DegenerateOrientation)
            );
            assert_eq!(ahrs.consecutive_failures(), expected);
        }

        ahrs.process(&level_sample(Vector3::new(0, 300, 0))).unwrap();
        assert_eq!(ahrs.consecutive_failures(), 0);
    }

    #[test]
    fn test_fusion_error_keeps_last_attitude() {
        let mut ahrs = Ahrs::default();
        let mut source = Scripted(VecDeque::from([
            Ok(Some(level_sample(Vector3::new(300, 0, 0)))),
            Ok(Some(RawSample::default())),
        ]));

        let good = ahrs.step(&mut source).unwrap().unwrap();
        assert!(matches!(
            ahrs.step(&mut source),
            Err(SampleError::Fusion(FusionError::DegenerateOrientation))
        ));
        assert_eq!(ahrs.attitude(), good);
    }

    #[test]
    fn test_calibration_swap_between_samples() {
        let mut ahrs = Ahrs::default();
        ahrs.calibration_mut()
            .load(SensorKind::Magnetometer, &[-100, 300, -200, 200, -50, 50])
            .unwrap();

        assert!(ahrs.calibration().profile(SensorKind::Magnetometer).enabled());
        ahrs.process(&level_sample(Vector3::new(100, 0, 0))).unwrap();
    }

    #[test]
    fn test_calibrate_both_sensors() {
        let ahrs = Ahrs::default();
        let sample = RawSample {
            accelerometer: Vector3::new(100, 200, 16000),
            magnetometer: Vector3::new(10, 20, 30),
            ..level_sample(Vector3::zeros())
        };

        let calibrated = ahrs.calibrate(&sample);
        assert_eq!(calibrated.accelerometer, Vector3::new(-100, 200, 16000));
        assert_eq!(calibrated.magnetometer, Vector3::new(20, -10, 30));
    }
}
