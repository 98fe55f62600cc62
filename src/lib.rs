//! Vario AHRS - magnetometer-aided attitude for gliding instruments
//!
//! Estimates roll, pitch and magnetic heading from a 9-axis IMU whose
//! gyroscope/accelerometer fusion runs on the device's motion co-processor.
//! The co-processor's quaternion gives stable roll and pitch but a drifting
//! yaw; this library tilt-compensates the magnetometer and blends its heading
//! into the integrated device yaw with a configurable mixing factor.
//!
//! # Features
//!
//! - Min/max calibration profiles for accelerometer and magnetometer, with
//!   load-time clamping and a text/record loader
//! - Fixed axis remap from sensor to body axes
//! - Tilt compensation by quaternion sandwich rotation
//! - Single-pole complementary yaw filter (gyro only, compass only, or damped)
//! - Four panel mounting orientations with the co-processor's packed scalar
//! - `$RPYL` output record
//!
//! # Quick Start
//!
//! ```rust
//! use nalgebra::Vector3;
//! use vario_ahrs::{Ahrs, FusionConfig, RawSample, RpylRecord};
//!
//! let mut ahrs = Ahrs::new(FusionConfig::default());
//!
//! // one sample from the device transport
//! let sample = RawSample {
//!     quaternion: [1 << 30, 0, 0, 0],
//!     magnetometer: Vector3::new(0, 250, -400),
//!     ..Default::default()
//! };
//!
//! let attitude = ahrs.process(&sample).unwrap();
//! let sentence = RpylRecord::from(&attitude).to_string();
//! assert!(sentence.starts_with("\r$RPYL,"));
//! ```

pub mod calibration;
pub mod compass;
pub mod config;
mod error;
pub mod fusion;
pub mod math;
pub mod orientation;
pub mod output;
pub mod pipeline;
mod types;

// Re-export all public types and functions
pub use calibration::{CalibrationProfile, CalibrationRecord, CalibrationTransform};
pub use config::FusionConfig;
pub use error::{CalibrationError, ConfigError, FusionError, SampleError};
pub use fusion::{FusionEngine, FusionPhase};
pub use math::{DEG_TO_RAD, EulerAngles, QuaternionExt, RAD_TO_DEG};
pub use orientation::{Mounting, SignedPermutation, rotation_matrix};
pub use output::RpylRecord;
pub use pipeline::{Ahrs, CalibratedSample, SampleSource};
pub use types::*;
