//! Error types for calibration, configuration and fusion

use thiserror::Error;

/// Errors raised while loading a calibration profile.
///
/// None of these are fatal: the affected sensor simply stays uncalibrated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CalibrationError {
    /// Fewer than six usable min/max values were supplied.
    #[error("insufficient calibration data: found {found} of 6 values")]
    InsufficientData {
        /// Number of valid values found before giving up.
        found: usize,
    },

    /// A raw extreme was zero, which the calibration tools never produce.
    #[error("invalid calibration value at index {index}")]
    InvalidValue {
        /// Position of the offending value in the six-value sequence.
        index: usize,
    },
}

/// Per-sample fusion failures.
///
/// Both are transient: the sample is skipped and the last good attitude kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FusionError {
    /// The device quaternion has zero norm.
    #[error("degenerate device orientation: zero-norm quaternion")]
    DegenerateOrientation,

    /// Tilt compensation produced a NaN magnetic heading.
    #[error("degenerate magnetic vector: heading is NaN")]
    DegenerateMagneticVector,
}

/// Rejected construction parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// Sample rate outside the supported 2-50 Hz window.
    #[error("sample rate {0} Hz outside 2..=50")]
    SampleRate(u32),

    /// Yaw mixing factor above 100.
    #[error("yaw mixing factor {0} outside 0..=100")]
    YawMixFactor(u32),
}

/// Outcome of pulling one sample through the pipeline.
#[derive(Debug, Error)]
pub enum SampleError<E> {
    /// The sample source failed; the engine was not touched.
    #[error("sample transport failed: {0}")]
    Transport(#[source] E),

    /// The sample was read but could not be fused.
    #[error(transparent)]
    Fusion(#[from] FusionError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calibration_error_messages() {
        let err = CalibrationError::InsufficientData { found: 5 };
        assert!(err.to_string().contains("found 5 of 6"));

        let err = CalibrationError::InvalidValue { index: 3 };
        assert!(err.to_string().contains("index 3"));
    }

    #[test]
    fn test_config_error_messages() {
        assert!(ConfigError::SampleRate(60).to_string().contains("60 Hz"));
        assert!(ConfigError::YawMixFactor(101).to_string().contains("101"));
    }

    #[test]
    fn test_sample_error_wraps_fusion() {
        let err: SampleError<std::io::Error> = FusionError::DegenerateMagneticVector.into();
        assert!(matches!(
            err,
            SampleError::Fusion(FusionError::DegenerateMagneticVector)
        ));
        assert!(err.to_string().contains("NaN"));
    }
}
