//! Accelerometer and magnetometer calibration
//!
//! A calibration is gathered by rotating the device through every axis and
//! recording the minimum and maximum raw reading per axis. From those six
//! extremes each axis gets a centre offset and a half-span range, and
//! [`CalibrationTransform`] rescales raw readings to the sensor's full range.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::CalibrationError;
use crate::types::SensorKind;

/// Number of raw extremes in a calibration: `(min, max)` for x, y and z
pub const CALIBRATION_VALUES: usize = 6;

/// Offset and range for one sensor
///
/// Profiles are only created through [`CalibrationProfile::load`] (or
/// [`CalibrationProfile::disabled`]), so `1 <= range[i] <= full_range` always
/// holds and the transform can divide by the range unchecked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalibrationProfile {
    kind: SensorKind,
    enabled: bool,
    offset: Vector3<i32>,
    range: Vector3<i32>,
}

impl CalibrationProfile {
    /// A profile that leaves readings unscaled
    pub fn disabled(kind: SensorKind) -> Self {
        Self {
            kind,
            enabled: false,
            offset: Vector3::zeros(),
            range: Vector3::repeat(1),
        }
    }

    /// Build a profile from raw extremes
    ///
    /// `extremes` holds `(min_x, max_x, min_y, max_y, min_z, max_z)`. For each
    /// axis `offset = (min + max) / 2` and `range = max - offset`, after which
    /// the range is clamped into `[1, full_range]` and, for the magnetometer,
    /// the offset into `[-full_range, full_range]`.
    ///
    /// # Example
    /// ```
    /// use vario_ahrs::{CalibrationProfile, SensorKind};
    ///
    /// let profile =
    ///     CalibrationProfile::load(SensorKind::Magnetometer, &[100, 300, -50, 50, -20, 60]).unwrap();
    /// assert_eq!(profile.offset().x, 200);
    /// assert_eq!(profile.range().x, 100);
    /// ```
    pub fn load(kind: SensorKind, extremes: &[i32]) -> Result<Self, CalibrationError> {
        if extremes.len() < CALIBRATION_VALUES {
            return Err(CalibrationError::InsufficientData {
                found: extremes.len(),
            });
        }
        if let Some(index) = extremes[..CALIBRATION_VALUES].iter().position(|&v| v == 0) {
            return Err(CalibrationError::InvalidValue { index });
        }

        let full_range = kind.full_range();
        let mut offset = Vector3::zeros();
        let mut range = Vector3::zeros();

        for axis in 0..3 {
            let min = i64::from(extremes[2 * axis]);
            let max = i64::from(extremes[2 * axis + 1]);
            let centre = (min + max) / 2;
            let half_span = max - centre;

            range[axis] = half_span.clamp(1, i64::from(full_range)) as i32;
            offset[axis] = match kind {
                SensorKind::Magnetometer => {
                    centre.clamp(-i64::from(full_range), i64::from(full_range)) as i32
                }
                SensorKind::Accelerometer => {
                    centre.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
                }
            };
        }

        Ok(Self {
            kind,
            enabled: true,
            offset,
            range,
        })
    }

    pub fn kind(&self) -> SensorKind {
        self.kind
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn offset(&self) -> Vector3<i32> {
        self.offset
    }

    pub fn range(&self) -> Vector3<i32> {
        self.range
    }

    /// Bias the accelerometer should subtract on-chip
    ///
    /// The accelerometer offset is removed by the device itself, which is why
    /// the transform only rescales accelerometer readings. Returns `None` for
    /// disabled or magnetometer profiles.
    pub fn device_bias(&self) -> Option<Vector3<i32>> {
        match (self.kind, self.enabled) {
            (SensorKind::Accelerometer, true) => Some(-self.offset),
            _ => None,
        }
    }
}

/// Parses the six-line text calibration format
///
/// Each line holds one integer, read the way C's `atoi` reads it: leading
/// whitespace, an optional sign, then digits up to the first non-digit.
/// Reading stops at the first missing, unparsable or zero line, and anything
/// short of six valid values is [`CalibrationError::InsufficientData`].
///
/// # Example
/// ```
/// use vario_ahrs::calibration::parse_calibration_text;
///
/// let values = parse_calibration_text("-210\n190\n-205\n230\n-180\n220\n").unwrap();
/// assert_eq!(values, [-210, 190, -205, 230, -180, 220]);
///
/// assert!(parse_calibration_text("-210\n190\n-205\n230\n-180\n").is_err());
/// ```
pub fn parse_calibration_text(text: &str) -> Result<[i32; CALIBRATION_VALUES], CalibrationError> {
    let mut values = [0; CALIBRATION_VALUES];
    let mut lines = text.lines();

    for (found, slot) in values.iter_mut().enumerate() {
        let value = lines.next().map(leading_integer).unwrap_or(0);
        if value == 0 {
            debug!(line = found, "calibration text ended early");
            return Err(CalibrationError::InsufficientData { found });
        }
        *slot = value;
    }

    Ok(values)
}

/// `atoi`-style prefix parse; anything unparsable reads as zero
fn leading_integer(line: &str) -> i32 {
    let trimmed = line.trim_start();
    let (negative, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };

    let magnitude = digits
        .bytes()
        .take_while(u8::is_ascii_digit)
        .fold(0i64, |acc, d| {
            (acc * 10 + i64::from(d - b'0')).min(i64::from(i32::MAX) + 1)
        });
    let value = if negative { -magnitude } else { magnitude };

    value.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

/// Calibration block of the persisted instrument record
///
/// Mirrors the fields of the on-board store. Magic, version and checksum are
/// the store's concern and are carried here unverified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationRecord {
    pub header: [u8; 3],
    pub data_version: u8,
    pub serial: [u8; 6],
    /// Pressure sensor zero offset from version 1 records
    pub zero_offset: f32,
    pub accel_min: [i32; 3],
    pub accel_max: [i32; 3],
    pub mag_min: [i32; 3],
    pub mag_max: [i32; 3],
    pub checksum: u8,
}

impl CalibrationRecord {
    /// Extremes for `kind` in [`CalibrationProfile::load`] order
    pub fn extremes(&self, kind: SensorKind) -> [i32; CALIBRATION_VALUES] {
        let (min, max) = match kind {
            SensorKind::Accelerometer => (self.accel_min, self.accel_max),
            SensorKind::Magnetometer => (self.mag_min, self.mag_max),
        };
        [min[0], max[0], min[1], max[1], min[2], max[2]]
    }

    pub fn profile(&self, kind: SensorKind) -> Result<CalibrationProfile, CalibrationError> {
        CalibrationProfile::load(kind, &self.extremes(kind))
    }
}

/// Maps raw accelerometer and magnetometer readings to calibrated vectors
///
/// Owns one profile per sensor. Profiles are swapped whole, between samples;
/// a failed load leaves the previous profile in place, which at start-up is a
/// disabled one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalibrationTransform {
    accelerometer: CalibrationProfile,
    magnetometer: CalibrationProfile,
}

impl CalibrationTransform {
    /// Create a transform with both sensors uncalibrated
    pub fn new() -> Self {
        Self {
            accelerometer: CalibrationProfile::disabled(SensorKind::Accelerometer),
            magnetometer: CalibrationProfile::disabled(SensorKind::Magnetometer),
        }
    }

    pub fn profile(&self, kind: SensorKind) -> &CalibrationProfile {
        match kind {
            SensorKind::Accelerometer => &self.accelerometer,
            SensorKind::Magnetometer => &self.magnetometer,
        }
    }

    /// Install a profile for the sensor it was loaded for
    pub fn set_profile(&mut self, profile: CalibrationProfile) {
        debug!(
            sensor = profile.kind().name(),
            enabled = profile.enabled(),
            range = ?profile.range(),
            offset = ?profile.offset(),
            "calibration profile installed"
        );
        match profile.kind() {
            SensorKind::Accelerometer => self.accelerometer = profile,
            SensorKind::Magnetometer => self.magnetometer = profile,
        }
    }

    /// Disable calibration for one sensor
    pub fn clear(&mut self, kind: SensorKind) {
        self.set_profile(CalibrationProfile::disabled(kind));
    }

    /// Load raw extremes, keeping the current profile on failure
    pub fn load(&mut self, kind: SensorKind, extremes: &[i32]) -> Result<(), CalibrationError> {
        match CalibrationProfile::load(kind, extremes) {
            Ok(profile) => {
                self.set_profile(profile);
                Ok(())
            }
            Err(err) => {
                warn!(sensor = kind.name(), error = %err, "calibration not loaded");
                Err(err)
            }
        }
    }

    /// Load the six-line text format, keeping the current profile on failure
    pub fn load_text(&mut self, kind: SensorKind, text: &str) -> Result<(), CalibrationError> {
        match parse_calibration_text(text) {
            Ok(extremes) => self.load(kind, &extremes),
            Err(err) => {
                warn!(sensor = kind.name(), error = %err, "calibration text rejected");
                Err(err)
            }
        }
    }

    /// Load both sensors from a persisted record
    ///
    /// Each sensor is loaded independently, so a bad magnetometer block does
    /// not discard a good accelerometer one. The first failure is returned.
    pub fn load_record(&mut self, record: &CalibrationRecord) -> Result<(), CalibrationError> {
        let accel = self.load(
            SensorKind::Accelerometer,
            &record.extremes(SensorKind::Accelerometer),
        );
        let mag = self.load(
            SensorKind::Magnetometer,
            &record.extremes(SensorKind::Magnetometer),
        );
        accel.and(mag)
    }

    /// Calibrate a raw magnetometer reading
    ///
    /// The magnetometer is mounted rotated against the body frame, so its
    /// axes are remapped: `x = raw.y`, `y = -raw.x`, `z = raw.z`.
    pub fn magnetometer(&self, raw: Vector3<i16>) -> Vector3<i16> {
        let profile = &self.magnetometer;
        if !profile.enabled {
            return Vector3::new(raw.y, raw.x.saturating_neg(), raw.z);
        }

        let full_range = SensorKind::Magnetometer.full_range();
        let axis = |index: usize| {
            scale(
                i32::from(raw[index]) - profile.offset[index],
                full_range,
                profile.range[index],
            )
        };

        Vector3::new(axis(1), saturate(-i64::from(axis(0))), axis(2))
    }

    /// Calibrate a raw accelerometer reading
    ///
    /// The device removes the offset on-chip, so readings are only rescaled
    /// and the X axis inverted.
    pub fn accelerometer(&self, raw: Vector3<i16>) -> Vector3<i16> {
        let profile = &self.accelerometer;
        if !profile.enabled {
            return Vector3::new(raw.x.saturating_neg(), raw.y, raw.z);
        }

        let full_range = SensorKind::Accelerometer.full_range();
        let axis = |index: usize| scale(i32::from(raw[index]), full_range, profile.range[index]);

        Vector3::new(saturate(-i64::from(axis(0))), axis(1), axis(2))
    }

    /// Calibrate a reading of either sensor
    pub fn apply(&self, kind: SensorKind, raw: Vector3<i16>) -> Vector3<i16> {
        match kind {
            SensorKind::Accelerometer => self.accelerometer(raw),
            SensorKind::Magnetometer => self.magnetometer(raw),
        }
    }
}

impl Default for CalibrationTransform {
    fn default() -> Self {
        Self::new()
    }
}

/// `value * full_range / range` in widened integers, truncating toward zero
fn scale(value: i32, full_range: i32, range: i32) -> i16 {
    saturate(i64::from(value) * i64::from(full_range) / i64::from(range))
}

fn saturate(value: i64) -> i16 {
    value.clamp(i64::from(i16::MIN), i64::from(i16::MAX)) as i16
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ACCEL_SENSOR_RANGE, MAG_SENSOR_RANGE};

    #[test]
    fn test_offset_and_range() {
        let profile =
            CalibrationProfile::load(SensorKind::Magnetometer, &[100, 300, -400, 200, 7, 9])
                .unwrap();

        assert!(profile.enabled());
        assert_eq!(profile.offset(), Vector3::new(200, -100, 8));
        assert_eq!(profile.range(), Vector3::new(100, 300, 1));
    }

    #[test]
    fn test_range_clamped() {
        // max == min gives a zero range; a wide span exceeds the full range
        let profile =
            CalibrationProfile::load(SensorKind::Magnetometer, &[50, 50, -9000, 9000, -1, 1])
                .unwrap();
        assert_eq!(profile.range().x, 1);
        assert_eq!(profile.range().y, MAG_SENSOR_RANGE);
        assert_eq!(profile.range().z, 1);

        let profile = CalibrationProfile::load(
            SensorKind::Accelerometer,
            &[-40000, 40000, -16000, 16000, 3, 3],
        )
        .unwrap();
        assert_eq!(profile.range().x, ACCEL_SENSOR_RANGE);
        assert_eq!(profile.range().y, 16000);
        assert_eq!(profile.range().z, 1);
    }

    #[test]
    fn test_mag_offset_clamped_accel_offset_not() {
        let extremes = [9000, 9200, -9200, -9000, 100, 300];

        let mag = CalibrationProfile::load(SensorKind::Magnetometer, &extremes).unwrap();
        assert_eq!(mag.offset().x, MAG_SENSOR_RANGE);
        assert_eq!(mag.offset().y, -MAG_SENSOR_RANGE);
        assert_eq!(mag.offset().z, 200);

        let accel = CalibrationProfile::load(SensorKind::Accelerometer, &extremes).unwrap();
        assert_eq!(accel.offset().x, 9100);
        assert_eq!(accel.offset().y, -9100);
    }

    #[test]
    fn test_load_rejects_short_and_zero_input() {
        assert_eq!(
            CalibrationProfile::load(SensorKind::Magnetometer, &[1, 2, 3, 4, 5]),
            Err(CalibrationError::InsufficientData { found: 5 })
        );
        assert_eq!(
            CalibrationProfile::load(SensorKind::Magnetometer, &[1, 2, 3, 0, 5, 6]),
            Err(CalibrationError::InvalidValue { index: 3 })
        );
    }

    #[test]
    fn test_device_bias() {
        let accel =
            CalibrationProfile::load(SensorKind::Accelerometer, &[-100, 300, -10, 30, 5, 15])
                .unwrap();
        assert_eq!(accel.device_bias(), Some(Vector3::new(-100, -10, -10)));

        let mag =
            CalibrationProfile::load(SensorKind::Magnetometer, &[-100, 300, -10, 30, 5, 15])
                .unwrap();
        assert_eq!(mag.device_bias(), None);
        assert_eq!(
            CalibrationProfile::disabled(SensorKind::Accelerometer).device_bias(),
            None
        );
    }

    #[test]
    fn test_parse_text() {
        let values = parse_calibration_text("  -210\n+190 counts\n-205\n230\r\n-180\n220\nextra\n")
            .unwrap();
        assert_eq!(values, [-210, 190, -205, 230, -180, 220]);
    }

    #[test]
    fn test_parse_text_five_valid_values() {
        let text = "-210\n190\n-205\nbogus\n-180\n220\n";
        assert_eq!(
            parse_calibration_text(text),
            Err(CalibrationError::InsufficientData { found: 3 })
        );

        let text = "-210\n190\n-205\n230\n-180\n0\n";
        assert_eq!(
            parse_calibration_text(text),
            Err(CalibrationError::InsufficientData { found: 5 })
        );
    }

    #[test]
    fn test_leading_integer() {
        assert_eq!(leading_integer("42"), 42);
        assert_eq!(leading_integer("\t-17abc"), -17);
        assert_eq!(leading_integer("abc"), 0);
        assert_eq!(leading_integer("-"), 0);
        assert_eq!(leading_integer("99999999999"), i32::MAX);
    }

    #[test]
    fn test_disabled_remap() {
        let transform = CalibrationTransform::new();
        let raw = Vector3::new(10, -20, 30);

        assert_eq!(transform.magnetometer(raw), Vector3::new(-20, -10, 30));
        assert_eq!(transform.accelerometer(raw), Vector3::new(-10, -20, 30));
    }

    #[test]
    fn test_magnetometer_scaling() {
        let mut transform = CalibrationTransform::new();
        transform
            .load(SensorKind::Magnetometer, &[-100, 300, -200, 200, 400, 600])
            .unwrap();

        // offset (100, 0, 500), range (200, 200, 100)
        let raw = Vector3::new(200, 50, 550);
        let calibrated = transform.magnetometer(raw);

        assert_eq!(calibrated.x, (50 * MAG_SENSOR_RANGE / 200) as i16);
        assert_eq!(calibrated.y, -((100 * MAG_SENSOR_RANGE / 200) as i16));
        assert_eq!(calibrated.z, (50 * MAG_SENSOR_RANGE / 100) as i16);
    }

    #[test]
    fn test_accelerometer_scaling_ignores_offset() {
        let mut transform = CalibrationTransform::new();
        transform
            .load(
                SensorKind::Accelerometer,
                &[-16000, 16000, -8000, 8000, -15000, 17000],
            )
            .unwrap();

        let raw = Vector3::new(8000, -4000, 16000);
        let calibrated = transform.accelerometer(raw);

        assert_eq!(calibrated, Vector3::new(-16000, -16000, 32000));
    }

    #[test]
    fn test_scaling_saturates() {
        let mut transform = CalibrationTransform::new();
        transform
            .load(SensorKind::Magnetometer, &[-1, 1, -1, 1, -1, 1])
            .unwrap();

        let calibrated = transform.magnetometer(Vector3::new(i16::MIN, i16::MAX, 1000));
        assert_eq!(calibrated, Vector3::new(i16::MAX, i16::MAX, i16::MAX));
    }

    #[test]
    fn test_failed_load_keeps_previous_profile() {
        let mut transform = CalibrationTransform::new();
        assert!(transform.load_text(SensorKind::Magnetometer, "1\n2\n3\n4\n5\n").is_err());
        assert!(!transform.profile(SensorKind::Magnetometer).enabled());

        transform
            .load(SensorKind::Magnetometer, &[-100, 300, -200, 200, 400, 600])
            .unwrap();
        let loaded = *transform.profile(SensorKind::Magnetometer);

        assert!(transform.load(SensorKind::Magnetometer, &[0; 6]).is_err());
        assert_eq!(*transform.profile(SensorKind::Magnetometer), loaded);
    }

    #[test]
    fn test_load_record() {
        let record = CalibrationRecord {
            header: *b"OVC",
            data_version: 2,
            serial: *b"000123",
            zero_offset: 0.25,
            accel_min: [-16100, -16300, -16800],
            accel_max: [16500, 16200, 15900],
            mag_min: [-310, -290, 0],
            mag_max: [270, 330, 410],
            checksum: 0,
        };

        let mut transform = CalibrationTransform::new();
        let result = transform.load_record(&record);

        assert_eq!(result, Err(CalibrationError::InvalidValue { index: 4 }));
        assert!(transform.profile(SensorKind::Accelerometer).enabled());
        assert!(!transform.profile(SensorKind::Magnetometer).enabled());
        assert_eq!(
            record.extremes(SensorKind::Accelerometer),
            [-16100, 16500, -16300, 16200, -16800, 15900]
        );
    }

    #[test]
    fn test_record_profile_matches_load() {
        let mut record = CalibrationRecord {
            header: *b"OVC",
            data_version: 2,
            serial: *b"000123",
            zero_offset: 0.0,
            accel_min: [-16100, -16300, -16800],
            accel_max: [16500, 16200, 15900],
            mag_min: [-310, -290, 0],
            mag_max: [270, 330, 410],
            checksum: 0,
        };

        for kind in [SensorKind::Accelerometer, SensorKind::Magnetometer] {
            assert_eq!(
                record.profile(kind),
                CalibrationProfile::load(kind, &record.extremes(kind))
            );
        }
        assert_eq!(
            record.profile(SensorKind::Magnetometer),
            Err(CalibrationError::InvalidValue { index: 4 })
        );

        record.mag_min[2] = -420;
        let profile = record.profile(SensorKind::Magnetometer).unwrap();
        assert_eq!(profile.offset(), Vector3::new(-20, 20, -5));
    }

    #[test]
    fn test_clear_restores_disabled_remap() {
        let mut transform = CalibrationTransform::new();
        transform
            .load(SensorKind::Magnetometer, &[-100, 300, -200, 200, -50, 50])
            .unwrap();
        transform
            .load(SensorKind::Accelerometer, &[-16000, 16000, -16000, 16000, -16000, 16000])
            .unwrap();

        let raw = Vector3::new(120, -40, 30);
        assert_ne!(transform.magnetometer(raw), Vector3::new(-40, -120, 30));

        transform.clear(SensorKind::Magnetometer);
        assert!(!transform.profile(SensorKind::Magnetometer).enabled());
        assert_eq!(transform.magnetometer(raw), Vector3::new(-40, -120, 30));
        // the other sensor keeps its profile
        assert!(transform.profile(SensorKind::Accelerometer).enabled());

        transform.clear(SensorKind::Accelerometer);
        assert_eq!(transform.accelerometer(raw), Vector3::new(-120, -40, 30));
        assert_eq!(transform, CalibrationTransform::new());
    }

    #[test]
    fn test_apply_dispatches_by_sensor() {
        let mut transform = CalibrationTransform::new();
        transform
            .load(SensorKind::Magnetometer, &[-310, 270, -290, 330, -420, 410])
            .unwrap();
        transform
            .load(SensorKind::Accelerometer, &[-16100, 16500, -16300, 16200, -16800, 15900])
            .unwrap();

        for raw in [
            Vector3::new(0, 0, 0),
            Vector3::new(250, -100, 400),
            Vector3::new(-16000, 8000, 16000),
        ] {
            assert_eq!(
                transform.apply(SensorKind::Magnetometer, raw),
                transform.magnetometer(raw)
            );
            assert_eq!(
                transform.apply(SensorKind::Accelerometer, raw),
                transform.accelerometer(raw)
            );
        }
    }
}
