//! `$RPYL` attitude sentence for gliding computers
//!
//! The record carries roll, pitch and magnetic heading in whole degrees,
//! followed by side slip, yaw rate and load factor (not measured, always 0)
//! and a status word. It starts with a carriage return and ends with a tab.

use core::fmt;

use crate::math::RAD_TO_DEG;
use crate::types::FusedAttitude;

/// One `$RPYL` record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RpylRecord {
    pub roll: i32,
    /// Nose-up positive, the opposite of the fused pitch sign
    pub pitch: i32,
    pub heading: i32,
    /// Status bits; the fusion core reports none
    pub status: u16,
}

impl From<&FusedAttitude> for RpylRecord {
    fn from(attitude: &FusedAttitude) -> Self {
        let degrees = |radians: f32| (radians * RAD_TO_DEG).round() as i32;
        Self {
            roll: degrees(attitude.euler.roll),
            pitch: -degrees(attitude.euler.pitch),
            heading: degrees(attitude.euler.yaw),
            status: 0,
        }
    }
}

impl fmt::Display for RpylRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "\r$RPYL,{},{},{},0,0,0,{}\t",
            self.roll, self.pitch, self.heading, self.status
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::{DEG_TO_RAD, EulerAngles};
    use nalgebra::UnitQuaternion;

    fn attitude(roll: f32, pitch: f32, yaw: f32) -> FusedAttitude {
        let euler = EulerAngles::new(roll * DEG_TO_RAD, pitch * DEG_TO_RAD, yaw * DEG_TO_RAD);
        FusedAttitude {
            euler,
            quaternion: UnitQuaternion::from_euler_angles(euler.roll, euler.pitch, euler.yaw),
        }
    }

    #[test]
    fn test_pitch_inverted_heading_and_roll_not() {
        let record = RpylRecord::from(&attitude(12.4, 5.6, -120.2));
        assert_eq!(record.roll, 12);
        assert_eq!(record.pitch, -6);
        assert_eq!(record.heading, -120);
        assert_eq!(record.status, 0);
    }

    #[test]
    fn test_sentence_layout() {
        let record = RpylRecord::from(&attitude(-3.0, -10.0, 45.0));
        assert_eq!(record.to_string(), "\r$RPYL,-3,10,45,0,0,0,0\t");
    }

    #[test]
    fn test_level_has_no_negative_zero() {
        let record = RpylRecord::from(&attitude(0.0, -0.0, 0.0));
        assert_eq!(record.to_string(), "\r$RPYL,0,0,0,0,0,0,0\t");
    }
}
