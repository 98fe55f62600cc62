//! Mounting orientations of the instrument panel
//!
//! The sensor board can be installed in four positions, each rotated about the
//! aircraft's longitudinal axis. Each position maps to a signed permutation
//! matrix that tells the motion co-processor how its axes relate to the
//! aircraft body (X forward, Y right wing, Z down).
//!
//! # Example
//! ```
//! use nalgebra::Vector3;
//! use vario_ahrs::{Mounting, rotation_matrix};
//!
//! let matrix = rotation_matrix(1);
//! assert_eq!(matrix, Mounting::Portrait90.matrix());
//!
//! // body = matrix * sensor
//! let body = matrix.apply(Vector3::new(1.0, 2.0, 3.0));
//! assert_eq!(body, Vector3::new(1.0, 3.0, -2.0));
//! ```

use nalgebra::Vector3;
use tracing::warn;

/// A 3x3 matrix with exactly one `±1` per row and column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SignedPermutation([[i8; 3]; 3]);

impl SignedPermutation {
    pub const IDENTITY: Self = Self([[1, 0, 0], [0, 1, 0], [0, 0, 1]]);

    /// Wrap raw rows; returns `None` unless they form a signed permutation
    pub fn new(rows: [[i8; 3]; 3]) -> Option<Self> {
        let candidate = Self(rows);
        candidate.is_valid().then_some(candidate)
    }

    pub fn rows(&self) -> [[i8; 3]; 3] {
        self.0
    }

    /// Every row and column holds exactly one nonzero entry, which is `±1`
    pub fn is_valid(&self) -> bool {
        let entries_ok = self.0.iter().flatten().all(|&v| (-1..=1).contains(&v));
        let rows_ok = self
            .0
            .iter()
            .all(|row| row.iter().filter(|&&v| v != 0).count() == 1);
        let columns_ok =
            (0..3).all(|c| (0..3).filter(|&r| self.0[r][c] != 0).count() == 1);
        entries_ok && rows_ok && columns_ok
    }

    /// Multiply a sensor-frame vector into the body frame
    pub fn apply(&self, sensor: Vector3<f32>) -> Vector3<f32> {
        let row = |r: usize| {
            (0..3)
                .map(|c| f32::from(self.0[r][c]) * sensor[c])
                .sum::<f32>()
        };
        Vector3::new(row(0), row(1), row(2))
    }

    /// The inverse mapping (body frame back to sensor frame)
    pub fn transpose(&self) -> Self {
        let m = self.0;
        Self([
            [m[0][0], m[1][0], m[2][0]],
            [m[0][1], m[1][1], m[2][1]],
            [m[0][2], m[1][2], m[2][2]],
        ])
    }

    /// Packed orientation scalar understood by the motion co-processor
    ///
    /// Three bits per row, row 0 in the low bits. Each row encodes the
    /// position and sign of its nonzero entry: 0/1/2 for +x/+y/+z,
    /// 4/5/6 for -x/-y/-z, and 7 for a row with no entry.
    pub fn dmp_scalar(&self) -> u16 {
        self.0
            .iter()
            .enumerate()
            .fold(0, |scalar, (r, row)| scalar | (row_scale(row) << (3 * r)))
    }
}

fn row_scale(row: &[i8; 3]) -> u16 {
    match row.iter().position(|&v| v != 0) {
        Some(c) if row[c] > 0 => c as u16,
        Some(c) => c as u16 + 4,
        None => 7,
    }
}

/// Installed position of the sensor board
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub enum Mounting {
    /// Normal landscape installation
    #[default]
    Landscape,
    /// Portrait, rotated 90°
    Portrait90,
    /// Landscape, upside down
    Landscape180,
    /// Portrait, rotated 270°
    Portrait270,
}

impl Mounting {
    pub const ALL: [Mounting; 4] = [
        Mounting::Landscape,
        Mounting::Portrait90,
        Mounting::Landscape180,
        Mounting::Portrait270,
    ];

    /// Look up a mounting by its configuration id
    ///
    /// Unknown ids fall back to [`Mounting::Landscape`]; the fallback is
    /// logged but not treated as an error.
    pub fn from_id(id: u8) -> Self {
        match id {
            0 => Mounting::Landscape,
            1 => Mounting::Portrait90,
            2 => Mounting::Landscape180,
            3 => Mounting::Portrait270,
            other => {
                warn!(id = other, "unknown mounting id, using landscape");
                Mounting::Landscape
            }
        }
    }

    pub fn id(self) -> u8 {
        match self {
            Mounting::Landscape => 0,
            Mounting::Portrait90 => 1,
            Mounting::Landscape180 => 2,
            Mounting::Portrait270 => 3,
        }
    }

    /// Axis mapping handed to the motion co-processor for gyro fusion
    pub fn matrix(self) -> SignedPermutation {
        match self {
            Mounting::Landscape => SignedPermutation([[1, 0, 0], [0, -1, 0], [0, 0, -1]]),
            Mounting::Portrait90 => SignedPermutation([[1, 0, 0], [0, 0, 1], [0, -1, 0]]),
            Mounting::Landscape180 => SignedPermutation::IDENTITY,
            Mounting::Portrait270 => SignedPermutation([[1, 0, 0], [0, 0, -1], [0, 1, 0]]),
        }
    }
}

/// Matrix for a mounting id, with unknown ids treated as id 0
pub fn rotation_matrix(id: u8) -> SignedPermutation {
    Mounting::from_id(id).matrix()
}
