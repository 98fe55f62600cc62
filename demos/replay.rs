//! Replay a recorded sample log through calibration and fusion
//!
//! Reads raw samples from a CSV file, optionally loads the six-line
//! accelerometer and magnetometer calibration files, and prints one `$RPYL`
//! record per fused sample.
//!
//! Run with: `cargo run --example replay -- samples.csv [accelcal.txt] [magcal.txt]`

use nalgebra::Vector3;
use serde::Deserialize;
use std::error::Error;
use std::io::Write;
use vario_ahrs::{Ahrs, FusionConfig, RawSample, RpylRecord, SensorKind};

#[derive(Debug, Deserialize)]
struct LoggedSample {
    qw: i32,
    qx: i32,
    qy: i32,
    qz: i32,
    ax: i16,
    ay: i16,
    az: i16,
    mx: i16,
    my: i16,
    mz: i16,
}

impl From<LoggedSample> for RawSample {
    fn from(row: LoggedSample) -> Self {
        RawSample {
            quaternion: [row.qw, row.qx, row.qy, row.qz],
            accelerometer: Vector3::new(row.ax, row.ay, row.az),
            magnetometer: Vector3::new(row.mx, row.my, row.mz),
        }
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let mut args = std::env::args().skip(1);
    let samples_path = args.next().ok_or("usage: replay <samples.csv> [accelcal] [magcal]")?;

    let mut ahrs = Ahrs::try_new(FusionConfig::default())?;

    // missing or bad calibration leaves the sensor uncalibrated
    for (kind, path) in [SensorKind::Accelerometer, SensorKind::Magnetometer]
        .into_iter()
        .zip(args)
    {
        match std::fs::read_to_string(&path) {
            Ok(text) => {
                if let Err(err) = ahrs.calibration_mut().load_text(kind, &text) {
                    eprintln!("{}: {}", path, err);
                }
            }
            Err(err) => eprintln!("{}: {}", path, err),
        }
    }

    let mut reader = csv::Reader::from_path(&samples_path)?;
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    let mut fused = 0usize;
    let mut skipped = 0usize;
    for row in reader.deserialize() {
        let sample: RawSample = row.map(|logged: LoggedSample| logged.into())?;

        match ahrs.process(&sample) {
            Ok(attitude) => {
                write!(out, "{}", RpylRecord::from(&attitude))?;
                writeln!(out)?;
                fused += 1;
            }
            Err(_) => skipped += 1,
        }
    }

    eprintln!("{} samples fused, {} skipped", fused, skipped);
    Ok(())
}
