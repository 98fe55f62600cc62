use nalgebra::{UnitQuaternion, Vector3};
use std::error::Error;
use vario_ahrs::{Ahrs, FusionConfig, RawSample, RpylRecord};

const Q30: f32 = (1u32 << 30) as f32;

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let mut ahrs = Ahrs::try_new(FusionConfig::default())?;

    for i in 0..10 {
        // this loop should repeat each time the device has a new sample
        let q = UnitQuaternion::from_euler_angles(0.05 * i as f32, 0.0, 0.1 * i as f32);
        let sample = RawSample {
            quaternion: [
                (q.w * Q30) as i32,
                (q.i * Q30) as i32,
                (q.j * Q30) as i32,
                (q.k * Q30) as i32,
            ], // replace with the device quaternion
            magnetometer: Vector3::new(-40, 210, -380), // replace with the raw magnetometer
            ..Default::default()
        };

        match ahrs.process(&sample) {
            Ok(attitude) => {
                let degrees = attitude.degrees();
                println!(
                    "Roll: {:.2}, Pitch: {:.2}, Heading: {:.2}  {:?}",
                    degrees.x,
                    degrees.y,
                    degrees.z,
                    RpylRecord::from(&attitude).to_string()
                );
            }
            Err(err) => println!("sample skipped: {}", err),
        }
    }

    Ok(())
}
