//! Watch a (simulated) ADXRS450 gyro from the command line.
//!
//! Brings the driver up against the behavioral simulation, calibrates, then
//! sweeps the simulated rate and prints heading and rate at 10 Hz. Useful
//! for eyeballing the calibration and integration behavior without a robot.

use std::thread;
use std::time::{Duration, Instant};

use clap::Parser;
use tracing::info;

use hardware::adxrs450::{sim::SimAdxrs450, Adxrs450, CalibrationConfig};
use hardware::spi::SpiPort;

#[derive(Parser)]
#[command(about = "Watch a simulated ADXRS450 gyro")]
struct Args {
    /// How long to watch, in seconds
    #[arg(long, default_value_t = 10.0, value_parser = seconds)]
    duration: f64,

    /// Simulated turn rate in degrees per second
    #[arg(long, default_value_t = 45.0)]
    rate: f64,

    /// Simulated at-rest bias in raw LSBs
    #[arg(long, default_value_t = 57)]
    bias: i16,

    /// Calibration window in seconds
    #[arg(long, default_value_t = 2.0, value_parser = seconds)]
    calibration: f64,
}

/// Parse a non-negative, finite number of seconds; `Duration::from_secs_f64`
/// panics on anything else.
fn seconds(arg: &str) -> Result<f64, String> {
    let secs: f64 = arg.parse().map_err(|err| format!("{err}"))?;
    if secs.is_finite() && secs >= 0.0 {
        Ok(secs)
    } else {
        Err("must be a non-negative number of seconds".into())
    }
}

fn main() {
    tracing_subscriber::fmt::init();

    let args = Args::parse();

    let (bus, handle) = SimAdxrs450::new();
    handle.set_rate_lsb(args.bias);

    info!("calibrating for {:.1}s, keep the robot still", args.calibration);
    let mut gyro = Adxrs450::with_calibration(
        SpiPort::OnboardCs0,
        bus,
        CalibrationConfig {
            settle: Duration::from_millis(100),
            sample_window: Duration::from_secs_f64(args.calibration),
        },
    );

    // Start turning: bias plus the requested rate in LSBs.
    let rate_lsb = args.bias + (args.rate / 0.0125).round() as i16;
    handle.set_rate_lsb(rate_lsb);
    info!("simulating {:.1} °/s on top of a {} LSB bias", args.rate, args.bias);

    let end = Instant::now() + Duration::from_secs_f64(args.duration);
    while Instant::now() < end {
        println!("heading {:9.3}°   rate {:8.3} °/s", gyro.angle(), gyro.rate());
        thread::sleep(Duration::from_millis(100));
    }

    gyro.free();
}

#[cfg(test)]
mod tests {
    use super::seconds;

    #[test]
    fn test_seconds_rejects_values_duration_cannot_hold() {
        assert_eq!(seconds("2.5"), Ok(2.5));
        assert_eq!(seconds("0"), Ok(0.0));
        assert!(seconds("-1").is_err());
        assert!(seconds("NaN").is_err());
        assert!(seconds("inf").is_err());
        assert!(seconds("ten").is_err());
    }
}
