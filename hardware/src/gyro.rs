//! Gyro interface trait consumed by the control loop.

/// Interface for a single-axis heading gyro.
///
/// Abstracts the sensor hardware so control code can be tested against a
/// canned implementation. Readings are bias-corrected; a missing or failed
/// device reads as zero rather than erroring, so one absent sensor never
/// stops the rest of the robot from running.
pub trait Gyro {
    /// Integrated heading in degrees since the last reset, positive
    /// clockwise. Continuous past ±360°.
    fn angle(&self) -> f64;

    /// Instantaneous angular rate in degrees per second.
    fn rate(&self) -> f64;

    /// Zero the heading without disturbing the calibrated bias.
    fn reset(&mut self);

    /// Re-run bias calibration. The robot must be stationary for the whole
    /// calibration window; blocks until it completes.
    fn calibrate(&mut self);
}
