//! Unit conversion for ADXRS450 rate samples
//!
//! Converts raw accumulator ticks to degrees and degrees per second.

/// Accumulator sampling interval in seconds.
pub const SAMPLE_PERIOD_S: f64 = 0.001;

/// Sensitivity from the datasheet: one rate LSB is 0.0125 °/s.
pub const DEGREES_PER_SECOND_PER_LSB: f64 = 0.0125;

/// Convert an accumulated tick sum into an integrated angle in degrees.
///
/// Each tick is a rate sample held for one sample period, so the running
/// sum times sensitivity times the period is the integrated heading.
pub fn accumulated_ticks_to_degrees(ticks: i64) -> f64 {
    ticks as f64 * DEGREES_PER_SECOND_PER_LSB * SAMPLE_PERIOD_S
}

/// Convert a single bias-corrected rate sample into degrees per second.
pub fn sample_to_degrees_per_second(sample: i64) -> f64 {
    sample as f64 * DEGREES_PER_SECOND_PER_LSB
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_angle_conversion() {
        // 800 ticks * 0.0125 °/s/LSB * 0.001 s = 0.01 °
        assert_relative_eq!(accumulated_ticks_to_degrees(800), 0.01, epsilon = 1e-12);
    }

    #[test]
    fn test_rate_conversion() {
        // 80 LSB * 0.0125 °/s/LSB = 1.0 °/s
        assert_relative_eq!(sample_to_degrees_per_second(80), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_negative_rates() {
        assert_relative_eq!(sample_to_degrees_per_second(-80), -1.0, epsilon = 1e-12);
        assert_relative_eq!(accumulated_ticks_to_degrees(-800), -0.01, epsilon = 1e-12);
    }

    #[test]
    fn test_zero_is_zero() {
        assert_eq!(accumulated_ticks_to_degrees(0), 0.0);
        assert_eq!(sample_to_degrees_per_second(0), 0.0);
    }
}
