//! ADXRS450 register map
//!
//! Only the registers the driver touches are listed; the rest of the map is
//! continuous self-test and quadrature machinery the driver never reads.

/// Angular rate, signed 16-bit, 0.0125 °/s per LSB.
pub const RATE: u8 = 0x00;
/// Die temperature.
pub const TEMPERATURE: u8 = 0x02;
/// Continuous self-test, low word.
pub const LO_CST: u8 = 0x04;
/// Continuous self-test, high word.
pub const HI_CST: u8 = 0x06;
/// Quadrature error.
pub const QUAD: u8 = 0x08;
/// Fault flags.
pub const FAULT: u8 = 0x0A;
/// Part ID.
pub const PID: u8 = 0x0C;
/// Serial number, upper 16 bits.
pub const SN_HIGH: u8 = 0x0E;
/// Serial number, lower 16 bits.
pub const SN_LOW: u8 = 0x10;

/// Device-family signature: the high byte of the PID register.
///
/// Every ADXRS450 reports `0x52` here; the low byte varies by revision and
/// is not checked.
pub const PART_ID_SIGNATURE: u8 = 0x52;

/// True when a PID register value identifies an ADXRS450.
pub fn is_adxrs450(pid: u16) -> bool {
    (pid & 0xFF00) == (PART_ID_SIGNATURE as u16) << 8
}
