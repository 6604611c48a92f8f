//! ADXRS450 Digital Output Gyroscope Driver
//!
//! Single-axis SPI rate gyro used for robot heading. The driver owns one
//! chip-select channel exclusively, validates the part ID before trusting
//! any reading, and then leaves steady-state sampling to a free-running
//! [`Accumulator`] engine: the control loop reads pre-accumulated ticks and
//! never issues per-sample register reads.
//!
//! # Degraded operation
//!
//! A robot must start with or without every sensor, so a failed identity
//! check never fails construction. The driver releases the channel, reports
//! the missing part on the error log, and settles into a disabled state
//! where [`angle`](Adxrs450::angle) and [`rate`](Adxrs450::rate) read `0.0`
//! and [`calibrate`](Adxrs450::calibrate)/[`reset`](Adxrs450::reset) are
//! no-ops. The state is a plain two-variant enum so every degraded path is
//! visible at the match sites.
//!
//! # Calibration
//!
//! Construction (and any later [`calibrate`](Adxrs450::calibrate) call)
//! blocks while the accumulator watches the stationary sensor, then adopts
//! the observed average as the bias center. The driver makes no attempt to
//! detect motion during the window; keep the robot still.
//!
//! # Example
//!
//! ```no_run
//! use hardware::adxrs450::{sim::SimAdxrs450, Adxrs450};
//! use hardware::spi::SpiPort;
//!
//! let (bus, _handle) = SimAdxrs450::new();
//! let mut gyro = Adxrs450::new(SpiPort::OnboardCs0, bus);
//! println!("heading: {:.2}°", gyro.angle());
//! gyro.reset();
//! ```

pub mod frame;
pub mod registers;
pub mod scale;
pub mod sim;

use std::mem;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::gyro::Gyro;
use crate::spi::accumulator::{Accumulator, AccumulatorConfig};
use crate::spi::{PortConfig, SpiBus, SpiPort};

/// Electrical configuration the ADXRS450 requires: 3 MHz clock, MSB first,
/// data sampled on the leading edge, chip select active low.
pub const PORT_CONFIG: PortConfig = PortConfig {
    clock_hz: 3_000_000,
    msb_first: true,
    sample_on_trailing_edge: false,
    chip_select_active_low: true,
};

/// Command word the accumulator transmits to request a sensor-data frame.
pub const SENSOR_DATA_CMD: u32 = 0x2000_0000;

/// Accumulator configuration for the part: sensor-data responses carry a
/// signed 16-bit rate field at bit 10, valid when the response-type bits
/// read sensor-data and no fault bits are raised.
const ACCUMULATOR_CONFIG: AccumulatorConfig = AccumulatorConfig {
    // One sample per scale::SAMPLE_PERIOD_S.
    period: Duration::from_millis(1),
    cmd: SENSOR_DATA_CMD,
    valid_mask: 0x0C00_000E,
    valid_value: 0x0400_0000,
    data_shift: 10,
    data_size: 16,
    is_signed: true,
};

/// Timing for the blocking bias-calibration procedure.
#[derive(Debug, Clone, Copy)]
pub struct CalibrationConfig {
    /// Settle delay before the measurement window, letting the bus and part
    /// stabilize after power-up or reconfiguration.
    pub settle: Duration,
    /// Length of the stationary measurement window.
    pub sample_window: Duration,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            settle: Duration::from_millis(100),
            sample_window: Duration::from_secs(5),
        }
    }
}

enum State<B: SpiBus + 'static> {
    /// Device validated; the accumulator is sampling on the shared bus.
    Ready {
        bus: Arc<Mutex<B>>,
        accumulator: Accumulator,
    },
    /// Device absent, failed validation, or freed. Terminal.
    Disabled,
}

/// Driver for the ADXRS450 gyro on one SPI channel.
///
/// Construct with an opened, exclusively-owned bus channel. Constructing two
/// drivers over the same physical channel is unsupported; the caller is
/// responsible for unique channel assignment.
pub struct Adxrs450<B: SpiBus + 'static> {
    port: SpiPort,
    calibration: CalibrationConfig,
    state: State<B>,
}

impl<B: SpiBus + 'static> Adxrs450<B> {
    /// Open the driver on `port`, validate the part, and run the full
    /// (multi-second) bias calibration. Never fails: a missing or
    /// unrecognized part leaves the driver in the disabled, always-zero
    /// state.
    pub fn new(port: SpiPort, bus: B) -> Self {
        Self::with_calibration(port, bus, CalibrationConfig::default())
    }

    /// As [`new`](Self::new), with explicit calibration timing. Bench tools
    /// and tests use this to shorten the stationary window.
    pub fn with_calibration(port: SpiPort, mut bus: B, calibration: CalibrationConfig) -> Self {
        if let Err(err) = bus.configure(&PORT_CONFIG) {
            error!(%err, "failed to configure SPI port {port} for ADXRS450");
            Self::release(&mut bus, port);
            return Self {
                port,
                calibration,
                state: State::Disabled,
            };
        }

        let pid = read_register(&mut bus, registers::PID);
        if !registers::is_adxrs450(pid) {
            error!("could not find ADXRS450 gyro on SPI port {port} (part ID {pid:#06x})");
            Self::release(&mut bus, port);
            return Self {
                port,
                calibration,
                state: State::Disabled,
            };
        }

        let serial = ((read_register(&mut bus, registers::SN_HIGH) as u32) << 16)
            | read_register(&mut bus, registers::SN_LOW) as u32;
        info!("ADXRS450 on SPI port {port}: part ID {pid:#06x}, serial {serial:#010x}");

        let bus = Arc::new(Mutex::new(bus));
        let accumulator = Accumulator::start(Arc::clone(&bus), ACCUMULATOR_CONFIG);
        let mut gyro = Self {
            port,
            calibration,
            state: State::Ready { bus, accumulator },
        };
        gyro.calibrate();
        gyro
    }

    /// Whether the part answered its identity check and the driver is live.
    pub fn is_connected(&self) -> bool {
        matches!(self.state, State::Ready { .. })
    }

    /// Integrated heading in degrees since the last reset. `0.0` when
    /// disabled.
    pub fn angle(&self) -> f64 {
        match &self.state {
            State::Ready { accumulator, .. } => {
                scale::accumulated_ticks_to_degrees(accumulator.value())
            }
            State::Disabled => 0.0,
        }
    }

    /// Bias-corrected angular rate in degrees per second, from the most
    /// recent accumulator sample. `0.0` when disabled.
    pub fn rate(&self) -> f64 {
        match &self.state {
            State::Ready { accumulator, .. } => {
                scale::sample_to_degrees_per_second(accumulator.last_value())
            }
            State::Disabled => 0.0,
        }
    }

    /// Zero the integrated heading. The calibrated bias center is kept, so
    /// this is safe to call any time the robot's reference heading changes.
    pub fn reset(&mut self) {
        if let State::Ready { accumulator, .. } = &self.state {
            accumulator.reset();
        }
    }

    /// Measure the at-rest bias and adopt it as the accumulator center.
    ///
    /// Blocks for the settle delay plus the full sample window; the sensor
    /// must be stationary throughout. Runs once during construction and may
    /// be re-run after the robot is repositioned. No-op when disabled.
    pub fn calibrate(&mut self) {
        let State::Ready { accumulator, .. } = &self.state else {
            return;
        };
        debug!(
            window_ms = self.calibration.sample_window.as_millis() as u64,
            "calibrating ADXRS450 on SPI port {}", self.port
        );
        thread::sleep(self.calibration.settle);

        accumulator.set_center(0);
        accumulator.reset();
        thread::sleep(self.calibration.sample_window);

        let center = accumulator.average().round() as i64;
        accumulator.set_center(center);
        accumulator.reset();
        info!("ADXRS450 on SPI port {} calibrated, center {center}", self.port);
    }

    /// Stop the accumulator and release the SPI channel. Idempotent; a
    /// second call (or a later drop) does nothing. Also runs on drop.
    pub fn free(&mut self) {
        match mem::replace(&mut self.state, State::Disabled) {
            State::Ready {
                bus,
                mut accumulator,
            } => {
                accumulator.stop();
                drop(accumulator);
                // Runs from Drop: recover a mutex poisoned by a panicked
                // sampler so the channel still gets released without a
                // panic-in-drop abort.
                let mut bus = bus.lock().unwrap_or_else(|e| e.into_inner());
                Self::release(&mut bus, self.port);
            }
            State::Disabled => {}
        }
    }

    /// Close the channel, logging rather than propagating any failure.
    fn release(bus: &mut B, port: SpiPort) {
        if let Err(err) = bus.close() {
            warn!(%err, "failed to close SPI port {port}");
        }
    }
}

impl<B: SpiBus + 'static> Gyro for Adxrs450<B> {
    fn angle(&self) -> f64 {
        Adxrs450::angle(self)
    }

    fn rate(&self) -> f64 {
        Adxrs450::rate(self)
    }

    fn reset(&mut self) {
        Adxrs450::reset(self);
    }

    fn calibrate(&mut self) {
        Adxrs450::calibrate(self);
    }
}

impl<B: SpiBus + 'static> Drop for Adxrs450<B> {
    fn drop(&mut self) {
        self.free();
    }
}

/// Issue one register-read transaction. Transport failures and no-data
/// responses both read as zero; register reads only happen during
/// initialization, where a zero simply fails the identity check.
fn read_register<B: SpiBus>(bus: &mut B, reg: u8) -> u16 {
    let mut response = [0u8; 4];
    let result = bus
        .write(&frame::encode_read(reg))
        .and_then(|_| bus.read(&mut response));
    match result {
        Ok(_) => frame::decode(response).unwrap_or(0),
        Err(err) => {
            debug!(%err, "register {reg:#04x} read failed");
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::sim::SimAdxrs450;
    use super::*;
    use crate::spi::mock::MockSpi;
    use crate::spi::SpiResult;
    use approx::assert_relative_eq;

    /// Mock transport that stays visible to the test after the driver takes
    /// ownership.
    #[derive(Clone, Default)]
    struct SharedSpi(Arc<Mutex<MockSpi>>);

    impl SharedSpi {
        fn close_count(&self) -> usize {
            self.0.lock().unwrap().close_count
        }
    }

    impl SpiBus for SharedSpi {
        fn configure(&mut self, config: &PortConfig) -> SpiResult<()> {
            self.0.lock().unwrap().configure(config)
        }

        fn write(&mut self, data: &[u8]) -> SpiResult<usize> {
            self.0.lock().unwrap().write(data)
        }

        fn read(&mut self, buf: &mut [u8]) -> SpiResult<usize> {
            self.0.lock().unwrap().read(buf)
        }

        fn close(&mut self) -> SpiResult<()> {
            self.0.lock().unwrap().close()
        }
    }

    fn fast_calibration() -> CalibrationConfig {
        CalibrationConfig {
            settle: Duration::from_millis(1),
            sample_window: Duration::from_millis(25),
        }
    }

    fn read_response(value: u16) -> Vec<u8> {
        let word: u32 = 0x4000_0000 | ((value as u32) << 5);
        word.to_be_bytes().to_vec()
    }

    #[test]
    fn test_identity_mismatch_degrades_without_failing() {
        let spi = SharedSpi::default();
        spi.0
            .lock()
            .unwrap()
            .push_response(read_response(0x1EAD));

        let mut gyro = Adxrs450::with_calibration(SpiPort::OnboardCs1, spi.clone(), fast_calibration());
        assert!(!gyro.is_connected());
        assert_eq!(gyro.angle(), 0.0);
        assert_eq!(gyro.rate(), 0.0);
        // Safe no-ops on the disabled driver.
        gyro.calibrate();
        gyro.reset();
        assert_eq!(spi.close_count(), 1);
    }

    #[test]
    fn test_no_data_response_degrades() {
        // Empty mock queue: the identity read decodes as no-data.
        let spi = SharedSpi::default();
        let gyro = Adxrs450::with_calibration(SpiPort::OnboardCs0, spi.clone(), fast_calibration());
        assert!(!gyro.is_connected());
        assert_eq!(spi.close_count(), 1);
    }

    #[test]
    fn test_identity_match_configures_and_connects() {
        let spi = SharedSpi::default();
        {
            let mut inner = spi.0.lock().unwrap();
            inner.push_response(read_response(0x5201));
            inner.push_response(read_response(0xABCD)); // SN high
            inner.push_response(read_response(0x1234)); // SN low
        }

        let mut gyro = Adxrs450::with_calibration(SpiPort::OnboardCs0, spi.clone(), fast_calibration());
        assert!(gyro.is_connected());
        {
            let inner = spi.0.lock().unwrap();
            assert_eq!(inner.configs, vec![PORT_CONFIG]);
            // First transmitted frame is the part ID read.
            assert_eq!(inner.writes[0], frame::encode_read(registers::PID).to_vec());
        }
        assert_eq!(spi.close_count(), 0);
        gyro.free();
        assert_eq!(spi.close_count(), 1);
    }

    #[test]
    fn test_double_free_closes_channel_once() {
        let spi = SharedSpi::default();
        spi.0
            .lock()
            .unwrap()
            .push_response(read_response(0x5200));

        let mut gyro = Adxrs450::with_calibration(SpiPort::OnboardCs2, spi.clone(), fast_calibration());
        gyro.free();
        gyro.free();
        assert_eq!(gyro.angle(), 0.0);
        assert_eq!(gyro.rate(), 0.0);
        drop(gyro);
        assert_eq!(spi.close_count(), 1);
    }

    #[test]
    fn test_calibration_zeroes_angle_and_corrects_bias() {
        let (bus, handle) = SimAdxrs450::new();
        handle.set_rate_lsb(57);

        let mut gyro = Adxrs450::with_calibration(SpiPort::OnboardCs0, bus, fast_calibration());
        assert!(gyro.is_connected());
        // A constant signal calibrates to an exact center, so the corrected
        // samples landing after the post-calibration reset are all zero.
        assert_eq!(gyro.angle(), 0.0);
        assert_eq!(gyro.rate(), 0.0);

        // 80 LSB above the calibrated bias reads as 1.0 °/s.
        handle.set_rate_lsb(57 + 80);
        thread::sleep(Duration::from_millis(50));
        assert_relative_eq!(gyro.rate(), 1.0, epsilon = 1e-9);
        assert!(gyro.angle() > 0.0);

        // Recalibrating at the new rest rate re-zeroes everything.
        gyro.calibrate();
        assert_eq!(gyro.angle(), 0.0);
        assert_eq!(gyro.rate(), 0.0);
    }

    #[test]
    fn test_reset_keeps_bias_center() {
        let (bus, handle) = SimAdxrs450::new();
        handle.set_rate_lsb(100);

        let mut gyro = Adxrs450::with_calibration(SpiPort::Mxp, bus, fast_calibration());
        handle.set_rate_lsb(100 + 40);
        thread::sleep(Duration::from_millis(30));
        assert!(gyro.angle() > 0.0);

        gyro.reset();
        // Rate still reads against the calibrated center after a reset.
        thread::sleep(Duration::from_millis(30));
        assert_relative_eq!(gyro.rate(), 0.5, epsilon = 1e-9);
    }

    #[test]
    fn test_codec_loopback_through_sim() {
        // Every register address echoes back the value the sim's register
        // table holds for it.
        let (mut bus, handle) = SimAdxrs450::new();
        handle.set_pid(0x52A5);
        handle.set_serial(0xDEAD_BEEF);
        assert_eq!(read_register(&mut bus, registers::PID), 0x52A5);
        assert_eq!(read_register(&mut bus, registers::SN_HIGH), 0xDEAD);
        assert_eq!(read_register(&mut bus, registers::SN_LOW), 0xBEEF);
        for reg in 0u8..=0x7F {
            let expected = handle.register(reg);
            assert_eq!(read_register(&mut bus, reg), expected, "register {reg:#04x}");
        }
    }

    #[test]
    fn test_gyro_trait_object() {
        let (bus, _handle) = SimAdxrs450::new();
        let mut gyro = Adxrs450::with_calibration(SpiPort::OnboardCs3, bus, fast_calibration());
        let gyro: &mut dyn Gyro = &mut gyro;
        gyro.reset();
        assert_eq!(gyro.angle(), 0.0);
    }
}
