//! Free-running SPI accumulation engine
//!
//! Some platforms provide a hardware engine that transmits a fixed command
//! on a schedule and folds a field of each response into a running sum with
//! no CPU involvement. This module emulates that engine with a fixed-rate
//! background sampling thread feeding the same semantics: a running sum, a
//! sample count, the last corrected sample, a subtracted bias center, and a
//! deadband below which samples are counted but not summed.
//!
//! Responses are read as big-endian 32-bit words. A response is valid when
//! `(word & valid_mask) == valid_value`; the data field is then extracted at
//! `data_shift`, sign-extended when configured, and corrected by the center
//! before use. An invalid response clears the last-sample value to zero.
//!
//! The engine shares the bus with its owning driver through a mutex; the
//! driver only touches the bus directly before the engine starts and after
//! it stops, so contention is limited to shutdown.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, trace};

use super::SpiBus;

/// Configuration for one accumulation engine.
#[derive(Debug, Clone, Copy)]
pub struct AccumulatorConfig {
    /// Interval between samples.
    pub period: Duration,
    /// 32-bit command transmitted, big-endian, to request each sample.
    pub cmd: u32,
    /// Mask applied to each response word for validity checking.
    pub valid_mask: u32,
    /// Required value of the masked response word.
    pub valid_value: u32,
    /// Right-shift applied to the response word to reach the data field.
    pub data_shift: u32,
    /// Width of the data field in bits.
    pub data_size: u32,
    /// Whether the data field is two's-complement signed.
    pub is_signed: bool,
}

#[derive(Debug, Default)]
struct State {
    value: i64,
    count: u32,
    last_value: i64,
    center: i64,
    deadband: i64,
}

impl State {
    /// Fold one response word into the accumulation state.
    fn process(&mut self, config: &AccumulatorConfig, resp: u32) {
        if resp & config.valid_mask != config.valid_value {
            // No data from the sensor; just clear the last value.
            self.last_value = 0;
            return;
        }
        let field_max = 1i64 << config.data_size;
        let mut data = ((resp >> config.data_shift) as i64) & (field_max - 1);
        if config.is_signed && data & (field_max >> 1) != 0 {
            data -= field_max;
        }
        data -= self.center;
        if data < -self.deadband || data > self.deadband {
            self.value += data;
        }
        self.count += 1;
        self.last_value = data;
    }
}

/// Emulated free-running accumulator over a shared [`SpiBus`].
///
/// Created by [`Accumulator::start`], which spawns the sampling thread.
/// Dropping the accumulator stops the thread.
pub struct Accumulator {
    state: Arc<Mutex<State>>,
    stop: Arc<AtomicBool>,
    sampler: Option<JoinHandle<()>>,
}

impl Accumulator {
    /// Start accumulating on `bus` with the given configuration.
    pub fn start<B: SpiBus + 'static>(bus: Arc<Mutex<B>>, config: AccumulatorConfig) -> Self {
        let state = Arc::new(Mutex::new(State::default()));
        let stop = Arc::new(AtomicBool::new(false));

        let thread_state = Arc::clone(&state);
        let thread_stop = Arc::clone(&stop);
        let sampler = thread::Builder::new()
            .name("spi-accumulator".into())
            .spawn(move || {
                debug!(period_us = config.period.as_micros() as u64, "accumulator sampling started");
                // Schedule against absolute deadlines so the bus transaction
                // time does not stretch the sample interval; the angle
                // integration assumes exactly one sample per period. A late
                // sample shortens the following sleeps until the schedule is
                // caught up.
                let mut next = Instant::now() + config.period;
                while !thread_stop.load(Ordering::Relaxed) {
                    sample_once(&bus, &config, &thread_state);
                    thread::sleep(next.saturating_duration_since(Instant::now()));
                    next += config.period;
                }
                debug!("accumulator sampling stopped");
            })
            .expect("failed to spawn accumulator thread");

        Self {
            state,
            stop,
            sampler: Some(sampler),
        }
    }

    /// Set the bias center subtracted from every sample before it is
    /// accumulated. Used to take a gyro's at-rest offset out of the
    /// integration.
    pub fn set_center(&self, center: i64) {
        self.lock().center = center;
    }

    /// Set the deadband: corrected samples with magnitude at or below this
    /// value are counted but not added to the running sum.
    pub fn set_deadband(&self, deadband: i64) {
        self.lock().deadband = deadband;
    }

    /// Reset the running sum, sample count, and last-sample value to zero.
    /// The bias center is left untouched.
    pub fn reset(&self) {
        let mut state = self.lock();
        state.value = 0;
        state.count = 0;
        state.last_value = 0;
    }

    /// The running sum accumulated since the last [`reset`](Self::reset).
    pub fn value(&self) -> i64 {
        self.lock().value
    }

    /// The most recent center-corrected sample, or zero if the last
    /// response was invalid.
    pub fn last_value(&self) -> i64 {
        self.lock().last_value
    }

    /// Number of samples folded in since the last reset.
    pub fn count(&self) -> u32 {
        self.lock().count
    }

    /// Mean of the accumulated samples, `0.0` when no samples have landed.
    pub fn average(&self) -> f64 {
        let state = self.lock();
        if state.count == 0 {
            return 0.0;
        }
        state.value as f64 / state.count as f64
    }

    /// Stop the sampling thread. Idempotent; also runs on drop.
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.sampler.take() {
            let _ = handle.join();
        }
    }

    // A panicked sampler thread poisons the state mutex; the counters are
    // plain integers, so recover the guard rather than propagating a panic
    // into accessors (and, via the driver's drop path, into an abort).
    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Drop for Accumulator {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Run one sample transaction: transmit the command, read the response, and
/// fold it into the state. Transport errors clear the last-sample value, the
/// same as a no-data response.
fn sample_once<B: SpiBus>(bus: &Arc<Mutex<B>>, config: &AccumulatorConfig, state: &Arc<Mutex<State>>) {
    let mut frame = [0u8; 4];
    let result = {
        let mut bus = bus.lock().unwrap_or_else(|e| e.into_inner());
        bus.write(&config.cmd.to_be_bytes())
            .and_then(|_| bus.read(&mut frame))
    };
    let mut state = state.lock().unwrap_or_else(|e| e.into_inner());
    match result {
        Ok(_) => state.process(config, u32::from_be_bytes(frame)),
        Err(err) => {
            trace!(%err, "accumulator sample failed");
            state.last_value = 0;
        }
    }
}
