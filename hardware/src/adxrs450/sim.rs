//! Behavioral ADXRS450 simulation
//!
//! Implements [`SpiBus`] as the sensor side of the wire: register-read
//! command frames are parity-checked and answered from a register table,
//! and the sensor-data command is answered with a valid rate frame. The
//! paired [`SimHandle`] stays with the test or tool after the driver takes
//! the bus, so the simulated rate and part identity can be changed live.
//!
//! Commands with bad parity are answered with an all-zero frame, the same
//! no-data response the real part produces when it drops a command.

use std::sync::{Arc, Mutex};

use super::{frame, registers, SENSOR_DATA_CMD};
use crate::spi::{PortConfig, SpiBus, SpiError, SpiResult};

#[derive(Debug)]
struct Inner {
    rate_lsb: i16,
    pid: u16,
    serial: u32,
    temperature: u16,
    parity_rejects: usize,
    config: Option<PortConfig>,
    closed: bool,
}

impl Inner {
    fn register_value(&self, reg: u8) -> u16 {
        match reg {
            registers::RATE => self.rate_lsb as u16,
            registers::TEMPERATURE => self.temperature,
            registers::PID => self.pid,
            registers::SN_HIGH => (self.serial >> 16) as u16,
            registers::SN_LOW => self.serial as u16,
            _ => 0,
        }
    }
}

/// Control handle for a [`SimAdxrs450`], shared with the bus value.
#[derive(Clone)]
pub struct SimHandle(Arc<Mutex<Inner>>);

impl SimHandle {
    /// Set the raw rate, in LSBs, reported in sensor-data frames.
    pub fn set_rate_lsb(&self, rate: i16) {
        self.lock().rate_lsb = rate;
    }

    /// Override the part ID register, e.g. to exercise identity failures.
    pub fn set_pid(&self, pid: u16) {
        self.lock().pid = pid;
    }

    /// Set the 32-bit serial number split across SN_HIGH/SN_LOW.
    pub fn set_serial(&self, serial: u32) {
        self.lock().serial = serial;
    }

    /// Value the simulation holds for a register address.
    pub fn register(&self, reg: u8) -> u16 {
        self.lock().register_value(reg)
    }

    /// Number of command frames rejected for bad parity or framing.
    pub fn parity_rejects(&self) -> usize {
        self.lock().parity_rejects
    }

    /// Whether the driver has released the channel.
    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Port configuration the driver applied, if any.
    pub fn config(&self) -> Option<PortConfig> {
        self.lock().config
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.0.lock().expect("sim state poisoned")
    }
}

/// Simulated ADXRS450 behind the [`SpiBus`] trait.
pub struct SimAdxrs450 {
    inner: Arc<Mutex<Inner>>,
    pending: Option<[u8; 4]>,
}

impl SimAdxrs450 {
    /// Create a simulated sensor at rest, reporting a genuine part ID.
    /// Returns the bus value for the driver and the control handle.
    pub fn new() -> (Self, SimHandle) {
        let inner = Arc::new(Mutex::new(Inner {
            rate_lsb: 0,
            pid: 0x5201,
            serial: 0x0001_0001,
            temperature: 0x0200,
            parity_rejects: 0,
            config: None,
            closed: false,
        }));
        (
            Self {
                inner: Arc::clone(&inner),
                pending: None,
            },
            SimHandle(inner),
        )
    }

    fn respond(&self, command: [u8; 4]) -> [u8; 4] {
        let mut inner = self.inner.lock().expect("sim state poisoned");
        let word = u32::from_be_bytes(command);

        if word == SENSOR_DATA_CMD {
            let rate = (inner.rate_lsb as u16) as u32;
            return (0x0400_0000 | (rate << 10)).to_be_bytes();
        }

        if word >> 31 == 1 {
            let reg = ((word >> 17) & 0x7F) as u8;
            // The part drops any command whose parity bit disagrees; an
            // exact re-encode is the reference for a well-formed frame.
            if command != frame::encode_read(reg) {
                inner.parity_rejects += 1;
                return [0; 4];
            }
            let value = inner.register_value(reg) as u32;
            return (0x4000_0000 | (value << 5)).to_be_bytes();
        }

        [0; 4]
    }
}

impl SpiBus for SimAdxrs450 {
    fn configure(&mut self, config: &PortConfig) -> SpiResult<()> {
        self.inner.lock().expect("sim state poisoned").config = Some(*config);
        Ok(())
    }

    fn write(&mut self, data: &[u8]) -> SpiResult<usize> {
        if self.inner.lock().expect("sim state poisoned").closed {
            return Err(SpiError::Closed);
        }
        let Ok(command) = <[u8; 4]>::try_from(data) else {
            return Err(SpiError::ShortTransfer {
                expected: 4,
                actual: data.len(),
            });
        };
        self.pending = Some(self.respond(command));
        Ok(4)
    }

    fn read(&mut self, buf: &mut [u8]) -> SpiResult<usize> {
        if self.inner.lock().expect("sim state poisoned").closed {
            return Err(SpiError::Closed);
        }
        let response = self.pending.take().unwrap_or([0; 4]);
        let n = response.len().min(buf.len());
        buf[..n].copy_from_slice(&response[..n]);
        buf[n..].fill(0);
        Ok(buf.len())
    }

    fn close(&mut self) -> SpiResult<()> {
        self.inner.lock().expect("sim state poisoned").closed = true;
        Ok(())
    }
}
