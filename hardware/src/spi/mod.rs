//! SPI transport boundary
//!
//! Drivers in this crate talk to their parts through the [`SpiBus`] trait
//! rather than a concrete OS transport, so the same driver runs against
//! real hardware, the behavioral simulations in this crate, and the
//! scripted [`mock::MockSpi`] in unit tests.
//!
//! A bus value represents one exclusively-owned chip-select channel. The
//! crate does not police duplicate channel assignment; constructing two
//! drivers over the same physical channel is a caller error.

pub mod accumulator;
pub mod mock;

use std::fmt;

use thiserror::Error;

/// Errors from an SPI transport.
#[derive(Error, Debug)]
pub enum SpiError {
    /// Low-level I/O error from the underlying transport.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The transport rejected the requested port configuration.
    #[error("unsupported port configuration: {0}")]
    UnsupportedConfig(String),

    /// The channel was closed before or during the operation.
    #[error("channel closed")]
    Closed,

    /// Fewer bytes moved than the frame required.
    #[error("short transfer: {actual} of {expected} bytes")]
    ShortTransfer {
        /// Bytes the frame required.
        expected: usize,
        /// Bytes actually transferred.
        actual: usize,
    },
}

/// Result type for SPI transport operations.
pub type SpiResult<T> = Result<T, SpiError>;

/// Chip-select channel identifier.
///
/// Names the physical channel a driver owns; used for diagnostics when a
/// part fails its identity check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpiPort {
    /// Onboard chip select 0.
    OnboardCs0,
    /// Onboard chip select 1.
    OnboardCs1,
    /// Onboard chip select 2.
    OnboardCs2,
    /// Onboard chip select 3.
    OnboardCs3,
    /// Expansion-header chip select.
    Mxp,
}

impl fmt::Display for SpiPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpiPort::OnboardCs0 => write!(f, "onboard CS0"),
            SpiPort::OnboardCs1 => write!(f, "onboard CS1"),
            SpiPort::OnboardCs2 => write!(f, "onboard CS2"),
            SpiPort::OnboardCs3 => write!(f, "onboard CS3"),
            SpiPort::Mxp => write!(f, "MXP"),
        }
    }
}

/// Electrical configuration for one SPI channel.
///
/// Set once at driver construction, before any traffic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortConfig {
    /// Clock rate in hertz.
    pub clock_hz: u32,
    /// Most significant bit first when true.
    pub msb_first: bool,
    /// Sample data on the trailing clock edge when true, leading when false.
    pub sample_on_trailing_edge: bool,
    /// Chip select is active low when true.
    pub chip_select_active_low: bool,
}

/// Blocking SPI channel owned exclusively by one driver.
///
/// All operations are synchronous; no concurrent use of one bus value is
/// expected except through the locking the caller provides.
pub trait SpiBus: Send {
    /// Apply the electrical configuration for this channel.
    fn configure(&mut self, config: &PortConfig) -> SpiResult<()>;

    /// Write `data` to the device, returning the byte count written.
    fn write(&mut self, data: &[u8]) -> SpiResult<usize>;

    /// Read `buf.len()` bytes from the device into `buf`, returning the
    /// byte count read.
    fn read(&mut self, buf: &mut [u8]) -> SpiResult<usize>;

    /// Release the channel. Implementations may assume this is called at
    /// most once; the driver guards against double release.
    fn close(&mut self) -> SpiResult<()>;
}
