//! Scripted SPI transport for unit tests
//!
//! Records every write, serves reads from a queue of canned responses, and
//! counts configure/close calls so tests can assert exactly-once resource
//! handling.

use std::collections::VecDeque;

use super::{PortConfig, SpiBus, SpiError, SpiResult};

/// Scripted [`SpiBus`] implementation.
///
/// Reads pop responses from the front of a queue; when the queue is empty
/// the read buffer is zero-filled (which decodes as a no-data frame for the
/// drivers in this crate).
#[derive(Debug, Default)]
pub struct MockSpi {
    /// Every frame written, in order.
    pub writes: Vec<Vec<u8>>,
    /// Canned read responses, consumed front to back.
    pub responses: VecDeque<Vec<u8>>,
    /// Configurations applied, in order.
    pub configs: Vec<PortConfig>,
    /// Number of `close` calls seen.
    pub close_count: usize,
    /// When true, every operation after `close` fails with `Closed`.
    pub strict_close: bool,
}

impl MockSpi {
    /// Empty mock: all reads return zero-filled (no-data) frames.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mock preloaded with read responses, served in order.
    pub fn with_responses<I>(responses: I) -> Self
    where
        I: IntoIterator<Item = Vec<u8>>,
    {
        Self {
            responses: responses.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Queue another read response.
    pub fn push_response(&mut self, response: Vec<u8>) {
        self.responses.push_back(response);
    }

    fn check_open(&self) -> SpiResult<()> {
        if self.strict_close && self.close_count > 0 {
            return Err(SpiError::Closed);
        }
        Ok(())
    }
}

impl SpiBus for MockSpi {
    fn configure(&mut self, config: &PortConfig) -> SpiResult<()> {
        self.check_open()?;
        self.configs.push(*config);
        Ok(())
    }

    fn write(&mut self, data: &[u8]) -> SpiResult<usize> {
        self.check_open()?;
        self.writes.push(data.to_vec());
        Ok(data.len())
    }

    fn read(&mut self, buf: &mut [u8]) -> SpiResult<usize> {
        self.check_open()?;
        match self.responses.pop_front() {
            Some(response) => {
                let n = response.len().min(buf.len());
                buf[..n].copy_from_slice(&response[..n]);
                buf[n..].fill(0);
                Ok(buf.len())
            }
            None => {
                buf.fill(0);
                Ok(buf.len())
            }
        }
    }

    fn close(&mut self) -> SpiResult<()> {
        self.close_count += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_pop_in_order() {
        let mut spi = MockSpi::with_responses([vec![1, 2, 3, 4], vec![5, 6, 7, 8]]);
        let mut buf = [0u8; 4];
        spi.read(&mut buf).unwrap();
        assert_eq!(buf, [1, 2, 3, 4]);
        spi.read(&mut buf).unwrap();
        assert_eq!(buf, [5, 6, 7, 8]);
    }

    #[test]
    fn test_empty_queue_zero_fills() {
        let mut spi = MockSpi::new();
        let mut buf = [0xFFu8; 4];
        spi.read(&mut buf).unwrap();
        assert_eq!(buf, [0, 0, 0, 0]);
    }

    #[test]
    fn test_writes_are_recorded() {
        let mut spi = MockSpi::new();
        spi.write(&[0x80, 0x18, 0x00, 0x00]).unwrap();
        assert_eq!(spi.writes, vec![vec![0x80, 0x18, 0x00, 0x00]]);
    }

    #[test]
    fn test_strict_close_rejects_use_after_close() {
        let mut spi = MockSpi::new();
        spi.strict_close = true;
        spi.close().unwrap();
        assert!(matches!(spi.write(&[0]), Err(SpiError::Closed)));
    }
}
