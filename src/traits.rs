use anyhow::Result;
use std::time::Duration;

/// Outcome of a bounded wait on the probe socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    Readable,
    TimedOut,
}

#[cfg_attr(test, mockall::automock)]
pub trait DatagramSource {
    /// Block until a datagram is ready or `timeout` elapses.
    /// An error here is a failure of the wait itself, not of the socket.
    fn wait_readable(&mut self, timeout: Duration) -> Result<Readiness>;

    /// Read one datagram into `buf`, truncating anything past its length.
    /// Returns the number of bytes stored.
    fn recv(&mut self, buf: &mut [u8]) -> Result<usize>;
}
