//! The probe's event loop.
//!
//! A single thread waits on the socket with the reporting interval as its
//! timeout. A datagram becomes one latency sample; a timeout with new packets
//! since the last report prints a report. The wait is rearmed with the full
//! interval after every wake, so continuous traffic postpones reports.

use anyhow::{bail, Result};
use log::{debug, info, trace, warn};
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::clock::WallClock;
use crate::report::Reporter;
use crate::store::SampleStore;
use crate::traits::{DatagramSource, Readiness};
use crate::wire::{Timestamp, TIMESTAMP_LEN};

/// What a single pass through the loop did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// A datagram was stored as a sample with this latency (microseconds).
    Received(i64),
    /// A datagram too short to carry a timestamp was ignored.
    Short(usize),
    /// The interval elapsed with new packets and a report was made.
    Reported,
    /// The interval elapsed with nothing new.
    Idle,
    /// The wait itself failed; nothing changed.
    WaitFailed,
}

pub struct Receiver<S, C, W>
where
    S: DatagramSource,
    C: WallClock,
    W: Write,
{
    source: S,
    clock: C,
    store: SampleStore,
    reporter: Reporter<W>,
    interval: Duration,

    received: u64,
    last_reported: u64,
}

impl<S, C, W> Receiver<S, C, W>
where
    S: DatagramSource,
    C: WallClock,
    W: Write,
{
    pub fn new(
        source: S,
        clock: C,
        store: SampleStore,
        reporter: Reporter<W>,
        interval: Duration,
    ) -> Self {
        Receiver {
            source,
            clock,
            store,
            reporter,
            interval,
            received: 0,
            last_reported: 0,
        }
    }

    /// Packets received since startup.
    pub fn received(&self) -> u64 {
        self.received
    }

    /// Packet count at the time of the last report.
    pub fn last_reported(&self) -> u64 {
        self.last_reported
    }

    pub fn store(&self) -> &SampleStore {
        &self.store
    }

    pub fn reporter(&self) -> &Reporter<W> {
        &self.reporter
    }

    /// Wait once and handle whatever woke us.
    ///
    /// Only a failed or empty datagram read is an error; the caller should
    /// stop looping on it.
    pub fn step(&mut self) -> Result<Step> {
        match self.source.wait_readable(self.interval) {
            Ok(Readiness::Readable) => self.ingest(),
            Ok(Readiness::TimedOut) => Ok(self.on_timeout()),
            Err(e) => {
                warn!("{:#}", e);
                Ok(Step::WaitFailed)
            }
        }
    }

    /// Step until the socket fails or `running` is cleared. On a clean
    /// shutdown any unreported packets get a final report.
    pub fn run(&mut self, running: &AtomicBool) -> Result<()> {
        while running.load(Ordering::SeqCst) {
            self.step()?;
        }

        if self.received != self.last_reported {
            self.emit_report();
        }
        info!("Stopped after {} packets.", self.received);
        Ok(())
    }

    fn ingest(&mut self) -> Result<Step> {
        let mut buf = [0u8; TIMESTAMP_LEN];
        let size = self.source.recv(&mut buf)?;
        if size == 0 {
            bail!("receiving datagram packet: empty read");
        }
        let now = self.clock.now();

        let sent = match Timestamp::parse(&buf[..size]) {
            Ok(ts) => ts,
            Err(e) => {
                debug!("Ignoring datagram: {}", e);
                return Ok(Step::Short(size));
            }
        };

        let delay = now.micros_since(&sent);
        self.store.record(delay);
        self.received += 1;
        trace!("Packet {}: {} us", self.received, delay);

        Ok(Step::Received(delay))
    }

    fn on_timeout(&mut self) -> Step {
        if self.received == self.last_reported {
            return Step::Idle;
        }
        self.emit_report();
        Step::Reported
    }

    fn emit_report(&mut self) {
        if let Err(e) = self.reporter.report(self.received, &self.store) {
            warn!("Failed to write report: {:#}", e);
        }
        self.last_reported = self.received;
    }
}
