use std::time::{SystemTime, UNIX_EPOCH};
use crate::wire::Timestamp;

/// Source of the local receive time.
#[cfg_attr(test, mockall::automock)]
pub trait WallClock {
    /// Current wall-clock time as seconds and microseconds since the epoch.
    fn now(&self) -> Timestamp;
}

/// `gettimeofday`-style clock backed by `SystemTime`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemWallClock;

impl WallClock for SystemWallClock {
    fn now(&self) -> Timestamp {
        match SystemTime::now().duration_since(UNIX_EPOCH) {
            Ok(d) => Timestamp::new(d.as_secs() as i64, d.subsec_micros() as i64),
            Err(e) => {
                // Clock set before 1970: express as a negative offset
                let d = e.duration();
                let mut secs = -(d.as_secs() as i64);
                let mut micros = -(d.subsec_micros() as i64);
                if micros < 0 {
                    secs -= 1;
                    micros += 1_000_000;
                }
                Timestamp::new(secs, micros)
            }
        }
    }
}
