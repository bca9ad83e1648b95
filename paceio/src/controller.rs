use std::time::Duration;

use crate::clock::BlockingClock;
use crate::clock::Clock;
use crate::clock::MonotonicClock;
use crate::error::PaceError;
use crate::error::Result;

const NANOS_PER_SEC: u128 = 1_000_000_000;

/// Virtual-clock rate controller
///
/// Converts bytes transferred into time that must elapse and blocks the
/// caller until it has. The controller keeps a virtual clock that is
/// advanced by `bytes / rate` for every transfer; whenever the virtual
/// clock runs ahead of wall time the difference is slept off, and
/// whenever the caller is naturally slower than the rate the lag is
/// banked as burst credit for later transfers. The virtual clock never
/// snaps forward to wall time, so credit is uncapped.
///
/// The first non-zero transfer only establishes the virtual clock and
/// is not charged, so a freshly built controller never stalls its first
/// operation.
#[derive(Debug)]
pub struct RateController<C: Clock = MonotonicClock> {
    /// Configured throughput in bytes per second
    bytes_per_sec: u64,

    /// Virtual clock in nanoseconds since the clock's epoch
    ///
    /// `None` until the first non-zero transfer. Monotonically
    /// non-decreasing afterwards; may run ahead of or behind wall time.
    virtual_nanos: Option<u64>,

    /// Time source used for readings and delays
    clock: C,
}

impl RateController<MonotonicClock> {
    /// Create a controller over the wall clock
    pub fn new(bytes_per_sec: u64) -> Result<Self> {
        Self::with_clock(bytes_per_sec, MonotonicClock::new())
    }
}

impl<C: Clock> RateController<C> {
    /// Create a controller over the given time source
    pub fn with_clock(bytes_per_sec: u64, clock: C) -> Result<Self> {
        if bytes_per_sec == 0 {
            return Err(PaceError::ZeroRate);
        }

        Ok(Self { bytes_per_sec, virtual_nanos: None, clock })
    }

    /// Configured throughput in bytes per second
    pub fn bytes_per_second(&self) -> u64 {
        self.bytes_per_sec
    }

    /// Advance the virtual clock for a completed transfer
    ///
    /// Returns how long the caller must wait to stay at or under the
    /// configured rate; zero when running at or under it. Does not
    /// sleep. A zero-byte transfer leaves the controller untouched.
    pub fn charge(&mut self, bytes: usize) -> Duration {
        if bytes == 0 {
            return Duration::ZERO;
        }

        let now = self.clock.now_nanos();

        let Some(virtual_now) = self.virtual_nanos else {
            // First transfer establishes the baseline; nothing is owed yet.
            self.virtual_nanos = Some(now);
            return Duration::ZERO;
        };

        // Widen before multiplying: buffer-sized transfers at 1 B/s
        // overflow u64 nanoseconds otherwise.
        let owed = (bytes as u128 * NANOS_PER_SEC) / u128::from(self.bytes_per_sec);
        let owed = u64::try_from(owed).unwrap_or(u64::MAX);

        let target = virtual_now.saturating_add(owed);
        self.virtual_nanos = Some(target);

        if target > now {
            Duration::from_nanos(target - now)
        } else {
            // Caller has been slower than the rate; the lag stays banked
            // as credit for a future burst.
            Duration::ZERO
        }
    }
}

impl<C: BlockingClock> RateController<C> {
    /// Block until the configured rate permits the transfer just made
    ///
    /// Charges `bytes` against the virtual clock and sleeps off any
    /// resulting debt. Never fails.
    pub fn pace(&mut self, bytes: usize) {
        let wait = self.charge(bytes);
        if !wait.is_zero() {
            tracing::trace!("pacing {} bytes: sleeping {:?}", bytes, wait);
            self.clock.sleep(wait);
        }
    }
}
