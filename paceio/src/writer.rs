use std::io;
use std::io::Write;

use crate::clock::BlockingClock;
use crate::clock::Clock;
use crate::clock::MonotonicClock;
use crate::controller::RateController;
use crate::error::Result;

/// An [`io::Write`] wrapper with a throughput limit
///
/// Each successful write is charged against the wrapper's own
/// [`RateController`] before returning. A partial write is charged only
/// for the bytes the inner writer actually accepted; the caller retries
/// the remainder as usual and that retry is paced on its own. Failures
/// pass through untouched and unpaced, and `flush` is never charged.
///
/// The wrapper is a state machine behind `&mut self` and is not meant
/// to be shared across threads without external locking.
#[derive(Debug)]
pub struct PacedWriter<W, C: Clock = MonotonicClock> {
    inner: W,
    controller: RateController<C>,
}

impl<W> PacedWriter<W, MonotonicClock> {
    /// Wrap `inner`, limiting writes to `bytes_per_sec`
    ///
    /// Returns [`PaceError::ZeroRate`](crate::PaceError::ZeroRate) when
    /// the rate is zero.
    pub fn new(inner: W, bytes_per_sec: u64) -> Result<Self> {
        Ok(Self { inner, controller: RateController::new(bytes_per_sec)? })
    }
}

impl<W, C: Clock> PacedWriter<W, C> {
    /// Wrap `inner` with an explicit time source
    pub fn with_clock(inner: W, bytes_per_sec: u64, clock: C) -> Result<Self> {
        Ok(Self { inner, controller: RateController::with_clock(bytes_per_sec, clock)? })
    }

    /// Configured throughput in bytes per second
    pub fn bytes_per_second(&self) -> u64 {
        self.controller.bytes_per_second()
    }

    /// Get a reference to the wrapped writer
    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    /// Get a mutable reference to the wrapped writer
    pub fn get_mut(&mut self) -> &mut W {
        &mut self.inner
    }

    /// Unwrap, returning the inner writer
    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write, C: BlockingClock> Write for PacedWriter<W, C> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.controller.pace(n);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
