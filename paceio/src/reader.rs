use std::io;
use std::io::Read;

use crate::clock::BlockingClock;
use crate::clock::Clock;
use crate::clock::MonotonicClock;
use crate::controller::RateController;
use crate::error::Result;

/// An [`io::Read`] wrapper with a throughput limit
///
/// Each successful read is charged against the wrapper's own
/// [`RateController`] before returning, so sustained reads through the
/// wrapper proceed at the configured rate. Failures pass through
/// untouched and cost the caller nothing; the virtual clock is advanced
/// only for bytes actually delivered.
///
/// The wrapper is a state machine behind `&mut self` and is not meant
/// to be shared across threads without external locking.
#[derive(Debug)]
pub struct PacedReader<R, C: Clock = MonotonicClock> {
    inner: R,
    controller: RateController<C>,
}

impl<R> PacedReader<R, MonotonicClock> {
    /// Wrap `inner`, limiting reads to `bytes_per_sec`
    ///
    /// Returns [`PaceError::ZeroRate`](crate::PaceError::ZeroRate) when
    /// the rate is zero.
    pub fn new(inner: R, bytes_per_sec: u64) -> Result<Self> {
        Ok(Self { inner, controller: RateController::new(bytes_per_sec)? })
    }
}

impl<R, C: Clock> PacedReader<R, C> {
    /// Wrap `inner` with an explicit time source
    pub fn with_clock(inner: R, bytes_per_sec: u64, clock: C) -> Result<Self> {
        Ok(Self { inner, controller: RateController::with_clock(bytes_per_sec, clock)? })
    }

    /// Configured throughput in bytes per second
    pub fn bytes_per_second(&self) -> u64 {
        self.controller.bytes_per_second()
    }

    /// Get a reference to the wrapped reader
    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    /// Get a mutable reference to the wrapped reader
    pub fn get_mut(&mut self) -> &mut R {
        &mut self.inner
    }

    /// Unwrap, returning the inner reader
    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read, C: BlockingClock> Read for PacedReader<R, C> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.controller.pace(n);
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::clock::ManualClock;
    use crate::error::PaceError;

    /// Yields `chunk` bytes of zeroes per call, forever
    struct ChunkSource {
        chunk: usize,
    }

    impl Read for ChunkSource {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let n = self.chunk.min(buf.len());
            buf[..n].fill(0);
            Ok(n)
        }
    }

    /// Fails every read with the given error kind
    struct BrokenSource {
        kind: io::ErrorKind,
    }

    impl Read for BrokenSource {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(self.kind, "stream broken"))
        }
    }

    #[test]
    fn test_zero_rate_rejected_at_construction() {
        let err = PacedReader::new(io::empty(), 0).unwrap_err();
        assert_eq!(err, PaceError::ZeroRate);
    }

    #[test]
    fn test_data_passes_through_unchanged() {
        let clock = ManualClock::new();
        let mut reader = PacedReader::with_clock(&b"hello world"[..], 1_000_000, clock).unwrap();

        let mut out = String::new();
        reader.read_to_string(&mut out).unwrap();
        assert_eq!(out, "hello world");
    }

    #[test]
    fn test_first_read_is_not_delayed() {
        let clock = ManualClock::new();
        let source = ChunkSource { chunk: 1000 };
        let mut reader = PacedReader::with_clock(source, 1000, clock.clone()).unwrap();

        let mut buf = [0u8; 1000];
        assert_eq!(reader.read(&mut buf).unwrap(), 1000);
        assert!(clock.slept().is_empty());
    }

    #[test]
    fn test_sustained_reads_are_limited() {
        // 1000 B/s source yielding 1000 bytes per call: the first read
        // returns immediately, the second completes a second later.
        let clock = ManualClock::new();
        let source = ChunkSource { chunk: 1000 };
        let mut reader = PacedReader::with_clock(source, 1000, clock.clone()).unwrap();

        let mut buf = [0u8; 1000];
        reader.read(&mut buf).unwrap();
        reader.read(&mut buf).unwrap();
        assert_eq!(clock.slept(), vec![Duration::from_secs(1)]);
    }

    #[test]
    fn test_failure_passes_through_unpaced() {
        let clock = ManualClock::new();
        let source = BrokenSource { kind: io::ErrorKind::ConnectionReset };
        let mut reader = PacedReader::with_clock(source, 1000, clock.clone()).unwrap();

        let mut buf = [0u8; 64];
        let err = reader.read(&mut buf).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::ConnectionReset);
        assert!(clock.slept().is_empty());
    }

    #[test]
    fn test_eof_costs_nothing() {
        let clock = ManualClock::new();
        let mut reader = PacedReader::with_clock(io::empty(), 1000, clock.clone()).unwrap();

        let mut buf = [0u8; 64];
        assert_eq!(reader.read(&mut buf).unwrap(), 0);
        assert!(clock.slept().is_empty());
    }

    #[test]
    fn test_external_delay_becomes_burst_credit() {
        let clock = ManualClock::new();
        let source = ChunkSource { chunk: 1000 };
        let mut reader = PacedReader::with_clock(source, 1000, clock.clone()).unwrap();

        let mut buf = [0u8; 1000];
        reader.read(&mut buf).unwrap();

        // Caller stalls elsewhere for a second; the next read rides on
        // the accumulated slack.
        clock.advance(Duration::from_secs(1));
        reader.read(&mut buf).unwrap();
        assert!(clock.slept().is_empty());
    }

    #[test]
    fn test_accessors() {
        let reader = PacedReader::new(io::empty(), 512).unwrap();
        assert_eq!(reader.bytes_per_second(), 512);

        let _inner: io::Empty = reader.into_inner();
    }
}
