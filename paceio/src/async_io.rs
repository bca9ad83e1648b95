use std::future::Future;
use std::io;
use std::pin::Pin;
use std::task::Context;
use std::task::Poll;
use std::task::ready;
use std::time::Duration;

use tokio::io::AsyncRead;
use tokio::io::AsyncWrite;
use tokio::io::ReadBuf;
use tokio::time::Instant;
use tokio::time::Sleep;

use crate::error::PaceError;
use crate::error::Result;

const NANOS_PER_SEC: u128 = 1_000_000_000;

/// Virtual-clock accounting for the async wrappers
///
/// Same math as [`RateController`](crate::RateController), but kept on
/// tokio's clock so paused-time tests behave, and split from the sleep:
/// a successful transfer charges the virtual clock here, and the owed
/// delay is awaited at the start of the next operation. A filled read
/// buffer cannot be held back across polls, so delaying the following
/// operation is the poll-model equivalent of sleeping before returning.
#[derive(Debug)]
struct AsyncPacing {
    bytes_per_sec: u64,

    /// Time by which the traffic charged so far is allowed to complete
    virtual_deadline: Option<Instant>,
}

impl AsyncPacing {
    fn new(bytes_per_sec: u64) -> Result<Self> {
        if bytes_per_sec == 0 {
            return Err(PaceError::ZeroRate);
        }

        Ok(Self { bytes_per_sec, virtual_deadline: None })
    }

    /// Charge a completed transfer, returning the deadline the next
    /// operation must wait for, if any
    fn charge(&mut self, bytes: usize) -> Option<Instant> {
        if bytes == 0 {
            return None;
        }

        let now = Instant::now();

        let owed = (bytes as u128 * NANOS_PER_SEC) / u128::from(self.bytes_per_sec);
        let owed = Duration::from_nanos(u64::try_from(owed).unwrap_or(u64::MAX));

        // A deadline in the past stays where it is: the lag is burst
        // credit for transfers still to come.
        let target = self.virtual_deadline.unwrap_or(now) + owed;
        self.virtual_deadline = Some(target);

        (target > now).then_some(target)
    }
}

/// An [`AsyncRead`] wrapper with a throughput limit
///
/// Each successful read charges the wrapper's virtual clock, and the
/// resulting delay is awaited before the next read touches the inner
/// stream. Delays are ordinary [`tokio::time::Sleep`]s, so cancelling
/// or dropping a pending read never strands the task. Failures pass
/// through untouched and unpaced.
#[derive(Debug)]
pub struct AsyncPacedReader<R> {
    inner: R,
    pacing: AsyncPacing,
    delay: Option<Pin<Box<Sleep>>>,
}

impl<R> AsyncPacedReader<R> {
    /// Wrap `inner`, limiting reads to `bytes_per_sec`
    ///
    /// Returns [`PaceError::ZeroRate`] when the rate is zero.
    pub fn new(inner: R, bytes_per_sec: u64) -> Result<Self> {
        Ok(Self { inner, pacing: AsyncPacing::new(bytes_per_sec)?, delay: None })
    }

    /// Configured throughput in bytes per second
    pub fn bytes_per_second(&self) -> u64 {
        self.pacing.bytes_per_sec
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

impl<R: AsyncRead + Unpin> AsyncRead for AsyncPacedReader<R> {
    fn poll_read(self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &mut ReadBuf<'_>) -> Poll<io::Result<()>> {
        let this = self.get_mut();

        // Wait out whatever the previous transfer still owes.
        if let Some(delay) = this.delay.as_mut() {
            ready!(delay.as_mut().poll(cx));
            this.delay = None;
        }

        let filled_before = buf.filled().len();
        ready!(Pin::new(&mut this.inner).poll_read(cx, buf))?;
        let n = buf.filled().len() - filled_before;

        if let Some(deadline) = this.pacing.charge(n) {
            this.delay = Some(Box::pin(tokio::time::sleep_until(deadline)));
        }

        Poll::Ready(Ok(()))
    }
}

/// An [`AsyncWrite`] wrapper with a throughput limit
///
/// Mirror of [`AsyncPacedReader`] for the write side. Partial writes
/// charge only the bytes the inner writer accepted; `poll_flush` and
/// `poll_shutdown` delegate directly and are never charged.
#[derive(Debug)]
pub struct AsyncPacedWriter<W> {
    inner: W,
    pacing: AsyncPacing,
    delay: Option<Pin<Box<Sleep>>>,
}

impl<W> AsyncPacedWriter<W> {
    /// Wrap `inner`, limiting writes to `bytes_per_sec`
    ///
    /// Returns [`PaceError::ZeroRate`] when the rate is zero.
    pub fn new(inner: W, bytes_per_sec: u64) -> Result<Self> {
        Ok(Self { inner, pacing: AsyncPacing::new(bytes_per_sec)?, delay: None })
    }

    /// Configured throughput in bytes per second
    pub fn bytes_per_second(&self) -> u64 {
        self.pacing.bytes_per_sec
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

impl<W: AsyncWrite + Unpin> AsyncWrite for AsyncPacedWriter<W> {
    fn poll_write(self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &[u8]) -> Poll<io::Result<usize>> {
        let this = self.get_mut();

        if let Some(delay) = this.delay.as_mut() {
            ready!(delay.as_mut().poll(cx));
            this.delay = None;
        }

        let n = ready!(Pin::new(&mut this.inner).poll_write(cx, buf))?;

        if let Some(deadline) = this.pacing.charge(n) {
            this.delay = Some(Box::pin(tokio::time::sleep_until(deadline)));
        }

        Poll::Ready(Ok(n))
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_shutdown(cx)
    }
}
