use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;
use std::time::Instant;

/// Monotonic time readings for the pacing core
///
/// Implementations report nanoseconds elapsed since an arbitrary fixed
/// epoch. The pacer only ever compares and subtracts readings, so the
/// epoch itself is irrelevant as long as readings never go backwards.
pub trait Clock {
    /// Current time in nanoseconds since the clock's epoch
    fn now_nanos(&self) -> u64;
}

/// A [`Clock`] that can also suspend the calling thread
pub trait BlockingClock: Clock {
    /// Block the caller for the given duration
    fn sleep(&self, duration: Duration);
}

/// Wall-clock time source backed by [`Instant`] and [`std::thread::sleep`]
///
/// This is the default clock for the blocking wrappers.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    /// Epoch for relative time measurements
    epoch: Instant,
}

impl MonotonicClock {
    /// Create a new clock with the current time as epoch
    pub fn new() -> Self {
        Self { epoch: Instant::now() }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    #[inline]
    fn now_nanos(&self) -> u64 {
        self.epoch.elapsed().as_nanos() as u64
    }
}

impl BlockingClock for MonotonicClock {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

#[derive(Debug, Default)]
struct ManualState {
    now_nanos: u64,
    slept: Vec<Duration>,
}

/// Deterministic clock for tests
///
/// Time only moves when something asks it to: `sleep` advances the
/// clock by the requested duration and records it, and [`advance`]
/// models the caller spending time elsewhere (blocking I/O, a stalled
/// peer). Handles are cheap clones sharing one state, so a test can
/// keep one handle for inspection while the pacer owns another.
///
/// [`advance`]: ManualClock::advance
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    state: Arc<Mutex<ManualState>>,
}

impl ManualClock {
    /// Create a new manual clock starting at its epoch
    pub fn new() -> Self {
        Self::default()
    }

    /// Move the clock forward without recording a sleep
    pub fn advance(&self, duration: Duration) {
        let mut state = self.state.lock().unwrap();
        state.now_nanos += duration.as_nanos() as u64;
    }

    /// All sleep durations requested so far, in order
    pub fn slept(&self) -> Vec<Duration> {
        self.state.lock().unwrap().slept.clone()
    }

    /// Sum of all sleep durations requested so far
    pub fn total_slept(&self) -> Duration {
        self.state.lock().unwrap().slept.iter().sum()
    }
}

impl Clock for ManualClock {
    fn now_nanos(&self) -> u64 {
        self.state.lock().unwrap().now_nanos
    }
}

impl BlockingClock for ManualClock {
    fn sleep(&self, duration: Duration) {
        let mut state = self.state.lock().unwrap();
        state.now_nanos += duration.as_nanos() as u64;
        state.slept.push(duration);
    }
}
