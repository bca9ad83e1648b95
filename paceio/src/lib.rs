//! Rate-limited wrappers for byte streams.
//!
//! Wrap a reader or writer in a pacer and it transfers at the rate you
//! ask for: each successful transfer advances a virtual clock by the
//! time the bytes *should* have taken, and the wrapper sleeps whenever
//! the virtual clock runs ahead of wall time. Individual operations may
//! burst past the rate, but the next operation is held back until the
//! budget allows it. Useful for simulating slow networks and disks in
//! tests.

pub mod async_io;
pub mod clock;
pub mod controller;
pub mod error;
pub mod reader;
pub mod writer;

pub use async_io::AsyncPacedReader;
pub use async_io::AsyncPacedWriter;
pub use clock::BlockingClock;
pub use clock::Clock;
pub use clock::ManualClock;
pub use clock::MonotonicClock;
pub use controller::RateController;
pub use error::PaceError;
pub use error::Result;
pub use reader::PacedReader;
pub use writer::PacedWriter;
