//! Round-trip and clock-offset measurement over a [`Connection`].
//!
//! One side calls [`LatencyProbe::probe`], the other [`LatencyProbe::respond`].
//! Each message is a single [`Timestamp`] on the wire: 8 bytes, big-endian
//! nanoseconds since the Unix epoch, with no framing.
//!
//! [`Connection`]: sockprims_transport::Connection

pub mod clock;
pub mod error;
pub mod probe;

pub use clock::{Clock, ClockOffset, SystemClock, Timestamp, TIMESTAMP_LEN};
pub use error::{ProbeError, Result};
pub use probe::{LatencyExt, LatencyMeasurement, LatencyProbe};
