use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use bytes::{Buf, BufMut};

/// Encoded size of a [`Timestamp`].
pub const TIMESTAMP_LEN: usize = 8;

/// Wall-clock instant as nanoseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(u64);

impl Timestamp {
    pub const fn from_nanos(nanos: u64) -> Self {
        Self(nanos)
    }

    pub const fn as_nanos(self) -> u64 {
        self.0
    }

    /// Convert a system time, saturating outside the representable range.
    pub fn from_system_time(time: SystemTime) -> Self {
        let nanos = time
            .duration_since(UNIX_EPOCH)
            .map(|d| u64::try_from(d.as_nanos()).unwrap_or(u64::MAX))
            .unwrap_or(0);
        Self(nanos)
    }

    pub fn to_system_time(self) -> SystemTime {
        UNIX_EPOCH + Duration::from_nanos(self.0)
    }

    /// Append the wire form to `dst`.
    pub fn encode(self, dst: &mut impl BufMut) {
        dst.put_u64(self.0);
    }

    /// Decode the wire form from the front of `src`.
    ///
    /// Returns `None` if fewer than [`TIMESTAMP_LEN`] bytes remain.
    pub fn decode(src: &mut impl Buf) -> Option<Self> {
        if src.remaining() < TIMESTAMP_LEN {
            return None;
        }
        Some(Self(src.get_u64()))
    }

    /// Signed distance from `earlier` to `self`.
    pub fn offset_from(self, earlier: Timestamp) -> ClockOffset {
        let nanos = i128::from(self.0) - i128::from(earlier.0);
        ClockOffset::from_nanos(nanos.clamp(i128::from(i64::MIN), i128::from(i64::MAX)) as i64)
    }

    /// Elapsed time since `earlier`, zero if the clock went backwards.
    pub fn saturating_duration_since(self, earlier: Timestamp) -> Duration {
        Duration::from_nanos(self.0.saturating_sub(earlier.0))
    }
}

/// Signed difference between two clocks' readings.
///
/// Positive when the remote clock reads later than the local one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ClockOffset(i64);

impl ClockOffset {
    pub const fn from_nanos(nanos: i64) -> Self {
        Self(nanos)
    }

    pub const fn as_nanos(self) -> i64 {
        self.0
    }

    /// Whether the remote clock appears ahead of the local clock.
    pub const fn is_ahead(self) -> bool {
        self.0 > 0
    }

    pub fn magnitude(self) -> Duration {
        Duration::from_nanos(self.0.unsigned_abs())
    }
}

impl fmt::Display for ClockOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "+" };
        write!(f, "{sign}{:?}", self.magnitude())
    }
}

/// Source of the current time.
pub trait Clock {
    fn now(&self) -> Timestamp;
}

/// The operating system wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::from_system_time(SystemTime::now())
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> Timestamp {
        (**self).now()
    }
}
