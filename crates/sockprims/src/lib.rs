//! Blocking socket connections with pluggable error recovery.
//!
//! Re-exports the transport layer and, with the `latency` feature (on by
//! default), the timestamp probe.

pub use sockprims_transport as transport;
pub use sockprims_transport::{
    ignore_sigpipe, Connection, ConnectionConfig, ConnectionError, ConnectionStats, Descriptor,
    EndpointAddress, ErrorSubscription, TransportError,
};

#[cfg(unix)]
pub use sockprims_transport::SocketFd;

#[cfg(feature = "latency")]
pub use sockprims_latency as latency;
#[cfg(feature = "latency")]
pub use sockprims_latency::{
    Clock, ClockOffset, LatencyExt, LatencyMeasurement, LatencyProbe, ProbeError, SystemClock,
    Timestamp, TIMESTAMP_LEN,
};
