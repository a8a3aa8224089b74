use std::time::Duration;

use bytes::{Buf, BytesMut};
use sockprims_transport::{Connection, Descriptor};
use tracing::debug;

use crate::clock::{Clock, ClockOffset, SystemClock, Timestamp, TIMESTAMP_LEN};
use crate::error::{ProbeError, Result};

/// Outcome of one probe exchange.
///
/// `clock_offset` is the peer's reported time minus the local send time. It
/// folds the one-way network delay and the true clock skew together; a single
/// exchange cannot separate them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LatencyMeasurement {
    pub clock_offset: ClockOffset,
    pub round_trip: Duration,
}

/// One-shot timestamp exchange driven by a [`Clock`].
///
/// Neither side retries or times out; a silent peer blocks the caller for as
/// long as the connection's read does.
#[derive(Debug, Clone, Default)]
pub struct LatencyProbe<C = SystemClock> {
    clock: C,
}

impl<C: Clock> LatencyProbe<C> {
    pub fn new(clock: C) -> Self {
        Self { clock }
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Initiator side: send the local time and wait for the peer's.
    pub fn probe<D: Descriptor>(&self, conn: &mut Connection<D>) -> Result<LatencyMeasurement> {
        let start = self.clock.now();
        send_timestamp(conn, start)?;
        let remote = recv_timestamp(conn)?;
        let end = self.clock.now();

        let measurement = LatencyMeasurement {
            clock_offset: remote.offset_from(start),
            round_trip: end.saturating_duration_since(start),
        };
        debug!(
            peer = %conn.address(),
            offset = %measurement.clock_offset,
            round_trip = ?measurement.round_trip,
            "latency probe complete"
        );
        Ok(measurement)
    }

    /// Responder side: consume one timestamp and answer with the local time.
    ///
    /// The incoming payload is discarded unseen, whatever its length, and
    /// exactly one reply is sent. A reply to a disposed connection is
    /// dropped by the connection.
    pub fn respond<D: Descriptor>(&self, conn: &mut Connection<D>) -> Result<()> {
        conn.read(TIMESTAMP_LEN, TIMESTAMP_LEN)?;
        send_timestamp(conn, self.clock.now())?;
        debug!(peer = %conn.address(), "answered latency probe");
        Ok(())
    }
}

/// `ping`/`pong` on a connection using the system clock.
pub trait LatencyExt {
    fn ping(&mut self) -> Result<LatencyMeasurement>;
    fn pong(&mut self) -> Result<()>;
}

impl<D: Descriptor> LatencyExt for Connection<D> {
    fn ping(&mut self) -> Result<LatencyMeasurement> {
        LatencyProbe::new(SystemClock).probe(self)
    }

    fn pong(&mut self) -> Result<()> {
        LatencyProbe::new(SystemClock).respond(self)
    }
}

fn send_timestamp<D: Descriptor>(conn: &mut Connection<D>, ts: Timestamp) -> Result<()> {
    let mut buf = BytesMut::with_capacity(TIMESTAMP_LEN);
    ts.encode(&mut buf);
    conn.write(&buf)?;
    Ok(())
}

fn recv_timestamp<D: Descriptor>(conn: &mut Connection<D>) -> Result<Timestamp> {
    let mut payload = conn.read(TIMESTAMP_LEN, TIMESTAMP_LEN)?;
    if payload.len() < TIMESTAMP_LEN {
        return Err(ProbeError::Truncated {
            expected: TIMESTAMP_LEN,
            received: payload.len(),
        });
    }
    Ok(Timestamp::from_nanos(payload.get_u64()))
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::io;
    use std::sync::{Arc, Mutex};

    use sockprims_transport::EndpointAddress;

    use super::*;

    /// Clock that hands out a fixed sequence of readings.
    struct SteppedClock(Mutex<VecDeque<u64>>);

    impl SteppedClock {
        fn new(readings: &[u64]) -> Self {
            Self(Mutex::new(readings.iter().copied().collect()))
        }
    }

    impl Clock for SteppedClock {
        fn now(&self) -> Timestamp {
            let next = self.0.lock().unwrap().pop_front().expect("clock exhausted");
            Timestamp::from_nanos(next)
        }
    }

    /// Descriptor with a canned inbound stream that records every send.
    struct Loopback {
        inbound: VecDeque<u8>,
        recv_calls: Arc<Mutex<usize>>,
        sent: Arc<Mutex<Vec<Vec<u8>>>>,
    }

    impl Loopback {
        fn new(inbound: &[u8]) -> Self {
            Self {
                inbound: inbound.iter().copied().collect(),
                recv_calls: Arc::default(),
                sent: Arc::default(),
            }
        }
    }

    impl Descriptor for Loopback {
        fn recv(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            *self.recv_calls.lock().unwrap() += 1;
            let n = buf.len().min(self.inbound.len());
            for slot in &mut buf[..n] {
                *slot = self.inbound.pop_front().unwrap();
            }
            Ok(n)
        }

        fn send(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.sent.lock().unwrap().push(buf.to_vec());
            Ok(buf.len())
        }
    }

    fn wire(nanos: u64) -> Vec<u8> {
        nanos.to_be_bytes().to_vec()
    }

    #[test]
    fn probe_computes_offset_and_round_trip() {
        let descriptor = Loopback::new(&wire(105));
        let sent = Arc::clone(&descriptor.sent);
        let mut conn = Connection::new(descriptor, EndpointAddress::Unnamed);
        let probe = LatencyProbe::new(SteppedClock::new(&[100, 110]));

        let m = probe.probe(&mut conn).unwrap();
        assert_eq!(m.clock_offset, ClockOffset::from_nanos(5));
        assert_eq!(m.round_trip, Duration::from_nanos(10));
        assert_eq!(*sent.lock().unwrap(), vec![wire(100)]);
    }

    #[test]
    fn probe_reports_peer_behind() {
        let descriptor = Loopback::new(&wire(40));
        let mut conn = Connection::new(descriptor, EndpointAddress::Unnamed);
        let probe = LatencyProbe::new(SteppedClock::new(&[100, 130]));

        let m = probe.probe(&mut conn).unwrap();
        assert_eq!(m.clock_offset.as_nanos(), -60);
        assert!(!m.clock_offset.is_ahead());
        assert_eq!(m.round_trip, Duration::from_nanos(30));
    }

    #[test]
    fn probe_fails_on_truncated_reply() {
        let descriptor = Loopback::new(&[0, 0, 0]);
        let mut conn = Connection::new(descriptor, EndpointAddress::Unnamed);
        let probe = LatencyProbe::new(SteppedClock::new(&[1, 2]));

        let err = probe.probe(&mut conn).unwrap_err();
        assert!(matches!(
            err,
            ProbeError::Truncated {
                expected: 8,
                received: 3
            }
        ));
        assert!(!conn.is_valid());
    }

    #[test]
    fn respond_reads_one_timestamp_and_replies_once() {
        let mut inbound = vec![0xFF; TIMESTAMP_LEN];
        inbound.extend_from_slice(&wire(7));
        let descriptor = Loopback::new(&inbound);
        let sent = Arc::clone(&descriptor.sent);
        let recv_calls = Arc::clone(&descriptor.recv_calls);
        let mut conn = Connection::new(descriptor, EndpointAddress::Unnamed);
        let probe = LatencyProbe::new(SteppedClock::new(&[42]));

        probe.respond(&mut conn).unwrap();
        assert_eq!(*sent.lock().unwrap(), vec![wire(42)]);
        assert_eq!(*recv_calls.lock().unwrap(), 1);

        // The second timestamp is still unread.
        assert_eq!(conn.read(16, 0).unwrap().as_ref(), wire(7).as_slice());
    }

    #[test]
    fn respond_to_closed_peer_sends_nothing() {
        let descriptor = Loopback::new(&[]);
        let sent = Arc::clone(&descriptor.sent);
        let mut conn = Connection::new(descriptor, EndpointAddress::Unnamed);
        let probe = LatencyProbe::new(SteppedClock::new(&[9]));

        probe.respond(&mut conn).unwrap();
        assert!(!conn.is_valid());
        assert!(sent.lock().unwrap().is_empty());
    }

    /// Descriptor whose receives never succeed.
    struct Stalled {
        sent: Arc<Mutex<Vec<Vec<u8>>>>,
    }

    impl Descriptor for Stalled {
        fn recv(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::from(io::ErrorKind::WouldBlock))
        }

        fn send(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.sent.lock().unwrap().push(buf.to_vec());
            Ok(buf.len())
        }
    }

    #[test]
    fn respond_replies_once_after_failed_receives() {
        let sent = Arc::new(Mutex::new(Vec::new()));
        let descriptor = Stalled {
            sent: Arc::clone(&sent),
        };
        let mut conn = Connection::new(descriptor, EndpointAddress::Unnamed);
        let probe = LatencyProbe::new(SteppedClock::new(&[77]));

        probe.respond(&mut conn).unwrap();
        assert!(conn.is_valid());
        assert_eq!(*sent.lock().unwrap(), vec![wire(77)]);
        assert_eq!(conn.stats().transport_errors, 8);
    }
}
