use std::io::ErrorKind;
use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use tracing::{debug, warn};

use crate::address::EndpointAddress;
use crate::config::ConnectionConfig;
use crate::descriptor::Descriptor;
use crate::error::{BoxError, Result};
use crate::subscription::{ErrorHandler, ErrorSubscription, HandlerRegistry};

/// Transfer counters for one connection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConnectionStats {
    pub bytes_read: u64,
    pub bytes_written: u64,
    /// Failed receive or send attempts reported to the error callbacks.
    pub transport_errors: u64,
    /// Sends that accepted fewer bytes than requested.
    pub short_writes: u64,
}

/// A connected byte stream with partial reads, single-shot writes and
/// callback-based error reporting.
///
/// Transport failures never come back from [`read`](Self::read) or
/// [`write`](Self::write). Every registered error callback is run instead,
/// in registration order, on the calling thread. With no callback registered
/// those failures are silently dropped: reads come back short and writes
/// lose their data.
///
/// End-of-stream disposes the connection. Once disposed, reads return an
/// empty buffer and writes are discarded without touching the transport.
pub struct Connection<D: Descriptor> {
    descriptor: Option<D>,
    address: EndpointAddress,
    handlers: HandlerRegistry,
    config: ConnectionConfig,
    stats: ConnectionStats,
}

impl<D: Descriptor> Connection<D> {
    /// Wrap an already connected descriptor with default configuration.
    pub fn new(descriptor: D, address: EndpointAddress) -> Self {
        Self::with_config(descriptor, address, ConnectionConfig::default())
    }

    /// Wrap an already connected descriptor with explicit configuration.
    pub fn with_config(descriptor: D, address: EndpointAddress, config: ConnectionConfig) -> Self {
        debug!(peer = %address, "connection opened");
        Self {
            descriptor: Some(descriptor),
            address,
            handlers: HandlerRegistry::default(),
            config,
            stats: ConnectionStats::default(),
        }
    }

    /// Whether the connection still owns an open descriptor.
    pub fn is_valid(&self) -> bool {
        self.descriptor.is_some()
    }

    /// The remote peer, as described by whoever opened the connection.
    pub fn address(&self) -> &EndpointAddress {
        &self.address
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    pub fn stats(&self) -> ConnectionStats {
        self.stats
    }

    /// Number of currently registered error callbacks.
    pub fn error_handler_count(&self) -> usize {
        self.handlers.len()
    }

    /// Register a callback to run on every transport error.
    ///
    /// Each call adds a distinct entry, even for the same closure. The entry
    /// stays registered until the returned subscription is released or
    /// dropped. A failing callback aborts the read or write that triggered
    /// it with [`ConnectionError::Handler`](crate::ConnectionError::Handler).
    pub fn register_error_handler<F, E>(&mut self, handler: F) -> ErrorSubscription
    where
        F: Fn() -> std::result::Result<(), E> + Send + Sync + 'static,
        E: Into<BoxError>,
    {
        let handler: ErrorHandler = Arc::new(move || handler().map_err(Into::<BoxError>::into));
        self.handlers.register(handler)
    }

    /// Read up to `max_bytes`.
    ///
    /// With `min_bytes == 0` a single receive is attempted and whatever it
    /// produced is returned. Otherwise receives repeat until at least
    /// `min_bytes` (clamped to `max_bytes`) have accumulated, the peer
    /// closes, or the configured run of consecutive failures is reached.
    /// End-of-stream disposes the connection and returns the bytes gathered
    /// so far.
    pub fn read(&mut self, max_bytes: usize, min_bytes: usize) -> Result<Bytes> {
        let min_bytes = min_bytes.min(max_bytes);
        let mut buf = BytesMut::zeroed(max_bytes);
        let mut filled = 0;
        let mut consecutive_errors = 0u32;

        while filled < max_bytes {
            let Some(descriptor) = self.descriptor.as_mut() else {
                debug!(peer = %self.address, "read on disposed connection");
                break;
            };

            match descriptor.recv(&mut buf[filled..]) {
                Ok(0) => {
                    debug!(peer = %self.address, received = filled, "peer closed stream");
                    self.dispose();
                    break;
                }
                Ok(n) => {
                    filled += n;
                    consecutive_errors = 0;
                    self.stats.bytes_read += n as u64;
                }
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => {
                    warn!(peer = %self.address, error = %err, "receive failed");
                    self.stats.transport_errors += 1;
                    self.handlers.notify()?;
                    consecutive_errors += 1;
                    if let Some(limit) = self.config.max_consecutive_errors {
                        if consecutive_errors >= limit {
                            warn!(
                                peer = %self.address,
                                attempts = consecutive_errors,
                                received = filled,
                                "giving up on read after repeated receive failures"
                            );
                            break;
                        }
                    }
                    if min_bytes > 0 && !self.config.error_backoff.is_zero() {
                        std::thread::sleep(self.config.error_backoff);
                    }
                }
            }

            if min_bytes == 0 || filled >= min_bytes {
                break;
            }
        }

        buf.truncate(filled);
        Ok(buf.freeze())
    }

    /// Read up to `max_bytes` with a single receive.
    pub fn read_some(&mut self, max_bytes: usize) -> Result<Bytes> {
        self.read(max_bytes, 0)
    }

    /// Send `data` in a single attempt.
    ///
    /// A short send is logged and counted in [`ConnectionStats::short_writes`]
    /// but the remainder is not retried.
    pub fn write(&mut self, data: &[u8]) -> Result<()> {
        let Some(descriptor) = self.descriptor.as_mut() else {
            debug!(peer = %self.address, len = data.len(), "write on disposed connection dropped");
            return Ok(());
        };

        let result = loop {
            match descriptor.send(data) {
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                other => break other,
            }
        };

        match result {
            Ok(sent) => {
                self.stats.bytes_written += sent as u64;
                if sent < data.len() {
                    self.stats.short_writes += 1;
                    warn!(
                        peer = %self.address,
                        requested = data.len(),
                        sent,
                        "short write"
                    );
                }
                Ok(())
            }
            Err(err) => {
                warn!(peer = %self.address, error = %err, "send failed");
                self.stats.transport_errors += 1;
                self.handlers.notify()
            }
        }
    }

    /// Close the descriptor. Calling this again has no effect.
    pub fn dispose(&mut self) {
        if self.descriptor.take().is_some() {
            debug!(peer = %self.address, "connection disposed");
        }
    }
}

impl<D: Descriptor> Drop for Connection<D> {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl<D: Descriptor> std::fmt::Debug for Connection<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("address", &self.address)
            .field("valid", &self.is_valid())
            .field("handlers", &self.handlers)
            .field("stats", &self.stats)
            .finish()
    }
}
