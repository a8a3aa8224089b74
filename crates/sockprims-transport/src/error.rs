/// Boxed failure raised by an error callback.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors surfaced from [`Connection`](crate::Connection) reads and writes.
///
/// Transport failures are not represented here; they go to the registered
/// error callbacks. The only way a read or write fails is when one of those
/// callbacks fails.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    /// A registered error callback failed; remaining callbacks were skipped.
    #[error("error handler failed: {0}")]
    Handler(#[source] BoxError),
}

pub type Result<T> = std::result::Result<T, ConnectionError>;

/// Errors raised while preparing a descriptor for use by a connection.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The raw handle does not name an open descriptor.
    #[error("invalid descriptor: {fd}")]
    InvalidDescriptor { fd: i32 },

    /// Applying a socket option failed.
    #[error("failed to set socket option {option}: {source}")]
    SocketOption {
        option: &'static str,
        source: std::io::Error,
    },
}
