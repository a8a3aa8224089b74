use sockprims_transport::ConnectionError;

/// Errors that can occur while exchanging latency timestamps.
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    /// The connection aborted the exchange through an error handler.
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    /// The stream ended before a whole timestamp arrived.
    #[error("truncated timestamp ({received} of {expected} bytes)")]
    Truncated { expected: usize, received: usize },
}

pub type Result<T> = std::result::Result<T, ProbeError>;
