//! Blocking byte-stream connection with caller-pluggable error recovery.
//!
//! A [`Connection`] owns one connected [`Descriptor`] and performs partial
//! reads and single-shot writes over it. Transport failures are never
//! returned from `read`/`write`; they are delivered to the callbacks
//! registered with [`Connection::register_error_handler`], each of which is
//! revoked by dropping (or releasing) its [`ErrorSubscription`].
//!
//! Establishing the connection is left to the caller. The [`connector`]
//! module only carries the helpers a connector needs before handing a
//! descriptor over.

pub mod address;
pub mod config;
pub mod connection;
pub mod connector;
pub mod descriptor;
pub mod error;
pub mod subscription;

pub use address::EndpointAddress;
pub use config::ConnectionConfig;
pub use connection::{Connection, ConnectionStats};
pub use connector::ignore_sigpipe;
pub use descriptor::Descriptor;
pub use error::{BoxError, ConnectionError, Result, TransportError};
pub use subscription::{ErrorHandler, ErrorSubscription};

#[cfg(unix)]
pub use descriptor::SocketFd;
