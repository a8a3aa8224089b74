use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Descriptive metadata about the remote end of a connection.
///
/// Carried for diagnostics only; the connection never interprets it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EndpointAddress {
    Tcp(SocketAddr),
    Unix(PathBuf),
    /// Socket pairs and abstract sockets with no printable name.
    Unnamed,
    Other(String),
}

impl fmt::Display for EndpointAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EndpointAddress::Tcp(addr) => write!(f, "tcp://{addr}"),
            EndpointAddress::Unix(path) => write!(f, "unix://{}", path.display()),
            EndpointAddress::Unnamed => f.write_str("unnamed"),
            EndpointAddress::Other(desc) => f.write_str(desc),
        }
    }
}

impl From<SocketAddr> for EndpointAddress {
    fn from(addr: SocketAddr) -> Self {
        EndpointAddress::Tcp(addr)
    }
}

impl From<PathBuf> for EndpointAddress {
    fn from(path: PathBuf) -> Self {
        EndpointAddress::Unix(path)
    }
}
