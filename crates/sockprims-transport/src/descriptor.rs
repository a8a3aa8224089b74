use std::io::{self, Read, Write};

/// An open, connected byte-stream channel owned by a [`Connection`].
///
/// `recv` and `send` each perform exactly one transfer attempt. `Ok(0)` from
/// `recv` means the peer closed its side. Dropping the descriptor closes it.
///
/// [`Connection`]: crate::Connection
pub trait Descriptor {
    /// Receive into `buf`, returning how many bytes arrived.
    fn recv(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Send from `buf`, returning how many bytes the channel accepted.
    fn send(&mut self, buf: &[u8]) -> io::Result<usize>;
}

impl Descriptor for std::net::TcpStream {
    fn recv(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.read(buf)
    }

    fn send(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write(buf)
    }
}

#[cfg(unix)]
impl Descriptor for std::os::unix::net::UnixStream {
    fn recv(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.read(buf)
    }

    fn send(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write(buf)
    }
}

#[cfg(unix)]
pub use self::unix::SocketFd;

#[cfg(unix)]
mod unix {
    use std::io;
    use std::os::fd::{AsFd, AsRawFd, BorrowedFd, FromRawFd, OwnedFd, RawFd};

    use tracing::debug;

    use super::Descriptor;
    use crate::connector::set_nosigpipe;
    use crate::error::TransportError;

    #[cfg(any(target_os = "linux", target_os = "android"))]
    const SEND_FLAGS: libc::c_int = libc::MSG_NOSIGNAL;
    #[cfg(not(any(target_os = "linux", target_os = "android")))]
    const SEND_FLAGS: libc::c_int = 0;

    /// A raw connected socket descriptor driven through `recv(2)`/`send(2)`.
    #[derive(Debug)]
    pub struct SocketFd {
        fd: OwnedFd,
    }

    impl SocketFd {
        /// Take ownership of a connected socket.
        ///
        /// Applies the per-socket broken-pipe option where the platform has
        /// one, so a write to a closed peer fails instead of raising `SIGPIPE`.
        pub fn from_owned(fd: OwnedFd) -> Result<Self, TransportError> {
            set_nosigpipe(fd.as_raw_fd())?;
            debug!(fd = fd.as_raw_fd(), "adopted socket descriptor");
            Ok(Self { fd })
        }

        /// Take ownership of a raw socket handle.
        ///
        /// Handles that are zero or negative are rejected.
        ///
        /// # Safety
        ///
        /// `fd` must be an open socket descriptor that nothing else owns or
        /// closes.
        pub unsafe fn from_raw(fd: RawFd) -> Result<Self, TransportError> {
            if fd <= 0 {
                return Err(TransportError::InvalidDescriptor { fd });
            }
            // SAFETY: the caller guarantees `fd` is open and exclusively ours.
            Self::from_owned(unsafe { OwnedFd::from_raw_fd(fd) })
        }
    }

    impl Descriptor for SocketFd {
        fn recv(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            // SAFETY: `buf` is a valid writable region of `buf.len()` bytes
            // and the descriptor stays open for the lifetime of `self`.
            let rc = unsafe {
                libc::recv(
                    self.fd.as_raw_fd(),
                    buf.as_mut_ptr().cast::<libc::c_void>(),
                    buf.len(),
                    0,
                )
            };
            if rc < 0 {
                Err(io::Error::last_os_error())
            } else {
                Ok(rc as usize)
            }
        }

        fn send(&mut self, buf: &[u8]) -> io::Result<usize> {
            // SAFETY: `buf` is a valid readable region of `buf.len()` bytes
            // and the descriptor stays open for the lifetime of `self`.
            let rc = unsafe {
                libc::send(
                    self.fd.as_raw_fd(),
                    buf.as_ptr().cast::<libc::c_void>(),
                    buf.len(),
                    SEND_FLAGS,
                )
            };
            if rc < 0 {
                Err(io::Error::last_os_error())
            } else {
                Ok(rc as usize)
            }
        }
    }

    impl AsRawFd for SocketFd {
        fn as_raw_fd(&self) -> RawFd {
            self.fd.as_raw_fd()
        }
    }

    impl AsFd for SocketFd {
        fn as_fd(&self) -> BorrowedFd<'_> {
            self.fd.as_fd()
        }
    }

    impl TryFrom<std::os::unix::net::UnixStream> for SocketFd {
        type Error = TransportError;

        fn try_from(stream: std::os::unix::net::UnixStream) -> Result<Self, Self::Error> {
            Self::from_owned(OwnedFd::from(stream))
        }
    }

    impl TryFrom<std::net::TcpStream> for SocketFd {
        type Error = TransportError;

        fn try_from(stream: std::net::TcpStream) -> Result<Self, Self::Error> {
            Self::from_owned(OwnedFd::from(stream))
        }
    }

}
