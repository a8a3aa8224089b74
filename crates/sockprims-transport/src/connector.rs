//! Helpers for the code that opens descriptors before handing them to a
//! [`Connection`](crate::Connection).
//!
//! A write to a peer that already closed must surface as an ordinary
//! transport error rather than a process-fatal `SIGPIPE`. Connectors either
//! call [`ignore_sigpipe`] once for the whole process or rely on
//! [`set_nosigpipe`] per socket where the platform supports it.

use std::sync::Once;

use tracing::debug;

use crate::error::TransportError;

static IGNORE_SIGPIPE: Once = Once::new();

/// Ignore `SIGPIPE` for the whole process. Safe to call repeatedly.
pub fn ignore_sigpipe() {
    IGNORE_SIGPIPE.call_once(|| {
        #[cfg(unix)]
        {
            // SAFETY: installing SIG_IGN has no handler code to run and is
            // valid for SIGPIPE on every Unix target.
            unsafe {
                libc::signal(libc::SIGPIPE, libc::SIG_IGN);
            }
            debug!("SIGPIPE ignored process-wide");
        }
    });
}

/// Set `SO_NOSIGPIPE` on `fd` where the platform provides it.
#[cfg(any(target_os = "macos", target_os = "ios", target_os = "freebsd"))]
pub fn set_nosigpipe(fd: std::os::fd::RawFd) -> Result<(), TransportError> {
    let set: libc::c_int = 1;
    // SAFETY: `set` is a valid readable c_int for the duration of the call
    // and `fd` is an open socket owned by the caller.
    let rc = unsafe {
        libc::setsockopt(
            fd,
            libc::SOL_SOCKET,
            libc::SO_NOSIGPIPE,
            (&set as *const libc::c_int).cast::<libc::c_void>(),
            std::mem::size_of::<libc::c_int>() as libc::socklen_t,
        )
    };
    if rc != 0 {
        return Err(TransportError::SocketOption {
            option: "SO_NOSIGPIPE",
            source: std::io::Error::last_os_error(),
        });
    }
    Ok(())
}

/// Set `SO_NOSIGPIPE` on `fd` where the platform provides it.
///
/// This target has no such option; sends use `MSG_NOSIGNAL` instead.
#[cfg(all(
    unix,
    not(any(target_os = "macos", target_os = "ios", target_os = "freebsd"))
))]
pub fn set_nosigpipe(_fd: std::os::fd::RawFd) -> Result<(), TransportError> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ignore_sigpipe_is_idempotent() {
        ignore_sigpipe();
        ignore_sigpipe();
        assert!(IGNORE_SIGPIPE.is_completed());
    }

    #[cfg(unix)]
    #[test]
    fn set_nosigpipe_on_socket() {
        use std::os::fd::AsRawFd;

        let (left, _right) = std::os::unix::net::UnixStream::pair().unwrap();
        set_nosigpipe(left.as_raw_fd()).unwrap();
    }
}
