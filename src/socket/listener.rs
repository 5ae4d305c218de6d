use std::marker::PhantomData;
use std::os::fd::{FromRawFd, OwnedFd};
use crate::addr::{Domain, FromSockAddr};
use crate::error::{SocketError, errno};
use super::stream::ConnectedStream;

/// A listening socket ready to accept connections.
///
/// Only stream sockets listen.
pub struct Listener<D: Domain> {
    fd: OwnedFd,
    _marker: PhantomData<D>,
}

impl<D: Domain> Listener<D> {
    /// Called by `BoundSocket::listen()`.
    pub(crate) fn from_fd(fd: OwnedFd) -> Self {
        Self {
            fd,
            _marker: PhantomData,
        }
    }

    #[inline]
    pub fn as_raw_fd(&self) -> libc::c_int {
        use std::os::fd::AsRawFd;
        self.fd.as_raw_fd()
    }
}

impl<D: Domain> Listener<D>
where
    D::Addr: FromSockAddr,
{
    /// Waits for one incoming connection.
    ///
    /// Blocks until a peer connects or, when the listener carries a receive
    /// timeout (SO_RCVTIMEO), until that timeout expires.
    ///
    /// # Outcomes
    ///
    /// - `Connection`: handshake complete, stream ready for read/write.
    ///   The peer address is `None` if the kernel reported a family this
    ///   domain cannot decode.
    /// - `TimedOut`: the listen timeout expired with nobody connecting.
    /// - `Interrupted`: a signal arrived; safe to retry immediately.
    /// - `Err`: any other accept failure. The listener stays usable.
    pub fn accept(&self) -> std::io::Result<AcceptResult<D>> {
        let mut storage: libc::sockaddr_storage = unsafe { std::mem::zeroed() };
        let mut len = std::mem::size_of::<libc::sockaddr_storage>() as libc::socklen_t;

        let fd = unsafe {
            libc::accept4(
                self.as_raw_fd(),
                &mut storage as *mut _ as *mut libc::sockaddr,
                &mut len,
                libc::SOCK_CLOEXEC,
            )
        };

        if fd == -1 {
            let err = errno();
            return match err {
                libc::EAGAIN => Ok(AcceptResult::TimedOut),
                libc::EINTR => Ok(AcceptResult::Interrupted),
                _ => Err(SocketError::Accept { errno: err }.into()),
            };
        }

        let fd = unsafe { OwnedFd::from_raw_fd(fd) };
        let stream = ConnectedStream::from_fd(fd);
        let peer = unsafe {
            D::Addr::from_sockaddr(&storage as *const _ as *const libc::sockaddr, len)
        };

        Ok(AcceptResult::Connection(stream, peer))
    }
}

impl<D: Domain> std::os::fd::AsRawFd for Listener<D> {
    fn as_raw_fd(&self) -> std::os::fd::RawFd {
        std::os::fd::AsRawFd::as_raw_fd(&self.fd)
    }
}

impl<D: Domain> std::os::fd::AsFd for Listener<D> {
    fn as_fd(&self) -> std::os::fd::BorrowedFd<'_> {
        std::os::fd::AsFd::as_fd(&self.fd)
    }
}

/// Result of one blocking accept attempt.
///
/// This enum does **not** represent socket state. The listener remains
/// a `Listener<D>` in all cases.
pub enum AcceptResult<D: Domain> {
    /// A connection was accepted.
    Connection(ConnectedStream<D>, Option<D::Addr>),

    /// The listener's receive timeout expired before anyone connected.
    TimedOut,

    /// The accept syscall was interrupted by a signal.
    Interrupted,
}
