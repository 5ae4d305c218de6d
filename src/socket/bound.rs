use std::os::fd::OwnedFd;
use std::marker::PhantomData;
use crate::addr::Domain;
use crate::error::{SocketError, errno};
use super::listener::Listener;

/// A socket that has been bound to an address but is not yet listening.
///
/// Same fd as the RawSocket it came from; the new type only unlocks
/// `.listen()` for stream sockets.
pub struct BoundSocket<D: Domain> {
	fd: OwnedFd,
	_marker: PhantomData<D>,
}

impl<D: Domain> BoundSocket<D> {
	/// Internal use only - called by RawSocket::bind()
	pub(crate) fn from_fd(fd: OwnedFd) -> Self {
		Self {
			fd,
			_marker: PhantomData,
		}
	}

	#[inline]
	pub fn as_raw_fd(&self) -> libc::c_int {
		std::os::fd::AsRawFd::as_raw_fd(&self.fd)
	}

	pub(crate) fn into_fd(self) -> OwnedFd {
		self.fd
	}

	/// Transitions to a listening socket.
	///
	/// `backlog` bounds the queue of not-yet-accepted connects, not the
	/// number of live connections. Sessions accept one peer at a time, so a
	/// small value is enough.
	pub fn listen(self, backlog: i32) -> std::io::Result<Listener<D>> {
		let result = unsafe { libc::listen(self.as_raw_fd(), backlog) };

		if result == -1 {
			return Err(SocketError::Listen { errno: errno(), backlog }.into());
		}

		Ok(Listener::from_fd(self.into_fd()))
	}
}

impl<D: Domain> std::os::fd::AsRawFd for BoundSocket<D> {
	fn as_raw_fd(&self) -> std::os::fd::RawFd {
		std::os::fd::AsRawFd::as_raw_fd(&self.fd)
	}
}

impl<D: Domain> std::os::fd::AsFd for BoundSocket<D> {
	fn as_fd(&self) -> std::os::fd::BorrowedFd<'_> {
		std::os::fd::AsFd::as_fd(&self.fd)
	}
}
