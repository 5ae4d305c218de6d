use std::marker::PhantomData;
use std::os::fd::{FromRawFd, OwnedFd};
use crate::addr::{Domain, ToSockAddr};
use crate::error::{SocketError, errno};
use super::bound::BoundSocket;
use super::stream::ConnectedStream;

/// A socket that has been created but not yet bound or connected.
///
/// Use `.bind()` on the way to a listener, `.connect()` for a client stream.
pub struct RawSocket<D: Domain> {
	fd: OwnedFd,
	_marker: PhantomData<D>,
}

impl<D: Domain> RawSocket<D> {
	/// Creates a socket whose family matches `addr`.
	///
	/// For `Inet` this picks `AF_INET` or `AF_INET6` per candidate address.
	/// The socket is created with `SOCK_CLOEXEC`.
	pub fn for_addr(addr: &D::Addr) -> std::io::Result<Self> {
		let family = D::family_of(addr);
		let fd = unsafe { libc::socket(family, libc::SOCK_STREAM | libc::SOCK_CLOEXEC, 0) };
		if fd == -1 {
			return Err(SocketError::Create { errno: errno() }.into());
		}
		let fd = unsafe { OwnedFd::from_raw_fd(fd) };

		Ok(Self {
			fd,
			_marker: PhantomData,
		})
	}

	#[inline]
	pub fn as_raw_fd(&self) -> libc::c_int {
		std::os::fd::AsRawFd::as_raw_fd(&self.fd)
	}

	/// Binds the socket to an address.
	///
	/// Consumes self, returns BoundSocket.
	pub fn bind(self, addr: D::Addr) -> std::io::Result<BoundSocket<D>>
	where
		D::Addr: ToSockAddr + std::fmt::Display,
	{
		let result = addr.with_raw(|ptr, len| unsafe {
			libc::bind(self.as_raw_fd(), ptr, len)
		});

		match result {
			Some(-1) => Err(SocketError::Bind {
				errno: errno(),
				addr: addr.to_string(),
			}.into()),
			Some(_) => Ok(BoundSocket::from_fd(self.into_fd())),
			None => Err(SocketError::InvalidAddress {
				reason: "address not representable",
			}.into()),
		}
	}

	pub(crate) fn into_fd(self) -> OwnedFd {
		self.fd
	}

	/// Connects to a remote address (blocking).
	///
	/// Consumes self, returns a connected stream.
	pub fn connect(self, addr: D::Addr) -> std::io::Result<ConnectedStream<D>>
	where
		D::Addr: ToSockAddr + std::fmt::Display,
	{
		let result = addr.with_raw(|ptr, len| unsafe {
			libc::connect(self.as_raw_fd(), ptr, len)
		});

		match result {
			Some(-1) => Err(SocketError::Connect {
				errno: errno(),
				addr: addr.to_string(),
			}.into()),
			Some(_) => Ok(ConnectedStream::from_fd(self.into_fd())),
			None => Err(SocketError::InvalidAddress {
				reason: "address not representable",
			}.into()),
		}
	}
}

impl<D: Domain> std::os::fd::AsRawFd for RawSocket<D> {
	fn as_raw_fd(&self) -> std::os::fd::RawFd {
		std::os::fd::AsRawFd::as_raw_fd(&self.fd)
	}
}

impl<D: Domain> std::os::fd::AsFd for RawSocket<D> {
	fn as_fd(&self) -> std::os::fd::BorrowedFd<'_> {
		std::os::fd::AsFd::as_fd(&self.fd)
	}
}
