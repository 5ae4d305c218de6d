use std::io::IoSlice;
use std::marker::PhantomData;
use std::os::fd::OwnedFd;
use crate::addr::Domain;
use crate::error::{SocketError, IoError, errno};

/// An established TCP connection.
///
/// Produced by `Listener::accept()` on the receiving side and by
/// `RawSocket::connect()` on the sending side. Every call is one blocking
/// syscall, bounded only by whatever SO_RCVTIMEO/SO_SNDTIMEO the socket
/// carries. Dropping the stream closes the descriptor.
pub struct ConnectedStream<D: Domain> {
	fd: OwnedFd,
	_marker: PhantomData<D>,
}

impl<D: Domain> ConnectedStream<D> {
	pub(crate) fn from_fd(fd: OwnedFd) -> Self {
		Self { fd, _marker: PhantomData }
	}

	#[inline]
	pub fn as_raw_fd(&self) -> libc::c_int {
		std::os::fd::AsRawFd::as_raw_fd(&self.fd)
	}

	/// One `read()`. `Ok(0)` means the peer closed its side; a receive
	/// timeout surfaces as `WouldBlock`.
	pub fn read(&self, buf: &mut [u8]) -> std::io::Result<usize> {
		let n = unsafe { libc::read(self.as_raw_fd(), buf.as_mut_ptr().cast(), buf.len()) };
		transferred(n, |errno| IoError::Read { errno })
	}

	/// One `write()`; may accept fewer bytes than given.
	pub fn write(&self, buf: &[u8]) -> std::io::Result<usize> {
		let n = unsafe { libc::write(self.as_raw_fd(), buf.as_ptr().cast(), buf.len()) };
		transferred(n, |errno| IoError::Write { errno })
	}

	/// Hands all of `bufs` to the kernel in one `writev()`, so a message and
	/// its terminator leave as a single segment.
	pub fn writev(&self, bufs: &[IoSlice<'_>]) -> std::io::Result<usize> {
		// IoSlice is ABI-compatible with iovec on unix
		let n = unsafe {
			libc::writev(self.as_raw_fd(), bufs.as_ptr().cast::<libc::iovec>(), bufs.len() as libc::c_int)
		};
		transferred(n, |errno| IoError::Write { errno })
	}

	/// Shuts down both directions ahead of the close, so the peer sees EOF
	/// even if another descriptor still refers to this socket.
	pub fn shutdown(&self) -> std::io::Result<()> {
		if unsafe { libc::shutdown(self.as_raw_fd(), libc::SHUT_RDWR) } == -1 {
			return Err(SocketError::SetOption { errno: errno(), option: "shutdown" }.into());
		}
		Ok(())
	}
}

fn transferred(n: libc::ssize_t, err: impl FnOnce(i32) -> IoError) -> std::io::Result<usize> {
	if n < 0 {
		Err(err(errno()).into())
	} else {
		Ok(n as usize)
	}
}

impl<D: Domain> std::os::fd::AsRawFd for ConnectedStream<D> {
	fn as_raw_fd(&self) -> std::os::fd::RawFd {
		std::os::fd::AsRawFd::as_raw_fd(&self.fd)
	}
}

impl<D: Domain> std::os::fd::AsFd for ConnectedStream<D> {
	fn as_fd(&self) -> std::os::fd::BorrowedFd<'_> {
		std::os::fd::AsFd::as_fd(&self.fd)
	}
}
