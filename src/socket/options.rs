use std::os::fd::AsRawFd;
use std::time::Duration;
use crate::error::{SocketError, errno};

/// Sets SO_REUSEADDR on a socket.
///
/// Allows binding to an address that's in TIME_WAIT state.
/// Essential for listener restarts on a fixed port.
pub fn set_reuse_addr<S: AsRawFd>(socket: &S, enable: bool) -> std::io::Result<()> {
	let val: libc::c_int = if enable { 1 } else { 0 };
	let result = unsafe {
		libc::setsockopt(
			socket.as_raw_fd(),
			libc::SOL_SOCKET,
			libc::SO_REUSEADDR,
			&val as *const _ as *const libc::c_void,
			std::mem::size_of::<libc::c_int>() as libc::socklen_t,
		)
	};
	if result == -1 {
		Err(SocketError::SetOption { errno: errno(), option: "SO_REUSEADDR" }.into())
	} else {
		Ok(())
	}
}

/// Sets the receive timeout (SO_RCVTIMEO).
///
/// Bounds each blocking `read()`/`recv()`; on expiry the call fails with
/// EAGAIN. On a listening socket the same option bounds `accept()`.
/// A zero duration means block forever.
pub fn set_recv_timeout<S: AsRawFd>(socket: &S, timeout: Duration) -> std::io::Result<()> {
	set_timeout(socket, libc::SO_RCVTIMEO, "SO_RCVTIMEO", timeout)
}

/// Sets the send timeout (SO_SNDTIMEO).
///
/// Bounds each blocking `write()`/`send()`. A zero duration means block forever.
pub fn set_send_timeout<S: AsRawFd>(socket: &S, timeout: Duration) -> std::io::Result<()> {
	set_timeout(socket, libc::SO_SNDTIMEO, "SO_SNDTIMEO", timeout)
}

fn set_timeout<S: AsRawFd>(
	socket: &S,
	option: libc::c_int,
	name: &'static str,
	timeout: Duration,
) -> std::io::Result<()> {
	let val = libc::timeval {
		tv_sec: timeout.as_secs() as libc::time_t,
		tv_usec: timeout.subsec_micros() as libc::suseconds_t,
	};
	let result = unsafe {
		libc::setsockopt(
			socket.as_raw_fd(),
			libc::SOL_SOCKET,
			option,
			&val as *const _ as *const libc::c_void,
			std::mem::size_of::<libc::timeval>() as libc::socklen_t,
		)
	};
	if result == -1 {
		Err(SocketError::SetOption { errno: errno(), option: name }.into())
	} else {
		Ok(())
	}
}
