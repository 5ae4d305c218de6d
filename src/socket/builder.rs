use std::fmt::Display;
use std::marker::PhantomData;
use std::time::Duration;
use crate::addr::{Domain, ToSockAddr};
use crate::error::SetupError;
use super::{
	RawSocket, Listener, ConnectedStream,
	set_reuse_addr, set_recv_timeout, set_send_timeout,
};

// ============================================================================
// Shared Configuration Structs
// ============================================================================

/// Address reuse configuration.
#[derive(Debug, Clone, Copy)]
pub struct ReuseConfig {
	pub addr: bool,
}

impl Default for ReuseConfig {
	fn default() -> Self {
		Self {
			addr: true,  // Listeners restart on the same fixed port
		}
	}
}

impl ReuseConfig {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn addr(mut self, enable: bool) -> Self {
		self.addr = enable;
		self
	}

	fn apply<S: std::os::fd::AsRawFd>(&self, socket: &S) -> std::io::Result<()> {
		if self.addr {
			set_reuse_addr(socket, true)?;
		}
		Ok(())
	}
}

/// Kernel-enforced blocking timeouts (SO_RCVTIMEO / SO_SNDTIMEO).
///
/// `None` leaves the option untouched, i.e. block forever.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeoutConfig {
	pub recv: Option<Duration>,
	pub send: Option<Duration>,
}

impl TimeoutConfig {
	pub fn new() -> Self {
		Self::default()
	}

	/// Same timeout both ways; `0` seconds means no timeout at all.
	pub fn from_secs(secs: u64) -> Self {
		if secs == 0 {
			Self::default()
		} else {
			Self::new().both(Duration::from_secs(secs))
		}
	}

	pub fn recv(mut self, timeout: Duration) -> Self {
		self.recv = Some(timeout);
		self
	}

	pub fn send(mut self, timeout: Duration) -> Self {
		self.send = Some(timeout);
		self
	}

	pub fn both(mut self, timeout: Duration) -> Self {
		self.recv = Some(timeout);
		self.send = Some(timeout);
		self
	}

	pub fn is_set(&self) -> bool {
		self.recv.is_some() || self.send.is_some()
	}

	pub(crate) fn apply<S: std::os::fd::AsRawFd>(&self, socket: &S) -> std::io::Result<()> {
		if let Some(timeout) = self.recv {
			set_recv_timeout(socket, timeout)?;
		}
		if let Some(timeout) = self.send {
			set_send_timeout(socket, timeout)?;
		}
		Ok(())
	}
}

// ============================================================================
// Listener Builder
// ============================================================================

/// Builder for stream listeners.
///
/// The order matches what the accept path relies on: reuse before bind,
/// timeouts on the bound socket, then `listen()`.
///
/// # Example
/// ```ignore
/// use msgsock::{Inet, SocketAddrV6, ListenerBuilder, TimeoutConfig};
///
/// let listener = ListenerBuilder::<Inet>::new()
///     .timeouts(TimeoutConfig::from_secs(1))
///     .backlog(2)
///     .bind(SocketAddrV6::unspecified(16273).into())?;
/// ```
pub struct ListenerBuilder<D: Domain> {
	reuse: ReuseConfig,
	timeouts: TimeoutConfig,
	backlog: i32,
	_marker: PhantomData<D>,
}

impl<D: Domain> Default for ListenerBuilder<D> {
	fn default() -> Self {
		Self::new()
	}
}

impl<D: Domain> ListenerBuilder<D> {
	pub fn new() -> Self {
		Self {
			reuse: ReuseConfig::default(),
			timeouts: TimeoutConfig::default(),
			backlog: 2,
			_marker: PhantomData,
		}
	}

	pub fn reuse(mut self, config: ReuseConfig) -> Self {
		self.reuse = config;
		self
	}

	/// Timeouts on the listening socket; the receive timeout bounds `accept()`.
	pub fn timeouts(mut self, config: TimeoutConfig) -> Self {
		self.timeouts = config;
		self
	}

	/// Set listen backlog. Default: 2.
	pub fn backlog(mut self, backlog: i32) -> Self {
		self.backlog = backlog;
		self
	}

	/// Creates, configures, binds and starts listening on `addr`.
	///
	/// The error says which step failed so callers can decide whether to
	/// move on to the next candidate address.
	pub fn bind(&self, addr: D::Addr) -> Result<Listener<D>, SetupError>
	where
		D::Addr: ToSockAddr + Display,
	{
		let socket = RawSocket::<D>::for_addr(&addr).map_err(SetupError::Create)?;

		self.reuse.apply(&socket).map_err(SetupError::Configure)?;

		let bound = socket.bind(addr).map_err(SetupError::Bind)?;

		self.timeouts.apply(&bound).map_err(SetupError::Configure)?;

		bound.listen(self.backlog).map_err(SetupError::Listen)
	}
}

// ============================================================================
// Connector Builder
// ============================================================================

/// Builder for outbound stream connections.
///
/// Timeouts are applied once the connection is established; the connect
/// itself blocks for as long as the kernel allows.
pub struct ConnectorBuilder<D: Domain> {
	timeouts: TimeoutConfig,
	_marker: PhantomData<D>,
}

impl<D: Domain> Default for ConnectorBuilder<D> {
	fn default() -> Self {
		Self::new()
	}
}

impl<D: Domain> ConnectorBuilder<D> {
	pub fn new() -> Self {
		Self {
			timeouts: TimeoutConfig::default(),
			_marker: PhantomData,
		}
	}

	pub fn timeouts(mut self, config: TimeoutConfig) -> Self {
		self.timeouts = config;
		self
	}

	/// Connects to the remote address.
	pub fn connect(&self, addr: D::Addr) -> Result<ConnectedStream<D>, SetupError>
	where
		D::Addr: ToSockAddr + Display,
	{
		let socket = RawSocket::<D>::for_addr(&addr).map_err(SetupError::Create)?;
		let stream = socket.connect(addr).map_err(SetupError::Connect)?;

		self.timeouts.apply(&stream).map_err(SetupError::Configure)?;
		Ok(stream)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn zero_seconds_means_no_timeout() {
		assert!(!TimeoutConfig::from_secs(0).is_set());
		let t = TimeoutConfig::from_secs(3);
		assert_eq!(t.recv, Some(Duration::from_secs(3)));
		assert_eq!(t.send, Some(Duration::from_secs(3)));
	}
}
