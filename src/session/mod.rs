//! Socket sessions.
//!
//! A `Session` is one socket role, either receiver or sender, together
//! with its descriptors and the result of its last operation. Operations run
//! in a fixed order per role:
//!
//! - receiver: `acquire_listener` → `accept` → `recv`*
//! - sender: `connect` → `send`*
//!
//! Each entry point re-validates the session before doing any I/O, since
//! the state may have changed (a connection closed, a listener dropped)
//! since the previous call. Every call records a [`ResultCode`] on the
//! session, and failures are also returned as a [`SessionError`] carrying
//! the same code. A session is not meant to be shared between threads
//! while an operation is running; it is `Send`, so it can be moved to a
//! worker thread.

mod config;
mod listen;
mod recv;
mod send;
mod disrupt;

pub use self::config::{SessionConfig, MAX_TIMEOUT_SECS};
pub use self::listen::AcceptOutcome;
pub use self::recv::Received;
pub use self::send::Sent;

use std::fmt;
use tracing::{debug, error, info};
use crate::addr::Inet;
use crate::error::SessionError;
use crate::frame::Ack;
use crate::result::ResultCode;
use crate::socket::{ConnectedStream, Listener};

/// Which side of the protocol a session plays.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Role {
	/// Listens, accepts one peer at a time, receives messages.
	Receiver,
	/// Connects to `host` and sends messages.
	Sender { host: String },
}

/// What happened to the acknowledgment that accompanies a message.
///
/// ACK trouble never undoes the message transfer itself; it is reported
/// here and in the session's last result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AckStatus {
	NotRequested,
	/// Receiver side: the ACK text was written.
	Sent,
	/// Sender side: an ACK arrived.
	Received(Ack),
	/// The ACK could not be written or read. Carries the recorded code:
	/// `AckSendFailed`, `AckReceiveFailed`, or `ClientDisconnected` when
	/// the failure turned out to be a broken pipe.
	Failed(ResultCode),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Op {
	AcquireListener,
	Accept,
	Receive,
	Connect,
	Send,
}

impl Op {
	fn name(self) -> &'static str {
		match self {
			Op::AcquireListener => "listener acquire",
			Op::Accept => "accept",
			Op::Receive => "receive",
			Op::Connect => "connect",
			Op::Send => "send",
		}
	}
}

/// One socket role instance.
pub struct Session {
	role: Role,
	config: SessionConfig,
	listener: Option<Listener<Inet>>,
	conn: Option<ConnectedStream<Inet>>,
	valid: bool,
	last_result: ResultCode,
	message_size: isize,
	last_io_error: Option<std::io::ErrorKind>,
}

impl Session {
	/// A receiver session; call `acquire_listener` next.
	pub fn receiver(config: SessionConfig) -> Self {
		Self::with_role(Role::Receiver, config)
	}

	/// A sender session for `host`; call `connect` next.
	pub fn sender(host: impl Into<String>, config: SessionConfig) -> Self {
		Self::with_role(Role::Sender { host: host.into() }, config)
	}

	fn with_role(role: Role, config: SessionConfig) -> Self {
		let valid = config.check().is_ok();
		Self {
			role,
			config,
			listener: None,
			conn: None,
			valid,
			last_result: ResultCode::Initialized,
			message_size: 0,
			last_io_error: None,
		}
	}

	pub fn role(&self) -> &Role {
		&self.role
	}

	pub fn config(&self) -> &SessionConfig {
		&self.config
	}

	/// Result of the most recent operation.
	pub fn last_result(&self) -> ResultCode {
		self.last_result
	}

	/// Outcome of the most recent validation.
	pub fn is_valid(&self) -> bool {
		self.valid
	}

	/// Bytes accumulated by the last `recv`, terminator included.
	///
	/// Negative after an overflow: the magnitude is what had been accepted
	/// before the rejected chunk, and the destination buffer must be
	/// discarded.
	pub fn message_size(&self) -> isize {
		self.message_size
	}

	pub fn has_listener(&self) -> bool {
		self.listener.is_some()
	}

	pub fn is_connected(&self) -> bool {
		self.conn.is_some()
	}

	/// Closes the connected descriptor, if any. Returns whether one was open.
	///
	/// A receiver can then `accept` its next peer on the same listener.
	pub fn close_connection(&mut self) -> bool {
		match self.conn.take() {
			Some(conn) => {
				if let Err(e) = conn.shutdown() {
					debug!(fd = conn.as_raw_fd(), error = %e, "shutdown before close failed");
				}
				info!(fd = conn.as_raw_fd(), "closing connected socket");
				self.last_io_error = None;
				true
			}
			None => false,
		}
	}

	/// Closes the listening descriptor, if any. Returns whether one was open.
	pub fn close_listener(&mut self) -> bool {
		match self.listener.take() {
			Some(listener) => {
				info!(fd = listener.as_raw_fd(), "closing listener socket");
				true
			}
			None => false,
		}
	}

	/// Final teardown: closes whatever is still open and releases the session.
	pub fn destroy(mut self) {
		let conn = self.close_connection();
		let listener = self.close_listener();
		debug!(closed_connection = conn, closed_listener = listener, "session destroyed");
	}

	/// Recomputes `valid` for `op` and records `InvalidSession` if it fails.
	pub(crate) fn validate(&mut self, op: Op) -> Result<(), SessionError> {
		match self.check(op) {
			Ok(()) => {
				self.valid = true;
				Ok(())
			}
			Err(reason) => {
				self.valid = false;
				error!(op = op.name(), reason, code = %ResultCode::InvalidSession, "invalid session");
				self.fail(SessionError::InvalidSession { op: op.name(), reason })
			}
		}
	}

	fn check(&self, op: Op) -> Result<(), &'static str> {
		self.config.check()?;
		match op {
			Op::AcquireListener => {
				if self.role != Role::Receiver {
					return Err("only a receiver can listen");
				}
				if self.listener.is_some() {
					return Err("listener already acquired");
				}
				if self.conn.is_some() {
					return Err("connection already open");
				}
			}
			Op::Accept => {
				if self.listener.is_none() {
					return Err("no listener");
				}
				if self.conn.is_some() {
					return Err("previous connection still open");
				}
			}
			Op::Receive => {
				if self.listener.is_none() {
					return Err("no listener");
				}
				if self.conn.is_none() {
					return Err("not connected");
				}
			}
			Op::Connect => {
				match &self.role {
					Role::Sender { host } if host.is_empty() => return Err("empty remote host"),
					Role::Sender { .. } => {}
					Role::Receiver => return Err("only a sender can connect"),
				}
				if self.conn.is_some() {
					return Err("already connected");
				}
			}
			Op::Send => {
				if self.conn.is_none() {
					return Err("not connected");
				}
			}
		}
		Ok(())
	}

	/// Records a failure's code and hands it back.
	pub(crate) fn fail<T>(&mut self, err: SessionError) -> Result<T, SessionError> {
		self.last_result = err.code();
		Err(err)
	}

	/// The open connection, or `InvalidSession` if it is gone.
	pub(crate) fn connection(&mut self, op: Op) -> Result<&ConnectedStream<Inet>, SessionError> {
		if self.conn.is_none() {
			self.valid = false;
			return self.fail(SessionError::InvalidSession { op: op.name(), reason: "not connected" });
		}
		self.conn.as_ref().ok_or(SessionError::InvalidSession { op: op.name(), reason: "not connected" })
	}

	pub(crate) fn store_connection(&mut self, conn: ConnectedStream<Inet>) {
		self.conn = Some(conn);
		self.last_io_error = None;
		self.last_result = ResultCode::ClientConnected;
	}
}

fn fd_of<T: std::os::fd::AsRawFd>(slot: &Option<T>) -> Option<i32> {
	slot.as_ref().map(|s| s.as_raw_fd())
}

impl fmt::Debug for Session {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Session")
			.field("role", &self.role)
			.field("port", &self.config.port)
			.field("listener_fd", &fd_of(&self.listener))
			.field("connected_fd", &fd_of(&self.conn))
			.field("listen_timeout_secs", &self.config.listen_timeout_secs)
			.field("io_timeout_secs", &self.config.io_timeout_secs)
			.field("valid", &self.valid)
			.field("last_result", &self.last_result)
			.finish()
	}
}

impl fmt::Display for Session {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let fd = |v: Option<i32>| v.map_or_else(|| "-".to_string(), |fd| fd.to_string());
		match &self.role {
			Role::Receiver => write!(f, "receiver port={}", self.config.port)?,
			Role::Sender { host } => write!(f, "sender {}:{}", host, self.config.port)?,
		}
		write!(
			f,
			" lsd={} csd={} lto={}s cto={}s valid={} result={}",
			fd(fd_of(&self.listener)),
			fd(fd_of(&self.conn)),
			self.config.listen_timeout_secs,
			self.config.io_timeout_secs,
			self.valid,
			self.last_result,
		)
	}
}
