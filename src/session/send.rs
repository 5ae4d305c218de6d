use std::io::{ErrorKind, IoSlice};
use tracing::{debug, error, info};
use crate::addr::{resolve, Hints, Inet};
use crate::error::{SessionError, SetupError};
use crate::frame::{Ack, ACK_BUF_LEN, TERMINATOR};
use crate::result::ResultCode;
use crate::signal::ignore_sigpipe;
use crate::socket::ConnectorBuilder;
use super::{AckStatus, Op, Role, Session};

/// A message handed to the kernel by `send`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sent {
	/// Bytes written, terminator included.
	pub bytes: usize,
	pub ack: AckStatus,
}

impl Session {
	/// Connects to the configured host and port.
	///
	/// Resolution may return IPv4 and IPv6 candidates; they are tried in
	/// order and the first that connects wins. When every candidate failed
	/// and all of them timed out the result is `ConnectTimeout`, otherwise
	/// `NoConnection`. The I/O timeout is applied once connected.
	pub fn connect(&mut self) -> Result<(), SessionError> {
		self.validate(Op::Connect)?;
		ignore_sigpipe();

		let host = match &self.role {
			Role::Sender { host } => host.clone(),
			Role::Receiver => {
				return self.fail(SessionError::InvalidSession { op: "connect", reason: "only a sender can connect" });
			}
		};
		let port = self.config.port;

		let candidates = match resolve(&host, port, Hints::connect()) {
			Ok(candidates) => candidates,
			Err(e) => {
				error!(%host, port, error = %e, code = %ResultCode::AddrResolutionFailed, "remote address lookup failed");
				return self.fail(e.into());
			}
		};

		let builder = ConnectorBuilder::<Inet>::new().timeouts(self.config.io_timeouts());
		let mut failures = Vec::new();

		for addr in candidates {
			match builder.connect(addr) {
				Ok(stream) => {
					info!(%addr, fd = stream.as_raw_fd(), "connected");
					self.store_connection(stream);
					return Ok(());
				}
				Err(SetupError::Configure(e)) => {
					error!(%addr, error = %e, code = %ResultCode::SetSockOptFailed, "unable to set client socket timeouts");
					return self.fail(SessionError::SetOption(e));
				}
				Err(SetupError::Connect(e)) => {
					failures.push(e.kind());
					debug!(%addr, error = %e, "connect candidate failed");
				}
				Err(other) => {
					failures.push(ErrorKind::Other);
					debug!(%addr, error = %other, "connect candidate failed");
				}
			}
		}

		let err = connect_failure(host, port, &failures);
		error!(error = %err, code = %err.code(), "failed to connect to any address");
		self.fail(err)
	}

	/// Sends `message` followed by its terminator in a single write.
	///
	/// The message must not itself contain a null byte, since the receiver
	/// would take it for the end of the message. A failed write records
	/// `MessageNotSent`, or `ClientDisconnected` if it was a broken pipe, in
	/// which case the connection is closed and the next `send` fails
	/// validation.
	///
	/// With `await_ack`, one bounded read waits for the receiver's ACK. Its
	/// content is passed back untouched; failing to read it records
	/// `AckReceiveFailed` without undoing the send.
	pub fn send(&mut self, message: &[u8], await_ack: bool) -> Result<Sent, SessionError> {
		self.validate(Op::Send)?;

		if let Some(position) = message.iter().position(|&b| b == TERMINATOR) {
			error!(position, code = %ResultCode::MessageNotSent, "message contains a null byte");
			return self.fail(SessionError::InteriorNul { position });
		}

		let expected = message.len() + 1;
		let terminator = [TERMINATOR];
		let parts = [IoSlice::new(message), IoSlice::new(&terminator)];
		let written = self.connection(Op::Send)?.writev(&parts);

		match written {
			Ok(n) if n == expected => {}
			Ok(n) => {
				error!(written = n, expected, code = %ResultCode::MessageNotSent, "short write");
				return self.fail(SessionError::ShortWrite { written: n, expected });
			}
			Err(e) => {
				self.record_io_error(&e);
				self.last_result = ResultCode::MessageNotSent;
				error!(error = %e, code = %ResultCode::MessageNotSent, "message send failed");
				if self.check_disruption() {
					return Err(SessionError::Disconnected { op: "send" });
				}
				return self.fail(SessionError::Send(e));
			}
		}

		self.last_result = ResultCode::MessageSent;
		debug!(bytes = expected, "message sent");

		let ack = if await_ack { self.await_ack() } else { AckStatus::NotRequested };
		Ok(Sent { bytes: expected, ack })
	}

	fn await_ack(&mut self) -> AckStatus {
		let mut raw = [0u8; ACK_BUF_LEN];
		let read = match self.connection(Op::Send) {
			Ok(conn) => conn.read(&mut raw),
			Err(_) => return AckStatus::Failed(self.last_result),
		};

		match read {
			Ok(0) => {
				self.last_result = ResultCode::AckReceiveFailed;
				error!(code = %ResultCode::AckReceiveFailed, "connection closed before ACK arrived");
				AckStatus::Failed(self.last_result)
			}
			Ok(n) => {
				let ack = Ack::from_bytes(&raw[..n]);
				debug!(ack = %ack, "ACK received");
				AckStatus::Received(ack)
			}
			Err(e) => {
				self.record_io_error(&e);
				self.last_result = ResultCode::AckReceiveFailed;
				error!(error = %e, code = %ResultCode::AckReceiveFailed, "unable to read ACK");
				self.check_disruption();
				AckStatus::Failed(self.last_result)
			}
		}
	}
}

/// `ConnectTimeout` only when there were candidates and every one of them
/// timed out; anything else is `NoConnection`.
fn connect_failure(host: String, port: u16, failures: &[ErrorKind]) -> SessionError {
	if !failures.is_empty() && failures.iter().all(|k| *k == ErrorKind::TimedOut) {
		SessionError::ConnectTimeout { host, port }
	} else {
		SessionError::NoConnection { host, port }
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn timeout_only_when_every_candidate_timed_out() {
		let all = [ErrorKind::TimedOut, ErrorKind::TimedOut];
		let err = connect_failure("db".into(), 16273, &all);
		assert_eq!(err.code(), ResultCode::ConnectTimeout);

		let mixed = [ErrorKind::TimedOut, ErrorKind::ConnectionRefused];
		let err = connect_failure("db".into(), 16273, &mixed);
		assert_eq!(err.code(), ResultCode::NoConnection);

		assert!(matches!(
			connect_failure("db".into(), 16273, &[]),
			SessionError::NoConnection { port: 16273, .. }
		));
	}
}
