use std::io::ErrorKind;
use std::sync::atomic::AtomicBool;
use tracing::{debug, error, info};
use crate::error::SessionError;
use crate::frame::{self, FrameBuffer};
use crate::result::ResultCode;
use super::{AckStatus, Op, Session};

/// A message accepted by `recv`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Received {
	/// Bytes written to the destination buffer, terminator included.
	pub size: usize,
	pub ack: AckStatus,
}

impl Received {
	/// The message without its terminator, borrowed from the buffer that
	/// was passed to `recv`.
	pub fn payload<'b>(&self, buf: &'b [u8]) -> &'b [u8] {
		frame::payload(&buf[..self.size.min(buf.len())])
	}
}

impl Session {
	/// Reads one null-terminated message into `buf`.
	///
	/// Reads come in chunks of `read_chunk` bytes and are appended to `buf`
	/// until either a read comes back short or the last byte copied is the
	/// terminator. The second check is what ends a message whose length is
	/// an exact multiple of the chunk size.
	///
	/// - Peer closed (0-byte read): `MessageNotReceived`, unless an earlier
	///   broken pipe turns it into `ClientDisconnected`.
	/// - Read timed out with an I/O timeout configured: `ReceiveTimeout`.
	///   Whatever was copied so far must not be trusted.
	/// - A chunk that does not fit (counting room for a terminator still to
	///   come): `MessageOverflow`, and `message_size()` goes negative. No
	///   ACK is written for a rejected message, so a sender waiting for one
	///   sits out its I/O timeout, and the rest of the message is still
	///   queued. Close the connection after an overflow.
	///
	/// With `send_ack`, a completed message is answered with
	/// `:ACK:ByteCount:<size>`. A failed ACK write records `AckSendFailed`
	/// (or `ClientDisconnected` on a broken pipe) but the message still
	/// counts as received.
	///
	/// `_shutdown` is accepted for symmetry with `accept`; a receive in
	/// progress cannot be cancelled.
	pub fn recv(
		&mut self,
		buf: &mut [u8],
		_shutdown: &AtomicBool,
		send_ack: bool,
	) -> Result<Received, SessionError> {
		self.validate(Op::Receive)?;

		let chunk_size = self.config.read_chunk;
		let capacity = buf.len();
		let mut chunk = vec![0u8; chunk_size];
		let mut frame = FrameBuffer::new(buf);
		self.message_size = 0;

		loop {
			let read = self.connection(Op::Receive)?.read(&mut chunk);
			let n = match read {
				Ok(0) => {
					info!(accumulated = frame.len(), "peer closed connection during receive");
					self.message_size = frame.len() as isize;
					if self.check_disruption() {
						return Err(SessionError::Disconnected { op: "receive" });
					}
					return self.fail(SessionError::PeerClosed);
				}
				Ok(n) => n,
				Err(e) if e.kind() == ErrorKind::Interrupted => continue,
				Err(e) => {
					self.record_io_error(&e);
					self.message_size = frame.len() as isize;
					if e.kind() == ErrorKind::WouldBlock && self.config.io_timeout_secs > 0 {
						let secs = self.config.io_timeout_secs;
						error!(secs, accumulated = frame.len(), code = %ResultCode::ReceiveTimeout, "receive timed out");
						return self.fail(SessionError::ReceiveTimeout { secs });
					}
					error!(error = %e, code = %ResultCode::MessageNotReceived, "receive failed");
					return self.fail(SessionError::Receive(e));
				}
			};

			if let Err(overflow) = frame.append(&chunk[..n]) {
				self.message_size = -(overflow.accumulated as isize);
				error!(
					accumulated = overflow.accumulated,
					needed = overflow.needed,
					capacity,
					code = %ResultCode::MessageOverflow,
					"receive buffer overflow; rejecting message"
				);
				return self.fail(SessionError::Overflow { accumulated: overflow.accumulated, capacity });
			}
			debug!(bytes = n, total = frame.len(), "chunk appended");

			// short read: nothing more was queued, the message is complete
			if n < chunk_size || frame.ends_with_terminator() {
				break;
			}
		}

		let size = frame.len();
		self.message_size = size as isize;
		self.last_result = ResultCode::MessageReceived;
		debug!(size, "message received");

		let ack = if send_ack { self.send_ack(size) } else { AckStatus::NotRequested };
		Ok(Received { size, ack })
	}

	fn send_ack(&mut self, size: usize) -> AckStatus {
		let text = frame::encode_ack(size);
		let written = match self.connection(Op::Receive) {
			Ok(conn) => conn.write(text.as_bytes()),
			Err(_) => return AckStatus::Failed(self.last_result),
		};

		match written {
			Ok(_) => AckStatus::Sent,
			Err(e) => {
				self.record_io_error(&e);
				self.last_result = ResultCode::AckSendFailed;
				error!(error = %e, code = %ResultCode::AckSendFailed, "unable to send ACK");
				self.check_disruption();
				AckStatus::Failed(self.last_result)
			}
		}
	}
}
