use std::io::ErrorKind;
use tracing::error;
use crate::result::ResultCode;
use super::Session;

impl Session {
	/// Turns a broken pipe into a session-level disconnect.
	///
	/// Looks at the error of the most recent failing I/O call on this
	/// session. If it was EPIPE, the connected descriptor is closed, the
	/// result becomes `ClientDisconnected`, and `true` is returned.
	/// Otherwise nothing changes and the caller's result stands.
	///
	/// This is the only place a connection is closed as a side effect of an
	/// error; all other closes are explicit owner actions.
	pub fn check_disruption(&mut self) -> bool {
		if self.last_io_error != Some(ErrorKind::BrokenPipe) {
			return false;
		}
		let fd = self.conn.as_ref().map(|c| c.as_raw_fd());
		error!(?fd, code = %ResultCode::ClientDisconnected, "broken pipe; closing connected socket");
		self.conn = None;
		self.last_io_error = None;
		self.last_result = ResultCode::ClientDisconnected;
		true
	}

	pub(crate) fn record_io_error(&mut self, err: &std::io::Error) {
		self.last_io_error = Some(err.kind());
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::session::SessionConfig;

	#[test]
	fn other_errors_leave_result_alone() {
		let mut session = Session::sender("localhost", SessionConfig::new(16273));
		session.last_result = ResultCode::MessageNotSent;
		session.record_io_error(&std::io::Error::from(ErrorKind::ConnectionRefused));
		assert!(!session.check_disruption());
		assert_eq!(session.last_result(), ResultCode::MessageNotSent);
	}

	#[test]
	fn broken_pipe_marks_disconnected() {
		let mut session = Session::sender("localhost", SessionConfig::new(16273));
		session.last_result = ResultCode::MessageNotSent;
		session.record_io_error(&std::io::Error::from(ErrorKind::BrokenPipe));
		assert!(session.check_disruption());
		assert_eq!(session.last_result(), ResultCode::ClientDisconnected);
		assert!(!session.is_connected());
		assert!(!session.check_disruption());
	}
}
