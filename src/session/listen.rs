use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use crate::addr::{resolve, Hints, Inet};
use crate::error::{SessionError, SetupError};
use crate::result::ResultCode;
use crate::signal::ignore_sigpipe;
use crate::socket::{AcceptResult, ListenerBuilder, ReuseConfig};
use super::{Op, Session};

/// Dual-stack wildcard; IPv4 peers arrive as v4-mapped addresses.
const LISTEN_ANY: &str = "::";

/// Pause after an accept failure other than a timeout, so an error that
/// keeps recurring (EMFILE, ENFILE) does not spin.
const ACCEPT_RETRY_DELAY: Duration = Duration::from_millis(100);

/// How an `accept` call ended without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcceptOutcome {
	/// A peer connected; the session now holds its stream.
	Connected,
	/// The shutdown flag was found set after a listen timeout or a failed
	/// accept.
	ShutdownRequested,
}

impl Session {
	/// Binds and starts listening on the configured port.
	///
	/// Candidates from the wildcard lookup are tried in order. One that
	/// cannot create a socket or bind is skipped; a socket option or
	/// `listen()` failure ends the call. With a listen timeout configured it
	/// is applied to the listener as both receive and send timeout, which is
	/// what bounds each `accept` wait.
	pub fn acquire_listener(&mut self) -> Result<(), SessionError> {
		self.validate(Op::AcquireListener)?;
		ignore_sigpipe();

		let port = self.config.port;
		let candidates = match resolve(LISTEN_ANY, port, Hints::passive_ipv6()) {
			Ok(candidates) => candidates,
			Err(e) => {
				error!(port, error = %e, code = %ResultCode::AddrResolutionFailed, "listener address lookup failed");
				return self.fail(e.into());
			}
		};

		let builder = ListenerBuilder::<Inet>::new()
			.reuse(ReuseConfig::new().addr(true))
			.timeouts(self.config.listen_timeouts())
			.backlog(self.config.backlog);

		for addr in candidates {
			match builder.bind(addr) {
				Ok(listener) => {
					info!(
						%addr,
						fd = listener.as_raw_fd(),
						listen_timeout_secs = self.config.listen_timeout_secs,
						"listener created"
					);
					self.listener = Some(listener);
					self.last_result = ResultCode::ListenerCreated;
					return Ok(());
				}
				Err(SetupError::Configure(e)) => {
					error!(%addr, error = %e, code = %ResultCode::SetSockOptFailed, "unable to configure listener socket");
					return self.fail(SessionError::SetOption(e));
				}
				Err(SetupError::Listen(e)) => {
					error!(%addr, error = %e, code = %ResultCode::ListenFailed, "listen() failed");
					return self.fail(SessionError::Listen(e));
				}
				Err(skipped) => {
					info!(%addr, error = %skipped, "skipping listener candidate");
				}
			}
		}

		error!(port, code = %ResultCode::SocketBindFailed, "unable to bind any listener address");
		self.fail(SessionError::Bind { port })
	}

	/// Waits for one peer to connect.
	///
	/// With a listen timeout, every expiry checks `shutdown`: if it is set
	/// the call returns `ShutdownRequested` without a connection, otherwise
	/// it waits again. Without one, the wait is unbounded and `shutdown` is
	/// never consulted. Other accept failures are logged and retried after a
	/// short pause, checking `shutdown` first.
	///
	/// On success the configured I/O timeout is applied to the new stream.
	/// One call yields at most one connection; close it with
	/// `close_connection` before accepting the next peer.
	pub fn accept(&mut self, shutdown: &AtomicBool) -> Result<AcceptOutcome, SessionError> {
		self.validate(Op::Accept)?;
		let timeout_set = self.config.listen_timeout_secs > 0;

		loop {
			let attempt = match &self.listener {
				Some(listener) => listener.accept(),
				None => return self.fail(SessionError::InvalidSession { op: "accept", reason: "no listener" }),
			};

			match attempt {
				Ok(AcceptResult::Connection(stream, peer)) => {
					if let Err(e) = self.config.io_timeouts().apply(&stream) {
						error!(error = %e, code = %ResultCode::SetSockOptFailed, "unable to set client socket timeouts");
						return self.fail(SessionError::SetOption(e));
					}
					info!(
						peer = %peer.map_or_else(|| "unknown".to_string(), |p| p.to_string()),
						fd = stream.as_raw_fd(),
						"client connected"
					);
					self.store_connection(stream);
					return Ok(AcceptOutcome::Connected);
				}
				Ok(AcceptResult::TimedOut) if timeout_set => {
					if shutdown.load(Ordering::Acquire) {
						info!(code = %ResultCode::ShutdownRequested, "accept() timed out and shutdown signaled");
						return Ok(self.shutdown_requested());
					}
					debug!(listen_timeout_secs = self.config.listen_timeout_secs, "accept() timed out, waiting again");
				}
				Ok(AcceptResult::TimedOut) => {
					warn!("accept() reported a timeout without a listen timeout, looping");
				}
				Ok(AcceptResult::Interrupted) => {
					debug!("accept() interrupted, retrying");
				}
				Err(e) => {
					if shutdown.load(Ordering::Acquire) {
						info!(error = %e, code = %ResultCode::ShutdownRequested, "accept() failed and shutdown signaled");
						return Ok(self.shutdown_requested());
					}
					warn!(error = %e, "accept() failed for this client, looping");
					thread::sleep(ACCEPT_RETRY_DELAY);
				}
			}
		}
	}

	fn shutdown_requested(&mut self) -> AcceptOutcome {
		self.last_result = ResultCode::ShutdownRequested;
		AcceptOutcome::ShutdownRequested
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::session::SessionConfig;

	#[test]
	fn failing_accept_still_honours_shutdown() {
		let mut session = Session::receiver(SessionConfig::new(16320));
		session.acquire_listener().unwrap();

		// a shut-down listener fails every accept() with EINVAL
		let fd = session.listener.as_ref().unwrap().as_raw_fd();
		assert_eq!(unsafe { libc::shutdown(fd, libc::SHUT_RDWR) }, 0);

		let outcome = session.accept(&AtomicBool::new(true)).unwrap();
		assert_eq!(outcome, AcceptOutcome::ShutdownRequested);
		assert_eq!(session.last_result(), ResultCode::ShutdownRequested);
		assert!(!session.is_connected());
	}
}
