//! Process-wide SIGPIPE handling.
//!
//! Writing to a socket whose peer has gone away raises SIGPIPE, which kills
//! the process by default. Sessions need the write to fail with EPIPE
//! instead so the broken connection can be detected and closed.

use std::sync::Once;
use tracing::{debug, warn};

static IGNORE_SIGPIPE: Once = Once::new();

/// Installs `SIG_IGN` for SIGPIPE, once per process.
///
/// Later calls are no-ops, so every listen- or send-capable entry point can
/// call this unconditionally.
pub fn ignore_sigpipe() {
	IGNORE_SIGPIPE.call_once(|| {
		let mut action: libc::sigaction = unsafe { std::mem::zeroed() };
		action.sa_sigaction = libc::SIG_IGN;
		action.sa_flags = 0;

		let result = unsafe {
			libc::sigemptyset(&mut action.sa_mask);
			libc::sigaction(libc::SIGPIPE, &action, std::ptr::null_mut())
		};

		if result == -1 {
			warn!(error = %std::io::Error::last_os_error(), "unable to ignore SIGPIPE");
		} else {
			debug!("SIGPIPE ignored for this process");
		}
	});
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn installs_ignore_disposition() {
		ignore_sigpipe();
		ignore_sigpipe();

		let mut current: libc::sigaction = unsafe { std::mem::zeroed() };
		let result = unsafe { libc::sigaction(libc::SIGPIPE, std::ptr::null(), &mut current) };
		assert_eq!(result, 0);
		assert_eq!(current.sa_sigaction, libc::SIG_IGN);
	}
}
