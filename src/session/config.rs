use crate::frame::READ_CHUNK;
use crate::socket::TimeoutConfig;

/// Upper bound on either timeout: one day. Anything larger is taken to be
/// a malformed value, not a real deadline.
pub const MAX_TIMEOUT_SECS: i64 = 86_400;

/// Per-session settings.
///
/// Timeouts are whole seconds; `0` means block indefinitely for that phase.
/// They are signed so that a malformed negative value is caught by session
/// validation instead of wrapping.
///
/// # Example
/// ```ignore
/// let config = SessionConfig::new(16273).listen_timeout(1).io_timeout(10);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
	pub port: u16,
	/// Bounds each accept wait before the shutdown flag is re-checked.
	pub listen_timeout_secs: i64,
	/// Bounds each read/write on a connected socket.
	pub io_timeout_secs: i64,
	/// Size of one receive read.
	pub read_chunk: usize,
	/// Pending-connect queue length for listeners.
	pub backlog: i32,
}

impl SessionConfig {
	pub fn new(port: u16) -> Self {
		Self {
			port,
			listen_timeout_secs: 0,
			io_timeout_secs: 0,
			read_chunk: READ_CHUNK,
			backlog: 2,
		}
	}

	pub fn listen_timeout(mut self, secs: i64) -> Self {
		self.listen_timeout_secs = secs;
		self
	}

	pub fn io_timeout(mut self, secs: i64) -> Self {
		self.io_timeout_secs = secs;
		self
	}

	pub fn read_chunk(mut self, size: usize) -> Self {
		self.read_chunk = size;
		self
	}

	pub fn backlog(mut self, backlog: i32) -> Self {
		self.backlog = backlog;
		self
	}

	/// Structural check shared by every operation.
	pub(crate) fn check(&self) -> Result<(), &'static str> {
		if self.port == 0 {
			return Err("port must be 1-65535");
		}
		if !(0..=MAX_TIMEOUT_SECS).contains(&self.listen_timeout_secs) {
			return Err("listen timeout outside 0..=86400 seconds");
		}
		if !(0..=MAX_TIMEOUT_SECS).contains(&self.io_timeout_secs) {
			return Err("io timeout outside 0..=86400 seconds");
		}
		if self.read_chunk == 0 {
			return Err("read chunk must be non-zero");
		}
		Ok(())
	}

	pub(crate) fn listen_timeouts(&self) -> TimeoutConfig {
		TimeoutConfig::from_secs(self.listen_timeout_secs.max(0) as u64)
	}

	pub(crate) fn io_timeouts(&self) -> TimeoutConfig {
		TimeoutConfig::from_secs(self.io_timeout_secs.max(0) as u64)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn defaults_block_forever() {
		let config = SessionConfig::new(16273);
		assert!(config.check().is_ok());
		assert!(!config.listen_timeouts().is_set());
		assert!(!config.io_timeouts().is_set());
		assert_eq!(config.read_chunk, READ_CHUNK);
	}

	#[test]
	fn rejects_out_of_range_values() {
		assert!(SessionConfig::new(0).check().is_err());
		assert!(SessionConfig::new(1).listen_timeout(-1).check().is_err());
		assert!(SessionConfig::new(1).io_timeout(MAX_TIMEOUT_SECS + 1).check().is_err());
		assert!(SessionConfig::new(1).read_chunk(0).check().is_err());
		assert!(SessionConfig::new(1).io_timeout(MAX_TIMEOUT_SECS).check().is_ok());
	}
}
