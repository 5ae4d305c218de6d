use std::ffi::{CStr, CString};
use crate::addr::{FromSockAddr, InetAddr};
use crate::error::ResolveError;

/// Lookup hints passed to `getaddrinfo()`.
///
/// Socket type is always `SOCK_STREAM`; only family and the passive flag vary.
#[derive(Debug, Clone, Copy)]
pub struct Hints {
	family: libc::c_int,
	passive: bool,
}

impl Hints {
	/// Any family, for outbound connections.
	pub fn connect() -> Self {
		Self { family: libc::AF_UNSPEC, passive: false }
	}

	/// IPv6 wildcard lookup for a listener (`AI_PASSIVE`, `AF_INET6`).
	pub fn passive_ipv6() -> Self {
		Self { family: libc::AF_INET6, passive: true }
	}

	fn to_raw(self) -> libc::addrinfo {
		let mut hints: libc::addrinfo = unsafe { std::mem::zeroed() };
		hints.ai_family = self.family;
		hints.ai_socktype = libc::SOCK_STREAM;
		if self.passive {
			hints.ai_flags = libc::AI_PASSIVE;
		}
		hints
	}
}

/// Owns a list returned by `getaddrinfo()`; frees it on drop.
struct AddrInfoList(*mut libc::addrinfo);

impl Drop for AddrInfoList {
	fn drop(&mut self) {
		if !self.0.is_null() {
			unsafe { libc::freeaddrinfo(self.0) };
		}
	}
}

/// Resolves `host:port` into stream-socket candidates, in the order the
/// resolver returned them.
///
/// Entries with a family this crate cannot represent are skipped.
pub fn resolve(host: &str, port: u16, hints: Hints) -> Result<Vec<InetAddr>, ResolveError> {
	let c_host = CString::new(host).map_err(|_| ResolveError::InvalidName { what: "host name" })?;
	let c_port = CString::new(port.to_string())
		.map_err(|_| ResolveError::InvalidName { what: "service" })?;
	let raw_hints = hints.to_raw();

	let mut head: *mut libc::addrinfo = std::ptr::null_mut();
	let rc = unsafe { libc::getaddrinfo(c_host.as_ptr(), c_port.as_ptr(), &raw_hints, &mut head) };
	let list = AddrInfoList(head);

	if rc != 0 {
		let reason = unsafe { CStr::from_ptr(libc::gai_strerror(rc)) }
			.to_string_lossy()
			.into_owned();
		return Err(ResolveError::Lookup { host: host.to_owned(), port, reason });
	}

	let mut candidates = Vec::new();
	let mut node = list.0;
	while !node.is_null() {
		let info = unsafe { &*node };
		if info.ai_socktype == libc::SOCK_STREAM {
			if let Some(addr) = unsafe { InetAddr::from_sockaddr(info.ai_addr, info.ai_addrlen) } {
				candidates.push(addr);
			}
		}
		node = info.ai_next;
	}

	if candidates.is_empty() {
		return Err(ResolveError::NoCandidates { host: host.to_owned(), port });
	}
	Ok(candidates)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn passive_wildcard_resolves_to_ipv6_any() {
		let candidates = resolve("::", 16273, Hints::passive_ipv6()).unwrap();
		assert!(!candidates.is_empty());
		assert!(candidates.iter().all(|c| c.is_ipv6() && c.port() == 16273));
	}

	#[test]
	fn numeric_loopback_resolves_without_dns() {
		let candidates = resolve("127.0.0.1", 80, Hints::connect()).unwrap();
		assert_eq!(candidates[0].to_string(), "127.0.0.1:80");
	}

	#[test]
	fn null_in_host_is_rejected() {
		let err = resolve("local\0host", 80, Hints::connect()).unwrap_err();
		assert!(matches!(err, ResolveError::InvalidName { what: "host name" }));
	}
}
