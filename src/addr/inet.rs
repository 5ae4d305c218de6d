use std::fmt;
use crate::addr::{Domain, FromSockAddr, SocketAddrV4, SocketAddrV6, ToSockAddr};

/// Internet domain whose family is picked per address.
///
/// Resolution can hand back either IPv4 or IPv6 candidates, so sockets that
/// walk a candidate list are typed `Inet` and opened with the family of the
/// address they are about to bind or connect.
pub struct Inet;

impl Domain for Inet {
	type Addr = InetAddr;

	fn family_of(addr: &InetAddr) -> libc::c_int {
		match addr {
			InetAddr::V4(_) => libc::AF_INET,
			InetAddr::V6(_) => libc::AF_INET6,
		}
	}
}

/// An IPv4 or IPv6 socket address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InetAddr {
	V4(SocketAddrV4),
	V6(SocketAddrV6),
}

impl InetAddr {
	pub fn port(&self) -> u16 {
		match self {
			InetAddr::V4(a) => a.port(),
			InetAddr::V6(a) => a.port(),
		}
	}

	pub fn is_ipv6(&self) -> bool {
		matches!(self, InetAddr::V6(_))
	}
}

impl From<SocketAddrV4> for InetAddr {
	fn from(addr: SocketAddrV4) -> Self {
		InetAddr::V4(addr)
	}
}

impl From<SocketAddrV6> for InetAddr {
	fn from(addr: SocketAddrV6) -> Self {
		InetAddr::V6(addr)
	}
}

impl fmt::Display for InetAddr {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			InetAddr::V4(a) => fmt::Display::fmt(a, f),
			InetAddr::V6(a) => fmt::Display::fmt(a, f),
		}
	}
}

impl ToSockAddr for InetAddr {
	fn with_raw<F, R>(&self, f: F) -> Option<R>
	where
		F: FnOnce(*const libc::sockaddr, libc::socklen_t) -> R,
	{
		match self {
			InetAddr::V4(a) => a.with_raw(f),
			InetAddr::V6(a) => a.with_raw(f),
		}
	}
}

impl FromSockAddr for InetAddr {
	unsafe fn from_sockaddr(addr: *const libc::sockaddr, len: libc::socklen_t) -> Option<Self> {
		if addr.is_null() || len < std::mem::size_of::<libc::sa_family_t>() as libc::socklen_t {
			return None;
		}
		let family = unsafe { (*addr).sa_family } as libc::c_int;
		match family {
			libc::AF_INET => unsafe { SocketAddrV4::from_sockaddr(addr, len) }.map(InetAddr::V4),
			libc::AF_INET6 => unsafe { SocketAddrV6::from_sockaddr(addr, len) }.map(InetAddr::V6),
			_ => None,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn family_follows_the_address() {
		let v4: InetAddr = SocketAddrV4::localhost(9000).into();
		let v6: InetAddr = SocketAddrV6::unspecified(9000).into();
		assert_eq!(Inet::family_of(&v4), libc::AF_INET);
		assert_eq!(Inet::family_of(&v6), libc::AF_INET6);
		assert_eq!(v6.to_string(), "[::]:9000");
	}

	#[test]
	fn decodes_from_raw_storage() {
		let v6 = SocketAddrV6::new(std::net::Ipv6Addr::LOCALHOST.octets(), 4242);
		let decoded = v6
			.with_raw(|ptr, len| unsafe { InetAddr::from_sockaddr(ptr, len) })
			.flatten();
		assert_eq!(decoded, Some(InetAddr::V6(v6)));
	}
}
