//! Null-terminated message sockets over TCP.
//!
//! A receiver listens on a port, accepts one peer at a time and reads
//! messages that end in a single `0` byte; a sender connects and writes
//! them. Either side can exchange an acknowledgment of the form
//! `:ACK:ByteCount:<n>` per message. See [`Session`] for the state machine
//! and [`frame`] for the wire format.

pub mod socket;
pub mod addr;
pub mod frame;
mod error;
mod result;
mod signal;
mod session;

pub use self::error::{IoError, ResolveError, SessionError, SetupError, SocketError, errno};
pub use self::result::ResultCode;
pub use self::signal::ignore_sigpipe;
pub use self::session::{
	AcceptOutcome, AckStatus, Received, Role, Sent, Session, SessionConfig, MAX_TIMEOUT_SECS,
};
pub use self::addr::{Domain, Inet, InetAddr, SocketAddrV4, SocketAddrV6};
pub use self::frame::{Ack, READ_CHUNK};
pub use self::socket::{
	AcceptResult, ConnectedStream, ConnectorBuilder, Listener, ListenerBuilder, ReuseConfig, TimeoutConfig,
};
