//! Blocking TCP sockets as typestates: `RawSocket` becomes a
//! `BoundSocket` and then a `Listener`, or a `ConnectedStream` directly.

mod listener;
mod raw;
mod stream;
mod options;
mod bound;
mod builder;

pub use self::listener::{Listener, AcceptResult};
pub use self::raw::RawSocket;
pub use self::stream::ConnectedStream;
pub use self::bound::BoundSocket;
pub use self::options::{set_reuse_addr, set_recv_timeout, set_send_timeout};
pub use self::builder::{ListenerBuilder, ConnectorBuilder, ReuseConfig, TimeoutConfig};
