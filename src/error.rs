use crate::result::ResultCode;

/// Socket creation/configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum SocketError {
    #[error("socket() failed: {}", errno_to_str(*.errno))]
    Create { errno: i32 },

    #[error("bind({addr}) failed: {}", errno_to_str(*.errno))]
    Bind { errno: i32, addr: String },

    #[error("listen(backlog={backlog}) failed: {}", errno_to_str(*.errno))]
    Listen { errno: i32, backlog: i32 },

    #[error("connect({addr}) failed: {}", errno_to_str(*.errno))]
    Connect { errno: i32, addr: String },

    #[error("accept() failed: {}", errno_to_str(*.errno))]
    Accept { errno: i32 },

    #[error("setsockopt({option}) failed: {}", errno_to_str(*.errno))]
    SetOption { errno: i32, option: &'static str },

    #[error("invalid address: {reason}")]
    InvalidAddress { reason: &'static str },
}

/// I/O operation errors.
#[derive(Debug, thiserror::Error)]
pub enum IoError {
    #[error("read() failed: {}", errno_to_str(*.errno))]
    Read { errno: i32 },

    #[error("write() failed: {}", errno_to_str(*.errno))]
    Write { errno: i32 },
}

/// Which step of building a listener or connection failed.
#[derive(Debug, thiserror::Error)]
pub enum SetupError {
    #[error("socket creation failed: {0}")]
    Create(#[source] std::io::Error),

    #[error("socket configuration failed: {0}")]
    Configure(#[source] std::io::Error),

    #[error("bind failed: {0}")]
    Bind(#[source] std::io::Error),

    #[error("listen failed: {0}")]
    Listen(#[source] std::io::Error),

    #[error("connect failed: {0}")]
    Connect(#[source] std::io::Error),
}

/// Address resolution errors reported by `getaddrinfo()`.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("getaddrinfo({host}:{port}) failed: {reason}")]
    Lookup { host: String, port: u16, reason: String },

    #[error("{what} contains a null byte")]
    InvalidName { what: &'static str },

    #[error("getaddrinfo({host}:{port}) returned no usable stream addresses")]
    NoCandidates { host: String, port: u16 },
}

/// Session-level failures.
///
/// Every variant corresponds to exactly one [`ResultCode`], which is also
/// recorded on the session as its last result.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("invalid session for {op}: {reason}")]
    InvalidSession { op: &'static str, reason: &'static str },

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error("socket option failed: {0}")]
    SetOption(#[source] std::io::Error),

    #[error("unable to bind any listener address on port {port}")]
    Bind { port: u16 },

    #[error("listen() failed: {0}")]
    Listen(#[source] std::io::Error),

    #[error("no reachable address for {host}:{port}")]
    NoConnection { host: String, port: u16 },

    #[error("connect to {host}:{port} timed out")]
    ConnectTimeout { host: String, port: u16 },

    #[error("peer closed the connection before a message arrived")]
    PeerClosed,

    #[error("receive failed: {0}")]
    Receive(#[source] std::io::Error),

    #[error("receive timed out after {secs}s")]
    ReceiveTimeout { secs: i64 },

    #[error("message overflows destination buffer ({accumulated} bytes accumulated, capacity {capacity})")]
    Overflow { accumulated: usize, capacity: usize },

    #[error("send failed: {0}")]
    Send(#[source] std::io::Error),

    #[error("short write: {written} of {expected} bytes")]
    ShortWrite { written: usize, expected: usize },

    #[error("message contains a null byte at offset {position}")]
    InteriorNul { position: usize },

    #[error("connection broken during {op}; connected descriptor closed")]
    Disconnected { op: &'static str },
}

impl SessionError {
    /// The result code this failure records on the session.
    pub fn code(&self) -> ResultCode {
        match self {
            SessionError::InvalidSession { .. } => ResultCode::InvalidSession,
            SessionError::Resolve(_) => ResultCode::AddrResolutionFailed,
            SessionError::SetOption(_) => ResultCode::SetSockOptFailed,
            SessionError::Bind { .. } => ResultCode::SocketBindFailed,
            SessionError::Listen(_) => ResultCode::ListenFailed,
            SessionError::NoConnection { .. } => ResultCode::NoConnection,
            SessionError::ConnectTimeout { .. } => ResultCode::ConnectTimeout,
            SessionError::PeerClosed | SessionError::Receive(_) => ResultCode::MessageNotReceived,
            SessionError::ReceiveTimeout { .. } => ResultCode::ReceiveTimeout,
            SessionError::Overflow { .. } => ResultCode::MessageOverflow,
            SessionError::Send(_)
            | SessionError::ShortWrite { .. }
            | SessionError::InteriorNul { .. } => ResultCode::MessageNotSent,
            SessionError::Disconnected { .. } => ResultCode::ClientDisconnected,
        }
    }
}

/// Returns current errno value.
#[inline]
pub fn errno() -> i32 {
    unsafe { *libc::__errno_location() }
}

/// Converts errno to human-readable string.
fn errno_to_str(errno: i32) -> String {
    match errno {
        libc::EACCES => "permission denied".into(),
        libc::EADDRINUSE => "address already in use".into(),
        libc::EADDRNOTAVAIL => "address not available".into(),
        libc::EAFNOSUPPORT => "address family not supported".into(),
        libc::EAGAIN => "resource temporarily unavailable".into(),
        libc::EBADF => "bad file descriptor".into(),
        libc::ECONNREFUSED => "connection refused".into(),
        libc::ECONNRESET => "connection reset by peer".into(),
        libc::EINTR => "interrupted by signal".into(),
        libc::EINVAL => "invalid argument".into(),
        libc::EMFILE => "too many open files".into(),
        libc::ENETUNREACH => "network unreachable".into(),
        libc::ENOTCONN => "not connected".into(),
        libc::EPIPE => "broken pipe".into(),
        libc::ETIMEDOUT => "connection timed out".into(),
        _ => format!("errno {}", errno),
    }
}

/// Maps errno to std::io::ErrorKind.
fn errno_to_kind(errno: i32) -> std::io::ErrorKind {
    match errno {
        libc::EACCES | libc::EPERM => std::io::ErrorKind::PermissionDenied,
        libc::EADDRINUSE => std::io::ErrorKind::AddrInUse,
        libc::EADDRNOTAVAIL => std::io::ErrorKind::AddrNotAvailable,
        libc::EAGAIN => std::io::ErrorKind::WouldBlock,
        libc::ECONNREFUSED => std::io::ErrorKind::ConnectionRefused,
        libc::ECONNRESET => std::io::ErrorKind::ConnectionReset,
        libc::EINTR => std::io::ErrorKind::Interrupted,
        libc::EINVAL => std::io::ErrorKind::InvalidInput,
        libc::ENOTCONN => std::io::ErrorKind::NotConnected,
        libc::EPIPE => std::io::ErrorKind::BrokenPipe,
        libc::ETIMEDOUT => std::io::ErrorKind::TimedOut,
        _ => std::io::ErrorKind::Other,
    }
}

impl From<SocketError> for std::io::Error {
    fn from(err: SocketError) -> Self {
        let errno = match &err {
            SocketError::Create { errno } => *errno,
            SocketError::Bind { errno, .. } => *errno,
            SocketError::Listen { errno, .. } => *errno,
            SocketError::Connect { errno, .. } => *errno,
            SocketError::Accept { errno } => *errno,
            SocketError::SetOption { errno, .. } => *errno,
            SocketError::InvalidAddress { .. } => libc::EINVAL,
        };
        std::io::Error::new(errno_to_kind(errno), err)
    }
}

impl From<IoError> for std::io::Error {
    fn from(err: IoError) -> Self {
        let kind = match &err {
            IoError::Read { errno } => errno_to_kind(*errno),
            IoError::Write { errno } => errno_to_kind(*errno),
        };
        std::io::Error::new(kind, err)
    }
}
