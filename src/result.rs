use std::fmt;

/// Outcome of the most recent session operation.
///
/// Success and failure share one taxonomy so that a caller holding only the
/// session can always tell what the last call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResultCode {
    /// Constructed, no operation run yet.
    Initialized,
    InvalidSession,

    ListenerCreated,
    ClientConnected,
    /// The accept loop saw its shutdown flag after a listen timeout.
    ShutdownRequested,
    /// Every connect candidate timed out.
    ConnectTimeout,

    AddrResolutionFailed,
    SetSockOptFailed,
    SocketBindFailed,
    ListenFailed,
    NoConnection,

    MessageReceived,
    MessageNotReceived,
    ReceiveTimeout,
    MessageOverflow,
    MessageSent,
    MessageNotSent,

    AckSendFailed,
    AckReceiveFailed,

    ClientDisconnected,
}

impl ResultCode {
    /// Stable symbolic name, suitable for logs and diagnostics.
    pub fn as_str(&self) -> &'static str {
        match self {
            ResultCode::Initialized => "INITIALIZED",
            ResultCode::InvalidSession => "INVALID_SESSION",
            ResultCode::ListenerCreated => "LISTENER_CREATED",
            ResultCode::ClientConnected => "CLIENT_CONNECTED",
            ResultCode::ShutdownRequested => "SHUTDOWN_REQUESTED",
            ResultCode::ConnectTimeout => "CONNECT_TIMEOUT",
            ResultCode::AddrResolutionFailed => "ERROR_GETADDRINFO",
            ResultCode::SetSockOptFailed => "ERROR_SETSOCKOPT",
            ResultCode::SocketBindFailed => "ERROR_SOCKBIND",
            ResultCode::ListenFailed => "ERROR_SOCKLISTEN",
            ResultCode::NoConnection => "ERROR_NOCONNECT",
            ResultCode::MessageReceived => "MESSAGE_RECVD",
            ResultCode::MessageNotReceived => "MESSAGE_NOT_RECVD",
            ResultCode::ReceiveTimeout => "MESSAGE_RECV_TIMEOUT",
            ResultCode::MessageOverflow => "MESSAGE_RECVD_OVERFLOW",
            ResultCode::MessageSent => "MESSAGE_SENT",
            ResultCode::MessageNotSent => "MESSAGE_NOT_SENT",
            ResultCode::AckSendFailed => "ERROR_ACK_SEND_FAIL",
            ResultCode::AckReceiveFailed => "ERROR_ACK_RECV_FAIL",
            ResultCode::ClientDisconnected => "CLIENT_DISCONNECTED",
        }
    }

    /// True for codes that report a completed step rather than a failure.
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            ResultCode::Initialized
                | ResultCode::ListenerCreated
                | ResultCode::ClientConnected
                | ResultCode::ShutdownRequested
                | ResultCode::MessageReceived
                | ResultCode::MessageSent
        )
    }
}

impl fmt::Display for ResultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
