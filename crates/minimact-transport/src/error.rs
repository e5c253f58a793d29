#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("connection is closed")]
    Closed,
    #[error("handshake did not complete within the timeout")]
    HandshakeTimeout,
    #[error("handshake rejected by server: {0}")]
    HandshakeRejected(String),
    #[error("invocation {0} timed out")]
    InvocationTimeout(String),
    #[error("socket error: {0}")]
    Socket(String),
    #[error(transparent)]
    Message(#[from] minimact_protocol::MessageError),
}
