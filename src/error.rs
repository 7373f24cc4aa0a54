//! Error types for the delivery subsystem.

use std::io;

use crate::http::parser::ParseError;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by URL parsing, transports and the HTTP client.
///
/// Delivery failures never propagate into the frame loop; they reach callers
/// only through completion handlers and [`crate::http::PendingResponse`].
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The URL string could not be parsed.
    #[error("malformed URL: {0}")]
    MalformedUrl(String),

    /// Host name resolution failed or yielded no address.
    #[error("failed to resolve {host}:{port}")]
    Resolve {
        host: String,
        port: u16,
        #[source]
        source: io::Error,
    },

    /// The TCP connection could not be established.
    #[error("connect to {host}:{port} failed")]
    Connect {
        host: String,
        port: u16,
        #[source]
        source: io::Error,
    },

    /// A send or receive failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The connection died (reset, broken pipe or EOF) while this work was queued.
    #[error("connection lost: {0:?}")]
    Disconnected(io::ErrorKind),

    /// The connection was retired before this work could run.
    #[error("connection closed")]
    ConnectionClosed,

    /// The peer sent something that is not HTTP/1.x.
    #[error("protocol error: {0}")]
    Protocol(#[from] ParseError),
}

impl Error {
    /// Whether the error means the underlying connection is unusable.
    pub fn is_terminal(&self) -> bool {
        match self {
            Error::Io(e) => is_terminal_kind(e.kind()),
            Error::Disconnected(_) | Error::ConnectionClosed => true,
            _ => false,
        }
    }
}

/// Reset, broken pipe and EOF all mean the peer is gone.
pub(crate) fn is_terminal_kind(kind: io::ErrorKind) -> bool {
    matches!(
        kind,
        io::ErrorKind::ConnectionReset | io::ErrorKind::BrokenPipe | io::ErrorKind::UnexpectedEof
    )
}
