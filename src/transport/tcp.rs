use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use bytes::Bytes;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::task::JoinHandle;

use crate::config::RetryPolicy;
use crate::dump::DumpTarget;
use crate::error::Result;
use crate::reactor::ReactorHandle;
use crate::transport::udp::resolve;
use crate::transport::{Attempt, Link, SocketTransport};

/// Persistent stream link that reconnects on its own.
///
/// Connecting happens in a background task that retries forever. Until it
/// succeeds, sends report [`Attempt::NotDispatched`].
pub struct TcpLink {
    dest: SocketAddr,
    reconnect_delay: Duration,
    stream: Option<TcpStream>,
    connecting: Option<JoinHandle<TcpStream>>,
}

impl TcpLink {
    /// Starts connecting to `dest` immediately.
    ///
    /// Must be called from within the reactor's runtime context.
    pub fn connect(dest: SocketAddr, reconnect_delay: Duration) -> Self {
        let mut link = Self {
            dest,
            reconnect_delay,
            stream: None,
            connecting: None,
        };
        link.start_connect();
        link
    }

    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    fn start_connect(&mut self) {
        let dest = self.dest;
        let delay = self.reconnect_delay;
        self.connecting = Some(tokio::spawn(async move {
            loop {
                match TcpStream::connect(dest).await {
                    Ok(stream) => {
                        tracing::info!(%dest, "connected");
                        return stream;
                    }
                    Err(e) => {
                        tracing::warn!(%dest, error = %e, retry_in = ?delay, "connection failed, retrying");
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }));
    }

    // Collects a finished connect task, if any.
    async fn poll_connected(&mut self) {
        if self.stream.is_some() {
            return;
        }
        let Some(task) = self.connecting.take_if(|t| t.is_finished()) else {
            return;
        };
        match task.await {
            Ok(stream) => self.stream = Some(stream),
            Err(e) => {
                tracing::error!(dest = %self.dest, error = %e, "connect task died, restarting");
                self.start_connect();
            }
        }
    }
}

impl Link for TcpLink {
    async fn attempt_send(&mut self, buf: Bytes) -> Attempt {
        self.poll_connected().await;
        let Some(stream) = self.stream.as_mut() else {
            return Attempt::NotDispatched;
        };

        match write_counted(stream, &buf).await {
            Ok(()) => Attempt::Sent,
            Err(failure) => {
                if failure.breaks_stream() {
                    tracing::warn!(
                        dest = %self.dest,
                        error = %failure.error,
                        written = failure.written,
                        "connection lost, reconnecting"
                    );
                    self.stream = None;
                    self.start_connect();
                } else {
                    tracing::warn!(dest = %self.dest, error = %failure.error, "write failed");
                }
                Attempt::Failed
            }
        }
    }
}

struct WriteFailure {
    error: io::Error,
    written: usize,
}

impl WriteFailure {
    // Part of the buffer is already on the wire; resending it whole would
    // duplicate those bytes, so the stream cannot be reused.
    fn breaks_stream(&self) -> bool {
        self.written > 0
            || matches!(
                self.error.kind(),
                io::ErrorKind::ConnectionReset | io::ErrorKind::BrokenPipe
            )
    }
}

// Like `write_all`, but reports how far it got.
async fn write_counted<W: AsyncWrite + Unpin>(out: &mut W, buf: &[u8]) -> std::result::Result<(), WriteFailure> {
    let mut written = 0;
    while written < buf.len() {
        match out.write(&buf[written..]).await {
            Ok(0) => {
                return Err(WriteFailure {
                    error: io::ErrorKind::WriteZero.into(),
                    written,
                });
            }
            Ok(n) => written += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(error) => return Err(WriteFailure { error, written }),
        }
    }
    Ok(())
}

impl Drop for TcpLink {
    fn drop(&mut self) {
        if let Some(task) = self.connecting.take() {
            task.abort();
        }
    }
}

/// Streams documents back to back over one TCP connection.
pub struct TcpTarget {
    transport: SocketTransport,
}

impl TcpTarget {
    pub fn new(reactor: &ReactorHandle, host: &str, port: u16, policy: RetryPolicy) -> Result<Self> {
        let dest = resolve(host, port)?;
        let link = {
            let _guard = reactor.tokio_handle().enter();
            TcpLink::connect(dest, policy.reconnect_delay)
        };
        tracing::debug!(%dest, "tcp target ready");
        Ok(Self {
            transport: SocketTransport::spawn(reactor, link, policy),
        })
    }

    pub fn queued(&self) -> usize {
        self.transport.queued()
    }
}

impl DumpTarget for TcpTarget {
    fn write(&self, document: &[u8]) {
        self.transport.enqueue(document);
    }
}
