use std::collections::VecDeque;
use std::future::Future;
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::task::{Context, Poll};

use bytes::{Buf, BytesMut};
use parking_lot::Mutex;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::{Notify, oneshot};

use crate::error::{Error, Result, is_terminal_kind};
use crate::http::parser::{ParseError, ResponseHead, parse_response_head};
use crate::http::request::Request;
use crate::http::response::Response;
use crate::http::writer::encode_request;
use crate::reactor::ReactorHandle;

/// Read chunk reserved ahead of each socket read.
const BUFFER_SIZE: usize = 8192;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Called once, with the connection id, when a connection becomes unusable.
pub type OnClose = Box<dyn FnOnce(u64) + Send + 'static>;

/// A response that will be delivered by a connection's driver task.
///
/// Resolves to [`Error::ConnectionClosed`] if the connection goes away
/// without answering.
#[derive(Debug)]
pub struct PendingResponse {
    rx: oneshot::Receiver<Result<Response>>,
}

impl Future for PendingResponse {
    type Output = Result<Response>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|r| r.unwrap_or_else(|_| Err(Error::ConnectionClosed)))
    }
}

struct Work {
    request: Request,
    reply: oneshot::Sender<Result<Response>>,
}

#[derive(Default)]
struct QueueState {
    items: VecDeque<Work>,
    pending: bool,
    closed: bool,
}

struct Shared {
    id: u64,
    /// Retire after the first response, whatever the server says.
    single_use: bool,
    state: Mutex<QueueState>,
    wake: Notify,
}

impl Shared {
    /// Waits for the next request; `None` once the connection is closed.
    async fn next_work(&self) -> Option<Work> {
        loop {
            {
                let mut state = self.state.lock();
                if state.closed {
                    return None;
                }
                if let Some(work) = state.items.pop_front() {
                    state.pending = true;
                    return Some(work);
                }
                state.pending = false;
            }
            self.wake.notified().await;
        }
    }

    /// Marks the connection dead and fails everything still queued.
    fn close(&self, make_err: impl Fn() -> Error) {
        let drained: Vec<Work> = {
            let mut state = self.state.lock();
            state.closed = true;
            state.pending = false;
            state.items.drain(..).collect()
        };
        if !drained.is_empty() {
            tracing::debug!(conn = self.id, failed = drained.len(), "failing queued requests");
        }
        for work in drained {
            let _ = work.reply.send(Err(make_err()));
        }
    }
}

// Last handle clone going away retires the driver.
struct ConnHandle {
    shared: Arc<Shared>,
}

impl Drop for ConnHandle {
    fn drop(&mut self) {
        self.shared.close(|| Error::ConnectionClosed);
        self.shared.wake.notify_one();
    }
}

/// One HTTP/1.1 connection with an ordered request queue.
///
/// Requests are sent one at a time in submission order. Cloning yields another
/// handle to the same connection.
#[derive(Clone)]
pub struct HttpConnection {
    inner: Arc<ConnHandle>,
}

impl HttpConnection {
    fn unconnected(single_use: bool) -> (Self, Arc<Shared>) {
        let shared = Arc::new(Shared {
            id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
            single_use,
            state: Mutex::new(QueueState::default()),
            wake: Notify::new(),
        });
        let conn = Self {
            inner: Arc::new(ConnHandle {
                shared: shared.clone(),
            }),
        };
        (conn, shared)
    }

    /// Resolves and connects to `host:port` on the reactor.
    ///
    /// Requests may be queued immediately; they are sent once the connection
    /// is up, or failed if it cannot be established.
    pub fn open(reactor: &ReactorHandle, host: String, port: u16, on_close: OnClose) -> Self {
        Self::connect_on(reactor, host, port, on_close, false)
    }

    /// Like [`open`](Self::open), but the connection serves one response and
    /// then closes even if the server offers keep-alive.
    pub fn open_single_use(reactor: &ReactorHandle, host: String, port: u16, on_close: OnClose) -> Self {
        Self::connect_on(reactor, host, port, on_close, true)
    }

    fn connect_on(
        reactor: &ReactorHandle,
        host: String,
        port: u16,
        on_close: OnClose,
        single_use: bool,
    ) -> Self {
        let (conn, shared) = Self::unconnected(single_use);

        reactor.spawn(async move {
            match connect(&host, port).await {
                Ok(stream) => {
                    tracing::debug!(conn = shared.id, %host, port, "connected");
                    Driver::new(stream, shared).run(on_close).await;
                }
                Err(e) => {
                    tracing::warn!(conn = shared.id, %host, port, error = %e, "connection failed");
                    shared.close(|| clone_error(&e));
                    on_close(shared.id);
                }
            }
        });

        conn
    }

    /// Runs the connection over an already established stream.
    pub fn with_stream<S>(reactor: &ReactorHandle, stream: S, on_close: OnClose) -> Self
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let (conn, shared) = Self::unconnected(false);
        reactor.spawn(Driver::new(stream, shared).run(on_close));
        conn
    }

    /// Queues a request. The returned future resolves with its response.
    pub fn request(&self, request: Request) -> PendingResponse {
        let (reply, rx) = oneshot::channel();
        let shared = &self.inner.shared;
        {
            let mut state = shared.state.lock();
            if state.closed {
                let _ = reply.send(Err(Error::ConnectionClosed));
                return PendingResponse { rx };
            }
            state.items.push_back(Work { request, reply });
        }
        shared.wake.notify_one();
        PendingResponse { rx }
    }

    pub fn id(&self) -> u64 {
        self.inner.shared.id
    }

    /// Requests waiting behind the one in flight.
    pub fn queued(&self) -> usize {
        self.inner.shared.state.lock().items.len()
    }

    /// Whether a request is currently in flight.
    pub fn is_busy(&self) -> bool {
        self.inner.shared.state.lock().pending
    }

    pub fn is_closed(&self) -> bool {
        self.inner.shared.state.lock().closed
    }
}

impl std::fmt::Debug for HttpConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpConnection").field("id", &self.id()).finish()
    }
}

async fn connect(host: &str, port: u16) -> Result<TcpStream> {
    let addrs = tokio::net::lookup_host((host, port))
        .await
        .map_err(|source| Error::Resolve {
            host: host.to_string(),
            port,
            source,
        })?;

    let mut last_err = io::Error::new(io::ErrorKind::NotFound, "no addresses resolved");
    for addr in addrs {
        match TcpStream::connect(addr).await {
            Ok(stream) => return Ok(stream),
            Err(e) => last_err = e,
        }
    }

    Err(Error::Connect {
        host: host.to_string(),
        port,
        source: last_err,
    })
}

// Each queued handler gets its own copy of a setup failure.
fn clone_error(e: &Error) -> Error {
    let copy = |source: &io::Error| io::Error::new(source.kind(), source.to_string());
    match e {
        Error::Resolve { host, port, source } => Error::Resolve {
            host: host.clone(),
            port: *port,
            source: copy(source),
        },
        Error::Connect { host, port, source } => Error::Connect {
            host: host.clone(),
            port: *port,
            source: copy(source),
        },
        _ => Error::ConnectionClosed,
    }
}

/// Owns the socket and runs the request/response state machine.
struct Driver<S> {
    stream: S,
    shared: Arc<Shared>,
    recv: BytesMut,
}

impl<S> Driver<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    fn new(stream: S, shared: Arc<Shared>) -> Self {
        Self {
            stream,
            shared,
            recv: BytesMut::with_capacity(BUFFER_SIZE),
        }
    }

    async fn run(mut self, on_close: OnClose) {
        let id = self.shared.id;

        while let Some(work) = self.shared.next_work().await {
            tracing::trace!(
                conn = id,
                method = work.request.method().as_str(),
                request_target = %work.request.url().make_request_target(false),
                "sending request"
            );

            match self.exchange(&work.request).await {
                Ok((response, keep_alive)) => {
                    tracing::debug!(conn = id, status = response.code().as_u16(), keep_alive, "response received");
                    let _ = work.reply.send(Ok(response));
                    if !keep_alive {
                        self.shared.close(|| Error::ConnectionClosed);
                        break;
                    }
                }
                Err(e) if e.is_terminal() => {
                    let kind = terminal_kind(&e);
                    tracing::warn!(conn = id, error = %e, "connection lost");
                    let _ = work.reply.send(Err(e));
                    self.shared.close(|| Error::Disconnected(kind));
                    break;
                }
                Err(e) if framing_lost(&e) => {
                    // Unread body bytes would be parsed as the next response.
                    tracing::warn!(conn = id, error = %e, "response framing lost, closing");
                    let _ = work.reply.send(Err(e));
                    self.shared.close(|| Error::ConnectionClosed);
                    break;
                }
                Err(e) => {
                    tracing::warn!(conn = id, error = %e, "request failed");
                    let _ = work.reply.send(Err(e));
                }
            }
        }

        let _ = self.stream.shutdown().await;
        tracing::debug!(conn = id, "connection closed");
        on_close(id);
    }

    /// Sends one request and reads its response.
    ///
    /// Returns the response and whether the connection may be reused.
    async fn exchange(&mut self, request: &Request) -> Result<(Response, bool)> {
        let out = encode_request(request);
        self.stream.write_all(&out).await?;
        self.stream.flush().await?;

        let head = self.read_head().await?;

        let (body, reusable) = match head.content_length()? {
            Some(len) => (self.read_body_exact(len).await?, true),
            None => (self.read_body_to_close().await?, false),
        };

        let keep_alive = reusable && head.keep_alive() && !self.shared.single_use;
        let ResponseHead { code, headers, .. } = head;
        let response = Response::new(request.clone(), code)
            .with_headers(headers)
            .with_body(body);

        Ok((response, keep_alive))
    }

    async fn read_head(&mut self) -> Result<ResponseHead> {
        loop {
            match parse_response_head(&self.recv) {
                Ok((head, consumed)) => {
                    self.recv.advance(consumed);
                    return Ok(head);
                }
                Err(ParseError::Incomplete) => {}
                Err(e) => {
                    self.recv.clear();
                    return Err(e.into());
                }
            }

            self.fill().await?;
        }
    }

    async fn read_body_exact(&mut self, len: usize) -> Result<Vec<u8>> {
        while self.recv.len() < len {
            self.fill().await?;
        }
        Ok(self.recv.split_to(len).to_vec())
    }

    async fn read_body_to_close(&mut self) -> Result<Vec<u8>> {
        loop {
            self.recv.reserve(BUFFER_SIZE);
            let n = self.stream.read_buf(&mut self.recv).await?;
            if n == 0 {
                break;
            }
        }
        Ok(self.recv.split().to_vec())
    }

    // Reads more bytes; a clean EOF here means the peer hung up mid-response.
    async fn fill(&mut self) -> Result<()> {
        self.recv.reserve(BUFFER_SIZE);
        let n = self.stream.read_buf(&mut self.recv).await?;
        if n == 0 {
            return Err(io::Error::from(io::ErrorKind::UnexpectedEof).into());
        }
        Ok(())
    }
}

// The head parsed but the body length is unknown, or the head never ended.
fn framing_lost(e: &Error) -> bool {
    matches!(
        e,
        Error::Protocol(ParseError::InvalidContentLength | ParseError::HeadersTooLarge)
    )
}

fn terminal_kind(e: &Error) -> io::ErrorKind {
    match e {
        Error::Io(io) if is_terminal_kind(io.kind()) => io.kind(),
        Error::Disconnected(kind) => *kind,
        _ => io::ErrorKind::UnexpectedEof,
    }
}
