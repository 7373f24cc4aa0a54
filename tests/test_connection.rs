use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use metadump::Error;
use metadump::http::connection::OnClose;
use metadump::http::headers::DEFAULT_USER_AGENT;
use metadump::http::parser::ParseError;
use metadump::http::{HttpConnection, Request, Url};
use metadump::reactor::ReactorHandle;
use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream, duplex};
use tokio::time::timeout;

fn url() -> Url {
    Url::parse("http://collector/frames").unwrap()
}

fn noop() -> OnClose {
    Box::new(|_: u64| {})
}

/// Reads one request head (requests never carry a body).
async fn read_request(server: &mut DuplexStream) -> String {
    let mut buf = Vec::new();
    let mut byte = [0u8; 1];
    while !buf.ends_with(b"\r\n\r\n") {
        let n = server.read(&mut byte).await.unwrap();
        assert!(n > 0, "client closed before finishing a request");
        buf.push(byte[0]);
    }
    String::from_utf8(buf).unwrap()
}

#[tokio::test]
async fn test_request_is_encoded_on_the_wire() {
    let (client, mut server) = duplex(4096);
    let conn = HttpConnection::with_stream(&ReactorHandle::current(), client, noop());

    let pending = conn.request(Request::post(url()));
    let head = read_request(&mut server).await;

    assert_eq!(
        head,
        format!("POST /frames HTTP/1.1\r\nhost: collector\r\nuser-agent: {DEFAULT_USER_AGENT}\r\n\r\n")
    );

    server
        .write_all(b"HTTP/1.1 201 Created\r\nContent-Length: 0\r\nConnection: Keep-Alive\r\n\r\n")
        .await
        .unwrap();

    let response = pending.await.unwrap();
    assert_eq!(response.code().as_u16(), 201);
    assert_eq!(response.request().url().path(), "/frames");
}

#[tokio::test]
async fn test_keep_alive_reuses_stream() {
    let (client, mut server) = duplex(4096);
    let conn = HttpConnection::with_stream(&ReactorHandle::current(), client, noop());

    let first = conn.request(Request::get(url()));
    let second = conn.request(Request::get(url()));

    read_request(&mut server).await;
    // Both responses in one write; the second must wait for its own request.
    server
        .write_all(
            b"HTTP/1.1 200 OK\r\nContent-Length: 5\r\nConnection: Keep-Alive\r\n\r\nhello\
              HTTP/1.1 200 OK\r\nContent-Length: 2\r\nConnection: Keep-Alive\r\n\r\nok",
        )
        .await
        .unwrap();

    let mut first = first.await.unwrap();
    assert_eq!(first.take_body(), Some(b"hello".to_vec()));

    read_request(&mut server).await;
    let second = second.await.unwrap();
    assert_eq!(second.body(), Some(&b"ok"[..]));
    assert!(!conn.is_closed());
}

#[tokio::test]
async fn test_body_read_to_close_without_content_length() {
    let (client, mut server) = duplex(4096);
    let closed = Arc::new(AtomicU64::new(0));
    let on_close: OnClose = {
        let closed = closed.clone();
        Box::new(move |id| closed.store(id, Ordering::SeqCst))
    };
    let conn = HttpConnection::with_stream(&ReactorHandle::current(), client, on_close);

    let first = conn.request(Request::get(url()));
    let second = conn.request(Request::get(url()));

    read_request(&mut server).await;
    server
        .write_all(b"HTTP/1.0 200 OK\r\n\r\nbody until close")
        .await
        .unwrap();
    drop(server);

    let response = first.await.unwrap();
    assert_eq!(response.body(), Some(&b"body until close"[..]));

    assert!(matches!(second.await, Err(Error::ConnectionClosed)));
    assert!(conn.is_closed());

    // The close notification carries this connection's id.
    timeout(Duration::from_secs(5), async {
        while closed.load(Ordering::SeqCst) != conn.id() {
            tokio::task::yield_now().await;
        }
    })
    .await
    .unwrap();

    assert!(matches!(
        conn.request(Request::get(url())).await,
        Err(Error::ConnectionClosed)
    ));
}

#[tokio::test]
async fn test_missing_keep_alive_closes_after_response() {
    let (client, mut server) = duplex(4096);
    let conn = HttpConnection::with_stream(&ReactorHandle::current(), client, noop());

    let first = conn.request(Request::get(url()));
    let second = conn.request(Request::get(url()));

    read_request(&mut server).await;
    server
        .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 2\r\n\r\nok")
        .await
        .unwrap();

    assert!(first.await.unwrap().is_success());
    assert!(matches!(second.await, Err(Error::ConnectionClosed)));
}

#[tokio::test]
async fn test_protocol_error_fails_only_current_request() {
    let (client, mut server) = duplex(4096);
    let conn = HttpConnection::with_stream(&ReactorHandle::current(), client, noop());

    let first = conn.request(Request::get(url()));
    let second = conn.request(Request::get(url()));

    read_request(&mut server).await;
    server.write_all(b"HTP/1.1 200 OK\r\n\r\n").await.unwrap();

    assert!(matches!(
        first.await,
        Err(Error::Protocol(ParseError::InvalidStatusLine))
    ));

    read_request(&mut server).await;
    server
        .write_all(b"HTTP/1.1 204 No Content\r\nContent-Length: 0\r\nConnection: Keep-Alive\r\n\r\n")
        .await
        .unwrap();

    assert_eq!(second.await.unwrap().code().as_u16(), 204);
    assert!(!conn.is_closed());
}

#[tokio::test]
async fn test_invalid_content_length_retires_connection() {
    let (client, mut server) = duplex(4096);
    let conn = HttpConnection::with_stream(&ReactorHandle::current(), client, noop());

    let first = conn.request(Request::get(url()));
    let second = conn.request(Request::get(url()));
    read_request(&mut server).await;
    // The body that follows cannot be skipped without a length.
    server
        .write_all(
            b"HTTP/1.1 200 OK\r\nContent-Length: many\r\nConnection: Keep-Alive\r\n\r\n\
              HTTP/1.1 200 OK\r\n",
        )
        .await
        .unwrap();

    assert!(matches!(
        first.await,
        Err(Error::Protocol(ParseError::InvalidContentLength))
    ));
    assert!(matches!(second.await, Err(Error::ConnectionClosed)));
    assert!(conn.is_closed());
}

#[tokio::test]
async fn test_peer_hangup_drains_queue() {
    let (client, mut server) = duplex(4096);
    let conn = HttpConnection::with_stream(&ReactorHandle::current(), client, noop());

    let first = conn.request(Request::get(url()));
    let second = conn.request(Request::get(url()));
    let third = conn.request(Request::get(url()));

    read_request(&mut server).await;
    drop(server);

    match first.await {
        Err(Error::Io(e)) => assert_eq!(e.kind(), io::ErrorKind::UnexpectedEof),
        other => panic!("expected EOF, got {other:?}"),
    }
    for pending in [second, third] {
        assert!(matches!(
            pending.await,
            Err(Error::Disconnected(io::ErrorKind::UnexpectedEof))
        ));
    }
    assert!(conn.is_closed());
}

#[tokio::test]
async fn test_dropping_last_handle_fails_queued_requests() {
    let (client, mut server) = duplex(4096);
    let conn = HttpConnection::with_stream(&ReactorHandle::current(), client, noop());

    let first = conn.request(Request::get(url()));
    let second = conn.request(Request::get(url()));
    read_request(&mut server).await;
    drop(conn);

    assert!(matches!(second.await, Err(Error::ConnectionClosed)));

    // The in-flight request still completes.
    server
        .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 0\r\nConnection: Keep-Alive\r\n\r\n")
        .await
        .unwrap();
    assert!(first.await.unwrap().is_success());
}

#[tokio::test]
async fn test_queue_accounting() {
    let (client, mut server) = duplex(4096);
    let conn = HttpConnection::with_stream(&ReactorHandle::current(), client, noop());

    let first = conn.request(Request::get(url()));
    let second = conn.request(Request::get(url()));

    read_request(&mut server).await;
    assert!(conn.is_busy());
    assert_eq!(conn.queued(), 1);

    server
        .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 0\r\nConnection: Keep-Alive\r\n\r\n")
        .await
        .unwrap();
    first.await.unwrap();

    read_request(&mut server).await;
    assert_eq!(conn.queued(), 0);

    server
        .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 0\r\nConnection: Keep-Alive\r\n\r\n")
        .await
        .unwrap();
    second.await.unwrap();
}

#[tokio::test]
async fn test_open_unreachable_fails_requests() {
    let port = {
        let unused = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        unused.local_addr().unwrap().port()
    };

    let conn = HttpConnection::open(&ReactorHandle::current(), "127.0.0.1".to_string(), port, noop());
    let first = conn.request(Request::get(url()));
    let second = conn.request(Request::get(url()));

    for pending in [first, second] {
        match timeout(Duration::from_secs(5), pending).await.unwrap() {
            Err(Error::Connect { host, port: p, .. }) => {
                assert_eq!(host, "127.0.0.1");
                assert_eq!(p, port);
            }
            other => panic!("expected connect error, got {other:?}"),
        }
    }
    assert!(conn.is_closed());
}
