use bytes::{BufMut, BytesMut};

use crate::http::headers::Headers;
use crate::http::request::Request;

const HTTP_VERSION: &str = "HTTP/1.1";

/// Serializes a request line and header block.
///
/// A `host` header derived from the URL is added when the request does not
/// carry one. Headers are written in sorted name order. No body is written.
pub fn encode_request(req: &Request) -> BytesMut {
    let mut buf = BytesMut::with_capacity(256);

    // Request line
    buf.put_slice(req.method().as_str().as_bytes());
    buf.put_u8(b' ');
    buf.put_slice(req.url().make_request_target(false).as_bytes());
    buf.put_u8(b' ');
    buf.put_slice(HTTP_VERSION.as_bytes());
    buf.put_slice(b"\r\n");

    let mut headers = req.header_map().clone();
    headers.augment(&host_default(req));

    for (k, v) in headers.get_all() {
        buf.put_slice(k.as_bytes());
        buf.put_slice(b": ");
        buf.put_slice(v.as_bytes());
        buf.put_slice(b"\r\n");
    }

    // Header block terminator
    buf.put_slice(b"\r\n");

    buf
}

fn host_default(req: &Request) -> Headers {
    let url = req.url();
    let mut defaults = Headers::empty();
    let value = match url.port() {
        Some(port) => format!("{}:{}", url.host(), port),
        None => url.host().to_string(),
    };
    defaults.set("host", value);
    defaults
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::headers::DEFAULT_USER_AGENT;
    use crate::http::url::Url;

    #[test]
    fn encodes_get_with_default_headers() {
        let req = Request::get(Url::parse("http://collector/api/frames?x=1").unwrap());

        let bytes = encode_request(&req);

        let expected = format!(
            "GET /api/frames?x=1 HTTP/1.1\r\nhost: collector\r\nuser-agent: {DEFAULT_USER_AGENT}\r\n\r\n"
        );
        assert_eq!(&bytes[..], expected.as_bytes());
    }

    #[test]
    fn explicit_host_wins() {
        let req = Request::post(Url::parse("http://10.0.0.1:8080/").unwrap())
            .header("Host", "collector.local");

        let text = String::from_utf8(encode_request(&req).to_vec()).unwrap();

        assert!(text.starts_with("POST / HTTP/1.1\r\n"));
        assert!(text.contains("host: collector.local\r\n"));
        assert!(!text.contains("10.0.0.1:8080\r\n"));
    }
}
