use crate::http::headers::Headers;
use crate::http::response::ResponseCode;

/// Largest header block accepted before the response is rejected.
pub const MAX_HEADER_BYTES: usize = 64 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("incomplete response head")]
    Incomplete,
    #[error("invalid status line")]
    InvalidStatusLine,
    #[error("invalid response code")]
    InvalidResponseCode,
    #[error("invalid header line")]
    InvalidHeader,
    #[error("invalid Content-Length")]
    InvalidContentLength,
    #[error("response head exceeds {} bytes", MAX_HEADER_BYTES)]
    HeadersTooLarge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpVersion {
    Http10,
    Http11,
}

/// Status line and headers of a response, without the body.
#[derive(Debug, Clone)]
pub struct ResponseHead {
    pub version: HttpVersion,
    pub code: ResponseCode,
    pub headers: Headers,
}

impl ResponseHead {
    /// Declared body length, `None` when the body runs until the connection closes.
    pub fn content_length(&self) -> Result<Option<usize>, ParseError> {
        match self.headers.get("content-length") {
            None => Ok(None),
            Some(v) if !v.is_empty() && v.bytes().all(|b| b.is_ascii_digit()) => v
                .parse::<usize>()
                .map(Some)
                .map_err(|_| ParseError::InvalidContentLength),
            Some(_) => Err(ParseError::InvalidContentLength),
        }
    }

    /// Whether the server allows another request on this connection.
    ///
    /// Requires HTTP/1.1 and an explicit `Connection: Keep-Alive`.
    pub fn keep_alive(&self) -> bool {
        self.version == HttpVersion::Http11
            && self
                .headers
                .get("connection")
                .is_some_and(|v| v.eq_ignore_ascii_case("keep-alive"))
    }
}

/// Parses a response head from the start of `buf`.
///
/// Returns the head and the number of bytes consumed, including the blank
/// line. Bytes after that belong to the body.
pub fn parse_response_head(buf: &[u8]) -> Result<(ResponseHead, usize), ParseError> {
    let headers_end = match find_headers_end(buf) {
        Some(pos) => pos,
        None if buf.len() > MAX_HEADER_BYTES => return Err(ParseError::HeadersTooLarge),
        None => return Err(ParseError::Incomplete),
    };

    let mut lines = buf[..headers_end].split(|&b| b == b'\n').map(|line| {
        line.strip_suffix(b"\r").unwrap_or(line)
    });

    let status_line = lines.next().ok_or(ParseError::InvalidStatusLine)?;
    let (version, code) = parse_status_line(status_line)?;

    let mut headers = Headers::empty();
    for line in lines {
        let line = std::str::from_utf8(line).map_err(|_| ParseError::InvalidHeader)?;
        let (name, value) = line.split_once(':').ok_or(ParseError::InvalidHeader)?;
        let value = value.strip_prefix(' ').unwrap_or(value);
        headers.set(name, value);
    }

    Ok((ResponseHead { version, code, headers }, headers_end + 4))
}

fn parse_status_line(line: &[u8]) -> Result<(HttpVersion, ResponseCode), ParseError> {
    let version = if line.starts_with(b"HTTP/1.1 ") {
        HttpVersion::Http11
    } else if line.starts_with(b"HTTP/1.0 ") {
        HttpVersion::Http10
    } else {
        return Err(ParseError::InvalidStatusLine);
    };

    let code = line.get(9..12).ok_or(ParseError::InvalidResponseCode)?;
    if line.get(12).is_some_and(|&b| b != b' ') {
        return Err(ParseError::InvalidResponseCode);
    }

    Ok((version, ResponseCode::parse(code)?))
}

fn find_headers_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n")
}
