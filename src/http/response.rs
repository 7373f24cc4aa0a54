use crate::http::headers::Headers;
use crate::http::parser::ParseError;
use crate::http::request::Request;

/// Status class of a response code, taken from its first digit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseType {
    /// 1xx
    Informational,
    /// 2xx
    Success,
    /// 3xx
    Redirection,
    /// 4xx
    ClientError,
    /// 5xx
    ServerError,
    /// Anything else
    Unknown,
}

/// A three-digit HTTP status code, stored digit by digit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseCode {
    digits: [u8; 3],
}

impl ResponseCode {
    /// Parses exactly three ASCII digits.
    ///
    /// # Example
    ///
    /// ```
    /// # use metadump::http::response::{ResponseCode, ResponseType};
    /// let code = ResponseCode::parse(b"404").unwrap();
    /// assert_eq!(code.as_u16(), 404);
    /// assert_eq!(code.kind(), ResponseType::ClientError);
    /// ```
    pub fn parse(s: &[u8]) -> Result<Self, ParseError> {
        let [d0, d1, d2] = s else {
            return Err(ParseError::InvalidResponseCode);
        };
        let mut digits = [0u8; 3];
        for (slot, b) in digits.iter_mut().zip([d0, d1, d2]) {
            if !b.is_ascii_digit() {
                return Err(ParseError::InvalidResponseCode);
            }
            *slot = b - b'0';
        }
        Ok(Self { digits })
    }

    pub fn digits(&self) -> [u8; 3] {
        self.digits
    }

    pub fn kind(&self) -> ResponseType {
        match self.digits[0] {
            1 => ResponseType::Informational,
            2 => ResponseType::Success,
            3 => ResponseType::Redirection,
            4 => ResponseType::ClientError,
            5 => ResponseType::ServerError,
            _ => ResponseType::Unknown,
        }
    }

    pub fn as_u16(&self) -> u16 {
        let [a, b, c] = self.digits;
        100 * a as u16 + 10 * b as u16 + c as u16
    }
}

/// An HTTP response together with the request that produced it.
#[derive(Debug)]
pub struct Response {
    request: Request,
    code: ResponseCode,
    headers: Headers,
    body: Option<Vec<u8>>,
}

impl Response {
    pub fn new(request: Request, code: ResponseCode) -> Self {
        Self {
            request,
            code,
            headers: Headers::empty(),
            body: Some(Vec::new()),
        }
    }

    pub fn with_headers(mut self, headers: Headers) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_body(mut self, body: Vec<u8>) -> Self {
        self.body = Some(body);
        self
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    pub fn code(&self) -> ResponseCode {
        self.code
    }

    /// Whether the response code is in the 2xx class.
    pub fn is_success(&self) -> bool {
        self.code.kind() == ResponseType::Success
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut Headers {
        &mut self.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    /// The body, or `None` once [`take_body`](Self::take_body) has been called.
    pub fn body(&self) -> Option<&[u8]> {
        self.body.as_deref()
    }

    pub fn body_mut(&mut self) -> Option<&mut Vec<u8>> {
        self.body.as_mut()
    }

    pub fn replace_body(&mut self, body: Vec<u8>) {
        self.body = Some(body);
    }

    /// Moves the body out. Only the first call returns `Some`.
    pub fn take_body(&mut self) -> Option<Vec<u8>> {
        self.body.take()
    }
}
