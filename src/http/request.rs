use crate::http::headers::Headers;
use crate::http::url::Url;

/// HTTP request methods.
///
/// Only the verbs the collector API needs are supported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// GET - Retrieve a resource
    Get,
    /// POST - Submit data
    Post,
    /// PUT - Replace a resource
    Put,
}

impl Method {
    /// The method token as it appears on the request line.
    ///
    /// # Example
    ///
    /// ```
    /// # use metadump::http::request::Method;
    /// assert_eq!(Method::Post.as_str(), "POST");
    /// ```
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
        }
    }

    /// Parses a method token (case-sensitive).
    pub fn from_token(s: &str) -> Option<Self> {
        match s {
            "GET" => Some(Method::Get),
            "POST" => Some(Method::Post),
            "PUT" => Some(Method::Put),
            _ => None,
        }
    }
}

/// An HTTP request before being sent.
///
/// Requests carry no body; the wire encoding is the request line plus headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    method: Method,
    url: Url,
    headers: Headers,
    follow_redirects: bool,
}

impl Request {
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: Headers::new(),
            follow_redirects: true,
        }
    }

    pub fn get(url: Url) -> Self {
        Self::new(Method::Get, url)
    }

    pub fn post(url: Url) -> Self {
        Self::new(Method::Post, url)
    }

    pub fn put(url: Url) -> Self {
        Self::new(Method::Put, url)
    }

    pub fn with_url(mut self, url: Url) -> Self {
        self.url = url;
        self
    }

    /// Sets one header, replacing any previous value.
    pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.set(name, value);
        self
    }

    /// Replaces the whole header set.
    pub fn headers(mut self, headers: Headers) -> Self {
        self.headers = headers;
        self
    }

    /// Fills in headers from `defaults` that are not already set.
    pub fn add_headers(mut self, defaults: &Headers) -> Self {
        self.headers.augment(defaults);
        self
    }

    /// Records whether redirects should be followed.
    ///
    /// The flag is carried with the request but the client does not act on it.
    pub fn follow_redirects(mut self, follow: bool) -> Self {
        self.follow_redirects = follow;
        self
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn header_map(&self) -> &Headers {
        &self.headers
    }

    pub fn header_map_mut(&mut self) -> &mut Headers {
        &mut self.headers
    }

    pub fn follows_redirects(&self) -> bool {
        self.follow_redirects
    }
}
