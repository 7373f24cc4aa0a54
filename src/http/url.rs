//! URL value type.
//!
//! A small, dependency-free URL representation for the collector endpoint:
//! `scheme://host[:port][/path][?query][#fragment]`. Parsing is a single pass
//! state machine; serialization produces HTTP request targets.

use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Characters escaped when building a query from key/value pairs.
const RESERVED_CHARS: &str = "\n !*'():;@&=+$,/?#[]";
const HEX_DIGITS: &[u8; 16] = b"0123456789ABCDEF";

/// Percent-encodes the reserved set using uppercase hex digits.
pub fn urlencode(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if RESERVED_CHARS.contains(c) {
            let b = c as u8;
            out.push('%');
            out.push(HEX_DIGITS[(b >> 4) as usize] as char);
            out.push(HEX_DIGITS[(b & 0x0f) as usize] as char);
        } else {
            out.push(c);
        }
    }
    out
}

/// Query component, stored either verbatim or as ordered key/value pairs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Query {
    /// Serialized as-is after the `?`.
    Raw(String),
    /// Serialized as `k=v` pairs joined by `&`, percent-encoded, in insertion order.
    Pairs(Vec<(String, String)>),
}

impl Default for Query {
    fn default() -> Self {
        Query::Raw(String::new())
    }
}

impl Query {
    fn is_empty(&self) -> bool {
        match self {
            Query::Raw(s) => s.is_empty(),
            Query::Pairs(kv) => kv.is_empty(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParseState {
    Scheme,
    Slash1,
    Slash2,
    Host,
    Port,
    Path,
    Query,
    Fragment,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Url {
    scheme: String,
    host: String,
    port: Option<u16>,
    /// `None` means the root path `/`.
    path: Option<Vec<String>>,
    query: Query,
    fragment: Option<String>,
}

impl Url {
    /// Builds `scheme://host:port/` with no query.
    pub fn new(scheme: impl Into<String>, host: impl Into<String>, port: u16) -> Self {
        Self {
            scheme: scheme.into(),
            host: host.into(),
            port: Some(port),
            path: None,
            query: Query::default(),
            fragment: None,
        }
    }

    /// Parses `scheme://host[:port][/path][?query][#fragment]`.
    pub fn parse(s: &str) -> Result<Self, Error> {
        let malformed = || Error::MalformedUrl(s.to_string());

        let mut url = Url {
            scheme: String::new(),
            host: String::new(),
            port: None,
            path: None,
            query: Query::default(),
            fragment: None,
        };
        let mut state = ParseState::Scheme;
        let mut top = String::new();

        for c in s.chars() {
            match state {
                ParseState::Scheme => {
                    if c == ':' {
                        url.scheme = std::mem::take(&mut top);
                        state = ParseState::Slash1;
                    } else {
                        top.push(c);
                    }
                }
                ParseState::Slash1 | ParseState::Slash2 => {
                    if c != '/' {
                        return Err(malformed());
                    }
                    state = if state == ParseState::Slash1 {
                        ParseState::Slash2
                    } else {
                        ParseState::Host
                    };
                }
                ParseState::Host => match c {
                    ':' | '/' | '?' | '#' => {
                        url.host = std::mem::take(&mut top);
                        state = Self::after_authority(c);
                    }
                    _ => top.push(c),
                },
                ParseState::Port => match c {
                    '/' | '?' | '#' => {
                        url.port = Some(parse_port(&top).ok_or_else(malformed)?);
                        top.clear();
                        state = Self::after_authority(c);
                    }
                    _ => top.push(c),
                },
                ParseState::Path => match c {
                    '?' | '#' => {
                        url.set_path_str(&std::mem::take(&mut top));
                        state = if c == '?' {
                            ParseState::Query
                        } else {
                            ParseState::Fragment
                        };
                    }
                    _ => top.push(c),
                },
                ParseState::Query => match c {
                    '#' => {
                        url.query = Query::Raw(std::mem::take(&mut top));
                        state = ParseState::Fragment;
                    }
                    _ => top.push(c),
                },
                ParseState::Fragment => top.push(c),
            }
        }

        match state {
            ParseState::Host => url.host = top,
            ParseState::Port => url.port = Some(parse_port(&top).ok_or_else(malformed)?),
            ParseState::Path => {
                url.set_path_str(&top);
            }
            ParseState::Query => url.query = Query::Raw(top),
            ParseState::Fragment => url.fragment = Some(top),
            ParseState::Scheme | ParseState::Slash1 | ParseState::Slash2 => {
                return Err(malformed());
            }
        }

        if url.host.is_empty() {
            return Err(malformed());
        }

        Ok(url)
    }

    // Which state follows the character that terminated host or port.
    fn after_authority(c: char) -> ParseState {
        match c {
            ':' => ParseState::Port,
            '?' => ParseState::Query,
            '#' => ParseState::Fragment,
            _ => ParseState::Path,
        }
    }

    pub fn set_scheme(&mut self, scheme: impl Into<String>) -> &mut Self {
        self.scheme = scheme.into();
        self
    }

    pub fn set_host(&mut self, host: impl Into<String>) -> &mut Self {
        self.host = host.into();
        self
    }

    pub fn set_port(&mut self, port: u16) -> &mut Self {
        self.port = Some(port);
        self
    }

    /// Replaces the path by splitting `path` on `/`.
    ///
    /// One leading slash is ignored and an empty trailing segment is dropped,
    /// so `"/a/b/"` and `"a/b"` both yield `["a", "b"]`. An empty result
    /// resets the path to the root.
    pub fn set_path_str(&mut self, path: &str) -> &mut Self {
        let trimmed = path.strip_prefix('/').unwrap_or(path);
        let mut parts: Vec<String> = trimmed.split('/').map(str::to_string).collect();
        if parts.last().is_some_and(|p| p.is_empty()) {
            parts.pop();
        }
        self.path = if parts.is_empty() { None } else { Some(parts) };
        self
    }

    /// Replaces the path with the given segments.
    pub fn set_path<I, S>(&mut self, parts: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let parts: Vec<String> = parts.into_iter().map(Into::into).collect();
        self.path = if parts.is_empty() { None } else { Some(parts) };
        self
    }

    /// Uses a verbatim query string (without the leading `?`).
    pub fn set_query_str(&mut self, query: impl Into<String>) -> &mut Self {
        self.query = Query::Raw(query.into());
        self
    }

    /// Uses key/value pairs as the query, replacing any raw query string.
    pub fn set_query_pairs<I, K, V>(&mut self, pairs: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut kv = Vec::new();
        for (k, v) in pairs {
            insert_pair(&mut kv, k.into(), v.into());
        }
        self.query = Query::Pairs(kv);
        self
    }

    /// Sets one query parameter, switching to the key/value form if needed.
    pub fn set_query_param(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        if !matches!(self.query, Query::Pairs(_)) {
            self.query = Query::Pairs(Vec::new());
        }
        if let Query::Pairs(kv) = &mut self.query {
            insert_pair(kv, key.into(), value.into());
        }
        self
    }

    pub fn set_fragment(&mut self, fragment: impl Into<String>) -> &mut Self {
        self.fragment = Some(fragment.into());
        self
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// The explicit port, if one was given.
    pub fn port(&self) -> Option<u16> {
        self.port
    }

    /// The explicit port, or the scheme's well-known port.
    pub fn port_or_infer(&self) -> u16 {
        if let Some(port) = self.port {
            return port;
        }
        match self.scheme.as_str() {
            "https" => 443,
            _ => 80,
        }
    }

    /// The serialized path, `/` when there is none.
    pub fn path(&self) -> String {
        match &self.path {
            Some(parts) => {
                let mut out = String::new();
                for part in parts {
                    out.push('/');
                    out.push_str(part);
                }
                out
            }
            None => "/".to_string(),
        }
    }

    pub fn path_components(&self) -> Option<&[String]> {
        self.path.as_deref()
    }

    pub fn query_kv(&self) -> Option<&[(String, String)]> {
        match &self.query {
            Query::Pairs(kv) => Some(kv),
            Query::Raw(_) => None,
        }
    }

    pub fn raw_query(&self) -> &Query {
        &self.query
    }

    pub fn fragment(&self) -> Option<&str> {
        self.fragment.as_deref()
    }

    /// The serialized query including its `?`, or an empty string for no query.
    pub fn query(&self) -> String {
        if self.query.is_empty() {
            return String::new();
        }
        match &self.query {
            Query::Raw(raw) => format!("?{raw}"),
            Query::Pairs(kv) => {
                let mut out = String::new();
                for (i, (k, v)) in kv.iter().enumerate() {
                    out.push(if i == 0 { '?' } else { '&' });
                    out.push_str(&urlencode(k));
                    out.push('=');
                    out.push_str(&urlencode(v));
                }
                out
            }
        }
    }

    /// Appends a path segment.
    pub fn push(&mut self, part: impl Into<String>) {
        self.path.get_or_insert_with(Vec::new).push(part.into());
    }

    /// Removes the last path segment; removing the only one resets to the root.
    pub fn pop(&mut self) {
        if let Some(parts) = &mut self.path {
            parts.pop();
            if parts.is_empty() {
                self.path = None;
            }
        }
    }

    /// `(host, port)` pair suitable for name resolution.
    pub fn socket_addr_query(&self) -> (String, u16) {
        (self.host.clone(), self.port_or_infer())
    }

    /// HTTP request target: `<path><query>`, or the absolute
    /// `scheme://host<path><query>` form used with proxies.
    pub fn make_request_target(&self, absolute: bool) -> String {
        if absolute {
            format!("{}://{}{}{}", self.scheme, self.host, self.path(), self.query())
        } else {
            format!("{}{}", self.path(), self.query())
        }
    }
}

fn parse_port(s: &str) -> Option<u16> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

fn insert_pair(kv: &mut Vec<(String, String)>, key: String, value: String) {
    match kv.iter_mut().find(|(k, _)| *k == key) {
        Some(entry) => entry.1 = value,
        None => kv.push((key, value)),
    }
}

impl FromStr for Url {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Url::parse(s)
    }
}

impl fmt::Display for Url {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.scheme, self.host)?;
        if let Some(port) = self.port {
            write!(f, ":{port}")?;
        }
        write!(f, "{}{}", self.path(), self.query())?;
        if let Some(frag) = &self.fragment {
            write!(f, "#{frag}")?;
        }
        Ok(())
    }
}
