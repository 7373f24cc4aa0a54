//! Minimal asynchronous HTTP/1.1 client.
//!
//! Enough HTTP to deliver telemetry to a REST collector: no TLS, no request
//! bodies, no chunked transfer-encoding, no redirects and no pipelining.
//!
//! # Architecture
//!
//! - **`url`**: URL value type and request-target serialization
//! - **`headers`**: Case-insensitive header map
//! - **`request`** / **`response`**: Request and response values
//! - **`writer`**: Encodes a request line and header block
//! - **`parser`**: Parses a response status line and header block
//! - **`connection`**: Per-connection request queue and state machine
//! - **`pool`**: Maps destinations to connections
//!
//! # Connection State Machine
//!
//! ```text
//!        ┌─────────────┐
//!        │    Idle     │ ← Wait for a queued request
//!        └──────┬──────┘
//!               │ Request dequeued
//!               ▼
//!        ┌──────────────────┐
//!        │    Sending       │ ← Write request line and headers
//!        └──────┬───────────┘
//!               │ Written
//!               ▼
//!        ┌──────────────────┐
//!        │  Reading head    │ ← Status line and headers
//!        └──────┬───────────┘
//!               │ Content-Length or read-to-close
//!               ▼
//!        ┌──────────────────┐
//!        │  Reading body    │
//!        └──────┬───────────┘
//!               │ Response delivered
//!               ├─ HTTP/1.1 + Keep-Alive → Idle (same connection)
//!               └─ Otherwise → Closed, queued requests failed
//! ```

pub mod connection;
pub mod headers;
pub mod parser;
pub mod pool;
pub mod request;
pub mod response;
pub mod url;
pub mod writer;

pub use connection::{HttpConnection, PendingResponse};
pub use headers::Headers;
pub use pool::HttpTarget;
pub use request::{Method, Request};
pub use response::{Response, ResponseCode, ResponseType};
pub use url::Url;
