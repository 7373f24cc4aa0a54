//! Connection management for HTTP delivery targets.
//!
//! With keep-alive enabled, one persistent connection is kept per
//! `(host, port)` and reused for every request to that destination. Without
//! it, each request gets its own connection and a `Connection: close` header,
//! and the connection is retired after its one response.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::error::Result;
use crate::http::connection::{HttpConnection, PendingResponse};
use crate::http::request::Request;
use crate::http::response::Response;
use crate::reactor::ReactorHandle;

/// Pool key: destination host and port.
pub type ConnKey = (String, u16);

#[derive(Default)]
struct Pool {
    /// Persistent connections, used in keep-alive mode.
    conns: HashMap<ConnKey, HttpConnection>,
    /// Live one-shot connections, used otherwise.
    active: Vec<HttpConnection>,
}

/// Sends requests over pooled or per-request connections.
pub struct HttpTarget {
    reactor: ReactorHandle,
    keep_alive: bool,
    pool: Arc<Mutex<Pool>>,
}

impl HttpTarget {
    pub fn new(reactor: ReactorHandle, keep_alive: bool) -> Self {
        Self {
            reactor,
            keep_alive,
            pool: Arc::new(Mutex::new(Pool::default())),
        }
    }

    pub fn keep_alive(&self) -> bool {
        self.keep_alive
    }

    /// Sends `request` and calls `handler` with the outcome on the reactor.
    ///
    /// Never blocks: connecting, sending and reading all happen later.
    pub fn submit<F>(&self, request: &Request, handler: F)
    where
        F: FnOnce(Result<Response>) + Send + 'static,
    {
        let pending = self.send(request);
        self.reactor.spawn(async move {
            handler(pending.await);
        });
    }

    /// Sends a private copy of `request`; the returned future yields the response.
    pub fn send(&self, request: &Request) -> PendingResponse {
        let url = request.url();
        let key = (url.host().to_string(), url.port_or_infer());

        let mut copy = request.clone();
        if !self.keep_alive && copy.header_map().get("connection").is_none() {
            copy.header_map_mut().set("connection", "close");
        }
        self.connection_for(key).request(copy)
    }

    /// Number of connections currently tracked.
    pub fn connection_count(&self) -> usize {
        let pool = self.pool.lock();
        pool.conns.len() + pool.active.len()
    }

    fn connection_for(&self, key: ConnKey) -> HttpConnection {
        let mut pool = self.pool.lock();

        if self.keep_alive {
            if let Some(conn) = pool.conns.get(&key) {
                if !conn.is_closed() {
                    tracing::trace!(conn = conn.id(), host = %key.0, port = key.1, "reusing connection");
                    return conn.clone();
                }
            }
        }

        let on_close = {
            let pool = Arc::downgrade(&self.pool);
            let key = key.clone();
            let keep_alive = self.keep_alive;
            Box::new(move |id| dispose(&pool, keep_alive, &key, id))
        };

        // Registered before it connects so concurrent submits share it. The
        // pool lock is held until then, so a fast close cannot run first.
        let conn = if self.keep_alive {
            HttpConnection::open(&self.reactor, key.0.clone(), key.1, on_close)
        } else {
            HttpConnection::open_single_use(&self.reactor, key.0.clone(), key.1, on_close)
        };
        tracing::debug!(conn = conn.id(), host = %key.0, port = key.1, "opening connection");

        if self.keep_alive {
            pool.conns.insert(key, conn.clone());
        } else {
            pool.active.push(conn.clone());
        }

        conn
    }
}

/// Drops a dead connection from whichever store holds it.
fn dispose(pool: &Weak<Mutex<Pool>>, keep_alive: bool, key: &ConnKey, id: u64) {
    let Some(pool) = pool.upgrade() else {
        return;
    };
    let mut pool = pool.lock();
    if keep_alive {
        if pool.conns.get(key).is_some_and(|c| c.id() == id) {
            pool.conns.remove(key);
        }
    } else {
        pool.active.retain(|c| c.id() != id);
    }
}
