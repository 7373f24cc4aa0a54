//! Retrying socket transports.
//!
//! A [`SocketTransport`] owns a FIFO queue of buffers and a single driver task
//! that hands the head of the queue to a [`Link`] until the link reports it
//! sent, backing off between failed attempts. Only one send is ever in flight
//! and a failed buffer is retried, never skipped.

pub mod tcp;
pub mod udp;

use std::collections::VecDeque;
use std::future::Future;
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

use crate::config::RetryPolicy;
use crate::reactor::ReactorHandle;

pub use tcp::{TcpLink, TcpTarget};
pub use udp::{UdpLink, UdpTarget};

/// Outcome of one send attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attempt {
    /// The send could not even be started (e.g. not connected yet).
    NotDispatched,
    /// The buffer was transmitted.
    Sent,
    /// The send was started but failed.
    Failed,
}

/// The socket-specific half of a transport.
pub trait Link: Send + 'static {
    /// Tries to transmit one buffer.
    fn attempt_send(&mut self, buf: Bytes) -> impl Future<Output = Attempt> + Send;
}

#[derive(Default)]
struct Queue {
    items: VecDeque<Bytes>,
}

struct Shared {
    queue: Mutex<Queue>,
    wake: Notify,
}

/// Queue plus retry loop in front of a [`Link`].
pub struct SocketTransport {
    shared: Arc<Shared>,
    driver: JoinHandle<()>,
}

impl SocketTransport {
    /// Starts the driver task for `link` on the reactor.
    pub fn spawn<L: Link>(reactor: &ReactorHandle, link: L, policy: RetryPolicy) -> Self {
        let shared = Arc::new(Shared {
            queue: Mutex::new(Queue::default()),
            wake: Notify::new(),
        });
        let driver = reactor.spawn(drive(link, shared.clone(), policy));
        Self { shared, driver }
    }

    /// Copies `buf` onto the queue and wakes the driver. Never blocks on I/O.
    pub fn enqueue(&self, buf: &[u8]) {
        self.shared
            .queue
            .lock()
            .items
            .push_back(Bytes::copy_from_slice(buf));
        self.shared.wake.notify_one();
    }

    /// Buffers not yet confirmed sent, including the one in flight.
    pub fn queued(&self) -> usize {
        self.shared.queue.lock().items.len()
    }
}

impl Drop for SocketTransport {
    fn drop(&mut self) {
        self.driver.abort();
    }
}

async fn drive<L: Link>(mut link: L, shared: Arc<Shared>, policy: RetryPolicy) {
    loop {
        let head = shared.queue.lock().items.front().cloned();
        let Some(buf) = head else {
            shared.wake.notified().await;
            continue;
        };

        let len = buf.len();
        match link.attempt_send(buf).await {
            Attempt::Sent => {
                shared.queue.lock().items.pop_front();
                tracing::trace!(bytes = len, "buffer sent");
            }
            Attempt::NotDispatched => {
                tracing::debug!(delay = ?policy.backpressure_delay, "send not dispatched, backing off");
                tokio::time::sleep(policy.backpressure_delay).await;
            }
            Attempt::Failed => {
                tracing::warn!(delay = ?policy.failure_delay, "send failed, retrying");
                tokio::time::sleep(policy.failure_delay).await;
            }
        }
    }
}
