//! Event loop ownership.
//!
//! All transport and connection state is driven by one single-threaded tokio
//! runtime. [`Reactor`] owns that runtime on a background thread and keeps it
//! running until it is shut down; [`ReactorHandle`] is what transports hold to
//! spawn work onto it from any thread.

use std::future::Future;
use std::thread::JoinHandle;

use tokio::runtime::{Builder, Handle};
use tokio::sync::oneshot;

/// A running event loop on a dedicated thread.
pub struct Reactor {
    handle: ReactorHandle,
    stop: Option<oneshot::Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl Reactor {
    /// Starts a current-thread runtime on a background thread named `metadump-reactor`.
    pub fn start() -> std::io::Result<Self> {
        let runtime = Builder::new_current_thread().enable_all().build()?;
        let handle = ReactorHandle {
            inner: runtime.handle().clone(),
        };
        let (stop, stopped) = oneshot::channel::<()>();

        let thread = std::thread::Builder::new()
            .name("metadump-reactor".to_string())
            .spawn(move || {
                // Spawned tasks only make progress while this block_on runs.
                runtime.block_on(async {
                    let _ = stopped.await;
                });
                tracing::debug!("reactor stopped");
            })?;

        tracing::debug!("reactor started");

        Ok(Self {
            handle,
            stop: Some(stop),
            thread: Some(thread),
        })
    }

    pub fn handle(&self) -> ReactorHandle {
        self.handle.clone()
    }

    /// Releases the keep-running token and joins the reactor thread.
    pub fn shutdown(mut self) {
        self.stop_and_join();
    }

    fn stop_and_join(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                tracing::error!("reactor thread panicked");
            }
        }
    }
}

impl Drop for Reactor {
    fn drop(&mut self) {
        self.stop_and_join();
    }
}

/// Cloneable handle used to spawn work onto a reactor.
#[derive(Debug, Clone)]
pub struct ReactorHandle {
    inner: Handle,
}

impl ReactorHandle {
    /// Adopts the runtime the caller is running in.
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime.
    pub fn current() -> Self {
        Self {
            inner: Handle::current(),
        }
    }

    pub fn from_handle(inner: Handle) -> Self {
        Self { inner }
    }

    pub fn spawn<F>(&self, fut: F) -> tokio::task::JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        self.inner.spawn(fut)
    }

    pub fn tokio_handle(&self) -> &Handle {
        &self.inner
    }
}
