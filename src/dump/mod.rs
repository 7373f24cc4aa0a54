//! Telemetry dumping.
//!
//! The [`Dumper`] turns one frame's results into a JSON document and passes it
//! to a [`DumpTarget`], which queues it for asynchronous delivery.

pub mod dumper;
pub mod post;
pub mod results;

use crate::config::{Config, TargetKind};
use crate::reactor::ReactorHandle;
use crate::transport::{TcpTarget, UdpTarget};

pub use dumper::{Dumper, FrameStats};
pub use post::PostTarget;
pub use results::{AlgorithmResult, BoundingBox, BoundingBoxesResult, Rect};

/// Destination for serialized documents.
///
/// `write` only queues; delivery happens on the reactor and failures are
/// logged, never returned to the caller.
pub trait DumpTarget: Send + Sync {
    fn write(&self, document: &[u8]);
}

/// Builds the target described by `cfg`.
pub fn build_target(cfg: &Config, reactor: &ReactorHandle) -> crate::Result<Box<dyn DumpTarget>> {
    let target = &cfg.target;
    let policy = cfg.retry_policy();

    let out: Box<dyn DumpTarget> = match target.kind {
        TargetKind::Udp => Box::new(UdpTarget::new(reactor, &target.host, target.port, policy)?),
        TargetKind::Tcp => Box::new(TcpTarget::new(reactor, &target.host, target.port, policy)?),
        TargetKind::Http => {
            let url = target.url.as_deref().unwrap_or_default();
            Box::new(PostTarget::with_keep_alive(reactor.clone(), url, target.keep_alive)?)
        }
    };
    Ok(out)
}
