use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, ToSocketAddrs};

use bytes::Bytes;
use tokio::net::UdpSocket;

use crate::config::RetryPolicy;
use crate::dump::DumpTarget;
use crate::error::{Error, Result};
use crate::reactor::ReactorHandle;
use crate::transport::{Attempt, Link, SocketTransport};

/// Connectionless link to a destination resolved once up front.
pub struct UdpLink {
    socket: UdpSocket,
    dest: SocketAddr,
}

impl UdpLink {
    /// Binds an ephemeral local socket of the destination's address family.
    ///
    /// Must be called from within the reactor's runtime context.
    pub fn bind(dest: SocketAddr) -> Result<Self> {
        let local = if dest.is_ipv4() {
            SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0))
        } else {
            SocketAddr::from((Ipv6Addr::UNSPECIFIED, 0))
        };
        let socket = std::net::UdpSocket::bind(local)?;
        socket.set_nonblocking(true)?;
        Ok(Self {
            socket: UdpSocket::from_std(socket)?,
            dest,
        })
    }
}

impl Link for UdpLink {
    async fn attempt_send(&mut self, buf: Bytes) -> Attempt {
        match self.socket.send_to(&buf, self.dest).await {
            Ok(_) => Attempt::Sent,
            Err(e) => {
                tracing::warn!(dest = %self.dest, error = %e, "datagram send failed");
                Attempt::Failed
            }
        }
    }
}

/// Sends each document as one datagram.
pub struct UdpTarget {
    transport: SocketTransport,
}

impl UdpTarget {
    pub fn new(reactor: &ReactorHandle, host: &str, port: u16, policy: RetryPolicy) -> Result<Self> {
        let dest = resolve(host, port)?;
        let link = {
            let _guard = reactor.tokio_handle().enter();
            UdpLink::bind(dest)?
        };
        tracing::debug!(%dest, "udp target ready");
        Ok(Self {
            transport: SocketTransport::spawn(reactor, link, policy),
        })
    }

    pub fn queued(&self) -> usize {
        self.transport.queued()
    }
}

impl DumpTarget for UdpTarget {
    fn write(&self, document: &[u8]) {
        self.transport.enqueue(document);
    }
}

/// Blocking name resolution, first address wins.
pub(crate) fn resolve(host: &str, port: u16) -> Result<SocketAddr> {
    let resolve_err = |source| Error::Resolve {
        host: host.to_string(),
        port,
        source,
    };
    (host, port)
        .to_socket_addrs()
        .map_err(resolve_err)?
        .next()
        .ok_or_else(|| {
            resolve_err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "no addresses resolved",
            ))
        })
}
