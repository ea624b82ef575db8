//! UDP transport.
//!
//! One socket bound to a fixed local port receives datagrams from every
//! producer. The source address of each datagram becomes the producer's
//! [`SessionId`], and replies go back to that same address.
//!
//! There is no retransmission, ordering or acknowledgement: a datagram lost
//! on the way in is lost, and outbound sends are fire-and-forget.

use std::net::SocketAddr;

use sightline_core::SessionId;
use tokio::net::UdpSocket;

use crate::error::ObserverError;

/// UDP transport using a tokio socket.
pub struct UdpTransport {
    /// Socket shared by all producers
    socket: UdpSocket,
}

impl UdpTransport {
    /// Create and bind a new UDP transport.
    pub async fn bind(address: &str) -> Result<Self, ObserverError> {
        let addr: SocketAddr = address
            .parse()
            .map_err(|e| ObserverError::Config(format!("invalid bind address '{address}': {e}")))?;

        let socket = UdpSocket::bind(addr).await?;

        tracing::info!("UDP transport bound to {}", socket.local_addr()?);

        Ok(Self { socket })
    }

    /// Receive one datagram into `buf`.
    ///
    /// Returns the number of bytes written and the sending producer. Datagrams
    /// longer than `buf` are truncated by the OS.
    pub async fn recv_from(&self, buf: &mut [u8]) -> Result<(usize, SessionId), ObserverError> {
        let (len, from) = self.socket.recv_from(buf).await?;
        Ok((len, SessionId::new(from)))
    }

    /// Send a datagram to a producer.
    ///
    /// Failures are logged and otherwise ignored.
    pub async fn send_to(&self, to: SessionId, bytes: &[u8]) {
        match self.socket.send_to(bytes, to.addr()).await {
            Ok(sent) if sent < bytes.len() => {
                tracing::warn!("short send to {}: {} of {} bytes", to, sent, bytes.len());
            },
            Ok(_) => {},
            Err(e) => tracing::warn!("send to {} failed: {}", to, e),
        }
    }

    /// Local address the transport is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, ObserverError> {
        Ok(self.socket.local_addr()?)
    }
}
