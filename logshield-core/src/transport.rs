//! UDP transport
//!
//! One record, one datagram, no acknowledgement and no retransmission at
//! this layer. Every failure (resolve, socket, timeout) is reported as an
//! error to the caller; nothing escapes the transport boundary.

use std::time::Duration;

use async_trait::async_trait;
use tokio::net::UdpSocket;

use crate::error::{Error, Result};
use crate::types::ServerDestination;

/// Seam between the forwarding pipeline and the network.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Transmit one encoded record to the destination.
    async fn send(&self, dest: &ServerDestination, payload: &[u8]) -> Result<()>;
}

/// Datagram transport: a new unconnected socket per send.
///
/// Records are expected to stay under typical MTU; oversized payloads are a
/// caller responsibility.
#[derive(Debug, Clone)]
pub struct UdpTransport {
    send_timeout: Duration,
}

impl Default for UdpTransport {
    fn default() -> Self {
        Self {
            send_timeout: Duration::from_secs(5),
        }
    }
}

impl UdpTransport {
    pub fn new(send_timeout: Duration) -> Self {
        Self { send_timeout }
    }
}

#[async_trait]
impl Transport for UdpTransport {
    async fn send(&self, dest: &ServerDestination, payload: &[u8]) -> Result<()> {
        let fut = async {
            let socket = UdpSocket::bind("0.0.0.0:0")
                .await
                .map_err(|e| Error::Transport(format!("bind failed: {}", e)))?;

            let target = (dest.host.as_str(), dest.port);
            let sent = socket
                .send_to(payload, target)
                .await
                .map_err(|e| Error::Transport(format!("send to {} failed: {}", dest, e)))?;

            tracing::debug!(%dest, bytes = sent, "Sent datagram");
            Ok(())
        };

        match tokio::time::timeout(self.send_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(Error::Transport(format!(
                "send to {} timed out after {:?}",
                dest, self.send_timeout
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_send_reaches_loopback_receiver() {
        let receiver = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let port = receiver.local_addr().unwrap().port();

        let dest = ServerDestination {
            host: "127.0.0.1".to_string(),
            port,
        };
        let transport = UdpTransport::default();
        transport.send(&dest, b"<13>test record").await.unwrap();

        let mut buf = [0u8; 1024];
        let (len, _) = receiver.recv_from(&mut buf).await.unwrap();
        assert_eq!(&buf[..len], b"<13>test record");
    }

    #[tokio::test]
    async fn test_unresolvable_host_is_error_not_panic() {
        let dest = ServerDestination {
            host: "definitely-not-a-real-host.invalid".to_string(),
            port: 1514,
        };
        let transport = UdpTransport::new(Duration::from_millis(500));
        let result = transport.send(&dest, b"x").await;
        assert!(result.is_err());
    }
}
