//! Client side of the single-instance channel.
//!
//! A secondary invocation uses this to probe for a primary instance and to
//! hand its command line over before exiting. Every operation opens a fresh
//! connection, performs one exchange, and closes — connections are never
//! reused.

use crate::config::RemoteConfig;
use crate::error::{RemoteError, Result};
use crate::protocol::{write_message, Message};
use std::net::Ipv4Addr;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::debug;

/// Client for the single-instance channel of a (possible) primary instance.
#[derive(Debug, Clone, Copy)]
pub struct RemoteClient {
    port: u16,
}

impl RemoteClient {
    /// Client targeting the given local port.
    pub fn new(port: u16) -> Self {
        Self { port }
    }

    /// Port this client targets.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Probe for a live primary instance.
    ///
    /// `Ok(())` means a listener accepted the probe and completed the
    /// exchange — no payload comes back; the completed exchange is the
    /// liveness signal. [`RemoteError::Unreachable`] and
    /// [`RemoteError::Timeout`] mean no primary is present.
    pub async fn ping(&self) -> Result<()> {
        let stream = self.connect().await?;
        self.exchange(stream, &Message::Ping).await
    }

    /// Forward command-line arguments to the primary instance.
    ///
    /// Fire-and-forget at the application level; the server closing the
    /// connection after dispatch is awaited as weak confirmation of receipt.
    pub async fn send_arguments(&self, args: &[String]) -> Result<()> {
        let stream = self.connect().await?;
        self.exchange(stream, &Message::SendArguments(args.to_vec()))
            .await
    }

    /// Open a connection to `127.0.0.1`, bounded by the connect timeout.
    async fn connect(&self) -> Result<TcpStream> {
        let attempt = TcpStream::connect((Ipv4Addr::LOCALHOST, self.port));
        match tokio::time::timeout(RemoteConfig::CONNECT_TIMEOUT, attempt).await {
            Err(_) => Err(RemoteError::Timeout(RemoteConfig::CONNECT_TIMEOUT)),
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::ConnectionRefused => {
                Err(RemoteError::Unreachable { port: self.port })
            }
            Ok(Err(e)) => Err(e.into()),
            Ok(Ok(stream)) => Ok(stream),
        }
    }

    /// Send one message, then wait for the server-side close.
    async fn exchange(&self, mut stream: TcpStream, message: &Message) -> Result<()> {
        write_message(&mut stream, message)
            .await
            .map_err(into_exchange_error)?;

        let mut buf = [0u8; 1];
        match tokio::time::timeout(RemoteConfig::EXCHANGE_TIMEOUT, stream.read(&mut buf)).await {
            Err(_) => Err(RemoteError::Timeout(RemoteConfig::EXCHANGE_TIMEOUT)),
            Ok(Ok(0)) => {
                debug!("exchange with primary on port {} complete", self.port);
                let _ = stream.shutdown().await;
                Ok(())
            }
            // The server never sends payload back on this channel.
            Ok(Ok(_)) => Err(RemoteError::framing("unexpected data in acknowledgment")),
            Ok(Err(e)) => Err(into_exchange_error(e.into())),
        }
    }
}

/// Socket resets during an exchange mean the peer went away mid-exchange,
/// not a local I/O fault.
fn into_exchange_error(err: RemoteError) -> RemoteError {
    match err {
        RemoteError::Io(e)
            if matches!(
                e.kind(),
                std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::BrokenPipe
                    | std::io::ErrorKind::UnexpectedEof
            ) =>
        {
            RemoteError::ConnectionClosed
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_ping_unbound_port_is_unreachable() {
        // Bind an ephemeral port, note it, and release it again.
        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let err = RemoteClient::new(port).ping().await.unwrap_err();
        assert!(err.means_no_instance(), "got {err:?}");
    }

    #[tokio::test]
    async fn test_unexpected_acknowledgment_payload_is_a_framing_error() {
        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
        let port = listener.local_addr().unwrap().port();

        // A peer that talks back on the acknowledgment channel is not a
        // primary instance of ours. Hold the connection open until the
        // client gives up so its read sees the payload, not a reset.
        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            stream.write_all(b"?").await.unwrap();
            let mut sink = Vec::new();
            let _ = stream.read_to_end(&mut sink).await;
        });

        let err = RemoteClient::new(port).ping().await.unwrap_err();
        assert!(matches!(err, RemoteError::ProtocolFraming { .. }));
    }
}
