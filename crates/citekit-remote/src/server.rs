//! Listener lifecycle for the primary instance.
//!
//! Binds a loopback socket, accepts connections on a spawned task, decodes
//! one message per connection, and dispatches it to the [`MessageHandler`].
//! The connection is closed right after dispatch; that close is the implicit
//! acknowledgment the client waits for.
//!
//! # Thread Safety
//!
//! The accept loop runs on the tokio runtime. Each connection is handled in
//! its own spawned task, so a slow or stalled client never starves the
//! others. The handler is shared via `Arc`.

use crate::config::RemoteConfig;
use crate::error::{RemoteError, Result};
use crate::handler::MessageHandler;
use crate::protocol::{read_message, Message};
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

/// Handle to a running listener. Dropping it shuts the listener down.
#[derive(Debug)]
pub struct ServerHandle {
    addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task_handle: Option<tokio::task::JoinHandle<()>>,
    active_connections: Arc<AtomicUsize>,
}

impl ServerHandle {
    /// Address the listener is bound to.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Port the listener is bound to. With port `0` at start time this is
    /// the OS-assigned port.
    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Stop accepting connections and wait for the accept loop to unwind.
    ///
    /// Idempotent: stopping an already stopped handle is a no-op. A dispatch
    /// already in flight is not cancelled; it is given until the read
    /// timeout to finish before `stop` returns.
    pub async fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.task_handle.take() {
            let _ = handle.await;
        }

        let deadline = tokio::time::Instant::now() + RemoteConfig::READ_TIMEOUT;
        while self.active_connections.load(Ordering::Relaxed) > 0 {
            if tokio::time::Instant::now() >= deadline {
                warn!("stopping with a dispatch still in flight");
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.task_handle.take() {
            handle.abort();
        }
    }
}

/// Listener for the single-instance channel.
pub struct RemoteServer;

impl RemoteServer {
    /// Bind `127.0.0.1:port` and start accepting in the background.
    ///
    /// Returns once the bind has succeeded; connection handling never runs
    /// on the caller's task. Port `0` binds an OS-assigned port, available
    /// from the returned handle. A port held by another process fails with
    /// [`RemoteError::AddressInUse`] and leaves nothing running — the caller
    /// interprets that as "another instance is already the primary".
    pub async fn start<H: MessageHandler>(handler: Arc<H>, port: u16) -> Result<ServerHandle> {
        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, port))
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::AddrInUse => RemoteError::AddressInUse { port },
                _ => e.into(),
            })?;
        let addr = listener.local_addr()?;

        info!("instance listener bound on {}", addr);

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let active_connections = Arc::new(AtomicUsize::new(0));

        let task_handle = tokio::spawn(Self::accept_loop(
            listener,
            handler,
            shutdown_rx,
            active_connections.clone(),
        ));

        Ok(ServerHandle {
            addr,
            shutdown_tx: Some(shutdown_tx),
            task_handle: Some(task_handle),
            active_connections,
        })
    }

    async fn accept_loop<H: MessageHandler>(
        listener: TcpListener,
        handler: Arc<H>,
        mut shutdown_rx: oneshot::Receiver<()>,
        active_connections: Arc<AtomicUsize>,
    ) {
        loop {
            tokio::select! {
                _ = &mut shutdown_rx => {
                    info!("instance listener shutting down");
                    break;
                }
                accept_result = listener.accept() => {
                    match accept_result {
                        Ok((stream, peer_addr)) => {
                            let current = active_connections.load(Ordering::Relaxed);
                            if current >= RemoteConfig::MAX_CONNECTIONS {
                                warn!(
                                    "rejecting connection from {}: at capacity ({})",
                                    peer_addr,
                                    RemoteConfig::MAX_CONNECTIONS
                                );
                                continue;
                            }

                            active_connections.fetch_add(1, Ordering::Relaxed);
                            let handler = handler.clone();
                            let conns = active_connections.clone();

                            tokio::spawn(async move {
                                debug!("connection from {}", peer_addr);
                                if let Err(e) = handle_connection(stream, &*handler).await {
                                    // A bad frame poisons this connection only.
                                    warn!("connection {} dropped: {}", peer_addr, e);
                                }
                                conns.fetch_sub(1, Ordering::Relaxed);
                            });
                        }
                        Err(e) => {
                            warn!("accept error: {}", e);
                        }
                    }
                }
            }
        }
    }
}

/// Decode one message, dispatch it, then close the connection.
async fn handle_connection<H: MessageHandler>(stream: TcpStream, handler: &H) -> Result<()> {
    let mut reader = BufReader::new(stream);

    let message = tokio::time::timeout(RemoteConfig::READ_TIMEOUT, read_message(&mut reader))
        .await
        .map_err(|_| RemoteError::Timeout(RemoteConfig::READ_TIMEOUT))??;

    match message {
        Message::Ping => {
            let alive = handler.is_alive().await;
            debug!("answered ping, alive={}", alive);
        }
        Message::SendArguments(args) => {
            debug!("dispatching {} forwarded argument(s)", args.len());
            handler.receive_arguments(args).await;
        }
    }

    // Best-effort close; the exchange is already complete.
    let mut stream = reader.into_inner();
    let _ = stream.shutdown().await;
    Ok(())
}
