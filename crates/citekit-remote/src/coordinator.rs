//! Caller-facing policy: delegate to a running instance or become primary.
//!
//! A starting process calls [`try_delegate_to_running_instance`] first. If a
//! primary answers and accepts the arguments, the process exits without
//! opening a window; otherwise it calls [`start_as_primary`] and keeps the
//! returned handle alive for its whole lifetime.

use crate::client::RemoteClient;
use crate::error::Result;
use crate::handler::MessageHandler;
use crate::server::{RemoteServer, ServerHandle};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Try to hand this invocation's arguments to an already running primary.
///
/// Returns `true` when a primary answered the probe and accepted the
/// arguments. Every failure maps to `false`: an unreachable port is the
/// expected "become primary" outcome, not an error to report.
pub async fn try_delegate_to_running_instance(port: u16, args: &[String]) -> bool {
    let client = RemoteClient::new(port);

    if let Err(e) = client.ping().await {
        if e.means_no_instance() {
            debug!("no primary instance on port {}: {}", port, e);
        } else {
            warn!("probe of port {} failed: {}", port, e);
        }
        return false;
    }

    match client.send_arguments(args).await {
        Ok(()) => {
            info!(
                "delegated {} argument(s) to the primary on port {}",
                args.len(),
                port
            );
            true
        }
        Err(e) => {
            warn!(
                "primary on port {} answered the probe but the hand-over failed: {}",
                port, e
            );
            false
        }
    }
}

/// Become the primary instance: bind the port and start the listener.
///
/// An `AddressInUse` failure propagates so the application can retry
/// delegation or warn the user; any other bind failure is unexpected and
/// propagates as-is.
pub async fn start_as_primary<H: MessageHandler>(
    handler: Arc<H>,
    port: u16,
) -> Result<ServerHandle> {
    RemoteServer::start(handler, port).await
}
