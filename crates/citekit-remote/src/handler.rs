//! The dispatch seam between the listener and the application.

use async_trait::async_trait;

/// Application-side reactions to decoded messages.
///
/// The server dispatches into this trait and nothing else. The application
/// wires in its real handler (typically queueing the arguments for the GUI
/// to open); tests substitute a recording implementation.
#[async_trait]
pub trait MessageHandler: Send + Sync + 'static {
    /// Answer a liveness probe.
    async fn is_alive(&self) -> bool;

    /// Accept command-line arguments forwarded by a secondary invocation.
    ///
    /// Ordering within one call is preserved. Ordering across connections is
    /// not guaranteed and must not be assumed.
    async fn receive_arguments(&self, args: Vec<String>);
}
