//! Single-instance coordination for the CiteKit desktop application.
//!
//! When a second CiteKit process starts, it must not open a second window:
//! it probes a loopback port for the running (primary) instance, forwards
//! its command-line arguments over a small framed protocol, and exits. If no
//! primary answers, the process binds the port itself and becomes the
//! primary. This crate is that channel — wire format, listener lifecycle,
//! and client calls — and nothing else: no GUI, no bibliography parsing, no
//! preference storage.
//!
//! # Architecture
//!
//! - [`protocol`]: wire framing and the [`Message`] sum type
//! - [`handler`]: the [`MessageHandler`] seam the application implements
//! - [`server`]: listener lifecycle owned by the primary instance
//! - [`client`]: probe and argument forwarding for secondary invocations
//! - [`coordinator`]: the delegate-or-become-primary policy
//!
//! # Example
//!
//! ```rust,ignore
//! use citekit_remote::{start_as_primary, try_delegate_to_running_instance, RemoteConfig};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> citekit_remote::Result<()> {
//!     let args: Vec<String> = std::env::args().skip(1).collect();
//!
//!     if try_delegate_to_running_instance(RemoteConfig::DEFAULT_PORT, &args).await {
//!         // The running instance opens the files; nothing left to do here.
//!         return Ok(());
//!     }
//!
//!     let handle = start_as_primary(Arc::new(AppHandler::new()), RemoteConfig::DEFAULT_PORT).await?;
//!     // ... run the GUI; keep `handle` alive until shutdown ...
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod handler;
pub mod protocol;
pub mod server;

// Re-export commonly used types
pub use client::RemoteClient;
pub use config::{ProtocolConfig, RemoteConfig};
pub use coordinator::{start_as_primary, try_delegate_to_running_instance};
pub use error::{RemoteError, Result};
pub use handler::MessageHandler;
pub use protocol::Message;
pub use server::{RemoteServer, ServerHandle};
