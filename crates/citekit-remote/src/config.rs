//! Centralized configuration for the single-instance channel.
//!
//! Wire limits and socket timeouts, grouped into const holders the same way
//! the rest of CiteKit groups its tunables.

use std::time::Duration;

/// Wire protocol limits.
pub struct ProtocolConfig;

impl ProtocolConfig {
    /// Upper bound on one payload line, in bytes.
    ///
    /// Argument lists are command lines, not bulk data; anything larger is a
    /// corrupted or hostile frame.
    pub const MAX_PAYLOAD_BYTES: u64 = 1024 * 1024; // 1 MiB
}

/// Socket configuration shared by server and client.
pub struct RemoteConfig;

impl RemoteConfig {
    /// Conventional port for the primary-instance listener.
    pub const DEFAULT_PORT: u16 = 6050;

    /// Bound on one client connect attempt.
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(2);

    /// Bound on one full client exchange after the connect.
    pub const EXCHANGE_TIMEOUT: Duration = Duration::from_secs(5);

    /// Bound on the server-side read of a single frame.
    pub const READ_TIMEOUT: Duration = Duration::from_secs(5);

    /// Cap on concurrently handled inbound connections.
    pub const MAX_CONNECTIONS: usize = 32;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeouts_are_reasonable() {
        // A ping decides "is a primary alive" at startup; it must not hang.
        assert!(RemoteConfig::CONNECT_TIMEOUT <= Duration::from_secs(5));
        assert!(RemoteConfig::EXCHANGE_TIMEOUT > Duration::ZERO);
        assert!(RemoteConfig::READ_TIMEOUT > Duration::ZERO);
    }

    #[test]
    fn test_payload_cap_fits_command_lines() {
        assert!(ProtocolConfig::MAX_PAYLOAD_BYTES >= 64 * 1024);
    }
}
