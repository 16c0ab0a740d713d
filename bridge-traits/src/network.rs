//! Network Monitoring Abstraction
//!
//! Provides connectivity information so the core can trigger stall recovery
//! when a connection comes back instead of waiting for the user.

use crate::error::Result;

/// Network connection status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkStatus {
    /// Connected to a network
    Connected,
    /// Not connected to any network
    Disconnected,
    /// Connection status unknown or indeterminate
    Indeterminate,
}

/// Network monitor trait
///
/// # Platform Support
///
/// - **Desktop**: System network APIs (NetworkManager, SystemConfiguration,
///   Windows Network List Manager)
/// - **iOS**: Network framework, Reachability
/// - **Android**: ConnectivityManager
#[async_trait::async_trait]
pub trait NetworkMonitor: Send + Sync {
    /// Get current network status
    async fn status(&self) -> Result<NetworkStatus>;

    /// Check if currently connected to any network
    async fn is_connected(&self) -> bool {
        matches!(self.status().await, Ok(NetworkStatus::Connected))
    }

    /// Subscribe to network status changes
    ///
    /// Implementations should emit an update whenever connectivity changes.
    async fn subscribe_changes(&self) -> Result<Box<dyn NetworkChangeStream>>;
}

/// Stream of network status changes
#[async_trait::async_trait]
pub trait NetworkChangeStream: Send {
    /// Get the next status update
    ///
    /// Returns `None` when the stream is closed.
    async fn next(&mut self) -> Option<NetworkStatus>;
}
