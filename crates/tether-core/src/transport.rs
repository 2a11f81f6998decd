//! Trait abstractions over the platform Bluetooth stack.
//!
//! The session manager talks to peers exclusively through [`PeerTransport`]
//! and [`PeerLink`], so the state machine can be exercised against the mock
//! transport in tests and against btleplug ([`crate::ble::BleTransport`]) in
//! production. Pairing, bonding, and GATT internals stay behind this seam;
//! they belong to the platform stack.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use tether_types::PeerAddress;

use crate::error::Result;

/// Connection establishment towards bonded peers.
#[async_trait]
pub trait PeerTransport: Send + Sync {
    /// Establish a link to `address`, bounded by `timeout`.
    ///
    /// Fails with `ConnectionFailed` when the peer is unknown, rejects the
    /// attempt, or the attempt times out. The future must be cancel-safe:
    /// dropping it abandons the attempt.
    async fn connect(&self, address: PeerAddress, timeout: Duration) -> Result<Box<dyn PeerLink>>;
}

/// An established, bidirectional link to a peer.
#[async_trait]
pub trait PeerLink: Send {
    /// Receive the next inbound payload chunk.
    ///
    /// Returns `None` when the link has dropped; chunk boundaries carry no
    /// meaning (framing happens above this layer).
    async fn recv(&mut self) -> Option<Bytes>;

    /// Write bytes to the peer (acknowledgements).
    async fn send(&mut self, data: &[u8]) -> Result<()>;

    /// Tear the link down. Idempotent.
    async fn disconnect(&mut self) -> Result<()>;
}
