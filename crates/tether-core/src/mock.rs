//! Mock transport and device source for testing.
//!
//! Lets the session state machine run without BLE hardware.
//!
//! # Features
//!
//! - **Failure injection**: fail the next N connection attempts
//! - **Latency simulation**: artificial connect delay for cancellation tests
//! - **Scripted payload**: chunks delivered on the next link, or fed live
//! - **Supersession accounting**: tracks how many links were ever open at once

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::mpsc;

use tether_types::{PeerAddress, PeerDevice};

use crate::directory::DeviceSource;
use crate::error::{ConnectionFailureReason, Error, Result};
use crate::transport::{PeerLink, PeerTransport};

/// Generate a random peer address for tests.
pub fn random_address() -> PeerAddress {
    PeerAddress::from_bytes(rand::random())
}

/// A mock transport implementing [`PeerTransport`].
///
/// Clone handles share state, so a test can keep one while the session
/// manager owns another.
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    shared: Arc<MockShared>,
}

#[derive(Debug, Default)]
struct MockShared {
    connect_latency_ms: AtomicU64,
    remaining_failures: AtomicU32,
    connects: AtomicU32,
    active: AtomicUsize,
    max_active: AtomicUsize,
    close_after_script: AtomicBool,
    script: Mutex<Vec<Bytes>>,
    current_tx: Mutex<Option<mpsc::UnboundedSender<Bytes>>>,
    sent: Mutex<Vec<Vec<u8>>>,
}

impl MockTransport {
    /// Create a mock transport that connects instantly and succeeds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every connection attempt by `latency`.
    pub fn set_connect_latency(&self, latency: Duration) {
        self.shared
            .connect_latency_ms
            .store(latency.as_millis() as u64, Ordering::Relaxed);
    }

    /// Fail the next `n` connection attempts.
    pub fn fail_connects(&self, n: u32) {
        self.shared.remaining_failures.store(n, Ordering::Relaxed);
    }

    /// Payload chunks delivered as soon as the next link is established.
    pub fn script(&self, chunks: &[&[u8]]) {
        let mut script = self.shared.script.lock().unwrap();
        *script = chunks.iter().map(|c| Bytes::copy_from_slice(c)).collect();
    }

    /// When set, the link closes by itself once the script has been
    /// delivered (simulates the peer dropping the connection).
    pub fn close_after_script(&self, close: bool) {
        self.shared
            .close_after_script
            .store(close, Ordering::Relaxed);
    }

    /// Feed a chunk to the currently open link.
    pub fn feed(&self, chunk: &[u8]) {
        if let Some(tx) = self.shared.current_tx.lock().unwrap().as_ref() {
            let _ = tx.send(Bytes::copy_from_slice(chunk));
        }
    }

    /// Drop the currently open link from the peer side.
    pub fn drop_link(&self) {
        self.shared.current_tx.lock().unwrap().take();
    }

    /// Bytes the host has written over any link.
    pub fn sent(&self) -> Vec<Vec<u8>> {
        self.shared.sent.lock().unwrap().clone()
    }

    /// Total successful connections so far.
    pub fn connect_count(&self) -> u32 {
        self.shared.connects.load(Ordering::Relaxed)
    }

    /// Links open right now.
    pub fn active_links(&self) -> usize {
        self.shared.active.load(Ordering::Relaxed)
    }

    /// The most links ever open at the same time.
    pub fn max_concurrent_links(&self) -> usize {
        self.shared.max_active.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl PeerTransport for MockTransport {
    async fn connect(&self, address: PeerAddress, _timeout: Duration) -> Result<Box<dyn PeerLink>> {
        let latency = self.shared.connect_latency_ms.load(Ordering::Relaxed);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }

        if self.shared.remaining_failures.load(Ordering::Relaxed) > 0 {
            self.shared.remaining_failures.fetch_sub(1, Ordering::Relaxed);
            return Err(Error::connection_failed(
                Some(address),
                ConnectionFailureReason::Rejected,
            ));
        }

        self.shared.connects.fetch_add(1, Ordering::Relaxed);
        let active = self.shared.active.fetch_add(1, Ordering::Relaxed) + 1;
        self.shared.max_active.fetch_max(active, Ordering::Relaxed);

        let (tx, rx) = mpsc::unbounded_channel();
        for chunk in self.shared.script.lock().unwrap().drain(..) {
            let _ = tx.send(chunk);
        }

        if self.shared.close_after_script.load(Ordering::Relaxed) {
            // Sender dropped: recv drains the script, then reports link loss.
            *self.shared.current_tx.lock().unwrap() = None;
        } else {
            *self.shared.current_tx.lock().unwrap() = Some(tx);
        }

        Ok(Box::new(MockLink {
            shared: Arc::clone(&self.shared),
            rx,
            open: true,
        }))
    }
}

/// A link handed out by [`MockTransport`].
struct MockLink {
    shared: Arc<MockShared>,
    rx: mpsc::UnboundedReceiver<Bytes>,
    open: bool,
}

impl MockLink {
    fn close(&mut self) {
        if self.open {
            self.open = false;
            self.shared.active.fetch_sub(1, Ordering::Relaxed);
            self.shared.current_tx.lock().unwrap().take();
        }
    }
}

#[async_trait]
impl PeerLink for MockLink {
    async fn recv(&mut self) -> Option<Bytes> {
        self.rx.recv().await
    }

    async fn send(&mut self, data: &[u8]) -> Result<()> {
        self.shared.sent.lock().unwrap().push(data.to_vec());
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<()> {
        self.close();
        Ok(())
    }
}

impl Drop for MockLink {
    fn drop(&mut self) {
        self.close();
    }
}

/// A fixed-list device source for directory tests.
#[derive(Debug, Clone, Default)]
pub struct MockDeviceSource {
    peers: Vec<PeerDevice>,
    fail: bool,
}

impl MockDeviceSource {
    /// Source reporting exactly `peers`.
    pub fn with_peers(peers: Vec<PeerDevice>) -> Self {
        Self { peers, fail: false }
    }

    /// Source that fails with `AdapterUnavailable`.
    pub fn failing() -> Self {
        Self {
            peers: Vec::new(),
            fail: true,
        }
    }
}

#[async_trait]
impl DeviceSource for MockDeviceSource {
    async fn known_peers(&self) -> Result<Vec<PeerDevice>> {
        if self.fail {
            return Err(Error::AdapterUnavailable);
        }
        Ok(self.peers.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn scripted_chunks_arrive_then_link_stays_open() {
        let transport = MockTransport::new();
        transport.script(&[b"one", b"two"]);

        let mut link = transport
            .connect(random_address(), Duration::from_secs(1))
            .await
            .unwrap();

        assert_eq!(link.recv().await.unwrap().as_ref(), b"one");
        assert_eq!(link.recv().await.unwrap().as_ref(), b"two");

        transport.feed(b"three");
        assert_eq!(link.recv().await.unwrap().as_ref(), b"three");

        link.disconnect().await.unwrap();
        assert_eq!(transport.active_links(), 0);
    }

    #[tokio::test]
    async fn failure_injection_counts_down() {
        let transport = MockTransport::new();
        transport.fail_connects(1);

        let addr = random_address();
        let err = transport
            .connect(addr, Duration::from_secs(1))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, Error::ConnectionFailed { .. }));

        assert!(transport.connect(addr, Duration::from_secs(1)).await.is_ok());
    }

    #[tokio::test]
    async fn dropped_link_reports_loss() {
        let transport = MockTransport::new();
        let mut link = transport
            .connect(random_address(), Duration::from_secs(1))
            .await
            .unwrap();

        transport.drop_link();
        assert!(link.recv().await.is_none());
    }
}
