//! Caller-side reconnection policy.
//!
//! The session core never retries on its own: a failed or dropped session
//! returns to idle and waits for a fresh selection. Callers that want a
//! sticky session opt into a [`Supervisor`], which watches the event stream
//! and re-issues `start_session` with a bounded policy.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use tether_types::PeerAddress;

use crate::error::{Error, Result};
use crate::events::{DisconnectReason, SessionEvent};
use crate::session::SessionManager;

/// Options for automatic reconnection.
#[derive(Debug, Clone)]
pub struct ReconnectOptions {
    /// Maximum number of reconnection attempts (None = unlimited).
    pub max_attempts: Option<u32>,
    /// Delay before the first reconnection attempt.
    pub initial_delay: Duration,
    /// Maximum delay between attempts.
    pub max_delay: Duration,
    /// Multiplier applied to the delay after each attempt (1.0 = fixed).
    pub backoff_multiplier: f64,
}

impl Default for ReconnectOptions {
    fn default() -> Self {
        // Fixed five-second cadence, giving up after roughly a minute.
        Self {
            max_attempts: Some(12),
            initial_delay: Duration::from_secs(5),
            max_delay: Duration::from_secs(60),
            backoff_multiplier: 1.0,
        }
    }
}

impl ReconnectOptions {
    /// Create new reconnect options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Options with unlimited retry attempts.
    pub fn unlimited() -> Self {
        Self {
            max_attempts: None,
            ..Default::default()
        }
    }

    /// Set the maximum number of reconnection attempts.
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = Some(attempts);
        self
    }

    /// Set the delay before the first reconnection attempt.
    pub fn initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Set the maximum delay between attempts.
    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Set the backoff multiplier.
    pub fn backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    /// Calculate the delay for a given attempt number (0-based).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let delay_ms =
            self.initial_delay.as_millis() as f64 * self.backoff_multiplier.powi(attempt as i32);
        Duration::from_millis(delay_ms as u64).min(self.max_delay)
    }

    /// Validate the options.
    pub fn validate(&self) -> Result<()> {
        if self.backoff_multiplier < 1.0 {
            return Err(Error::invalid_config("backoff_multiplier must be >= 1.0"));
        }
        if self.initial_delay.is_zero() {
            return Err(Error::invalid_config("initial_delay must be > 0"));
        }
        if self.max_delay < self.initial_delay {
            return Err(Error::invalid_config("max_delay must be >= initial_delay"));
        }
        Ok(())
    }
}

/// Keeps a session to one peer alive on behalf of a caller.
///
/// Stands down as soon as the user acts: an explicit stop or a selection of
/// a different peer ends supervision, so it never fights a newer decision.
pub struct Supervisor {
    manager: Arc<SessionManager>,
    options: ReconnectOptions,
}

impl Supervisor {
    /// Create a supervisor. Fails with `InvalidConfig` on bad options.
    pub fn new(manager: Arc<SessionManager>, options: ReconnectOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self { manager, options })
    }

    /// Start supervising a session to `address` until `cancel` fires or the
    /// policy gives up.
    pub fn spawn(self, address: PeerAddress, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move { self.run(address, cancel).await })
    }

    async fn run(self, address: PeerAddress, cancel: CancellationToken) {
        // Subscribe before starting so no outcome can slip past.
        let mut events = self.manager.subscribe();
        // A supervised start is still a selection: it persists the device.
        if self.manager.select(address).is_err() {
            return;
        }

        let mut attempts: u32 = 0;
        loop {
            let event = tokio::select! {
                _ = cancel.cancelled() => {
                    let _ = self.manager.stop_session();
                    return;
                }
                event = events.recv() => match event {
                    Ok(event) => event,
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "supervisor lagged behind the event stream");
                        continue;
                    }
                    Err(RecvError::Closed) => return,
                },
            };

            match event {
                SessionEvent::Connected { device } if device == address => {
                    attempts = 0;
                }
                SessionEvent::ConnectFailed { device, .. } if device == address => {
                    if !self.retry(&mut attempts, address, &cancel).await {
                        return;
                    }
                }
                SessionEvent::Disconnected {
                    device,
                    reason: DisconnectReason::LinkLost,
                } if device == address => {
                    if !self.retry(&mut attempts, address, &cancel).await {
                        return;
                    }
                }
                // The user stopped the session or picked another peer.
                SessionEvent::Disconnected {
                    reason: DisconnectReason::UserRequested | DisconnectReason::Superseded,
                    ..
                } => return,
                SessionEvent::Starting { device } if device != address => return,
                _ => {}
            }
        }
    }

    /// Wait out the policy delay and re-issue the start. Returns false when
    /// supervision should end.
    async fn retry(
        &self,
        attempts: &mut u32,
        address: PeerAddress,
        cancel: &CancellationToken,
    ) -> bool {
        if let Some(max) = self.options.max_attempts
            && *attempts >= max
        {
            warn!(%address, attempts = *attempts, "giving up on reconnection");
            return false;
        }

        let delay = self.options.delay_for_attempt(*attempts);
        *attempts += 1;
        info!(%address, attempt = *attempts, ?delay, "reconnecting");

        tokio::select! {
            _ = cancel.cancelled() => return false,
            _ = sleep(delay) => {}
        }

        self.manager.start_session(address).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockTransport;
    use crate::prefs::PrefsStore;
    use tokio::time::timeout;

    fn addr(s: &str) -> PeerAddress {
        s.parse().unwrap()
    }

    fn fast_options() -> ReconnectOptions {
        ReconnectOptions::new()
            .initial_delay(Duration::from_millis(10))
            .max_delay(Duration::from_millis(50))
    }

    fn new_manager() -> (tempfile::TempDir, MockTransport, Arc<SessionManager>) {
        let dir = tempfile::tempdir().unwrap();
        let prefs = PrefsStore::at(dir.path().join("config.toml"));
        let transport = MockTransport::new();
        let manager = Arc::new(SessionManager::new(Arc::new(transport.clone()), prefs));
        (dir, transport, manager)
    }

    async fn wait_connected(events: &mut crate::events::EventReceiver, address: PeerAddress) {
        timeout(Duration::from_secs(2), async {
            loop {
                if let Ok(SessionEvent::Connected { device }) = events.recv().await
                    && device == address
                {
                    return;
                }
            }
        })
        .await
        .expect("timed out waiting for connection");
    }

    #[test]
    fn validation_rejects_bad_options() {
        let opts = ReconnectOptions::new().backoff_multiplier(0.5);
        assert!(opts.validate().is_err());

        let opts = ReconnectOptions::new().initial_delay(Duration::ZERO);
        assert!(opts.validate().is_err());

        let opts = ReconnectOptions::new()
            .initial_delay(Duration::from_secs(10))
            .max_delay(Duration::from_secs(1));
        assert!(opts.validate().is_err());
    }

    #[test]
    fn fixed_delay_by_default_backoff_when_asked() {
        let opts = ReconnectOptions::default();
        assert_eq!(opts.delay_for_attempt(0), Duration::from_secs(5));
        assert_eq!(opts.delay_for_attempt(5), Duration::from_secs(5));

        let opts = ReconnectOptions::new().backoff_multiplier(2.0);
        assert_eq!(opts.delay_for_attempt(0), Duration::from_secs(5));
        assert_eq!(opts.delay_for_attempt(1), Duration::from_secs(10));
        // Capped at max_delay.
        assert_eq!(opts.delay_for_attempt(10), Duration::from_secs(60));
    }

    #[tokio::test]
    async fn reconnects_after_link_loss() {
        let (_dir, transport, manager) = new_manager();
        let mut events = manager.subscribe();
        let a = addr("AA:BB:CC:DD:EE:01");

        let cancel = CancellationToken::new();
        let supervisor = Supervisor::new(Arc::clone(&manager), fast_options()).unwrap();
        let handle = supervisor.spawn(a, cancel.clone());

        wait_connected(&mut events, a).await;
        transport.drop_link();
        wait_connected(&mut events, a).await;
        assert_eq!(transport.connect_count(), 2);

        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let (_dir, transport, manager) = new_manager();
        transport.fail_connects(10);
        let a = addr("AA:BB:CC:DD:EE:02");

        let options = fast_options().max_attempts(2);
        let supervisor = Supervisor::new(Arc::clone(&manager), options).unwrap();
        let handle = supervisor.spawn(a, CancellationToken::new());

        timeout(Duration::from_secs(2), handle)
            .await
            .expect("supervisor did not give up")
            .unwrap();

        assert_eq!(transport.connect_count(), 0);
        assert_eq!(manager.phase().await, tether_types::SessionPhase::Idle);
    }

    #[tokio::test]
    async fn stands_down_when_user_selects_another_peer() {
        let (_dir, _transport, manager) = new_manager();
        let mut events = manager.subscribe();
        let a1 = addr("AA:BB:CC:DD:EE:01");
        let a2 = addr("AA:BB:CC:DD:EE:02");

        let supervisor = Supervisor::new(Arc::clone(&manager), fast_options()).unwrap();
        let handle = supervisor.spawn(a1, CancellationToken::new());
        wait_connected(&mut events, a1).await;

        manager.select(a2).unwrap();
        timeout(Duration::from_secs(2), handle)
            .await
            .expect("supervisor did not stand down")
            .unwrap();

        wait_connected(&mut events, a2).await;
        assert_eq!(manager.snapshot().await.selected, Some(a2));
    }
}
