//! Session lifecycle management.
//!
//! A [`SessionManager`] owns at most one background connection session to a
//! selected peer. Selections persist the peer address durably, then hand the
//! connection work to a resident worker task; the caller never blocks on the
//! connection itself. Outcomes arrive over the event stream.
//!
//! All state transitions run on the single worker task, which receives
//! commands over a channel. Serialization therefore holds by construction: a
//! start that supersedes an in-flight session fully tears the old link down
//! before the new attempt begins, so no two sessions are ever active at once.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, RwLock, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use tether_types::{PeerAddress, SessionPhase, SessionSnapshot};

use crate::error::{Error, Result};
use crate::events::{DisconnectReason, EventDispatcher, EventReceiver, SessionEvent};
use crate::framing::{ACK, FrameSplitter};
use crate::prefs::PrefsStore;
use crate::transport::{PeerLink, PeerTransport};

/// Configuration for the session manager.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Bound on a single connection attempt.
    pub connect_timeout: Duration,
    /// Event channel capacity.
    pub event_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(20),
            event_capacity: 100,
        }
    }
}

enum Command {
    Start(PeerAddress),
    Stop,
}

/// Manager for the background connection session.
///
/// Construct once per process and share via `Arc`. Requires a running tokio
/// runtime (the resident worker is spawned on it).
pub struct SessionManager {
    commands: mpsc::UnboundedSender<Command>,
    snapshot: Arc<RwLock<SessionSnapshot>>,
    events: EventDispatcher,
    prefs: PrefsStore,
    shutdown: CancellationToken,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl SessionManager {
    /// Create a manager with default configuration.
    pub fn new(transport: Arc<dyn PeerTransport>, prefs: PrefsStore) -> Self {
        Self::with_config(transport, prefs, SessionConfig::default())
    }

    /// Create a manager with full configuration.
    pub fn with_config(
        transport: Arc<dyn PeerTransport>,
        prefs: PrefsStore,
        config: SessionConfig,
    ) -> Self {
        let snapshot = Arc::new(RwLock::new(SessionSnapshot {
            phase: SessionPhase::Idle,
            // Restored at startup so callers can offer "reconnect to last".
            selected: prefs.last_device(),
        }));
        let events = EventDispatcher::new(config.event_capacity);
        let shutdown = CancellationToken::new();
        let (commands, receiver) = mpsc::unbounded_channel();

        let worker = Worker {
            transport,
            commands: receiver,
            snapshot: Arc::clone(&snapshot),
            events: events.clone(),
            config,
            shutdown: shutdown.clone(),
        };
        let handle = tokio::spawn(worker.run());

        Self {
            commands,
            snapshot,
            events,
            prefs,
            shutdown,
            worker: Mutex::new(Some(handle)),
        }
    }

    /// Select a peer by textual address: validate, persist as the last
    /// device, and start a session towards it.
    ///
    /// Fails with `InvalidAddress` before any state is touched when the
    /// input is not a hardware address.
    pub fn select_device(&self, input: &str) -> Result<()> {
        let address: PeerAddress = input.parse().map_err(Error::InvalidAddress)?;
        self.select(address)
    }

    /// Select an already-parsed peer address.
    pub fn select(&self, address: PeerAddress) -> Result<()> {
        self.prefs.set_last_device(address)?;
        self.start_session(address)
    }

    /// Ask the resident worker to establish a session to `address`.
    ///
    /// Fire-and-forget: enqueues the request and returns immediately. At
    /// most one session is active system-wide; this call supersedes any
    /// prior session, which is fully stopped before the new one may become
    /// active. Fails with `ServiceUnavailable` when the worker is gone.
    pub fn start_session(&self, address: PeerAddress) -> Result<()> {
        self.commands
            .send(Command::Start(address))
            .map_err(|_| Error::ServiceUnavailable)
    }

    /// Tear down any active session. Idempotent: succeeds as a no-op when
    /// nothing is active, and is safe in any phase including mid-connect.
    pub fn stop_session(&self) -> Result<()> {
        // A missing worker means nothing can be active, which is the
        // no-op success case.
        let _ = self.commands.send(Command::Stop);
        Ok(())
    }

    /// The persisted last-selected device, if any selection ever happened.
    pub fn last_selected_device(&self) -> Option<PeerAddress> {
        self.prefs.last_device()
    }

    /// Current observable session state.
    pub async fn snapshot(&self) -> SessionSnapshot {
        *self.snapshot.read().await
    }

    /// Current lifecycle phase.
    pub async fn phase(&self) -> SessionPhase {
        self.snapshot.read().await.phase
    }

    /// Subscribe to session events.
    pub fn subscribe(&self) -> EventReceiver {
        self.events.subscribe()
    }

    /// Stop the resident worker, tearing down any active session first.
    ///
    /// After shutdown, `start_session` fails with `ServiceUnavailable`.
    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        if let Some(handle) = self.worker.lock().await.take() {
            if let Err(e) = handle.await {
                warn!("session worker panicked during shutdown: {}", e);
            }
        }
    }
}

/// The resident task owning the session state machine.
struct Worker {
    transport: Arc<dyn PeerTransport>,
    commands: mpsc::UnboundedReceiver<Command>,
    snapshot: Arc<RwLock<SessionSnapshot>>,
    events: EventDispatcher,
    config: SessionConfig,
    shutdown: CancellationToken,
}

impl Worker {
    async fn run(mut self) {
        loop {
            let command = tokio::select! {
                _ = self.shutdown.cancelled() => break,
                cmd = self.commands.recv() => match cmd {
                    Some(cmd) => cmd,
                    None => break,
                },
            };

            let mut next = match command {
                // Stop while idle is the documented no-op.
                Command::Stop => None,
                Command::Start(address) => self.run_session(address).await,
            };
            // A superseding start begins only after the previous session's
            // teardown completed inside run_session.
            while let Some(address) = next {
                next = self.run_session(address).await;
            }
        }
        debug!("session worker exiting");
    }

    async fn set_phase(&self, phase: SessionPhase) {
        self.snapshot.write().await.phase = phase;
    }

    /// Drive one session from Starting to its end. Returns the address of a
    /// superseding start, if one arrived.
    async fn run_session(&mut self, address: PeerAddress) -> Option<PeerAddress> {
        {
            let mut snap = self.snapshot.write().await;
            snap.phase = SessionPhase::Starting;
            snap.selected = Some(address);
        }
        self.events.send(SessionEvent::Starting { device: address });
        info!(%address, "starting session");

        let connect = self.transport.connect(address, self.config.connect_timeout);
        tokio::pin!(connect);

        let mut link = tokio::select! {
            _ = self.shutdown.cancelled() => {
                self.set_phase(SessionPhase::Idle).await;
                return None;
            }
            cmd = self.commands.recv() => {
                // Dropping the connect future abandons the in-flight attempt.
                debug!(%address, "connection attempt cancelled");
                self.set_phase(SessionPhase::Idle).await;
                return match cmd {
                    Some(Command::Start(next)) => Some(next),
                    Some(Command::Stop) | None => None,
                };
            }
            result = &mut connect => match result {
                Ok(link) => link,
                Err(e) => {
                    warn!(%address, "connection failed: {}", e);
                    self.events.send(SessionEvent::ConnectFailed {
                        device: address,
                        reason: e.to_string(),
                    });
                    self.set_phase(SessionPhase::Idle).await;
                    return None;
                }
            }
        };

        self.set_phase(SessionPhase::Active).await;
        self.events.send(SessionEvent::Connected { device: address });
        info!(%address, "session active");

        let mut splitter = FrameSplitter::new();
        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    self.teardown(&mut link, address, DisconnectReason::Shutdown).await;
                    return None;
                }
                cmd = self.commands.recv() => match cmd {
                    Some(Command::Start(next)) => {
                        self.teardown(&mut link, address, DisconnectReason::Superseded).await;
                        return Some(next);
                    }
                    Some(Command::Stop) => {
                        self.teardown(&mut link, address, DisconnectReason::UserRequested).await;
                        return None;
                    }
                    None => {
                        self.teardown(&mut link, address, DisconnectReason::Shutdown).await;
                        return None;
                    }
                },
                chunk = link.recv() => match chunk {
                    Some(data) => {
                        if let Err(e) = link.send(ACK).await {
                            warn!(%address, "failed to acknowledge chunk: {}", e);
                        }
                        for frame in splitter.push(&data) {
                            if frame.alert {
                                self.events.send(SessionEvent::Alert {
                                    device: address,
                                    text: frame.text.clone(),
                                });
                            }
                            self.events.send(SessionEvent::Message {
                                device: address,
                                text: frame.text,
                            });
                        }
                    }
                    None => {
                        warn!(%address, "link lost");
                        self.teardown(&mut link, address, DisconnectReason::LinkLost).await;
                        return None;
                    }
                }
            }
        }
    }

    async fn teardown(
        &self,
        link: &mut Box<dyn PeerLink>,
        address: PeerAddress,
        reason: DisconnectReason,
    ) {
        self.set_phase(SessionPhase::Stopping).await;
        if let Err(e) = link.disconnect().await {
            warn!(%address, "error during teardown: {}", e);
        }
        self.set_phase(SessionPhase::Idle).await;
        info!(%address, ?reason, "session ended");
        self.events
            .send(SessionEvent::Disconnected { device: address, reason });
    }
}
