//! Core library for the Tether device-session manager.
//!
//! Tether keeps a persistent connection session to one previously bonded
//! Bluetooth peer, resident in a background task and decoupled from whatever
//! front end drives the selection. The last selected peer is remembered
//! across restarts.
//!
//! # Features
//!
//! - **Bonded-peer directory**: enumerate the adapter's known peers without
//!   scanning
//! - **Session manager**: at most one active session system-wide; a new
//!   selection supersedes the old session before it may become active
//! - **Event stream**: connection outcomes, messages, and alerts over a
//!   broadcast channel
//! - **Durable selection**: the last device survives process restarts
//! - **Opt-in supervision**: callers that want auto-reconnect wrap the
//!   manager in a [`Supervisor`]
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use tether_core::{BleTransport, PrefsStore, SessionManager, directory};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let peers = directory::list_bonded_devices().await?;
//!     println!("{} bonded peers", peers.len());
//!
//!     let manager = SessionManager::new(
//!         Arc::new(BleTransport::new()),
//!         PrefsStore::open_default(),
//!     );
//!     let mut events = manager.subscribe();
//!
//!     manager.select(peers[0].address)?;
//!     while let Ok(event) = events.recv().await {
//!         println!("{:?}", event);
//!     }
//!     Ok(())
//! }
//! ```

pub mod ble;
pub mod directory;
pub mod error;
pub mod events;
pub mod framing;
pub mod mock;
pub mod prefs;
pub mod session;
pub mod supervisor;
pub mod transport;
pub mod uuids;

// Re-export types from tether-types for convenience
pub use tether_types::{ParseAddressError, PeerAddress, PeerDevice, SessionPhase, SessionSnapshot};

// Core exports
pub use ble::BleTransport;
pub use directory::{DeviceDirectory, DeviceSource, PlatformSource, list_bonded_devices};
pub use error::{ConnectionFailureReason, Error, Result};
pub use events::{DisconnectReason, EventReceiver, EventSender, SessionEvent};
pub use framing::{Frame, FrameSplitter};
pub use mock::{MockDeviceSource, MockTransport};
pub use prefs::{Preferences, PrefsStore};
pub use session::{SessionConfig, SessionManager};
pub use supervisor::{ReconnectOptions, Supervisor};
pub use transport::{PeerLink, PeerTransport};
