//! Core types for bonded peers and session state.

use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::address::PeerAddress;

/// A bonded peer device as reported by the platform adapter.
///
/// Peers are immutable once enumerated; they are sourced entirely from the
/// platform's bonded-device registry and are never created or destroyed by
/// this system.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PeerDevice {
    /// The device's hardware address.
    pub address: PeerAddress,
    /// Human-readable device name, if the adapter knows one.
    pub name: Option<String>,
}

impl PeerDevice {
    /// Create a peer device description.
    pub fn new(address: PeerAddress, name: Option<String>) -> Self {
        Self { address, name }
    }

    /// The name to show a user: the device name, or the address when the
    /// adapter did not report one.
    pub fn display_name(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => self.address.to_string(),
        }
    }
}

impl fmt::Display for PeerDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{} ({})", name, self.address),
            None => write!(f, "{}", self.address),
        }
    }
}

/// Lifecycle phase of a connection session.
///
/// Transitions are serialized by the session worker: Idle -> Starting on a
/// start request, Starting -> Active on connect success, Starting -> Idle on
/// connect failure, Active -> Stopping on a stop or superseding start,
/// Stopping -> Idle on teardown completion. There is no terminal phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum SessionPhase {
    /// No session; ready for a selection.
    #[default]
    Idle,
    /// A connection attempt is in flight.
    Starting,
    /// The session is connected and resident in the background.
    Active,
    /// Teardown is in progress.
    Stopping,
}

impl SessionPhase {
    /// Whether the session is currently connected.
    pub fn is_active(self) -> bool {
        self == SessionPhase::Active
    }
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionPhase::Idle => "idle",
            SessionPhase::Starting => "starting",
            SessionPhase::Active => "active",
            SessionPhase::Stopping => "stopping",
        };
        f.write_str(s)
    }
}

/// Observable state of the session manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SessionSnapshot {
    /// Current lifecycle phase.
    pub phase: SessionPhase,
    /// The peer the current (or most recent) session targets.
    pub selected: Option<PeerAddress>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_name_falls_back_to_address() {
        let addr: PeerAddress = "AA:BB:CC:DD:EE:02".parse().unwrap();
        let named = PeerDevice::new(addr, Some("Headset".to_string()));
        assert_eq!(named.display_name(), "Headset");
        assert_eq!(named.to_string(), "Headset (AA:BB:CC:DD:EE:02)");

        let unnamed = PeerDevice::new(addr, None);
        assert_eq!(unnamed.display_name(), "AA:BB:CC:DD:EE:02");
    }

    #[test]
    fn phase_activity() {
        assert!(SessionPhase::Active.is_active());
        assert!(!SessionPhase::Idle.is_active());
        assert!(!SessionPhase::Starting.is_active());
        assert!(!SessionPhase::Stopping.is_active());
    }

    #[test]
    fn snapshot_defaults_to_idle() {
        let snap = SessionSnapshot::default();
        assert_eq!(snap.phase, SessionPhase::Idle);
        assert!(snap.selected.is_none());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn phase_serializes_snake_case() {
        let json = serde_json::to_string(&SessionPhase::Starting).unwrap();
        assert_eq!(json, "\"starting\"");
    }
}
