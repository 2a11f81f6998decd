//! Error types for tether-core.
//!
//! Enumeration and validation errors are returned synchronously to the
//! caller. Connect-phase failures are additionally reported through the
//! session event stream, since the connection attempt itself runs on the
//! resident worker task. No error here is fatal to the process; every
//! failure path returns the session to `Idle` and allows a fresh selection.

use std::time::Duration;

use thiserror::Error;

use tether_types::{ParseAddressError, PeerAddress};

/// Errors that can occur while enumerating peers or managing a session.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// No Bluetooth adapter is present, or the adapter is powered off.
    #[error("Bluetooth adapter unavailable")]
    AdapterUnavailable,

    /// The host denied the Bluetooth connect/scan capability.
    #[error("Bluetooth permission denied by host")]
    PermissionDenied,

    /// The supplied device address is not a valid hardware identifier.
    #[error("invalid device address: {0}")]
    InvalidAddress(#[from] ParseAddressError),

    /// The resident session worker cannot be reached (it was shut down or
    /// never started).
    #[error("session service unavailable")]
    ServiceUnavailable,

    /// A connection attempt failed.
    #[error("connection failed: {reason}")]
    ConnectionFailed {
        /// The peer that failed to connect, when known.
        device: Option<PeerAddress>,
        /// The structured reason for the failure.
        reason: ConnectionFailureReason,
    },

    /// Operation attempted without an established link.
    #[error("not connected to device")]
    NotConnected,

    /// Operation timed out.
    #[error("operation '{operation}' timed out after {duration:?}")]
    Timeout {
        /// The operation that timed out.
        operation: String,
        /// The timeout duration.
        duration: Duration,
    },

    /// Operation was cancelled.
    #[error("operation cancelled")]
    Cancelled,

    /// Bluetooth stack error.
    #[error("Bluetooth error: {0}")]
    Bluetooth(btleplug::Error),

    /// I/O error (preferences file, sockets).
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Preferences file could not be parsed.
    #[error("invalid preferences file: {0}")]
    PrefsParse(#[from] toml::de::Error),

    /// Preferences could not be encoded.
    #[error("failed to encode preferences: {0}")]
    PrefsEncode(#[from] toml::ser::Error),

    /// Invalid configuration provided.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Structured reasons for connection failures.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new reasons
/// in future versions without breaking downstream code.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConnectionFailureReason {
    /// The peer is not in the adapter's bonded/known set.
    NotBonded,
    /// The peer rejected or did not answer the connection.
    Rejected,
    /// The connection attempt timed out.
    Timeout,
    /// The peer lacks the expected serial service.
    ServiceMissing,
    /// Underlying Bluetooth stack error.
    Ble(String),
    /// Other/unknown error.
    Other(String),
}

impl std::fmt::Display for ConnectionFailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotBonded => write!(f, "device is not bonded with this adapter"),
            Self::Rejected => write!(f, "connection rejected by device"),
            Self::Timeout => write!(f, "connection timed out"),
            Self::ServiceMissing => write!(f, "device does not expose the serial service"),
            Self::Ble(msg) => write!(f, "Bluetooth error: {}", msg),
            Self::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl Error {
    /// Create a timeout error with operation context.
    pub fn timeout(operation: impl Into<String>, duration: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            duration,
        }
    }

    /// Create a connection failure with structured reason.
    pub fn connection_failed(device: Option<PeerAddress>, reason: ConnectionFailureReason) -> Self {
        Self::ConnectionFailed { device, reason }
    }

    /// Create a configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }
}

impl From<btleplug::Error> for Error {
    fn from(err: btleplug::Error) -> Self {
        // The host's capability refusal surfaces as a distinct variant so the
        // caller can tell it apart from a flaky link.
        match err {
            btleplug::Error::PermissionDenied => Error::PermissionDenied,
            other => Error::Bluetooth(other),
        }
    }
}

/// Result type alias using tether-core's Error type.
pub type Result<T> = std::result::Result<T, Error>;
