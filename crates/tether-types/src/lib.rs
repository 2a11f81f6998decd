//! Platform-agnostic types for the Tether device-session manager.
//!
//! This crate provides the shared vocabulary used by `tether-core` and any
//! front end driving it: peer addresses, bonded-device descriptions, and the
//! observable session state.
//!
//! # Features
//!
//! - [`PeerAddress`]: a 6-byte Bluetooth device address with strict
//!   parse/format round-tripping
//! - [`PeerDevice`]: a bonded peer as reported by the platform adapter
//! - [`SessionPhase`] / [`SessionSnapshot`]: the externally visible state of
//!   a connection session
//!
//! # Example
//!
//! ```
//! use tether_types::{PeerAddress, SessionPhase};
//!
//! let addr: PeerAddress = "AA:BB:CC:DD:EE:01".parse().unwrap();
//! assert_eq!(addr.to_string(), "AA:BB:CC:DD:EE:01");
//! assert!(!SessionPhase::Idle.is_active());
//! ```

pub mod address;
pub mod error;
pub mod types;

pub use address::PeerAddress;
pub use error::ParseAddressError;
pub use types::{PeerDevice, SessionPhase, SessionSnapshot};
