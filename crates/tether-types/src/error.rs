//! Error types for address parsing in tether-types.

use thiserror::Error;

/// Errors that can occur when parsing a peer device address.
///
/// This error type is platform-agnostic and does not include
/// Bluetooth-stack errors (those belong in tether-core).
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ParseAddressError {
    /// The input was empty.
    #[error("empty device address")]
    Empty,

    /// The input did not have six colon-separated two-digit groups.
    #[error("device address must be six colon-separated octets (like AA:BB:CC:DD:EE:FF)")]
    Malformed,

    /// A group was not a valid hexadecimal octet.
    #[error("invalid octet '{0}' in device address")]
    InvalidOctet(String),
}
