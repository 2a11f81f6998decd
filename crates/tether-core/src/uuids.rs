//! Bluetooth UUIDs for the peer serial service.
//!
//! Peers expose a Nordic-UART-style serial service: one characteristic the
//! peer notifies inbound payload on, and one the host writes acknowledgements
//! to. The classic SPP UUID is listed as well since bonded peers advertise it
//! in their service records.

use uuid::{Uuid, uuid};

// --- Serial service (Nordic UART layout) ---

/// Serial service UUID.
pub const SERIAL_SERVICE: Uuid = uuid!("6e400001-b5a3-f393-e0a9-e50e24dcca9e");

/// Peer-to-host characteristic: the peer notifies payload chunks here.
pub const SERIAL_TX: Uuid = uuid!("6e400003-b5a3-f393-e0a9-e50e24dcca9e");

/// Host-to-peer characteristic: acknowledgements are written here.
pub const SERIAL_RX: Uuid = uuid!("6e400002-b5a3-f393-e0a9-e50e24dcca9e");

// --- Standard service records ---

/// Classic Serial Port Profile UUID, present in bonded peers' service lists.
pub const SPP_SERVICE: Uuid = uuid!("00001101-0000-1000-8000-00805f9b34fb");

/// Generic Access Profile (GAP) service.
pub const GAP_SERVICE: Uuid = uuid!("00001800-0000-1000-8000-00805f9b34fb");
