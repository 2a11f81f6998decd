//! Bonded-peer enumeration.
//!
//! Reads the adapter's currently known device set without starting a scan.
//! On Linux this is the bonded/cached registry BlueZ maintains; ordering is
//! whatever the platform returns and is only stable for the duration of one
//! call.

use async_trait::async_trait;
use btleplug::api::{Central as _, Peripheral as _};
use tracing::debug;

use tether_types::{PeerAddress, PeerDevice};

use crate::ble;
use crate::error::Result;

/// Source of known peers. The platform adapter in production, a fixed list
/// in tests.
#[async_trait]
pub trait DeviceSource: Send + Sync {
    /// The peers currently known to the source.
    async fn known_peers(&self) -> Result<Vec<PeerDevice>>;
}

/// The platform Bluetooth adapter as a device source.
#[derive(Debug, Default)]
pub struct PlatformSource;

#[async_trait]
impl DeviceSource for PlatformSource {
    async fn known_peers(&self) -> Result<Vec<PeerDevice>> {
        let adapter = ble::get_adapter().await?;

        let mut peers = Vec::new();
        for peripheral in adapter.peripherals().await? {
            let Ok(Some(props)) = peripheral.properties().await else {
                continue;
            };
            let address = PeerAddress::from_bytes(props.address.into_inner());
            peers.push(PeerDevice::new(address, props.local_name));
        }

        debug!(count = peers.len(), "enumerated bonded peers");
        Ok(peers)
    }
}

/// Directory of bonded peers.
pub struct DeviceDirectory<S = PlatformSource> {
    source: S,
}

impl DeviceDirectory<PlatformSource> {
    /// Directory over the platform adapter.
    pub fn platform() -> Self {
        Self::new(PlatformSource)
    }
}

impl<S: DeviceSource> DeviceDirectory<S> {
    /// Directory over a custom source.
    pub fn new(source: S) -> Self {
        Self { source }
    }

    /// List the currently bonded/known peers.
    ///
    /// No side effects; ordering is implementation-defined. Fails with
    /// `AdapterUnavailable` when no adapter is present and
    /// `PermissionDenied` when the host refuses the connect capability.
    pub async fn list_bonded_devices(&self) -> Result<Vec<PeerDevice>> {
        self.source.known_peers().await
    }
}

/// List bonded peers via the platform adapter.
///
/// Convenience for callers that don't need to hold a directory.
pub async fn list_bonded_devices() -> Result<Vec<PeerDevice>> {
    DeviceDirectory::platform().list_bonded_devices().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockDeviceSource;

    #[tokio::test]
    async fn lists_peers_from_source() {
        let source = MockDeviceSource::with_peers(vec![
            PeerDevice::new("AA:BB:CC:DD:EE:01".parse().unwrap(), Some("Speaker".into())),
            PeerDevice::new("AA:BB:CC:DD:EE:02".parse().unwrap(), Some("Headset".into())),
        ]);
        let directory = DeviceDirectory::new(source);

        let peers = directory.list_bonded_devices().await.unwrap();
        assert_eq!(peers.len(), 2);
        assert_eq!(peers[0].display_name(), "Speaker");
        assert_eq!(peers[1].address.to_string(), "AA:BB:CC:DD:EE:02");
    }

    #[tokio::test]
    async fn empty_source_is_not_an_error() {
        let directory = DeviceDirectory::new(MockDeviceSource::default());
        let peers = directory.list_bonded_devices().await.unwrap();
        assert!(peers.is_empty());
    }

    #[tokio::test]
    async fn source_errors_propagate() {
        let source = MockDeviceSource::failing();
        let directory = DeviceDirectory::new(source);
        let err = directory.list_bonded_devices().await.unwrap_err();
        assert!(matches!(err, crate::Error::AdapterUnavailable));
    }
}
