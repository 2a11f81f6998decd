//! btleplug-backed transport.
//!
//! Links to peers over the BLE serial service: inbound payload arrives as
//! notifications on the TX characteristic, acknowledgements are written to
//! the RX characteristic. Peers must already be bonded/known to the adapter;
//! this module never scans.

use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use btleplug::api::{Central as _, Characteristic, Manager as _, Peripheral as _, WriteType};
use btleplug::platform::{Adapter, Manager, Peripheral};
use bytes::Bytes;
use futures::{Stream, StreamExt};
use tokio::time::timeout;
use tracing::{debug, warn};

use tether_types::PeerAddress;

use crate::error::{ConnectionFailureReason, Error, Result};
use crate::transport::{PeerLink, PeerTransport};
use crate::uuids::{SERIAL_RX, SERIAL_TX};

/// Get the first available Bluetooth adapter.
pub(crate) async fn get_adapter() -> Result<Adapter> {
    let manager = Manager::new().await?;
    let adapters = manager.adapters().await?;

    adapters.into_iter().next().ok_or(Error::AdapterUnavailable)
}

/// Find a peer in the adapter's known set by hardware address.
pub(crate) async fn find_known_peripheral(
    adapter: &Adapter,
    address: PeerAddress,
) -> Result<Option<Peripheral>> {
    for peripheral in adapter.peripherals().await? {
        if let Ok(Some(props)) = peripheral.properties().await
            && props.address.into_inner() == *address.as_bytes()
        {
            return Ok(Some(peripheral));
        }
    }
    Ok(None)
}

/// Transport over the platform BLE stack.
#[derive(Debug, Default)]
pub struct BleTransport;

impl BleTransport {
    /// Create a transport using the first available adapter.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PeerTransport for BleTransport {
    async fn connect(
        &self,
        address: PeerAddress,
        connect_timeout: Duration,
    ) -> Result<Box<dyn PeerLink>> {
        let adapter = get_adapter().await?;

        let peripheral = find_known_peripheral(&adapter, address)
            .await?
            .ok_or_else(|| {
                Error::connection_failed(Some(address), ConnectionFailureReason::NotBonded)
            })?;

        debug!(%address, "connecting");
        match timeout(connect_timeout, peripheral.connect()).await {
            Ok(Ok(())) => {}
            Ok(Err(btleplug::Error::PermissionDenied)) => return Err(Error::PermissionDenied),
            Ok(Err(e)) => {
                return Err(Error::connection_failed(
                    Some(address),
                    ConnectionFailureReason::Ble(e.to_string()),
                ));
            }
            Err(_) => {
                return Err(Error::connection_failed(
                    Some(address),
                    ConnectionFailureReason::Timeout,
                ));
            }
        }

        peripheral.discover_services().await?;

        let chars = peripheral.characteristics();
        let tx = chars.iter().find(|c| c.uuid == SERIAL_TX).cloned();
        let rx = chars.iter().find(|c| c.uuid == SERIAL_RX).cloned();
        let (tx, rx) = match (tx, rx) {
            (Some(tx), Some(rx)) => (tx, rx),
            _ => {
                if let Err(e) = peripheral.disconnect().await {
                    warn!(%address, "disconnect after failed service lookup: {}", e);
                }
                return Err(Error::connection_failed(
                    Some(address),
                    ConnectionFailureReason::ServiceMissing,
                ));
            }
        };

        peripheral.subscribe(&tx).await?;
        let notifications = peripheral.notifications().await?;

        debug!(%address, "link established");
        Ok(Box::new(BleLink {
            peripheral,
            rx,
            notifications,
            disconnected: false,
        }))
    }
}

/// A live BLE link.
struct BleLink {
    peripheral: Peripheral,
    rx: Characteristic,
    notifications: Pin<Box<dyn Stream<Item = btleplug::api::ValueNotification> + Send>>,
    disconnected: bool,
}

#[async_trait]
impl PeerLink for BleLink {
    async fn recv(&mut self) -> Option<Bytes> {
        // The notification stream carries every subscribed characteristic;
        // only serial TX is payload.
        while let Some(notification) = self.notifications.next().await {
            if notification.uuid == SERIAL_TX {
                return Some(Bytes::from(notification.value));
            }
        }
        None
    }

    async fn send(&mut self, data: &[u8]) -> Result<()> {
        self.peripheral
            .write(&self.rx, data, WriteType::WithoutResponse)
            .await?;
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<()> {
        if self.disconnected {
            return Ok(());
        }
        self.disconnected = true;
        self.peripheral.disconnect().await?;
        Ok(())
    }
}

impl Drop for BleLink {
    fn drop(&mut self) {
        if !self.disconnected {
            warn!("BLE link dropped without disconnect; peer may hold the connection open");
        }
    }
}
