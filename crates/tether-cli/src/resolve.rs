//! Device argument resolution.
//!
//! Precedence: an explicit address beats an index, an index beats the
//! remembered device. Indexes resolve against the listing the user just saw.

use anyhow::{Context, Result, bail};
use tether_types::{PeerAddress, PeerDevice};

/// Parse an explicit device argument into an address.
pub fn parse_address(input: &str) -> Result<PeerAddress> {
    input
        .parse()
        .with_context(|| format!("'{}' is not a valid device address", input))
}

/// Resolve an index against the bonded-device listing.
pub fn resolve_index(peers: &[PeerDevice], index: usize) -> Result<PeerAddress> {
    match peers.get(index) {
        Some(peer) => Ok(peer.address),
        None => {
            if peers.is_empty() {
                bail!("no bonded devices found");
            }
            bail!(
                "index {} out of range (the listing has {} devices)",
                index,
                peers.len()
            )
        }
    }
}

/// Fall back to the remembered device.
pub fn remembered(last: Option<PeerAddress>) -> Result<PeerAddress> {
    last.context("no device selected yet; run `tether devices` and pass an address or --index")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peers() -> Vec<PeerDevice> {
        vec![
            PeerDevice::new("AA:BB:CC:DD:EE:01".parse().unwrap(), Some("Speaker".into())),
            PeerDevice::new("AA:BB:CC:DD:EE:02".parse().unwrap(), Some("Headset".into())),
        ]
    }

    #[test]
    fn parses_explicit_address() {
        let addr = parse_address("AA:BB:CC:DD:EE:01").unwrap();
        assert_eq!(addr.to_string(), "AA:BB:CC:DD:EE:01");

        let err = parse_address("speaker").unwrap_err();
        assert!(err.to_string().contains("speaker"));
    }

    #[test]
    fn index_resolves_against_listing() {
        let addr = resolve_index(&peers(), 1).unwrap();
        assert_eq!(addr.to_string(), "AA:BB:CC:DD:EE:02");
    }

    #[test]
    fn index_out_of_range_reports_count() {
        let err = resolve_index(&peers(), 5).unwrap_err();
        assert!(err.to_string().contains("2 devices"));

        let err = resolve_index(&[], 0).unwrap_err();
        assert!(err.to_string().contains("no bonded devices"));
    }

    #[test]
    fn remembered_requires_a_prior_selection() {
        let addr: PeerAddress = "AA:BB:CC:DD:EE:03".parse().unwrap();
        assert_eq!(remembered(Some(addr)).unwrap(), addr);
        assert!(remembered(None).is_err());
    }
}
