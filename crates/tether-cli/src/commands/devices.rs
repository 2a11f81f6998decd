//! Devices command implementation.

use anyhow::{Context, Result};
use tether_core::directory;

use crate::OutputFormat;

pub async fn cmd_devices(format: OutputFormat) -> Result<()> {
    let peers = directory::list_bonded_devices()
        .await
        .context("Failed to enumerate bonded devices")?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&peers)?);
        }
        OutputFormat::Text => {
            if peers.is_empty() {
                println!("No bonded devices found.");
                return Ok(());
            }
            for (index, peer) in peers.iter().enumerate() {
                let name = peer.name.as_deref().unwrap_or("(unnamed)");
                println!("{:>3}  {}  {}", index, peer.address, name);
            }
            println!("\nConnect with: tether connect --index <N>");
        }
    }

    Ok(())
}
