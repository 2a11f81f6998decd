//! Last command implementation.

use anyhow::Result;
use tether_core::PrefsStore;

pub fn cmd_last() -> Result<()> {
    match PrefsStore::open_default().last_device() {
        Some(address) => println!("{}", address),
        None => println!("No device remembered yet."),
    }
    Ok(())
}
