//! Connect command implementation.
//!
//! Runs the session in the foreground until ctrl-c. The session manager
//! itself never retries; `--watch` opts into the supervisor for a sticky
//! session, mirroring how a background deployment would drive it.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use tether_core::{
    BleTransport, DisconnectReason, PrefsStore, ReconnectOptions, SessionConfig, SessionEvent,
    SessionManager, Supervisor, directory,
};
use tether_types::PeerAddress;

use crate::resolve;

/// Arguments for the connect command.
pub struct ConnectArgs {
    pub device: Option<String>,
    pub index: Option<usize>,
    pub timeout: u64,
    pub watch: bool,
    pub quiet: bool,
}

pub async fn cmd_connect(args: ConnectArgs) -> Result<()> {
    let prefs = PrefsStore::open_default();

    let address: PeerAddress = match (&args.device, args.index) {
        (Some(input), _) => resolve::parse_address(input)?,
        (None, Some(index)) => {
            let peers = directory::list_bonded_devices()
                .await
                .context("Failed to enumerate bonded devices")?;
            resolve::resolve_index(&peers, index)?
        }
        (None, None) => {
            let address = resolve::remembered(prefs.last_device())?;
            if !args.quiet {
                eprintln!("Using remembered device: {}", address);
            }
            address
        }
    };

    let config = SessionConfig {
        connect_timeout: Duration::from_secs(args.timeout),
        ..Default::default()
    };
    let manager = Arc::new(SessionManager::with_config(
        Arc::new(BleTransport::new()),
        prefs,
        config,
    ));
    let mut events = manager.subscribe();

    let cancel = CancellationToken::new();
    let mut supervisor_handle = if args.watch {
        let supervisor = Supervisor::new(Arc::clone(&manager), ReconnectOptions::default())?;
        Some(supervisor.spawn(address, cancel.clone()))
    } else {
        manager
            .select(address)
            .context("failed to start the session")?;
        None
    };

    if !args.quiet {
        eprintln!("Connecting to {} (ctrl-c to stop)...", address);
    }

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                if !args.quiet {
                    eprintln!("\nShutting down...");
                }
                cancel.cancel();
                manager.stop_session()?;
                break;
            }
            _ = wait_done(&mut supervisor_handle) => {
                manager.shutdown().await;
                bail!("gave up reconnecting to {}", address);
            }
            event = events.recv() => {
                let event = match event {
                    Ok(event) => event,
                    Err(_) => break,
                };
                match event {
                    SessionEvent::Connected { device } => {
                        if !args.quiet {
                            eprintln!("Connected to {}", device);
                        }
                    }
                    SessionEvent::ConnectFailed { device, reason } => {
                        if args.watch {
                            eprintln!("Connection to {} failed: {}. Retrying...", device, reason);
                        } else {
                            manager.shutdown().await;
                            bail!("connection to {} failed: {}", device, reason);
                        }
                    }
                    SessionEvent::Message { text, .. } => println!("{}", text),
                    SessionEvent::Alert { text, .. } => eprintln!("ALERT: {}", text),
                    SessionEvent::Disconnected { device, reason } => match reason {
                        DisconnectReason::LinkLost if args.watch => {
                            eprintln!("Connection lost. Reconnecting...");
                        }
                        DisconnectReason::LinkLost => {
                            manager.shutdown().await;
                            bail!("connection to {} lost", device);
                        }
                        _ => {
                            if !args.quiet {
                                eprintln!("Disconnected from {}", device);
                            }
                            break;
                        }
                    },
                    SessionEvent::Starting { .. } => {}
                    _ => {}
                }
            }
        }
    }

    manager.shutdown().await;
    if let Some(handle) = supervisor_handle {
        let _ = handle.await;
    }
    Ok(())
}

/// Resolve when the supervisor task ends; pends forever without one.
async fn wait_done(handle: &mut Option<JoinHandle<()>>) {
    match handle {
        Some(handle) => {
            let _ = handle.await;
        }
        None => std::future::pending().await,
    }
}
