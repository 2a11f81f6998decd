use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

mod commands;
mod resolve;

#[derive(Parser)]
#[command(name = "tether")]
#[command(author, version, about = "Keep a background session to a bonded Bluetooth peer", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Output format for listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// List bonded peer devices
    Devices {
        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Connect to a peer and keep the session until ctrl-c
    Connect {
        /// Device address (like AA:BB:CC:DD:EE:FF); falls back to the
        /// remembered device when omitted
        device: Option<String>,

        /// Pick a device by its index in the `devices` listing
        #[arg(short, long, conflicts_with = "device")]
        index: Option<usize>,

        /// Connection attempt timeout in seconds
        #[arg(short, long, default_value = "20")]
        timeout: u64,

        /// Automatically reconnect when the session drops
        #[arg(short, long)]
        watch: bool,
    },

    /// Show the remembered last device
    Last,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // When quiet mode is enabled, suppress info-level logging
    let filter = if cli.quiet {
        EnvFilter::new("warn")
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Devices { format } => commands::devices::cmd_devices(format).await,
        Commands::Connect {
            device,
            index,
            timeout,
            watch,
        } => {
            commands::connect::cmd_connect(commands::connect::ConnectArgs {
                device,
                index,
                timeout,
                watch,
                quiet: cli.quiet,
            })
            .await
        }
        Commands::Last => commands::last::cmd_last(),
    }
}
