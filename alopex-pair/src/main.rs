/*!
 * ALOPEX Bluetooth Pairing Helper
 * Remove, trust and pair a device through bluetoothctl
 * Onyx Digital Intelligence Development LLC
 */

use anyhow::Result;
use clap::Parser;
use tracing::info;

mod ansi;
mod bluetooth;
mod config;
mod error;
mod pty;
mod session;

use bluetooth::BluetoothManager;
use config::PairConfig;

#[derive(Parser)]
#[command(name = "alopex-pair")]
#[command(about = "Pair a Bluetooth device by scripting bluetoothctl")]
struct Cli {
    /// Bluetooth address of the device, e.g. 00:1A:7D:DA:71:13
    device_address: String,

    /// PIN code sent when the device asks for one
    pin_code: String,

    /// Configuration file path
    #[arg(short, long, default_value = "/etc/alopex/alopex-pair.toml")]
    config: String,

    /// Enable debug logging, including bluetoothctl output
    #[arg(short, long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(format!("alopex_pair={0},bluetoothctl={0}", log_level))
        .init();

    let config = PairConfig::load(&cli.config)?;
    info!("Driving {} with prompt {:?}", config.tool, config.prompt);

    let manager = BluetoothManager::new(config);
    manager.pair_device(&cli.device_address, &cli.pin_code).await?;

    Ok(())
}
