use clap::Parser;

pub mod config;
pub mod main;
mod prettylog;

/// Serial sensor to HTTP bridge with plant recommendations
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Configuration file (TOML); agrosense.toml is used when present
    #[arg(short, long)]
    pub config: Option<String>,

    /// Serial port (e.g., /dev/ttyACM0, COM3), or "auto" to detect the board
    #[arg(short, long)]
    pub port: Option<String>,

    /// Serial baud rate
    #[arg(short, long)]
    pub baud_rate: Option<u32>,

    /// HTTP listen address (e.g., 0.0.0.0:5000)
    #[arg(short, long)]
    pub listen: Option<String>,

    /// Generate synthetic readings without opening the serial port
    #[arg(long)]
    pub simulate: bool,
}
