use std::env;

use inquire::MultiSelect;
use sbot_accelerometer::{
    discovery::{Discovery, StaticRegistry},
    serial::SerialPortConnector,
    transport::TransportConfig,
};
use tracing_subscriber::{EnvFilter, filter::LevelFilter};

// The boards can take a moment to answer after the port opens.
const SETTLE_TIME_MS: u32 = 100;
const SERIAL_TIMEOUT_MS: u32 = 500;

fn main() {
    // Log to stdout, filtering according to RUST_LOG, defaulting to INFO.
    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    // Ports from the command line, or pick interactively.
    let mut port_names: Vec<String> = env::args().skip(1).collect();
    if port_names.is_empty() {
        let ports = serialport::available_ports().expect("Failed to enumerate serial ports");

        if ports.is_empty() {
            eprintln!("No serial ports found!");
            std::process::exit(1);
        }

        let names: Vec<String> = ports.iter().map(|p| p.port_name.clone()).collect();
        port_names = MultiSelect::new("Select the ports to scan:", names)
            .prompt()
            .expect("Failed to select ports");
    }

    let config = TransportConfig::default()
        .with_timeout(fugit::MillisDurationU32::millis(SERIAL_TIMEOUT_MS))
        .with_settle_time(fugit::MillisDurationU32::millis(SETTLE_TIME_MS));

    // No simulator here, every board comes from the ports given.
    let mut discovery: Discovery<_, _> =
        Discovery::new(SerialPortConnector, StaticRegistry::new()).with_config(config);
    let manual: Vec<&str> = port_names.iter().map(String::as_str).collect();
    let mut boards = discovery.discover(&manual);

    if boards.is_empty() {
        println!("No accelerometer boards found.");
        return;
    }

    for (asset_tag, board) in boards.iter_mut() {
        println!("\n--- {} ---", asset_tag);
        println!("Identity: {}", board.identity());
        match board.status() {
            Ok(status) => println!("Status: {}", status),
            Err(err) => println!("Status unavailable: {}", err),
        }
        match board.acceleration() {
            Ok((x, y, z)) => println!("Acceleration: x={:.3} y={:.3} z={:.3} m/s²", x, y, z),
            Err(err) => println!("Acceleration unavailable: {}", err),
        }
    }

    // Dropping the boards resets them.
}
