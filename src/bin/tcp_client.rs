//! Modbus TCP client example
//!
//! Reads holding registers from the device at `host`, then writes a single
//! coil, logging each raw reply.
//!
//! Usage: cargo run --features cli --bin tcp_client [host] [port]
//! Example: cargo run --features cli --bin tcp_client 192.168.1.10 502

use modbus_master::constants::{FC_READ_HOLDING_REGISTERS, FC_WRITE_SINGLE_COIL};
use modbus_master::logging::{format_hex_packet, init};
use modbus_master::{TcpConfig, TcpTransport, DEFAULT_TCP_PORT};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init("info")?;

    let mut args = std::env::args().skip(1);
    let host = args.next().unwrap_or_else(|| "127.0.0.1".to_string());
    let port = match args.next() {
        Some(port) => port.parse()?,
        None => DEFAULT_TCP_PORT,
    };

    let mut transport =
        TcpTransport::new(TcpConfig::new().with_port(port).with_packet_logging(true))?;
    info!("Modbus TCP client, slave device at {}:{}", host, port);

    // Transaction 1, no bridge, unit 0: read holding registers
    match transport
        .read_raw(&host, 1, false, 0x00, FC_READ_HOLDING_REGISTERS, &[0, 1])
        .await
    {
        Ok(reply) => info!("Read reply: {}", format_hex_packet(&reply)),
        Err(e) => error!("Read failed: {}", e),
    }

    // Write a single coil
    match transport
        .write_raw(&host, 1, false, 0x00, FC_WRITE_SINGLE_COIL, &[0, 1])
        .await
    {
        Ok(reply) => info!("Write reply: {}", format_hex_packet(&reply)),
        Err(e) => error!("Write failed: {}", e),
    }

    let stats = transport.stats();
    info!(
        "Requests: {}, responses: {}, errors: {}",
        stats.requests_sent, stats.responses_received, stats.errors
    );
    Ok(())
}
