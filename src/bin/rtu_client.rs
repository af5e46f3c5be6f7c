//! Modbus RTU client example
//!
//! On slave 2: reads coil 3, then writes 0x0001 to register 3.
//!
//! Usage: cargo run --features cli,rtu --bin rtu_client <serial device> [baud rate]
//! Example: cargo run --features cli,rtu --bin rtu_client /dev/ttyUSB0 9600

use modbus_master::constants::{FC_READ_COILS, FC_WRITE_SINGLE_REGISTER};
use modbus_master::logging::{format_hex_packet, init};
use modbus_master::{ModbusClient, RtuClient, RtuConfig};
use tracing::{error, info};

const SLAVE_ID: u8 = 0x02;
const REGISTER: u16 = 0x0003;
const DEFAULT_BAUD_RATE: u32 = 9600;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init("info")?;

    let mut args = std::env::args().skip(1);
    let Some(device) = args.next() else {
        eprintln!("Usage: rtu_client <serial device> [baud rate]");
        eprintln!("  serial device: RS485 port, e.g. /dev/ttyS0 (try \"dmesg | grep tty\")");
        return Ok(());
    };
    let baud_rate = match args.next() {
        Some(baud) => baud.parse()?,
        None => DEFAULT_BAUD_RATE,
    };

    let mut client = match RtuClient::open(
        &device,
        baud_rate,
        RtuConfig::new().with_packet_logging(true),
    ) {
        Ok(client) => client,
        Err(e) => {
            error!("Unable to open serial port {}: {}", device, e);
            return Ok(());
        }
    };

    match client.read(SLAVE_ID, FC_READ_COILS, REGISTER, 0x0001).await {
        Ok(payload) => info!("Read payload: {}", format_hex_packet(&payload)),
        Err(e) => error!("Read failed: {}", e),
    }

    match client
        .write(SLAVE_ID, FC_WRITE_SINGLE_REGISTER, REGISTER, 0x0001, &[0, 1])
        .await
    {
        Ok(payload) => info!("Write payload: {}", format_hex_packet(&payload)),
        Err(e) => error!("Write failed: {}", e),
    }

    Ok(())
}
