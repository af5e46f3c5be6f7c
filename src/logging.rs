//! Packet logging for frames on the wire
//!
//! Frames are logged through `tracing` at `info` level, formatted as
//! space-separated upper-case hex:
//!
//! ```text
//! [MODBUS-RTU] send slave:2 02 01 00 03 00 01 0D F9
//! ```
//!
//! With the `cli` feature, [`init`] installs a `tracing-subscriber` output.

use tracing::info;

/// Install a `fmt` subscriber; `RUST_LOG` overrides `level` when set.
#[cfg(feature = "cli")]
pub fn init(level: &str) -> Result<(), Box<dyn std::error::Error>> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()?;

    Ok(())
}

/// Format raw bytes as hex string for packet logging
pub fn format_hex_packet(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Log packet with direction and transport name
pub fn log_packet(direction: &str, data: &[u8], protocol: &str, slave_id: Option<u8>) {
    let hex_string = format_hex_packet(data);
    match slave_id {
        Some(id) => info!("[MODBUS-{}] {} slave:{} {}", protocol, direction, id, hex_string),
        None => info!("[MODBUS-{}] {} {}", protocol, direction, hex_string),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_hex_packet() {
        assert_eq!(format_hex_packet(&[]), "");
        assert_eq!(format_hex_packet(&[0x0A]), "0A");
        assert_eq!(
            format_hex_packet(&[0x02, 0x01, 0x00, 0x03, 0x00, 0x01, 0x0D, 0xF9]),
            "02 01 00 03 00 01 0D F9"
        );
    }
}
