//! # Modbus Master - RTU and TCP frame and transaction engine
//!
//! A master-side Modbus client for reading and writing coils and registers
//! on slave devices over a serial line (RTU) or Ethernet (TCP).
//!
//! ## Features
//!
//! - **Byte-exact framing**: RTU (`addr + PDU + CRC-16`) and TCP (`MBAP + PDU`)
//! - **Validated RTU replies**: address, function, exception, length and CRC checks
//! - **Async/await with Tokio**: the serial line is any `AsyncRead + AsyncWrite` stream
//! - **Stack-allocated PDU**: the 253-byte PDU limit is enforced while encoding
//! - **Configurable timing**: settle delay and timeouts instead of fixed sleeps
//!
//! ## Supported Function Codes
//!
//! | Code | Function | Kind |
//! |------|----------|------|
//! | 0x01 | Read Coils | read |
//! | 0x02 | Read Discrete Inputs | read |
//! | 0x03 | Read Holding Registers | read |
//! | 0x04 | Read Input Registers | read |
//! | 0x05 | Write Single Coil | write |
//! | 0x06 | Write Single Register | write |
//! | 0x10 | Write Multiple Registers | write |
//!
//! Any other code is rejected with [`ModbusError::InvalidFunction`] before a
//! frame is built.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use modbus_master::{ModbusResult, TcpConfig, TcpTransport};
//!
//! #[tokio::main]
//! async fn main() -> ModbusResult<()> {
//!     let mut transport = TcpTransport::new(TcpConfig::default())?;
//!
//!     // Transaction 1, no bridge, read 10 holding registers from address 0
//!     let reply = transport
//!         .read("192.168.1.10", 1, false, 1, 0x03, 0, 10)
//!         .await?;
//!     println!("Reply: {:02X?}", reply);
//!     Ok(())
//! }
//! ```

// ============================================================================
// Core modules
// ============================================================================

/// Core error types and result handling
pub mod error;

/// Modbus protocol constants based on official specification
pub mod constants;

/// Immutable exception code table
pub mod exception;

/// CRC-16/MODBUS checksum
pub mod crc;

/// High-performance PDU with stack-allocated fixed array
pub mod pdu;

/// Function codes, classifier and request values
pub mod protocol;

/// RTU and TCP frame codecs
pub mod codec;

/// Transport configuration
pub mod config;

/// Packet logging
pub mod logging;

/// Transaction executors for TCP and RTU
pub mod transport;

/// Modbus client implementations
pub mod client;

// ============================================================================
// Re-exports for convenience
// ============================================================================

// === Async runtime (users can use modbus_master::tokio) ===
pub use tokio;

// === Core client API ===
pub use client::{ModbusClient, RtuClient, TcpClient};

// === Error handling ===
pub use error::{ErrorCategory, ModbusError, ModbusResult};

// === Core types ===
pub use exception::{ModbusException, EXCEPTION_TABLE};
pub use protocol::{
    classify, is_valid_read, is_valid_write, ModbusFunction, ModbusRequest, OperationKind,
    RequestBody, SlaveId,
};

// === Framing ===
pub use codec::{FrameCodec, ResponseHandling, RtuCodec, TcpCodec};
pub use self::crc::crc16;

// === Transports ===
pub use config::{RtuConfig, TcpConfig};
pub use transport::{RtuTransport, TcpTransport, TransportStats};

// === Protocol limits (commonly needed constants) ===
pub use constants::{
    DEFAULT_TCP_PORT, MAX_PDU_SIZE, MAX_READ_COILS, MAX_READ_REGISTERS, MAX_RTU_FRAME_SIZE,
    MAX_TCP_FRAME_SIZE, MAX_WRITE_REGISTERS,
};

// === PDU (advanced usage) ===
pub use pdu::{ModbusPdu, PduBuilder};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
