//! Modbus protocol constants based on official specification
//!
//! These constants are derived from the official Modbus specification:
//! - Maximum PDU size: 253 bytes (inherited from RS485 ADU limit of 256 bytes)
//! - Register/coil limits are calculated to fit within the PDU size constraint

use std::time::Duration;

// ============================================================================
// Frame Size Constants
// ============================================================================

/// Modbus MBAP header length for TCP, excluding the unit id
/// Format: Transaction ID(2) + Protocol ID(2) + Length(2) = 6 bytes
/// The MBAP length field counts every byte after these 6.
pub const MBAP_HEADER_LEN: usize = 6;

/// Maximum PDU (Protocol Data Unit) size per Modbus specification
/// RS485 ADU (256 bytes) - Slave Address (1 byte) - CRC (2 bytes) = 253 bytes
pub const MAX_PDU_SIZE: usize = 253;

/// Maximum RTU ADU size: address (1) + PDU (253) + CRC (2)
pub const MAX_RTU_FRAME_SIZE: usize = 1 + MAX_PDU_SIZE + 2;

/// Maximum TCP ADU size: MBAP (6) + unit id (1) + PDU (253)
pub const MAX_TCP_FRAME_SIZE: usize = MBAP_HEADER_LEN + 1 + MAX_PDU_SIZE;

/// Length of an RTU request that carries no data beyond start and quantity
/// Address(1) + Function(1) + Start(2) + Quantity(2) + CRC(2) = 8 bytes
pub const RTU_HEADER_ONLY_FRAME_LEN: usize = 8;

/// Length of an RTU exception response: Address(1) + Function(1) + Code(1) + CRC(2)
pub const RTU_EXCEPTION_FRAME_LEN: usize = 5;

/// Protocol identifier carried in bytes 2-3 of every MBAP header
pub const MBAP_PROTOCOL_ID: u16 = 0x0000;

/// Unit id sent when the TCP peer is itself the slave (no serial bridging)
pub const TCP_UNIT_ID_NO_BRIDGE: u8 = 0x00;

/// Bit set on the echoed function code of an exception response
pub const EXCEPTION_FLAG: u8 = 0x80;

// ============================================================================
// Transport Defaults
// ============================================================================

/// Modbus TCP default port
pub const DEFAULT_TCP_PORT: u16 = 502;

/// Default RTU settle delay between writing a request and reading the reply
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(300);

/// Default RTU response timeout, measured from the end of the settle delay
pub const DEFAULT_RESPONSE_TIMEOUT: Duration = Duration::from_millis(1000);

/// Default TCP connect and read timeout
pub const DEFAULT_TCP_TIMEOUT: Duration = Duration::from_millis(5000);

// ============================================================================
// Register Operation Limits
// ============================================================================

/// Maximum number of registers for FC03/FC04 (Read Holding/Input Registers)
///
/// Response PDU: Function Code (1) + Byte Count (1) + N × 2 ≤ 253
/// Therefore: N ≤ 125
pub const MAX_READ_REGISTERS: usize = 125;

/// Maximum number of registers for FC16 (Write Multiple Registers)
///
/// Request PDU: Function Code (1) + Start (2) + Quantity (2) + Byte Count (1) + N × 2 ≤ 253
/// Therefore: N ≤ 123
pub const MAX_WRITE_REGISTERS: usize = 123;

/// Maximum number of coils for FC01/FC02 (Read Coils/Discrete Inputs)
pub const MAX_READ_COILS: usize = 2000;

// ============================================================================
// Modbus Function Codes
// ============================================================================

/// Read Coils (FC01)
pub const FC_READ_COILS: u8 = 0x01;

/// Read Discrete Inputs (FC02)
pub const FC_READ_DISCRETE_INPUTS: u8 = 0x02;

/// Read Holding Registers (FC03)
pub const FC_READ_HOLDING_REGISTERS: u8 = 0x03;

/// Read Input Registers (FC04)
pub const FC_READ_INPUT_REGISTERS: u8 = 0x04;

/// Write Single Coil (FC05)
pub const FC_WRITE_SINGLE_COIL: u8 = 0x05;

/// Write Single Register (FC06)
pub const FC_WRITE_SINGLE_REGISTER: u8 = 0x06;

/// Write Multiple Registers (FC16)
pub const FC_WRITE_MULTIPLE_REGISTERS: u8 = 0x10;

/// Encapsulated Interface Transport (FC43). Known to the protocol, never
/// accepted by this master.
pub const FC_ENCAPSULATED_INTERFACE: u8 = 0x2B;

/// Function codes accepted for read transactions
pub const READ_FUNCTION_CODES: [u8; 4] = [
    FC_READ_COILS,
    FC_READ_DISCRETE_INPUTS,
    FC_READ_HOLDING_REGISTERS,
    FC_READ_INPUT_REGISTERS,
];

/// Function codes accepted for write transactions
pub const WRITE_FUNCTION_CODES: [u8; 3] = [
    FC_WRITE_SINGLE_COIL,
    FC_WRITE_SINGLE_REGISTER,
    FC_WRITE_MULTIPLE_REGISTERS,
];

/// Single coil ON value
pub const COIL_ON: u16 = 0xFF00;

/// Single coil OFF value
pub const COIL_OFF: u16 = 0x0000;

// ============================================================================
// Modbus Exception Codes
// ============================================================================

/// Illegal Function
pub const EXCEPTION_ILLEGAL_FUNCTION: u8 = 0x01;

/// Illegal Data Address
pub const EXCEPTION_DATA_ADDRESS: u8 = 0x02;

/// Illegal Data Value
pub const EXCEPTION_DATA_VALUE: u8 = 0x03;

/// Slave Device Failure
pub const EXCEPTION_SLAVE_DEVICE_FAILURE: u8 = 0x04;

/// Acknowledge
pub const EXCEPTION_ACKNOWLEDGE: u8 = 0x05;

/// Slave Device Busy
pub const EXCEPTION_SLAVE_DEVICE_BUSY: u8 = 0x06;

/// Memory Parity Error
pub const EXCEPTION_MEMORY_PARITY_ERROR: u8 = 0x08;

/// Gateway Path Unavailable
pub const EXCEPTION_GATEWAY_PATH_UNAVAILABLE: u8 = 0x0A;

/// Gateway Target Device Failed to Respond
pub const EXCEPTION_GATEWAY_TARGET_FAILED: u8 = 0x0B;

/// Exception codes the RTU decoder reports as exceptions. Any other code in
/// an RTU exception frame is an unspecified protocol error.
pub const RTU_DECODED_EXCEPTION_CODES: [u8; 4] = [
    EXCEPTION_ILLEGAL_FUNCTION,
    EXCEPTION_DATA_ADDRESS,
    EXCEPTION_DATA_VALUE,
    EXCEPTION_SLAVE_DEVICE_FAILURE,
];
