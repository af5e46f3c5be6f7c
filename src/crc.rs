//! CRC-16/MODBUS checksum for RTU frames
//!
//! Accumulator starts at 0xFFFF; each byte is XORed into the low byte and the
//! accumulator is shifted right eight times, XORing 0xA001 whenever the bit
//! shifted out was set. The CRC goes on the wire low byte first.

use crc::{Crc, CRC_16_MODBUS};

const CRC_MODBUS: Crc<u16> = Crc::<u16>::new(&CRC_16_MODBUS);

/// Compute the Modbus CRC-16 of `data`.
#[inline]
pub fn crc16(data: &[u8]) -> u16 {
    CRC_MODBUS.checksum(data)
}

/// Check a CRC received as `(low, high)` against the CRC of `data`.
#[inline]
pub fn matches(data: &[u8], low: u8, high: u8) -> bool {
    crc16(data).to_le_bytes() == [low, high]
}
