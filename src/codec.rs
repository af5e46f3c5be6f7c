//! # Frame Codecs
//!
//! Serialization of a [`ModbusRequest`] into a transport ADU, and decoding of
//! the raw reply.
//!
//! | Transport | Request ADU | Reply handling |
//! |-----------|-------------|----------------|
//! | RTU | Slave ID + PDU + CRC (low, high) | Validated: header, exception, length, CRC |
//! | TCP | MBAP header + Unit ID + PDU | Passthrough: bytes returned as received |
//!
//! The two transports deliberately differ in how much they check the reply.
//! Callers can query [`FrameCodec::response_handling`] instead of assuming.
//!
//! Encoding is pure: the same request always yields the same bytes.

use bytes::{BufMut, Bytes, BytesMut};
use tracing::debug;

use crate::constants::{
    EXCEPTION_FLAG, MAX_RTU_FRAME_SIZE, MAX_TCP_FRAME_SIZE, MBAP_HEADER_LEN, MBAP_PROTOCOL_ID,
    RTU_DECODED_EXCEPTION_CODES, RTU_EXCEPTION_FRAME_LEN,
};
use crate::crc;
use crate::error::{ModbusError, ModbusResult};
use crate::exception::ModbusException;
use crate::protocol::ModbusRequest;

/// How much of the reply a codec interprets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResponseHandling {
    /// Header, exception, length and CRC are checked; only payload is returned
    Validated,
    /// The reply is returned as received, without interpretation
    Passthrough,
}

/// Transport-specific ADU framing.
pub trait FrameCodec {
    /// Reply handling implemented by [`FrameCodec::decode`]
    fn response_handling(&self) -> ResponseHandling;

    /// Serialize a request into a complete ADU
    fn encode(&self, request: &ModbusRequest) -> ModbusResult<Bytes>;

    /// Turn the bytes read for `request` into the transaction result
    fn decode(&self, request: &ModbusRequest, response: &[u8]) -> ModbusResult<Vec<u8>>;

    /// Upper bound on a reply ADU for this transport
    fn max_frame_size(&self) -> usize;
}

// ============================================================================
// RTU
// ============================================================================

/// Modbus RTU framing: `[addr][fc][...body][crc lo][crc hi]`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RtuCodec;

impl RtuCodec {
    /// Create a new RTU codec
    pub fn new() -> Self {
        Self
    }
}

impl FrameCodec for RtuCodec {
    fn response_handling(&self) -> ResponseHandling {
        ResponseHandling::Validated
    }

    fn encode(&self, request: &ModbusRequest) -> ModbusResult<Bytes> {
        let pdu = request.to_pdu()?;
        let mut frame = BytesMut::with_capacity(1 + pdu.len() + 2);
        frame.put_u8(request.slave_id);
        frame.put_slice(pdu.as_slice());
        let crc = crc::crc16(&frame);
        frame.put_u16_le(crc);
        Ok(frame.freeze())
    }

    fn decode(&self, request: &ModbusRequest, response: &[u8]) -> ModbusResult<Vec<u8>> {
        let function = request.function.to_u8();

        if response.len() < 2 {
            return Err(truncated(response.len(), 2));
        }

        if response[0] != request.slave_id || response[1] != function {
            if response[0] == request.slave_id
                && response[1] & !EXCEPTION_FLAG == function
                && response[1] & EXCEPTION_FLAG != 0
            {
                if response.len() < 3 {
                    return Err(truncated(response.len(), 3));
                }
                let code = response[2];
                let decoded = RTU_DECODED_EXCEPTION_CODES
                    .contains(&code)
                    .then(|| ModbusException::from_u8(code))
                    .flatten();
                return match decoded {
                    Some(exception) => {
                        debug!(
                            "RTU exception from slave {}: {}",
                            request.slave_id, exception
                        );
                        Err(ModbusError::exception(function, exception))
                    }
                    None => Err(ModbusError::unspecified(format!(
                        "Unhandled exception code 0x{:02X}",
                        code
                    ))),
                };
            }
            return Err(ModbusError::unspecified(format!(
                "Response header mismatch: expected {:02X} {:02X}, got {:02X} {:02X}",
                request.slave_id, function, response[0], response[1]
            )));
        }

        if response.len() < 3 {
            return Err(truncated(response.len(), 3));
        }
        let payload_end = 3 + response[2] as usize;
        if response.len() < payload_end + 2 {
            return Err(truncated(response.len(), payload_end + 2));
        }

        if !crc::matches(
            &response[..payload_end],
            response[payload_end],
            response[payload_end + 1],
        ) {
            return Err(ModbusError::unspecified(format!(
                "CRC mismatch: expected {:04X}, got {:02X}{:02X}",
                crc::crc16(&response[..payload_end]),
                response[payload_end + 1],
                response[payload_end]
            )));
        }

        Ok(response[3..payload_end].to_vec())
    }

    fn max_frame_size(&self) -> usize {
        MAX_RTU_FRAME_SIZE
    }
}

fn truncated(received: usize, required: usize) -> ModbusError {
    ModbusError::unspecified(format!(
        "Truncated response: {} bytes, need {}",
        received, required
    ))
}

/// Total length of the RTU reply whose first bytes are `received`, once it
/// can be known.
///
/// Returns `None` while more bytes are needed to tell. A header that matches
/// neither the request nor its exception form is complete as received, since
/// decoding rejects it on the first two bytes alone.
pub fn expected_rtu_response_len(request: &ModbusRequest, received: &[u8]) -> Option<usize> {
    if received.len() < 2 {
        return None;
    }
    let function = request.function.to_u8();
    if received[0] != request.slave_id {
        return Some(received.len());
    }
    if received[1] == function {
        return received.get(2).map(|len| 3 + *len as usize + 2);
    }
    if received[1] == function | EXCEPTION_FLAG {
        return Some(RTU_EXCEPTION_FRAME_LEN);
    }
    Some(received.len())
}

// ============================================================================
// TCP
// ============================================================================

/// Modbus TCP framing: `[txn:2][0x0000][len:2][unit][fc][...body]`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TcpCodec;

impl TcpCodec {
    /// Create a new TCP codec
    pub fn new() -> Self {
        Self
    }
}

impl FrameCodec for TcpCodec {
    fn response_handling(&self) -> ResponseHandling {
        ResponseHandling::Passthrough
    }

    fn encode(&self, request: &ModbusRequest) -> ModbusResult<Bytes> {
        let pdu = request.to_pdu()?;
        // Length counts unit id + PDU
        let length = 1 + pdu.len();

        let mut frame = BytesMut::with_capacity(MBAP_HEADER_LEN + length);
        frame.put_u16(request.transaction_id);
        frame.put_u16(MBAP_PROTOCOL_ID);
        frame.put_u16(length as u16);
        frame.put_u8(request.unit_id());
        frame.put_slice(pdu.as_slice());
        Ok(frame.freeze())
    }

    fn decode(&self, _request: &ModbusRequest, response: &[u8]) -> ModbusResult<Vec<u8>> {
        let end = response.len().min(MAX_TCP_FRAME_SIZE);
        Ok(response[..end].to_vec())
    }

    fn max_frame_size(&self) -> usize {
        MAX_TCP_FRAME_SIZE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::*;
    use crate::error::ErrorCategory;
    use crate::protocol::OperationKind;

    fn read_coil_request() -> ModbusRequest {
        ModbusRequest::read(0x02, FC_READ_COILS, 0x0003, 0x0001).unwrap()
    }

    #[test]
    fn test_rtu_encode_header_only() {
        let frame = RtuCodec.encode(&read_coil_request()).unwrap();
        assert_eq!(frame.len(), RTU_HEADER_ONLY_FRAME_LEN);
        assert_eq!(
            &frame[..],
            &[0x02, 0x01, 0x00, 0x03, 0x00, 0x01, 0x0D, 0xF9]
        );
    }

    #[test]
    fn test_rtu_encode_with_data() {
        let request =
            ModbusRequest::write(0x02, FC_WRITE_SINGLE_REGISTER, 0x0003, 0x0001, &[0x00, 0x01])
                .unwrap();
        let frame = RtuCodec.encode(&request).unwrap();
        assert_eq!(
            &frame[..],
            &[0x02, 0x06, 0x00, 0x03, 0x00, 0x01, 0x00, 0x01, 0x73, 0xD2]
        );
    }

    #[test]
    fn test_rtu_encode_raw_body() {
        let request =
            ModbusRequest::raw(OperationKind::Read, 0x01, FC_READ_HOLDING_REGISTERS, &[0x00, 0x00, 0x00, 0x0A])
                .unwrap();
        let frame = RtuCodec.encode(&request).unwrap();
        assert_eq!(
            &frame[..],
            &[0x01, 0x03, 0x00, 0x00, 0x00, 0x0A, 0xC5, 0xCD]
        );
    }

    #[test]
    fn test_rtu_decode_payload() {
        let request = read_coil_request();
        let payload = RtuCodec
            .decode(&request, &[0x02, 0x01, 0x01, 0x01, 0x90, 0x0C])
            .unwrap();
        assert_eq!(payload, vec![0x01]);

        let request = ModbusRequest::read(0x01, FC_READ_HOLDING_REGISTERS, 0, 2).unwrap();
        let payload = RtuCodec
            .decode(
                &request,
                &[0x01, 0x03, 0x04, 0x00, 0x0A, 0x01, 0x02, 0x5A, 0x60],
            )
            .unwrap();
        assert_eq!(payload, vec![0x00, 0x0A, 0x01, 0x02]);
    }

    #[test]
    fn test_rtu_decode_ignores_trailing_bytes() {
        let payload = RtuCodec
            .decode(
                &read_coil_request(),
                &[0x02, 0x01, 0x01, 0x01, 0x90, 0x0C, 0xAA, 0xBB],
            )
            .unwrap();
        assert_eq!(payload, vec![0x01]);
    }

    #[test]
    fn test_rtu_decode_address_mismatch() {
        let err = RtuCodec
            .decode(&read_coil_request(), &[0x03, 0x01, 0x01, 0x01, 0x90, 0x0C])
            .unwrap_err();
        assert_eq!(err.category(), ErrorCategory::UnspecifiedProtocol);
    }

    #[test]
    fn test_rtu_decode_function_mismatch() {
        let err = RtuCodec
            .decode(&read_coil_request(), &[0x02, 0x03, 0x01, 0x01, 0x90, 0x0C])
            .unwrap_err();
        assert_eq!(err.category(), ErrorCategory::UnspecifiedProtocol);
    }

    #[test]
    fn test_rtu_decode_exception() {
        let err = RtuCodec
            .decode(&read_coil_request(), &[0x02, 0x81, 0x02, 0x31, 0x91])
            .unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Exception);
        assert_eq!(err.as_exception(), Some(ModbusException::DataAddress));
    }

    #[test]
    fn test_rtu_decode_handled_exceptions() {
        for code in RTU_DECODED_EXCEPTION_CODES {
            let err = RtuCodec
                .decode(&read_coil_request(), &[0x02, 0x81, code, 0x00, 0x00])
                .unwrap_err();
            assert_eq!(err.category(), ErrorCategory::Exception);
            assert_eq!(err.as_exception(), ModbusException::from_u8(code));
        }
    }

    #[test]
    fn test_rtu_decode_other_table_exceptions_are_unspecified() {
        for (code, _) in crate::exception::EXCEPTION_TABLE
            .iter()
            .filter(|(code, _)| !RTU_DECODED_EXCEPTION_CODES.contains(code))
        {
            let err = RtuCodec
                .decode(&read_coil_request(), &[0x02, 0x81, *code, 0x00, 0x00])
                .unwrap_err();
            assert_eq!(err.category(), ErrorCategory::UnspecifiedProtocol);
            assert_eq!(err.as_exception(), None);
        }
    }

    #[test]
    fn test_rtu_decode_unknown_exception_code() {
        let err = RtuCodec
            .decode(&read_coil_request(), &[0x02, 0x81, 0x07, 0x00, 0x00])
            .unwrap_err();
        assert_eq!(err.category(), ErrorCategory::UnspecifiedProtocol);
    }

    #[test]
    fn test_rtu_decode_tampered_payload() {
        let err = RtuCodec
            .decode(&read_coil_request(), &[0x02, 0x01, 0x01, 0x03, 0x90, 0x0C])
            .unwrap_err();
        assert_eq!(err.category(), ErrorCategory::UnspecifiedProtocol);
        assert!(err.to_string().contains("CRC"));
    }

    #[test]
    fn test_rtu_decode_truncated() {
        let request = read_coil_request();
        for response in [
            &[][..],
            &[0x02][..],
            &[0x02, 0x01][..],
            &[0x02, 0x01, 0x01, 0x01, 0x90][..],
            &[0x02, 0x81][..],
        ] {
            let err = RtuCodec.decode(&request, response).unwrap_err();
            assert_eq!(err.category(), ErrorCategory::UnspecifiedProtocol);
        }
    }

    #[test]
    fn test_expected_rtu_response_len() {
        let request = read_coil_request();
        assert_eq!(expected_rtu_response_len(&request, &[0x02]), None);
        assert_eq!(expected_rtu_response_len(&request, &[0x02, 0x01]), None);
        assert_eq!(expected_rtu_response_len(&request, &[0x02, 0x01, 0x04]), Some(9));
        assert_eq!(expected_rtu_response_len(&request, &[0x02, 0x81]), Some(5));
        assert_eq!(expected_rtu_response_len(&request, &[0x07, 0x01]), Some(2));
        assert_eq!(expected_rtu_response_len(&request, &[0x02, 0x03, 0x00]), Some(3));
    }

    #[test]
    fn test_tcp_encode_header() {
        let request =
            ModbusRequest::raw(OperationKind::Read, 0x01, FC_READ_HOLDING_REGISTERS, &[0x00, 0x01, 0x02])
                .unwrap()
                .with_transaction_id(1);
        let frame = TcpCodec.encode(&request).unwrap();
        assert_eq!(
            &frame[..],
            &[0x00, 0x01, 0x00, 0x00, 0x00, 0x05, 0x00, 0x03, 0x00, 0x01, 0x02]
        );
        let length = u16::from_be_bytes([frame[4], frame[5]]) as usize;
        assert_eq!(length, frame.len() - MBAP_HEADER_LEN);
    }

    #[test]
    fn test_tcp_encode_bridge_unit_id() {
        let request = ModbusRequest::read(0x05, FC_READ_HOLDING_REGISTERS, 0x0000, 0x0002)
            .unwrap()
            .with_transaction_id(0x1234)
            .with_bridge(true);
        let frame = TcpCodec.encode(&request).unwrap();
        assert_eq!(
            &frame[..],
            &[0x12, 0x34, 0x00, 0x00, 0x00, 0x06, 0x05, 0x03, 0x00, 0x00, 0x00, 0x02]
        );
    }

    #[test]
    fn test_tcp_decode_passthrough() {
        let request = ModbusRequest::read(0x05, FC_READ_HOLDING_REGISTERS, 0, 1).unwrap();
        // Not even a valid MBAP reply: still returned untouched
        let response = [0xDE, 0xAD, 0xBE, 0xEF];
        assert_eq!(TcpCodec.decode(&request, &response).unwrap(), response.to_vec());
        assert_eq!(TcpCodec.response_handling(), ResponseHandling::Passthrough);
        assert_eq!(RtuCodec.response_handling(), ResponseHandling::Validated);
    }

    #[test]
    fn test_encode_is_pure() {
        let request = read_coil_request();
        assert_eq!(
            RtuCodec.encode(&request).unwrap(),
            RtuCodec.encode(&request).unwrap()
        );
        let request = request.with_transaction_id(9);
        assert_eq!(
            TcpCodec.encode(&request).unwrap(),
            TcpCodec.encode(&request).unwrap()
        );
    }

    #[test]
    fn test_oversized_request_rejected_before_framing() {
        let request = ModbusRequest::write(
            0x01,
            FC_WRITE_MULTIPLE_REGISTERS,
            0,
            1,
            &[0u8; MAX_PDU_SIZE],
        )
        .unwrap();
        assert_eq!(
            RtuCodec.encode(&request).unwrap_err().category(),
            ErrorCategory::Validation
        );
        assert_eq!(
            TcpCodec.encode(&request).unwrap_err().category(),
            ErrorCategory::Validation
        );
    }
}
