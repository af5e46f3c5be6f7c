#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use modbus_master::{crc16, FrameCodec, ModbusRequest, OperationKind, RtuCodec, TcpCodec};

#[derive(Debug, Arbitrary)]
struct Input {
    write: bool,
    slave_id: u8,
    function_code: u8,
    transaction_id: u16,
    bridge: bool,
    body: Vec<u8>,
}

fuzz_target!(|input: Input| {
    let kind = if input.write {
        OperationKind::Write
    } else {
        OperationKind::Read
    };
    let Ok(request) = ModbusRequest::raw(kind, input.slave_id, input.function_code, &input.body)
    else {
        return;
    };
    let request = request
        .with_transaction_id(input.transaction_id)
        .with_bridge(input.bridge);

    if let Ok(frame) = RtuCodec.encode(&request) {
        let (data, crc) = frame.split_at(frame.len() - 2);
        assert_eq!(crc16(data).to_le_bytes(), [crc[0], crc[1]]);
        assert_eq!(data[0], input.slave_id);
    }

    if let Ok(frame) = TcpCodec.encode(&request) {
        let length = u16::from_be_bytes([frame[4], frame[5]]) as usize;
        assert_eq!(length, frame.len() - 6);
        assert_eq!(frame[7], input.function_code);
    }
});
