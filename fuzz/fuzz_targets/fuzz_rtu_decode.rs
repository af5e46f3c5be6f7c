#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use modbus_master::codec::expected_rtu_response_len;
use modbus_master::{FrameCodec, ModbusRequest, RtuCodec};

#[derive(Debug, Arbitrary)]
struct Input {
    slave_id: u8,
    function_code: u8,
    response: Vec<u8>,
}

fuzz_target!(|input: Input| {
    // Only classified requests reach the decoder
    let Ok(request) = ModbusRequest::read(input.slave_id, input.function_code, 0, 1) else {
        return;
    };

    // Must never panic, whatever the slave sends
    let decoded = RtuCodec.decode(&request, &input.response);
    let _ = expected_rtu_response_len(&request, &input.response);

    if let Ok(payload) = decoded {
        assert!(payload.len() + 5 <= input.response.len());
        assert_eq!(payload.len(), input.response[2] as usize);
    }
});
