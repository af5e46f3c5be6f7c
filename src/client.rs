//! High-level Modbus client implementations
//!
//! The clients pair a transaction executor with its transport handle and add
//! a typed layer on top of the raw `read`/`write` operations.
//!
//! # Architecture
//!
//! Modbus TCP and RTU share the same application layer (PDU), differing only
//! in transport encapsulation and in how much of the reply is checked:
//! - **RTU**: Slave ID + PDU + CRC; the executor returns the validated payload
//! - **TCP**: MBAP Header + PDU; the executor returns the reply as received
//!
//! The typed helpers on [`ModbusClient`] consult
//! [`ModbusClient::response_handling`] to extract data from either shape, so
//! the conversion logic is written once for both transports.
//!
//! | Function Code | Raw call | Typed helper |
//! |---------------|----------|--------------|
//! | 0x01 | `read(slave, 0x01, ..)` | `read_coils()` |
//! | 0x02 | `read(slave, 0x02, ..)` | `read_discrete_inputs()` |
//! | 0x03 | `read(slave, 0x03, ..)` | `read_holding_registers()` |
//! | 0x04 | `read(slave, 0x04, ..)` | `read_input_registers()` |
//! | 0x05 | `write(slave, 0x05, ..)` | `write_single_coil()` |
//! | 0x06 | `write(slave, 0x06, ..)` | `write_single_register()` |
//! | 0x10 | `write(slave, 0x10, ..)` | `write_multiple_registers()` |
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use modbus_master::{ModbusClient, ModbusResult, TcpClient, TcpConfig};
//!
//! #[tokio::main]
//! async fn main() -> ModbusResult<()> {
//!     let mut client = TcpClient::new("192.168.1.10", TcpConfig::default())?;
//!
//!     // Read 10 holding registers from slave 1, starting at address 0
//!     let registers = client.read_holding_registers(1, 0, 10).await?;
//!     println!("Registers: {:?}", registers);
//!
//!     // Switch coil 172 on
//!     client.write_single_coil(1, 172, true).await?;
//!     Ok(())
//! }
//! ```

use tokio::io::{AsyncRead, AsyncWrite};

use crate::codec::ResponseHandling;
use crate::config::{RtuConfig, TcpConfig};
use crate::constants::*;
use crate::error::{ModbusError, ModbusResult};
use crate::protocol::{ModbusRequest, OperationKind, SlaveId};
use crate::transport::{RtuTransport, TcpTransport, TransportStats};

/// Trait defining the interface for Modbus client operations.
///
/// # Implemented By
///
/// - [`RtuClient`] - Modbus RTU over any async byte stream
/// - [`TcpClient`] - Modbus TCP, one connection per call
///
/// # Protocol Limits
///
/// The typed helpers enforce these limits before any I/O:
///
/// | Operation | Limit |
/// |-----------|-------|
/// | Read Coils (0x01) | 2000 coils |
/// | Read Discrete Inputs (0x02) | 2000 bits |
/// | Read Holding Registers (0x03) | 125 registers |
/// | Read Input Registers (0x04) | 125 registers |
/// | Write Multiple Registers (0x10) | 123 registers |
///
/// # Write replies over RTU
///
/// The RTU decoder reads byte 2 of every reply as a length byte. A slave
/// that answers writes with the standard echo
/// (`addr fc addr_hi addr_lo val_hi val_lo crc`) therefore fails the CRC
/// check, and the typed writes on [`RtuClient`] return an
/// `UnspecifiedProtocol` error. They succeed only against slaves that reply
/// `addr fc len data crc`. Over TCP the standard echo is accepted.
pub trait ModbusClient: Send {
    /// Raw read with a read function code (0x01-0x04).
    ///
    /// Returns the transport's transaction result: the payload for RTU, the
    /// whole reply ADU for TCP.
    fn read(
        &mut self,
        slave_id: SlaveId,
        function_code: u8,
        start: u16,
        quantity: u16,
    ) -> impl std::future::Future<Output = ModbusResult<Vec<u8>>> + Send;

    /// Raw write with a write function code (0x05, 0x06, 0x10).
    fn write(
        &mut self,
        slave_id: SlaveId,
        function_code: u8,
        start: u16,
        quantity: u16,
        data: &[u8],
    ) -> impl std::future::Future<Output = ModbusResult<Vec<u8>>> + Send;

    /// What `read`/`write` return on success
    fn response_handling(&self) -> ResponseHandling;

    /// Returns statistics about requests sent and responses received.
    fn get_stats(&self) -> TransportStats;

    /// Read coils (function code 0x01).
    ///
    /// # Arguments
    ///
    /// * `slave_id` - The Modbus slave/unit ID
    /// * `address` - Starting coil address (0-65535)
    /// * `quantity` - Number of coils to read (1-2000)
    fn read_coils(
        &mut self,
        slave_id: SlaveId,
        address: u16,
        quantity: u16,
    ) -> impl std::future::Future<Output = ModbusResult<Vec<bool>>> + Send
    where
        Self: Sized,
    {
        self.read_bits(slave_id, FC_READ_COILS, address, quantity)
    }

    /// Read discrete inputs (function code 0x02).
    fn read_discrete_inputs(
        &mut self,
        slave_id: SlaveId,
        address: u16,
        quantity: u16,
    ) -> impl std::future::Future<Output = ModbusResult<Vec<bool>>> + Send
    where
        Self: Sized,
    {
        self.read_bits(slave_id, FC_READ_DISCRETE_INPUTS, address, quantity)
    }

    /// Read holding registers (function code 0x03).
    ///
    /// # Arguments
    ///
    /// * `slave_id` - The Modbus slave/unit ID
    /// * `address` - Starting register address (0-65535)
    /// * `quantity` - Number of registers to read (1-125)
    ///
    /// # Returns
    ///
    /// A vector of 16-bit register values.
    fn read_holding_registers(
        &mut self,
        slave_id: SlaveId,
        address: u16,
        quantity: u16,
    ) -> impl std::future::Future<Output = ModbusResult<Vec<u16>>> + Send
    where
        Self: Sized,
    {
        self.read_words(slave_id, FC_READ_HOLDING_REGISTERS, address, quantity)
    }

    /// Read input registers (function code 0x04).
    fn read_input_registers(
        &mut self,
        slave_id: SlaveId,
        address: u16,
        quantity: u16,
    ) -> impl std::future::Future<Output = ModbusResult<Vec<u16>>> + Send
    where
        Self: Sized,
    {
        self.read_words(slave_id, FC_READ_INPUT_REGISTERS, address, quantity)
    }

    /// Write single coil (function code 0x05).
    ///
    /// `true` is sent as 0xFF00, `false` as 0x0000.
    fn write_single_coil(
        &mut self,
        slave_id: SlaveId,
        address: u16,
        value: bool,
    ) -> impl std::future::Future<Output = ModbusResult<()>> + Send
    where
        Self: Sized,
    {
        let handling = self.response_handling();
        let value = if value { COIL_ON } else { COIL_OFF };
        async move {
            let response = self
                .write(slave_id, FC_WRITE_SINGLE_COIL, address, value, &[])
                .await?;
            utils::check_write_reply(handling, FC_WRITE_SINGLE_COIL, &response)
        }
    }

    /// Write single register (function code 0x06).
    fn write_single_register(
        &mut self,
        slave_id: SlaveId,
        address: u16,
        value: u16,
    ) -> impl std::future::Future<Output = ModbusResult<()>> + Send
    where
        Self: Sized,
    {
        let handling = self.response_handling();
        async move {
            let response = self
                .write(slave_id, FC_WRITE_SINGLE_REGISTER, address, value, &[])
                .await?;
            utils::check_write_reply(handling, FC_WRITE_SINGLE_REGISTER, &response)
        }
    }

    /// Write multiple registers (function code 0x10).
    ///
    /// # Arguments
    ///
    /// * `slave_id` - The Modbus slave/unit ID
    /// * `address` - Starting register address (0-65535)
    /// * `values` - Register values (1-123 registers)
    fn write_multiple_registers(
        &mut self,
        slave_id: SlaveId,
        address: u16,
        values: &[u16],
    ) -> impl std::future::Future<Output = ModbusResult<()>> + Send
    where
        Self: Sized,
    {
        let handling = self.response_handling();
        let count = values.len();
        let payload = utils::registers_to_payload(values);
        async move {
            let payload = payload?;
            let response = self
                .write(
                    slave_id,
                    FC_WRITE_MULTIPLE_REGISTERS,
                    address,
                    count as u16,
                    &payload,
                )
                .await?;
            utils::check_write_reply(handling, FC_WRITE_MULTIPLE_REGISTERS, &response)
        }
    }

    #[doc(hidden)]
    fn read_bits(
        &mut self,
        slave_id: SlaveId,
        function_code: u8,
        address: u16,
        quantity: u16,
    ) -> impl std::future::Future<Output = ModbusResult<Vec<bool>>> + Send
    where
        Self: Sized,
    {
        let handling = self.response_handling();
        async move {
            if quantity == 0 || quantity as usize > MAX_READ_COILS {
                return Err(ModbusError::invalid_data("Invalid quantity"));
            }
            let response = self.read(slave_id, function_code, address, quantity).await?;
            let data = utils::response_data(handling, function_code, &response)?;
            if data.len() * 8 < quantity as usize {
                return Err(ModbusError::unspecified(format!(
                    "Expected {} bits, got {} bytes",
                    quantity,
                    data.len()
                )));
            }
            Ok(utils::unpack_bits(data, quantity))
        }
    }

    #[doc(hidden)]
    fn read_words(
        &mut self,
        slave_id: SlaveId,
        function_code: u8,
        address: u16,
        quantity: u16,
    ) -> impl std::future::Future<Output = ModbusResult<Vec<u16>>> + Send
    where
        Self: Sized,
    {
        let handling = self.response_handling();
        async move {
            if quantity == 0 || quantity as usize > MAX_READ_REGISTERS {
                return Err(ModbusError::invalid_data("Invalid quantity"));
            }
            let response = self.read(slave_id, function_code, address, quantity).await?;
            let data = utils::response_data(handling, function_code, &response)?;
            let registers = utils::registers_from_bytes(data)?;
            if registers.len() != quantity as usize {
                return Err(ModbusError::unspecified(format!(
                    "Expected {} registers, got {}",
                    quantity,
                    registers.len()
                )));
            }
            Ok(registers)
        }
    }
}

// ============================================================================
// RTU
// ============================================================================

/// Modbus RTU client over an async byte stream
///
/// With the `rtu` feature, [`RtuClient::open`] opens a serial device.
///
/// Typed writes expect an `addr fc len data crc` reply; a standard write
/// echo is reported as `UnspecifiedProtocol` (see [`ModbusClient`]).
#[derive(Debug)]
pub struct RtuClient<S> {
    stream: S,
    transport: RtuTransport,
}

impl<S> RtuClient<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    /// Wrap an already opened byte stream
    pub fn new(stream: S, config: RtuConfig) -> ModbusResult<Self> {
        Ok(Self {
            stream,
            transport: RtuTransport::new(config)?,
        })
    }

    /// Get the underlying executor
    pub fn transport(&self) -> &RtuTransport {
        &self.transport
    }

    /// Release the byte stream
    pub fn into_inner(self) -> S {
        self.stream
    }
}

#[cfg(feature = "rtu")]
impl RtuClient<tokio_serial::SerialStream> {
    /// Open the serial device at `path` (e.g. `/dev/ttyUSB0`)
    pub fn open(path: &str, baud_rate: u32, config: RtuConfig) -> ModbusResult<Self> {
        use tokio_serial::SerialPortBuilderExt;

        let port = tokio_serial::new(path, baud_rate)
            .open_native_async()
            .map_err(|e| {
                ModbusError::connection(format!("Failed to open serial port {}: {}", path, e))
            })?;
        Self::new(port, config)
    }
}

impl<S> ModbusClient for RtuClient<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn read(
        &mut self,
        slave_id: SlaveId,
        function_code: u8,
        start: u16,
        quantity: u16,
    ) -> ModbusResult<Vec<u8>> {
        self.transport
            .read(&mut self.stream, slave_id, function_code, start, quantity)
            .await
    }

    async fn write(
        &mut self,
        slave_id: SlaveId,
        function_code: u8,
        start: u16,
        quantity: u16,
        data: &[u8],
    ) -> ModbusResult<Vec<u8>> {
        self.transport
            .write(&mut self.stream, slave_id, function_code, start, quantity, data)
            .await
    }

    fn response_handling(&self) -> ResponseHandling {
        ResponseHandling::Validated
    }

    fn get_stats(&self) -> TransportStats {
        self.transport.stats()
    }
}

// ============================================================================
// TCP
// ============================================================================

/// Modbus TCP client
///
/// Holds the host and a transaction id counter; each call opens and closes
/// its own connection. The first request uses transaction id 1.
#[derive(Debug)]
pub struct TcpClient {
    host: String,
    bridge: bool,
    next_transaction_id: u16,
    transport: TcpTransport,
}

impl TcpClient {
    /// Create a client for `host` (name or address, without port)
    pub fn new(host: impl Into<String>, config: TcpConfig) -> ModbusResult<Self> {
        Ok(Self {
            host: host.into(),
            bridge: false,
            next_transaction_id: 1,
            transport: TcpTransport::new(config)?,
        })
    }

    /// Address slaves behind an Ethernet-to-serial gateway
    pub fn with_bridge(mut self, bridge: bool) -> Self {
        self.bridge = bridge;
        self
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// Get the underlying executor
    pub fn transport(&self) -> &TcpTransport {
        &self.transport
    }

    fn take_transaction_id(&mut self) -> u16 {
        let id = self.next_transaction_id;
        self.next_transaction_id = self.next_transaction_id.wrapping_add(1);
        id
    }

    /// Read with a caller-encoded body, e.g. `[start hi][start lo][count]`
    pub async fn read_raw(
        &mut self,
        slave_id: SlaveId,
        function_code: u8,
        body: &[u8],
    ) -> ModbusResult<Vec<u8>> {
        let request = ModbusRequest::raw(OperationKind::Read, slave_id, function_code, body)?;
        self.send(request).await
    }

    /// Write with a caller-encoded body
    pub async fn write_raw(
        &mut self,
        slave_id: SlaveId,
        function_code: u8,
        body: &[u8],
    ) -> ModbusResult<Vec<u8>> {
        let request = ModbusRequest::raw(OperationKind::Write, slave_id, function_code, body)?;
        self.send(request).await
    }

    async fn send(&mut self, request: ModbusRequest) -> ModbusResult<Vec<u8>> {
        let request = request
            .with_transaction_id(self.take_transaction_id())
            .with_bridge(self.bridge);
        self.transport.execute(&self.host, &request).await
    }
}

impl ModbusClient for TcpClient {
    async fn read(
        &mut self,
        slave_id: SlaveId,
        function_code: u8,
        start: u16,
        quantity: u16,
    ) -> ModbusResult<Vec<u8>> {
        let request = ModbusRequest::read(slave_id, function_code, start, quantity)?;
        self.send(request).await
    }

    async fn write(
        &mut self,
        slave_id: SlaveId,
        function_code: u8,
        start: u16,
        quantity: u16,
        data: &[u8],
    ) -> ModbusResult<Vec<u8>> {
        let request = ModbusRequest::write(slave_id, function_code, start, quantity, data)?;
        self.send(request).await
    }

    fn response_handling(&self) -> ResponseHandling {
        ResponseHandling::Passthrough
    }

    fn get_stats(&self) -> TransportStats {
        self.transport.stats()
    }
}

/// Conversions between transaction results and typed values
pub mod utils {
    use super::*;
    use crate::exception::ModbusException;
    use crate::pdu::ModbusPdu;

    /// Data bytes of a read reply (after the byte count)
    ///
    /// Validated results already are the data. Passthrough results are a
    /// full TCP ADU: the MBAP header is skipped, exception replies and
    /// function code mismatches are turned into errors, and the byte count
    /// is checked against what was received.
    pub fn response_data(
        handling: ResponseHandling,
        function_code: u8,
        response: &[u8],
    ) -> ModbusResult<&[u8]> {
        match handling {
            ResponseHandling::Validated => Ok(response),
            ResponseHandling::Passthrough => {
                let body = tcp_reply_body(function_code, response)?;
                let (&byte_count, data) = body.split_first().ok_or_else(|| {
                    ModbusError::unspecified("Read reply without byte count")
                })?;
                data.get(..byte_count as usize).ok_or_else(|| {
                    ModbusError::unspecified(format!(
                        "Byte count {} exceeds {} bytes received",
                        byte_count,
                        data.len()
                    ))
                })
            }
        }
    }

    /// Check a write reply for an exception or a mismatched function code
    pub fn check_write_reply(
        handling: ResponseHandling,
        function_code: u8,
        response: &[u8],
    ) -> ModbusResult<()> {
        match handling {
            ResponseHandling::Validated => Ok(()),
            ResponseHandling::Passthrough => tcp_reply_body(function_code, response).map(|_| ()),
        }
    }

    /// PDU bytes after the function code of a TCP reply
    fn tcp_reply_body(function_code: u8, response: &[u8]) -> ModbusResult<&[u8]> {
        if response.len() < MBAP_HEADER_LEN + 2 {
            return Err(ModbusError::unspecified(format!(
                "TCP reply too short: {} bytes",
                response.len()
            )));
        }
        let pdu = ModbusPdu::from_slice(&response[MBAP_HEADER_LEN + 1..])?;

        if pdu.is_exception() {
            let code = pdu.exception_code().ok_or_else(|| {
                ModbusError::unspecified("Exception reply without exception code")
            })?;
            return match ModbusException::from_u8(code) {
                Some(exception) => Err(ModbusError::exception(function_code, exception)),
                None => Err(ModbusError::unspecified(format!(
                    "Unknown exception code 0x{:02X}",
                    code
                ))),
            };
        }

        if pdu.function_code() != Some(function_code) {
            return Err(ModbusError::unspecified(format!(
                "Function code mismatch: expected {:02X}, got {:02X}",
                function_code,
                pdu.function_code().unwrap_or(0)
            )));
        }

        Ok(&response[MBAP_HEADER_LEN + 2..])
    }

    /// Unpack LSB-first coil bits, truncated to `quantity`
    pub fn unpack_bits(data: &[u8], quantity: u16) -> Vec<bool> {
        data.iter()
            .flat_map(|byte| (0..8).map(move |bit| byte & (1 << bit) != 0))
            .take(quantity as usize)
            .collect()
    }

    /// Convert big-endian byte pairs to register values
    pub fn registers_from_bytes(data: &[u8]) -> ModbusResult<Vec<u16>> {
        if data.len() % 2 != 0 {
            return Err(ModbusError::unspecified(format!(
                "Odd register data length: {}",
                data.len()
            )));
        }
        Ok(data
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect())
    }

    /// Byte count followed by big-endian register values
    ///
    /// Fails for an empty slice or more than 123 values.
    pub fn registers_to_payload(values: &[u16]) -> ModbusResult<Vec<u8>> {
        if values.is_empty() || values.len() > MAX_WRITE_REGISTERS {
            return Err(ModbusError::invalid_data(format!(
                "Invalid register count: {}",
                values.len()
            )));
        }
        let mut payload = Vec::with_capacity(1 + values.len() * 2);
        payload.push((values.len() * 2) as u8);
        for value in values {
            payload.extend_from_slice(&value.to_be_bytes());
        }
        Ok(payload)
    }
}
