//! # Transaction Executors
//!
//! One executor per transport. Each runs a single request/reply exchange:
//!
//! ```text
//! request -> encode -> write -> [RTU: settle delay] -> read -> decode -> payload
//! ```
//!
//! Function codes are classified when the [`ModbusRequest`] is built, so a
//! rejected code never reaches the byte stream. Transport failures are
//! returned as-is, without protocol interpretation, and nothing is retried.
//!
//! ## RTU
//!
//! The serial stream is passed in by the caller as any
//! `AsyncRead + AsyncWrite + Unpin` value (a `tokio_serial::SerialStream`,
//! or a scripted mock in tests). After the settle delay the executor reads
//! until the reply is complete, the stream ends, or the response timeout
//! expires. The reply is validated by [`RtuCodec`]. Bytes left on the stream
//! by an earlier reply are discarded before the next request is written.
//!
//! ```rust,no_run
//! use modbus_master::{ModbusResult, RtuConfig, RtuTransport};
//! use tokio::io::{AsyncRead, AsyncWrite};
//!
//! async fn poll_coil<S>(port: &mut S) -> ModbusResult<Vec<u8>>
//! where
//!     S: AsyncRead + AsyncWrite + Unpin,
//! {
//!     let mut transport = RtuTransport::new(RtuConfig::default())?;
//!     // Read coil 3 on slave 2
//!     transport.read(port, 2, 0x01, 3, 1).await
//! }
//! ```
//!
//! ## TCP
//!
//! Every call resolves `host:port`, connects, exchanges one frame and closes
//! the connection. The reply is returned as received (see
//! [`ResponseHandling::Passthrough`](crate::codec::ResponseHandling)).

use std::io;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::{sleep, timeout};
use tracing::{debug, warn};

use crate::codec::{expected_rtu_response_len, FrameCodec, RtuCodec, TcpCodec};
use crate::config::{RtuConfig, TcpConfig};
use crate::error::{ModbusError, ModbusResult};
use crate::logging::log_packet;
use crate::protocol::{ModbusRequest, OperationKind, SlaveId};

/// Transport statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransportStats {
    pub requests_sent: u64,
    pub responses_received: u64,
    pub errors: u64,
    pub timeouts: u64,
    pub bytes_sent: u64,
    pub bytes_received: u64,
}

impl TransportStats {
    fn record_error(&mut self, error: &ModbusError) {
        self.errors += 1;
        if error.is_timeout() {
            self.timeouts += 1;
        }
    }
}

// ============================================================================
// RTU
// ============================================================================

/// Modbus RTU transaction executor
#[derive(Debug, Clone)]
pub struct RtuTransport {
    config: RtuConfig,
    codec: RtuCodec,
    stats: TransportStats,
}

impl RtuTransport {
    /// Create an executor; fails if `config` does not validate.
    pub fn new(config: RtuConfig) -> ModbusResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            codec: RtuCodec::new(),
            stats: TransportStats::default(),
        })
    }

    pub fn config(&self) -> &RtuConfig {
        &self.config
    }

    pub fn codec(&self) -> &RtuCodec {
        &self.codec
    }

    pub fn stats(&self) -> TransportStats {
        self.stats
    }

    /// Read `quantity` items from `start` with a read function (0x01-0x04).
    pub async fn read<S>(
        &mut self,
        stream: &mut S,
        slave_id: SlaveId,
        function_code: u8,
        start: u16,
        quantity: u16,
    ) -> ModbusResult<Vec<u8>>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let request = ModbusRequest::read(slave_id, function_code, start, quantity)?;
        self.execute(stream, &request).await
    }

    /// Write with a write function (0x05, 0x06, 0x10).
    ///
    /// `quantity` fills the 16-bit field after the start address (the value
    /// itself for single writes); `data` follows it verbatim.
    pub async fn write<S>(
        &mut self,
        stream: &mut S,
        slave_id: SlaveId,
        function_code: u8,
        start: u16,
        quantity: u16,
        data: &[u8],
    ) -> ModbusResult<Vec<u8>>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let request = ModbusRequest::write(slave_id, function_code, start, quantity, data)?;
        self.execute(stream, &request).await
    }

    /// Run one transaction on `stream` and return the validated payload.
    pub async fn execute<S>(
        &mut self,
        stream: &mut S,
        request: &ModbusRequest,
    ) -> ModbusResult<Vec<u8>>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let result = self.transact(stream, request).await;
        if let Err(error) = &result {
            self.stats.record_error(error);
            debug!("RTU transaction with slave {} failed: {}", request.slave_id, error);
        }
        result
    }

    async fn transact<S>(&mut self, stream: &mut S, request: &ModbusRequest) -> ModbusResult<Vec<u8>>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let frame = self.codec.encode(request)?;

        let stale = discard_pending_input(stream, self.config.max_frame_size).await?;
        if stale > 0 {
            warn!(
                "Discarded {} stale bytes before request to slave {}",
                stale, request.slave_id
            );
        }

        if self.config.packet_logging {
            log_packet("send", &frame, "RTU", Some(request.slave_id));
        }

        stream.write_all(&frame).await?;
        stream.flush().await?;
        self.stats.requests_sent += 1;
        self.stats.bytes_sent += frame.len() as u64;

        if !self.config.settle_delay.is_zero() {
            sleep(self.config.settle_delay).await;
        }

        let response_timeout = self.config.response_timeout;
        let response = match timeout(
            response_timeout,
            read_rtu_reply(stream, request, self.config.max_frame_size),
        )
        .await
        {
            Ok(result) => result?,
            Err(_) => {
                return Err(ModbusError::timeout(
                    "read response",
                    response_timeout.as_millis() as u64,
                ))
            }
        };

        self.stats.responses_received += 1;
        self.stats.bytes_received += response.len() as u64;

        if self.config.packet_logging {
            log_packet("receive", &response, "RTU", Some(request.slave_id));
        }

        self.codec.decode(request, &response)
    }
}

/// Drop bytes already waiting on the stream, such as the tail of a reply
/// that ended the previous transaction early. Returns the number dropped.
async fn discard_pending_input<S>(stream: &mut S, chunk_size: usize) -> ModbusResult<usize>
where
    S: AsyncRead + Unpin,
{
    let mut buffer = vec![0u8; chunk_size];
    let mut discarded = 0;

    // A zero timeout still polls the read once, so only ready bytes are taken
    while let Ok(result) = timeout(Duration::ZERO, stream.read(&mut buffer)).await {
        match result? {
            0 => break,
            n => discarded += n,
        }
    }
    Ok(discarded)
}

/// Read until the RTU reply to `request` is complete, the stream ends or
/// `max_frame_size` bytes have arrived.
async fn read_rtu_reply<S>(
    stream: &mut S,
    request: &ModbusRequest,
    max_frame_size: usize,
) -> ModbusResult<Vec<u8>>
where
    S: AsyncRead + Unpin,
{
    let mut buffer = vec![0u8; max_frame_size];
    let mut received = 0;

    while received < max_frame_size {
        let n = stream.read(&mut buffer[received..]).await?;
        if n == 0 {
            if received == 0 {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "serial stream closed before reply",
                )
                .into());
            }
            break;
        }
        received += n;

        if let Some(expected) = expected_rtu_response_len(request, &buffer[..received]) {
            if received >= expected {
                break;
            }
        }
    }

    buffer.truncate(received);
    Ok(buffer)
}

// ============================================================================
// TCP
// ============================================================================

/// Modbus TCP transaction executor
#[derive(Debug, Clone)]
pub struct TcpTransport {
    config: TcpConfig,
    codec: TcpCodec,
    stats: TransportStats,
}

impl TcpTransport {
    /// Create an executor; fails if `config` does not validate.
    pub fn new(config: TcpConfig) -> ModbusResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            codec: TcpCodec::new(),
            stats: TransportStats::default(),
        })
    }

    pub fn config(&self) -> &TcpConfig {
        &self.config
    }

    pub fn codec(&self) -> &TcpCodec {
        &self.codec
    }

    pub fn stats(&self) -> TransportStats {
        self.stats
    }

    /// Read with a read function (0x01-0x04) from `host`.
    #[allow(clippy::too_many_arguments)]
    pub async fn read(
        &mut self,
        host: &str,
        transaction_id: u16,
        bridge: bool,
        slave_id: SlaveId,
        function_code: u8,
        start: u16,
        quantity: u16,
    ) -> ModbusResult<Vec<u8>> {
        let request = ModbusRequest::read(slave_id, function_code, start, quantity)?
            .with_transaction_id(transaction_id)
            .with_bridge(bridge);
        self.execute(host, &request).await
    }

    /// Write with a write function (0x05, 0x06, 0x10) to `host`.
    #[allow(clippy::too_many_arguments)]
    pub async fn write(
        &mut self,
        host: &str,
        transaction_id: u16,
        bridge: bool,
        slave_id: SlaveId,
        function_code: u8,
        start: u16,
        quantity: u16,
        data: &[u8],
    ) -> ModbusResult<Vec<u8>> {
        let request = ModbusRequest::write(slave_id, function_code, start, quantity, data)?
            .with_transaction_id(transaction_id)
            .with_bridge(bridge);
        self.execute(host, &request).await
    }

    /// Read with a caller-encoded body, e.g. `[start hi][start lo][count]`.
    pub async fn read_raw(
        &mut self,
        host: &str,
        transaction_id: u16,
        bridge: bool,
        slave_id: SlaveId,
        function_code: u8,
        body: &[u8],
    ) -> ModbusResult<Vec<u8>> {
        let request = ModbusRequest::raw(OperationKind::Read, slave_id, function_code, body)?
            .with_transaction_id(transaction_id)
            .with_bridge(bridge);
        self.execute(host, &request).await
    }

    /// Write with a caller-encoded body.
    pub async fn write_raw(
        &mut self,
        host: &str,
        transaction_id: u16,
        bridge: bool,
        slave_id: SlaveId,
        function_code: u8,
        body: &[u8],
    ) -> ModbusResult<Vec<u8>> {
        let request = ModbusRequest::raw(OperationKind::Write, slave_id, function_code, body)?
            .with_transaction_id(transaction_id)
            .with_bridge(bridge);
        self.execute(host, &request).await
    }

    /// Connect to `host`, run one transaction and close the connection.
    pub async fn execute(&mut self, host: &str, request: &ModbusRequest) -> ModbusResult<Vec<u8>> {
        // Encode before connecting so a bad request never opens a socket
        let frame = self.codec.encode(request)?;

        let mut stream = match self.connect(host).await {
            Ok(stream) => stream,
            Err(error) => {
                self.stats.record_error(&error);
                return Err(error);
            }
        };

        let result = self.transact(&mut stream, request, &frame).await;
        let result = self.record_result(request, result);

        if let Err(e) = stream.shutdown().await {
            warn!("Failed to close connection to {}: {}", host, e);
        }
        result
    }

    /// Run one transaction on an already connected stream.
    pub async fn execute_on<S>(
        &mut self,
        stream: &mut S,
        request: &ModbusRequest,
    ) -> ModbusResult<Vec<u8>>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let result = match self.codec.encode(request) {
            Ok(frame) => self.transact(stream, request, &frame).await,
            Err(error) => Err(error),
        };
        self.record_result(request, result)
    }

    fn record_result(
        &mut self,
        request: &ModbusRequest,
        result: ModbusResult<Vec<u8>>,
    ) -> ModbusResult<Vec<u8>> {
        if let Err(error) = &result {
            self.stats.record_error(error);
            debug!(
                "TCP transaction {} with unit {} failed: {}",
                request.transaction_id,
                request.unit_id(),
                error
            );
        }
        result
    }

    async fn connect(&self, host: &str) -> ModbusResult<TcpStream> {
        let address = format!("{}:{}", host, self.config.port);
        let connect_timeout = self.config.connect_timeout;

        let stream = match timeout(connect_timeout, TcpStream::connect(address.as_str())).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => {
                return Err(ModbusError::connection(format!(
                    "Failed to connect to {}: {}",
                    address, e
                )))
            }
            Err(_) => {
                return Err(ModbusError::timeout(
                    format!("connect to {}", address),
                    connect_timeout.as_millis() as u64,
                ))
            }
        };

        stream.set_nodelay(true)?;
        debug!("Connected to {}", address);
        Ok(stream)
    }

    async fn transact<S>(
        &mut self,
        stream: &mut S,
        request: &ModbusRequest,
        frame: &[u8],
    ) -> ModbusResult<Vec<u8>>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        if self.config.packet_logging {
            log_packet("send", frame, "TCP", Some(request.slave_id));
        }

        stream.write_all(frame).await?;
        stream.flush().await?;
        self.stats.requests_sent += 1;
        self.stats.bytes_sent += frame.len() as u64;

        let read_timeout = self.config.read_timeout;
        let mut buffer = vec![0u8; self.config.max_frame_size];
        let n = match timeout(read_timeout, stream.read(&mut buffer)).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(ModbusError::timeout(
                    "read response",
                    read_timeout.as_millis() as u64,
                ))
            }
        };
        if n == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "connection closed before reply",
            )
            .into());
        }
        buffer.truncate(n);

        self.stats.responses_received += 1;
        self.stats.bytes_received += n as u64;

        if self.config.packet_logging {
            log_packet("receive", &buffer, "TCP", Some(request.slave_id));
        }

        self.codec.decode(request, &buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::*;
    use crate::error::ErrorCategory;
    use crate::exception::ModbusException;
    use std::time::Duration;
    use tokio::net::TcpListener;
    use tokio_test::io::Builder;

    const READ_COIL_FRAME: [u8; 8] = [0x02, 0x01, 0x00, 0x03, 0x00, 0x01, 0x0D, 0xF9];
    const READ_COIL_REPLY: [u8; 6] = [0x02, 0x01, 0x01, 0x01, 0x90, 0x0C];

    fn rtu() -> RtuTransport {
        RtuTransport::new(
            RtuConfig::new()
                .with_settle_delay(Duration::ZERO)
                .with_response_timeout(Duration::from_millis(100)),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_rtu_read_returns_payload() {
        let mut stream = Builder::new()
            .write(&READ_COIL_FRAME)
            .read(&READ_COIL_REPLY)
            .build();

        let mut transport = rtu();
        let payload = transport.read(&mut stream, 2, FC_READ_COILS, 3, 1).await.unwrap();
        assert_eq!(payload, vec![0x01]);

        let stats = transport.stats();
        assert_eq!(stats.requests_sent, 1);
        assert_eq!(stats.responses_received, 1);
        assert_eq!(stats.bytes_sent, 8);
        assert_eq!(stats.bytes_received, 6);
        assert_eq!(stats.errors, 0);
    }

    #[tokio::test]
    async fn test_rtu_reply_in_fragments() {
        let mut stream = Builder::new()
            .write(&[0x01, 0x03, 0x00, 0x00, 0x00, 0x02, 0xC4, 0x0B])
            .read(&[0x01, 0x03])
            .read(&[0x04, 0x00, 0x0A])
            .read(&[0x01, 0x02, 0x5A, 0x60])
            .build();

        let payload = rtu()
            .read(&mut stream, 1, FC_READ_HOLDING_REGISTERS, 0, 2)
            .await
            .unwrap();
        assert_eq!(payload, vec![0x00, 0x0A, 0x01, 0x02]);
    }

    #[tokio::test]
    async fn test_rtu_exception_reply() {
        let mut stream = Builder::new()
            .write(&READ_COIL_FRAME)
            .read(&[0x02, 0x81, 0x02, 0x31, 0x91])
            .build();

        let mut transport = rtu();
        let err = transport
            .read(&mut stream, 2, FC_READ_COILS, 3, 1)
            .await
            .unwrap_err();
        assert_eq!(err.as_exception(), Some(ModbusException::DataAddress));
        assert_eq!(transport.stats().errors, 1);
    }

    #[tokio::test]
    async fn test_rtu_invalid_function_performs_no_io() {
        // Any write would fail the mock
        let mut stream = Builder::new().build();

        let mut transport = rtu();
        let err = transport
            .read(&mut stream, 2, FC_WRITE_SINGLE_REGISTER, 3, 1)
            .await
            .unwrap_err();
        assert!(matches!(err, ModbusError::InvalidFunction { code: 0x06 }));
        assert_eq!(transport.stats().requests_sent, 0);

        let err = transport
            .write(&mut stream, 2, FC_ENCAPSULATED_INTERFACE, 0, 0, &[])
            .await
            .unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Validation);
    }

    #[tokio::test]
    async fn test_rtu_stream_closed() {
        let mut stream = Builder::new().write(&READ_COIL_FRAME).build();

        let err = rtu()
            .read(&mut stream, 2, FC_READ_COILS, 3, 1)
            .await
            .unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Transport);
    }

    #[tokio::test]
    async fn test_rtu_partial_reply_then_close() {
        let mut stream = Builder::new()
            .write(&READ_COIL_FRAME)
            .read(&[0x02, 0x01, 0x01])
            .build();

        let err = rtu()
            .read(&mut stream, 2, FC_READ_COILS, 3, 1)
            .await
            .unwrap_err();
        assert_eq!(err.category(), ErrorCategory::UnspecifiedProtocol);
    }

    #[tokio::test]
    async fn test_rtu_write_error_is_transport() {
        let mut stream = Builder::new()
            .write_error(io::Error::new(io::ErrorKind::BrokenPipe, "unplugged"))
            .build();

        let err = rtu()
            .read(&mut stream, 2, FC_READ_COILS, 3, 1)
            .await
            .unwrap_err();
        assert!(matches!(err, ModbusError::Io(_)));
    }

    #[tokio::test]
    async fn test_rtu_response_timeout() {
        let (mut client, mut device) = tokio::io::duplex(64);

        let mut transport = rtu();
        let err = transport
            .read(&mut client, 2, FC_READ_COILS, 3, 1)
            .await
            .unwrap_err();
        assert!(err.is_timeout());
        assert_eq!(err.category(), ErrorCategory::Transport);
        assert_eq!(transport.stats().timeouts, 1);

        // The request still went out
        let mut sent = [0u8; 8];
        device.read_exact(&mut sent).await.unwrap();
        assert_eq!(sent, READ_COIL_FRAME);
    }

    #[tokio::test]
    async fn test_rtu_settle_delay_then_read() {
        let (mut client, mut device) = tokio::io::duplex(64);

        let device_task = tokio::spawn(async move {
            let mut request = [0u8; 10];
            device.read_exact(&mut request).await.unwrap();
            // Echo of the single register write with its value as payload
            device
                .write_all(&[0x02, 0x06, 0x02, 0x00, 0x01, 0x3D, 0x48])
                .await
                .unwrap();
            device
        });

        let mut transport = RtuTransport::new(
            RtuConfig::new()
                .with_settle_delay(Duration::from_millis(10))
                .with_response_timeout(Duration::from_millis(500)),
        )
        .unwrap();
        let payload = transport
            .write(&mut client, 2, FC_WRITE_SINGLE_REGISTER, 3, 1, &[0x00, 0x01])
            .await
            .unwrap();
        assert_eq!(payload, vec![0x00, 0x01]);
        device_task.await.unwrap();
    }

    #[tokio::test]
    async fn test_rtu_stale_bytes_discarded_before_request() {
        let mut stream = Builder::new()
            .read(&[0x03, 0x00, 0x01])
            .write(&READ_COIL_FRAME)
            .read(&READ_COIL_REPLY)
            .build();

        let payload = rtu().read(&mut stream, 2, FC_READ_COILS, 3, 1).await.unwrap();
        assert_eq!(payload, vec![0x01]);
    }

    #[tokio::test]
    async fn test_rtu_split_write_echo_does_not_spoil_next_transaction() {
        // A standard 0x06 echo read as `addr fc len=0 crc` stops after 5 bytes;
        // its last 3 bytes arrive later and must not reach the next reply
        let mut stream = Builder::new()
            .write(&[0x02, 0x06, 0x00, 0x03, 0x00, 0x01, 0xB8, 0x39])
            .read(&[0x02, 0x06, 0x00, 0x03, 0x00])
            .read(&[0x01, 0xB8, 0x39])
            .write(&READ_COIL_FRAME)
            .read(&READ_COIL_REPLY)
            .build();

        let mut transport = rtu();
        let err = transport
            .write(&mut stream, 2, FC_WRITE_SINGLE_REGISTER, 3, 1, &[])
            .await
            .unwrap_err();
        assert_eq!(err.category(), ErrorCategory::UnspecifiedProtocol);

        let payload = transport
            .read(&mut stream, 2, FC_READ_COILS, 3, 1)
            .await
            .unwrap();
        assert_eq!(payload, vec![0x01]);
    }

    #[tokio::test]
    async fn test_discard_pending_input_stops_when_nothing_ready() {
        let (mut client, mut device) = tokio::io::duplex(64);
        device.write_all(&[0xAA, 0xBB]).await.unwrap();

        assert_eq!(discard_pending_input(&mut client, 64).await.unwrap(), 2);
        assert_eq!(discard_pending_input(&mut client, 64).await.unwrap(), 0);
    }

    fn tcp() -> TcpTransport {
        TcpTransport::new(TcpConfig::new().with_read_timeout(Duration::from_millis(100))).unwrap()
    }

    #[tokio::test]
    async fn test_tcp_execute_on_returns_raw_reply() {
        let reply = [
            0x00, 0x01, 0x00, 0x00, 0x00, 0x07, 0x00, 0x03, 0x04, 0x00, 0x0A, 0x01, 0x02,
        ];
        let mut stream = Builder::new()
            .write(&[0x00, 0x01, 0x00, 0x00, 0x00, 0x05, 0x00, 0x03, 0x00, 0x01, 0x02])
            .read(&reply)
            .build();

        let request =
            ModbusRequest::raw(OperationKind::Read, 1, FC_READ_HOLDING_REGISTERS, &[0x00, 0x01, 0x02])
                .unwrap()
                .with_transaction_id(1);
        let response = tcp().execute_on(&mut stream, &request).await.unwrap();
        assert_eq!(response, reply.to_vec());
    }

    #[tokio::test]
    async fn test_tcp_peer_closed() {
        let mut stream = Builder::new()
            .write(&[0x00, 0x02, 0x00, 0x00, 0x00, 0x06, 0x00, 0x05, 0x00, 0xAC, 0xFF, 0x00])
            .build();

        let request = ModbusRequest::write(1, FC_WRITE_SINGLE_COIL, 0x00AC, COIL_ON, &[])
            .unwrap()
            .with_transaction_id(2);
        let err = tcp().execute_on(&mut stream, &request).await.unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Transport);
    }

    #[tokio::test]
    async fn test_tcp_read_timeout() {
        let (mut client, _server) = tokio::io::duplex(64);

        let request = ModbusRequest::read(1, FC_READ_INPUT_REGISTERS, 0, 1).unwrap();
        let mut transport = tcp();
        let err = transport.execute_on(&mut client, &request).await.unwrap_err();
        assert!(err.is_timeout());
        assert_eq!(transport.stats().timeouts, 1);
    }

    #[tokio::test]
    async fn test_tcp_round_trip_over_socket() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = [0u8; 12];
            socket.read_exact(&mut request).await.unwrap();
            // Echo the request back as the reply
            socket.write_all(&request).await.unwrap();
            request
        });

        let mut transport = TcpTransport::new(TcpConfig::new().with_port(port)).unwrap();
        let response = transport
            .write(
                "127.0.0.1",
                7,
                true,
                5,
                FC_WRITE_SINGLE_COIL,
                0x00AC,
                COIL_ON,
                &[],
            )
            .await
            .unwrap();

        let expected = [0x00, 0x07, 0x00, 0x00, 0x00, 0x06, 0x05, 0x05, 0x00, 0xAC, 0xFF, 0x00];
        assert_eq!(server.await.unwrap(), expected);
        assert_eq!(response, expected.to_vec());

        let stats = transport.stats();
        assert_eq!(stats.requests_sent, 1);
        assert_eq!(stats.bytes_sent, expected.len() as u64);
        assert_eq!(stats.errors, 0);
    }

    #[tokio::test]
    async fn test_tcp_oversized_request_rejected_before_connect() {
        let request =
            ModbusRequest::write(1, FC_WRITE_MULTIPLE_REGISTERS, 0, 1, &[0u8; 253]).unwrap();

        // Nothing listens on port 1
        let mut transport = TcpTransport::new(TcpConfig::new().with_port(1)).unwrap();
        let err = transport.execute("127.0.0.1", &request).await.unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Validation);
        assert_eq!(transport.stats().requests_sent, 0);

        let mut stream = Builder::new().build();
        let err = transport.execute_on(&mut stream, &request).await.unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Validation);
        assert_eq!(transport.stats().errors, 1);
    }

    #[tokio::test]
    async fn test_tcp_invalid_function_never_connects() {
        // Nothing listens on port 1, so reaching connect would be a Connection error
        let mut transport = TcpTransport::new(TcpConfig::new().with_port(1)).unwrap();
        let err = transport
            .read_raw("127.0.0.1", 1, false, 1, FC_WRITE_MULTIPLE_REGISTERS, &[0, 0, 1])
            .await
            .unwrap_err();
        assert!(matches!(err, ModbusError::InvalidFunction { code: 0x10 }));
    }

    #[tokio::test]
    async fn test_tcp_connection_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let mut transport = TcpTransport::new(TcpConfig::new().with_port(port)).unwrap();
        let err = transport
            .read("127.0.0.1", 1, false, 1, FC_READ_HOLDING_REGISTERS, 0, 1)
            .await
            .unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Transport);
    }
}
