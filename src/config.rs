//! # Transport Configuration
//!
//! Timing and framing settings for the RTU and TCP transaction executors.
//!
//! ## Defaults
//!
//! | Setting | RTU | TCP |
//! |---------|-----|-----|
//! | Settle delay (write to first read) | 300 ms | - |
//! | Response / read timeout | 1000 ms | 5000 ms |
//! | Connect timeout | - | 5000 ms |
//! | Max reply size | 256 bytes | 260 bytes |
//! | Port | - | 502 |
//!
//! Serial line parameters (baud rate) are given when the device is opened.

use std::time::Duration;

use crate::constants::{
    DEFAULT_RESPONSE_TIMEOUT, DEFAULT_SETTLE_DELAY, DEFAULT_TCP_PORT, DEFAULT_TCP_TIMEOUT,
    MAX_RTU_FRAME_SIZE, MAX_TCP_FRAME_SIZE,
};
use crate::error::{ModbusError, ModbusResult};

/// RTU executor settings.
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use modbus_master::RtuConfig;
///
/// // A fast device on a short bus
/// let config = RtuConfig::new()
///     .with_settle_delay(Duration::from_millis(20))
///     .with_packet_logging(true);
///
/// assert_eq!(config.settle_delay, Duration::from_millis(20));
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RtuConfig {
    /// Wait between writing a request and the first read.
    pub settle_delay: Duration,
    /// Upper bound on reading the reply, starting after the settle delay.
    pub response_timeout: Duration,
    /// Largest reply accepted, in bytes.
    pub max_frame_size: usize,
    /// Log every frame sent and received as hex at `info` level.
    pub packet_logging: bool,
}

impl RtuConfig {
    /// Create a config with the default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the settle delay. `Duration::ZERO` reads immediately.
    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    /// Set the response timeout.
    pub fn with_response_timeout(mut self, timeout: Duration) -> Self {
        self.response_timeout = timeout;
        self
    }

    /// Set the maximum reply size.
    pub fn with_max_frame_size(mut self, size: usize) -> Self {
        self.max_frame_size = size;
        self
    }

    /// Enable or disable packet logging.
    pub fn with_packet_logging(mut self, enabled: bool) -> Self {
        self.packet_logging = enabled;
        self
    }

    /// Check the settings are usable.
    pub fn validate(&self) -> ModbusResult<()> {
        if self.response_timeout.is_zero() {
            return Err(ModbusError::configuration("RTU response timeout must be non-zero"));
        }
        validate_frame_size(self.max_frame_size, MAX_RTU_FRAME_SIZE)
    }
}

impl Default for RtuConfig {
    fn default() -> Self {
        Self {
            settle_delay: DEFAULT_SETTLE_DELAY,
            response_timeout: DEFAULT_RESPONSE_TIMEOUT,
            max_frame_size: MAX_RTU_FRAME_SIZE,
            packet_logging: false,
        }
    }
}

/// TCP executor settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TcpConfig {
    /// Port appended to the host on every connect.
    pub port: u16,
    /// Upper bound on resolving and connecting.
    pub connect_timeout: Duration,
    /// Upper bound on the single reply read.
    pub read_timeout: Duration,
    /// Largest reply accepted, in bytes.
    pub max_frame_size: usize,
    /// Log every frame sent and received as hex at `info` level.
    pub packet_logging: bool,
}

impl TcpConfig {
    /// Create a config with the default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the connect timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the read timeout.
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Set the maximum reply size.
    pub fn with_max_frame_size(mut self, size: usize) -> Self {
        self.max_frame_size = size;
        self
    }

    /// Enable or disable packet logging.
    pub fn with_packet_logging(mut self, enabled: bool) -> Self {
        self.packet_logging = enabled;
        self
    }

    /// Check the settings are usable.
    pub fn validate(&self) -> ModbusResult<()> {
        if self.port == 0 {
            return Err(ModbusError::configuration("TCP port must be non-zero"));
        }
        if self.connect_timeout.is_zero() || self.read_timeout.is_zero() {
            return Err(ModbusError::configuration("TCP timeouts must be non-zero"));
        }
        validate_frame_size(self.max_frame_size, MAX_TCP_FRAME_SIZE)
    }
}

impl Default for TcpConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_TCP_PORT,
            connect_timeout: DEFAULT_TCP_TIMEOUT,
            read_timeout: DEFAULT_TCP_TIMEOUT,
            max_frame_size: MAX_TCP_FRAME_SIZE,
            packet_logging: false,
        }
    }
}

fn validate_frame_size(size: usize, max: usize) -> ModbusResult<()> {
    if size == 0 || size > max {
        return Err(ModbusError::configuration(format!(
            "max_frame_size must be in 1..={}, got {}",
            max, size
        )));
    }
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
