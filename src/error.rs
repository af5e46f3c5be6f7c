//! Error types for Modbus master transactions
//!
//! Every failure a transaction can produce is a [`ModbusError`]. Callers that
//! only care about the broad kind of failure use [`ModbusError::category`]:
//!
//! | Category | Raised when |
//! |----------|-------------|
//! | [`ErrorCategory::Validation`] | The request is rejected before any I/O |
//! | [`ErrorCategory::Transport`] | Opening, resolving, connecting, writing or reading failed |
//! | [`ErrorCategory::Exception`] | The slave answered with an exception response |
//! | [`ErrorCategory::UnspecifiedProtocol`] | The reply did not match the request or failed its CRC |

use std::io;

use thiserror::Error;

use crate::exception::ModbusException;

/// Result alias used throughout the crate.
pub type ModbusResult<T> = Result<T, ModbusError>;

/// Broad classification of a [`ModbusError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Request rejected before any transport I/O.
    Validation,
    /// Failure reported by the underlying device or socket.
    Transport,
    /// The slave explicitly signalled a protocol exception.
    Exception,
    /// Header mismatch without exception marker, CRC failure or truncated reply.
    UnspecifiedProtocol,
}

/// Errors produced by the Modbus master.
#[derive(Debug, Error)]
pub enum ModbusError {
    /// Function code not permitted for the requested operation
    #[error("Illegal function: 0x{code:02X}")]
    InvalidFunction { code: u8 },

    /// Request data that cannot be framed
    #[error("Invalid data: {message}")]
    InvalidData { message: String },

    /// Invalid client or transport configuration
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// I/O failure on the serial device or socket
    #[error("Transport error: {0}")]
    Io(#[from] io::Error),

    /// Failed to resolve, connect or open the transport
    #[error("Connection error: {message}")]
    Connection { message: String },

    /// A transport operation exceeded its configured timeout
    #[error("Timeout during {operation} after {timeout_ms}ms")]
    Timeout { operation: String, timeout_ms: u64 },

    /// The slave answered with an exception response
    #[error("Modbus exception on function 0x{function:02X}: {exception}")]
    Exception {
        function: u8,
        exception: ModbusException,
    },

    /// Reply could not be matched to the request or failed its integrity check
    #[error("Unspecified protocol error: {message}")]
    UnspecifiedProtocol { message: String },
}

impl ModbusError {
    /// Create an illegal function error
    pub fn invalid_function(code: u8) -> Self {
        Self::InvalidFunction { code }
    }

    /// Create an invalid data error
    pub fn invalid_data<S: Into<String>>(message: S) -> Self {
        Self::InvalidData {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a connection error
    pub fn connection<S: Into<String>>(message: S) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Create a timeout error
    pub fn timeout<S: Into<String>>(operation: S, timeout_ms: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            timeout_ms,
        }
    }

    /// Create an exception error for a slave exception response
    pub fn exception(function: u8, exception: ModbusException) -> Self {
        Self::Exception {
            function,
            exception,
        }
    }

    /// Create an unspecified protocol error
    pub fn unspecified<S: Into<String>>(message: S) -> Self {
        Self::UnspecifiedProtocol {
            message: message.into(),
        }
    }

    /// Get the error category
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidFunction { .. } | Self::InvalidData { .. } | Self::Configuration { .. } => {
                ErrorCategory::Validation
            }
            Self::Io(_) | Self::Connection { .. } | Self::Timeout { .. } => {
                ErrorCategory::Transport
            }
            Self::Exception { .. } => ErrorCategory::Exception,
            Self::UnspecifiedProtocol { .. } => ErrorCategory::UnspecifiedProtocol,
        }
    }

    /// The slave exception carried by this error, if any
    pub fn as_exception(&self) -> Option<ModbusException> {
        match self {
            Self::Exception { exception, .. } => Some(*exception),
            _ => None,
        }
    }

    /// Check if this is a transport timeout
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categories() {
        assert_eq!(
            ModbusError::invalid_function(0x2B).category(),
            ErrorCategory::Validation
        );
        assert_eq!(
            ModbusError::invalid_data("too long").category(),
            ErrorCategory::Validation
        );
        assert_eq!(
            ModbusError::timeout("read response", 100).category(),
            ErrorCategory::Transport
        );
        assert_eq!(
            ModbusError::from(io::Error::from(io::ErrorKind::BrokenPipe)).category(),
            ErrorCategory::Transport
        );
        assert_eq!(
            ModbusError::exception(0x03, ModbusException::SlaveDeviceBusy).category(),
            ErrorCategory::Exception
        );
        assert_eq!(
            ModbusError::unspecified("crc").category(),
            ErrorCategory::UnspecifiedProtocol
        );
    }

    #[test]
    fn test_display() {
        let err = ModbusError::invalid_function(0x2B);
        assert_eq!(err.to_string(), "Illegal function: 0x2B");

        let err = ModbusError::timeout("read response", 250);
        assert_eq!(err.to_string(), "Timeout during read response after 250ms");
        assert!(err.is_timeout());
    }

    #[test]
    fn test_as_exception() {
        let err = ModbusError::exception(0x01, ModbusException::DataAddress);
        assert_eq!(err.as_exception(), Some(ModbusException::DataAddress));
        assert_eq!(ModbusError::unspecified("x").as_exception(), None);
    }
}
