//! Modbus exception table
//!
//! Exception responses carry a single code byte. The mapping from code to
//! [`ModbusException`] is a `static` table fixed at compile time, so lookups
//! from any number of threads need no synchronization.

use std::fmt;

use crate::constants::*;

/// Exceptions a slave can signal in reply to a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ModbusException {
    /// The function code is not an allowable action for the slave
    IllegalFunction = EXCEPTION_ILLEGAL_FUNCTION,
    /// The data address is not an allowable address for the slave
    DataAddress = EXCEPTION_DATA_ADDRESS,
    /// A value in the query data field is not allowable for the slave
    DataValue = EXCEPTION_DATA_VALUE,
    /// Unrecoverable error while the slave performed the action
    SlaveDeviceFailure = EXCEPTION_SLAVE_DEVICE_FAILURE,
    /// Request accepted, processing will take a long time
    Acknowledge = EXCEPTION_ACKNOWLEDGE,
    /// Slave is processing a long-duration command
    SlaveDeviceBusy = EXCEPTION_SLAVE_DEVICE_BUSY,
    /// Parity error detected in extended memory
    MemoryParityError = EXCEPTION_MEMORY_PARITY_ERROR,
    /// Gateway could not allocate a path to the target
    GatewayPathUnavailable = EXCEPTION_GATEWAY_PATH_UNAVAILABLE,
    /// Gateway got no response from the target device
    GatewayTargetDeviceFailedToRespond = EXCEPTION_GATEWAY_TARGET_FAILED,
}

/// Every exception code understood by the master.
pub static EXCEPTION_TABLE: [(u8, ModbusException); 9] = [
    (EXCEPTION_ILLEGAL_FUNCTION, ModbusException::IllegalFunction),
    (EXCEPTION_DATA_ADDRESS, ModbusException::DataAddress),
    (EXCEPTION_DATA_VALUE, ModbusException::DataValue),
    (EXCEPTION_SLAVE_DEVICE_FAILURE, ModbusException::SlaveDeviceFailure),
    (EXCEPTION_ACKNOWLEDGE, ModbusException::Acknowledge),
    (EXCEPTION_SLAVE_DEVICE_BUSY, ModbusException::SlaveDeviceBusy),
    (EXCEPTION_MEMORY_PARITY_ERROR, ModbusException::MemoryParityError),
    (EXCEPTION_GATEWAY_PATH_UNAVAILABLE, ModbusException::GatewayPathUnavailable),
    (
        EXCEPTION_GATEWAY_TARGET_FAILED,
        ModbusException::GatewayTargetDeviceFailedToRespond,
    ),
];

impl ModbusException {
    /// Look up an exception code in [`EXCEPTION_TABLE`]
    pub fn from_u8(code: u8) -> Option<Self> {
        EXCEPTION_TABLE
            .iter()
            .find(|(entry, _)| *entry == code)
            .map(|(_, exception)| *exception)
    }

    /// Convert to u8
    pub fn to_u8(self) -> u8 {
        self as u8
    }

    /// Get human-readable description
    pub fn description(self) -> &'static str {
        match self {
            Self::IllegalFunction => "illegal function",
            Self::DataAddress => "illegal data address",
            Self::DataValue => "illegal data value",
            Self::SlaveDeviceFailure => "slave device failure",
            Self::Acknowledge => "acknowledge",
            Self::SlaveDeviceBusy => "slave device busy",
            Self::MemoryParityError => "memory parity error",
            Self::GatewayPathUnavailable => "gateway path unavailable",
            Self::GatewayTargetDeviceFailedToRespond => {
                "gateway target device failed to respond"
            }
        }
    }
}

impl fmt::Display for ModbusException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (0x{:02X})", self.description(), self.to_u8())
    }
}
