//! Modbus function codes, the read/write classifier and request values
//!
//! A [`ModbusRequest`] can only be created through a constructor that has
//! already classified its function code, so every request that reaches a
//! codec carries a function permitted for its operation kind.

use std::fmt;

use tracing::debug;

use crate::constants::*;
use crate::error::{ModbusError, ModbusResult};
use crate::pdu::{ModbusPdu, PduBuilder};

/// Modbus slave/unit identifier
pub type SlaveId = u8;

/// Function codes supported by the master
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ModbusFunction {
    /// Read Coils (0x01)
    ReadCoils = FC_READ_COILS,
    /// Read Discrete Inputs (0x02)
    ReadDiscreteInputs = FC_READ_DISCRETE_INPUTS,
    /// Read Holding Registers (0x03)
    ReadHoldingRegisters = FC_READ_HOLDING_REGISTERS,
    /// Read Input Registers (0x04)
    ReadInputRegisters = FC_READ_INPUT_REGISTERS,
    /// Write Single Coil (0x05)
    WriteSingleCoil = FC_WRITE_SINGLE_COIL,
    /// Write Single Register (0x06)
    WriteSingleRegister = FC_WRITE_SINGLE_REGISTER,
    /// Write Multiple Registers (0x10)
    WriteMultipleRegisters = FC_WRITE_MULTIPLE_REGISTERS,
}

impl ModbusFunction {
    /// Convert from u8 to ModbusFunction
    pub fn from_u8(value: u8) -> ModbusResult<Self> {
        match value {
            FC_READ_COILS => Ok(Self::ReadCoils),
            FC_READ_DISCRETE_INPUTS => Ok(Self::ReadDiscreteInputs),
            FC_READ_HOLDING_REGISTERS => Ok(Self::ReadHoldingRegisters),
            FC_READ_INPUT_REGISTERS => Ok(Self::ReadInputRegisters),
            FC_WRITE_SINGLE_COIL => Ok(Self::WriteSingleCoil),
            FC_WRITE_SINGLE_REGISTER => Ok(Self::WriteSingleRegister),
            FC_WRITE_MULTIPLE_REGISTERS => Ok(Self::WriteMultipleRegisters),
            _ => Err(ModbusError::invalid_function(value)),
        }
    }

    /// Convert to u8
    pub fn to_u8(self) -> u8 {
        self as u8
    }

    /// The operation family this function belongs to
    pub fn kind(self) -> OperationKind {
        match self {
            Self::ReadCoils
            | Self::ReadDiscreteInputs
            | Self::ReadHoldingRegisters
            | Self::ReadInputRegisters => OperationKind::Read,
            Self::WriteSingleCoil | Self::WriteSingleRegister | Self::WriteMultipleRegisters => {
                OperationKind::Write
            }
        }
    }
}

impl fmt::Display for ModbusFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ReadCoils => "Read Coils",
            Self::ReadDiscreteInputs => "Read Discrete Inputs",
            Self::ReadHoldingRegisters => "Read Holding Registers",
            Self::ReadInputRegisters => "Read Input Registers",
            Self::WriteSingleCoil => "Write Single Coil",
            Self::WriteSingleRegister => "Write Single Register",
            Self::WriteMultipleRegisters => "Write Multiple Registers",
        };
        write!(f, "{} (0x{:02X})", name, self.to_u8())
    }
}

/// Read or write transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Read,
    Write,
}

impl OperationKind {
    /// Whether `code` belongs to this operation's function set
    pub fn permits(self, code: u8) -> bool {
        match self {
            Self::Read => is_valid_read(code),
            Self::Write => is_valid_write(code),
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read => f.write_str("read"),
            Self::Write => f.write_str("write"),
        }
    }
}

/// Check whether `code` is one of the read functions (0x01-0x04)
pub fn is_valid_read(code: u8) -> bool {
    READ_FUNCTION_CODES.contains(&code)
}

/// Check whether `code` is one of the write functions (0x05, 0x06, 0x10)
pub fn is_valid_write(code: u8) -> bool {
    WRITE_FUNCTION_CODES.contains(&code)
}

/// Resolve `code` for an operation of the given kind.
///
/// Fails with [`ModbusError::InvalidFunction`] when the code is outside the
/// kind's set, including codes valid for the other kind.
pub fn classify(kind: OperationKind, code: u8) -> ModbusResult<ModbusFunction> {
    if !kind.permits(code) {
        debug!("Rejected function 0x{:02X} for {} request", code, kind);
        return Err(ModbusError::invalid_function(code));
    }
    ModbusFunction::from_u8(code)
}

/// Bytes that follow the function code in a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestBody {
    /// Start address and quantity (or 16-bit value), then any extra data bytes
    Range {
        address: u16,
        quantity: u16,
        data: Vec<u8>,
    },
    /// Caller pre-encoded bytes, sent verbatim
    Raw(Vec<u8>),
}

/// A single Modbus request
///
/// `transaction_id` and `bridge` only affect TCP framing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModbusRequest {
    pub slave_id: SlaveId,
    pub function: ModbusFunction,
    pub body: RequestBody,
    pub transaction_id: u16,
    pub bridge: bool,
}

impl ModbusRequest {
    /// Create a read request (start address + quantity)
    pub fn read(
        slave_id: SlaveId,
        function_code: u8,
        address: u16,
        quantity: u16,
    ) -> ModbusResult<Self> {
        let function = classify(OperationKind::Read, function_code)?;
        Ok(Self::with_body(
            slave_id,
            function,
            RequestBody::Range {
                address,
                quantity,
                data: Vec::new(),
            },
        ))
    }

    /// Create a write request (start address + quantity/value + data bytes)
    pub fn write(
        slave_id: SlaveId,
        function_code: u8,
        address: u16,
        quantity: u16,
        data: &[u8],
    ) -> ModbusResult<Self> {
        let function = classify(OperationKind::Write, function_code)?;
        Ok(Self::with_body(
            slave_id,
            function,
            RequestBody::Range {
                address,
                quantity,
                data: data.to_vec(),
            },
        ))
    }

    /// Create a request whose body the caller has already encoded
    ///
    /// For reads this is typically `[start hi][start lo][count]`.
    pub fn raw(
        kind: OperationKind,
        slave_id: SlaveId,
        function_code: u8,
        body: &[u8],
    ) -> ModbusResult<Self> {
        let function = classify(kind, function_code)?;
        Ok(Self::with_body(
            slave_id,
            function,
            RequestBody::Raw(body.to_vec()),
        ))
    }

    fn with_body(slave_id: SlaveId, function: ModbusFunction, body: RequestBody) -> Self {
        Self {
            slave_id,
            function,
            body,
            transaction_id: 0,
            bridge: false,
        }
    }

    /// Set the MBAP transaction id
    pub fn with_transaction_id(mut self, transaction_id: u16) -> Self {
        self.transaction_id = transaction_id;
        self
    }

    /// Address the slave through an Ethernet-to-serial gateway
    pub fn with_bridge(mut self, bridge: bool) -> Self {
        self.bridge = bridge;
        self
    }

    /// Unit id for the MBAP header
    pub fn unit_id(&self) -> u8 {
        if self.bridge {
            self.slave_id
        } else {
            TCP_UNIT_ID_NO_BRIDGE
        }
    }

    /// Build the PDU: function code followed by the body
    pub fn to_pdu(&self) -> ModbusResult<ModbusPdu> {
        let builder = PduBuilder::new().function_code(self.function.to_u8())?;
        let builder = match &self.body {
            RequestBody::Range {
                address,
                quantity,
                data,
            } => builder.address(*address)?.quantity(*quantity)?.data(data)?,
            RequestBody::Raw(body) => builder.data(body)?,
        };
        Ok(builder.build())
    }
}
