//! Command model for lock controller operations.
//!
//! A [`Command`] is the semantic unit to send: it is converted to exactly one
//! frame, written once, and never retried or persisted.

use bytes::Bytes;

use crate::error::FrameError;

/// Width of the address field, in ASCII digits.
pub const ADDRESS_WIDTH: usize = 2;

/// Maximum payload length representable by the delimited length field.
pub const MAX_PAYLOAD_LEN: usize = 99;

/// Operations understood by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Assign/announce a unit address.
    Identify,
    /// Request unit status.
    ReportStatus,
    /// Open a numbered lock channel.
    OpenChannel(u8),
    /// Keepalive probe.
    Ping,
    /// Raw payload passthrough.
    Raw,
}

impl Operation {
    /// ASCII mnemonic used by the positional profiles.
    #[must_use]
    pub const fn mnemonic(self) -> &'static [u8] {
        match self {
            Self::Identify => b"ID",
            Self::ReportStatus => b"RES",
            Self::OpenChannel(_) => b"OPE",
            Self::Ping | Self::Raw => b"",
        }
    }

    /// Decimal operation code used by the delimited profiles.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Ping => 0,
            Self::OpenChannel(_) => 1,
            Self::Identify => 2,
            Self::ReportStatus => 3,
            Self::Raw => 4,
        }
    }
}

/// A semantic unit to send to the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    /// Logical unit address, a short numeric string such as "01".
    pub address: String,
    /// Operation to perform.
    pub operation: Operation,
    /// Payload bytes, possibly empty.
    pub payload: Bytes,
}

impl Command {
    /// Creates a command with an empty payload.
    #[must_use]
    pub fn new(address: impl Into<String>, operation: Operation) -> Self {
        Self {
            address: address.into(),
            operation,
            payload: Bytes::new(),
        }
    }

    /// Attaches a payload.
    #[must_use]
    pub fn with_payload(mut self, payload: impl Into<Bytes>) -> Self {
        self.payload = payload.into();
        self
    }

    /// Checks that the command fits the protocol's fixed field widths.
    pub(crate) fn validate(&self) -> Result<(), FrameError> {
        if self.address.is_empty() || self.address.len() > ADDRESS_WIDTH {
            return Err(FrameError::InvalidCommand {
                reason: format!("address must be 1..={ADDRESS_WIDTH} digits"),
            });
        }
        if !self.address.bytes().all(|b| b.is_ascii_digit()) {
            return Err(FrameError::InvalidCommand {
                reason: "address must be numeric".into(),
            });
        }
        if self.payload.len() > MAX_PAYLOAD_LEN {
            return Err(FrameError::InvalidCommand {
                reason: format!("payload exceeds {MAX_PAYLOAD_LEN} bytes"),
            });
        }
        Ok(())
    }

    /// Zero-padded two-digit address for the positional profiles.
    ///
    /// Only meaningful after `validate` has passed.
    pub(crate) fn address_digits(&self) -> [u8; 2] {
        let bytes = self.address.as_bytes();
        if bytes.len() == 1 {
            [b'0', bytes[0]]
        } else {
            [bytes[0], bytes[1]]
        }
    }
}
