//! Reply model for frames received from the controller.

use std::fmt;

use bytes::Bytes;

/// A decoded reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// Unit address the reply carries, when the frame names one.
    pub address: Option<String>,
    /// Decoded reply status or payload.
    pub status: Status,
}

/// Known reply forms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    /// Keepalive acknowledgment.
    Pong,
    /// Unit accepted an address assignment.
    Identified,
    /// Lock channel opened.
    ChannelOpened,
    /// Lock channel closed by the user.
    ChannelClosed,
    /// Reset acknowledged.
    ResetAck,
    /// Badge read from the attached card reader.
    Card(String),
    /// Well-formed but unrecognized body, passed through.
    Data(Bytes),
}

impl Status {
    /// Maps a positional ack code to its status.
    #[must_use]
    pub(crate) fn from_ack_code(code: &[u8]) -> Option<Self> {
        match code {
            b"OKO" => Some(Self::ChannelOpened),
            b"RE" => Some(Self::ChannelClosed),
            b"RS" => Some(Self::ResetAck),
            _ => None,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pong => write!(f, "pong"),
            Self::Identified => write!(f, "identified"),
            Self::ChannelOpened => write!(f, "channel opened"),
            Self::ChannelClosed => write!(f, "channel closed"),
            Self::ResetAck => write!(f, "reset acknowledged"),
            Self::Card(id) => write!(f, "card {id}"),
            Self::Data(bytes) => write!(f, "data {}", hex::encode(bytes)),
        }
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.address {
            Some(address) => write!(f, "unit {address}: {}", self.status),
            None => write!(f, "{}", self.status),
        }
    }
}
