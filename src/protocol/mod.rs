//! Protocol definitions for lock controller communication.
//!
//! This module contains the wire-level types:
//! - Checksum schemes
//! - Command model
//! - Frame encoding/decoding for the deployed wire profiles
//! - Reply parsing

pub mod checksum;
pub mod command;
pub mod frame;
pub mod response;

pub use checksum::ChecksumScheme;
pub use command::{ADDRESS_WIDTH, Command, MAX_PAYLOAD_LEN, Operation};
pub use frame::{Profile, SEPARATOR, decode, encode};
pub use response::{Response, Status};
