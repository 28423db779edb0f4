//! # lockbus
//!
//! A Rust client for cabinet lock controller units over serial links.
//!
//! This library provides async communication with lock controller units
//! connected via USB/serial adapters.
//!
//! ## Features
//!
//! - Bit-exact codecs for the wire profiles deployed in the field
//! - Typed commands and replies instead of hand-built byte strings
//! - Bounded port discovery
//! - Comprehensive error handling
//!
//! ## Quick Start
//!
//! ```no_run
//! use lockbus::{LockPanel, Profile};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), lockbus::Error> {
//!     // Connect to a controller unit
//!     let mut panel = LockPanel::serial("/dev/ttyUSB0", Profile::Legacy);
//!     panel.connect().await?;
//!
//!     // Open lock channel 7 on unit "01"
//!     let response = panel.open_channel("01", 7).await?;
//!     println!("{response}");
//!
//!     // Disconnect
//!     panel.disconnect().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`protocol`] - Wire-level types (frames, commands, replies, checksums)
//! - [`transport`] - Transport implementations (currently USB/Serial)
//! - [`client`] - High-level [`LockPanel`] client

pub mod client;
pub mod error;
pub mod protocol;
pub mod transport;

// Re-exports for convenience
pub use client::{DEFAULT_ADDRESS, LockPanel};
pub use error::{Error, FrameError, Result};
pub use protocol::{ChecksumScheme, Command, Operation, Profile, Response, Status};
pub use transport::{
    SerialTransport, Transport,
    serial::{SerialConfig, discover_port, list_ports},
};
