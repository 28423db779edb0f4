//! Transport layer for lock controller communication.
//!
//! This module provides the abstraction over the byte channel.
//! Currently only USB/Serial is implemented.

pub mod serial;

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use bytes::Bytes;

use crate::error::Result;

/// Trait for transport implementations.
///
/// The channel is exclusively owned by one caller; the protocol permits a
/// single in-flight exchange at a time, so there is nothing to synchronize.
pub trait Transport: Send {
    /// Connects to the device.
    fn connect(&mut self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;

    /// Disconnects from the device, releasing the channel.
    fn disconnect(&mut self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;

    /// Writes one frame to the channel.
    fn send(&mut self, data: Bytes) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;

    /// Reads whatever bytes are available within the window.
    ///
    /// An empty buffer means the window elapsed with no data, which is a
    /// normal outcome, not an error.
    fn recv(
        &mut self,
        timeout: Duration,
    ) -> Pin<Box<dyn Future<Output = Result<Bytes>> + Send + '_>>;

    /// Returns true if connected.
    fn is_connected(&self) -> bool;
}

pub use serial::SerialTransport;
