//! Main [`LockPanel`] client implementation.
//!
//! This module provides the high-level [`LockPanel`] client that combines
//! the transport and the frame codec into a unified interface.
//!
//! The client owns the channel exclusively for its lifetime. The protocol
//! has no request-id multiplexing, so exactly one exchange may be in flight:
//! a write is immediately followed by one timed read, and the reply is
//! assumed to correspond to the most recent write. That assumption is a
//! property of the device firmware, carried here as-is.

use std::time::Duration;

use bytes::Bytes;

use crate::error::{Error, FrameError, Result};
use crate::protocol::{Command, Operation, Profile, Response, decode, encode};
use crate::transport::{SerialTransport, Transport, serial::SerialConfig};

/// Address used for commands that do not target a specific unit.
pub const DEFAULT_ADDRESS: &str = "01";

/// Client for communicating with a lock controller unit.
pub struct LockPanel<T> {
    transport: T,
    profile: Profile,
    read_timeout: Duration,
}

impl LockPanel<SerialTransport> {
    /// Creates a new client for a serial port.
    ///
    /// # Arguments
    ///
    /// * `port` - Serial port path (e.g., "/dev/ttyUSB0")
    /// * `profile` - Wire profile the controller speaks
    ///
    /// # Returns
    ///
    /// A new client (not yet connected).
    #[must_use]
    pub fn serial(port: impl Into<String>, profile: Profile) -> Self {
        Self::with_serial_config(SerialConfig::new(port), profile)
    }

    /// Creates a new client with custom serial configuration.
    #[must_use]
    pub fn with_serial_config(config: SerialConfig, profile: Profile) -> Self {
        let read_timeout = config.read_timeout;
        Self::new(SerialTransport::new(config), profile, read_timeout)
    }
}

impl<T: Transport> LockPanel<T> {
    /// Creates a new client with the given transport.
    pub fn new(transport: T, profile: Profile, read_timeout: Duration) -> Self {
        Self {
            transport,
            profile,
            read_timeout,
        }
    }

    /// Connects to the device.
    pub async fn connect(&mut self) -> Result<()> {
        self.transport.connect().await
    }

    /// Disconnects from the device.
    pub async fn disconnect(&mut self) -> Result<()> {
        self.transport.disconnect().await
    }

    /// Returns true if connected.
    pub fn is_connected(&self) -> bool {
        self.transport.is_connected()
    }

    /// Returns the wire profile in use.
    #[must_use]
    pub const fn profile(&self) -> Profile {
        self.profile
    }

    /// Sends a command and waits for the single corresponding reply.
    ///
    /// One write, one timed read; no retries. The caller owns re-send
    /// policy.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Timeout`] when the read window elapses with no
    /// reply, or a frame error when the reply does not decode.
    pub async fn exchange(&mut self, command: &Command) -> Result<Response> {
        let frame = encode(command, self.profile)?;
        tracing::debug!(operation = ?command.operation, "sending frame: {}", hex::encode(&frame));
        self.transport.send(frame).await?;

        let raw = self.transport.recv(self.read_timeout).await?;
        match decode(&raw, self.profile) {
            Err(FrameError::Empty) => Err(Error::Timeout {
                timeout_ms: u64::try_from(self.read_timeout.as_millis()).unwrap_or(u64::MAX),
            }),
            other => other.map_err(Error::Frame),
        }
    }

    /// Sends a command without waiting for a reply.
    pub async fn send(&mut self, command: &Command) -> Result<()> {
        let frame = encode(command, self.profile)?;
        tracing::debug!(operation = ?command.operation, "sending frame: {}", hex::encode(&frame));
        self.transport.send(frame).await
    }

    /// Polls the channel for unsolicited traffic (badge reads, lock-closed
    /// notifications).
    ///
    /// Returns `Ok(None)` when nothing arrived within the read window.
    pub async fn poll(&mut self) -> Result<Option<Response>> {
        let raw = self.transport.recv(self.read_timeout).await?;
        match decode(&raw, self.profile) {
            Ok(response) => Ok(Some(response)),
            Err(FrameError::Empty) => Ok(None),
            Err(e) => Err(Error::Frame(e)),
        }
    }

    // ==================== High-Level Commands ====================

    /// Announces an address assignment to the unit.
    ///
    /// Fire-and-forget: the unit confirms asynchronously, if at all; watch
    /// [`LockPanel::poll`] for the confirmation.
    pub async fn identify(&mut self, address: &str) -> Result<()> {
        self.send(&Command::new(address, Operation::Identify)).await
    }

    /// Requests unit status.
    pub async fn report_status(&mut self, address: &str) -> Result<Response> {
        self.exchange(&Command::new(address, Operation::ReportStatus))
            .await
    }

    /// Opens a numbered lock channel.
    pub async fn open_channel(&mut self, address: &str, channel: u8) -> Result<Response> {
        self.exchange(&Command::new(address, Operation::OpenChannel(channel)))
            .await
    }

    /// Sends a keepalive probe.
    ///
    /// The keepalive reply is NUL bytes, indistinguishable from read-buffer
    /// padding, so a live unit and a silent one both come back as `None`
    /// under the positional profiles; the delimited profiles return a
    /// proper pong.
    pub async fn ping(&mut self) -> Result<Option<Response>> {
        self.send(&Command::new(DEFAULT_ADDRESS, Operation::Ping))
            .await?;
        self.poll().await
    }

    /// Sends raw payload bytes and waits for the reply.
    pub async fn send_raw(&mut self, payload: impl Into<Bytes>) -> Result<Response> {
        self.exchange(&Command::new(DEFAULT_ADDRESS, Operation::Raw).with_payload(payload))
            .await
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::future::Future;
    use std::pin::Pin;

    use super::*;
    use crate::protocol::Status;

    /// Transport that records writes and replays scripted reads.
    #[derive(Default)]
    struct MockTransport {
        sent: Vec<Bytes>,
        replies: VecDeque<Bytes>,
        connected: bool,
    }

    impl MockTransport {
        fn scripted(replies: &[&'static [u8]]) -> Self {
            Self {
                sent: Vec::new(),
                replies: replies.iter().copied().map(Bytes::from_static).collect(),
                connected: true,
            }
        }
    }

    impl Transport for MockTransport {
        fn connect(&mut self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
            Box::pin(async move {
                self.connected = true;
                Ok(())
            })
        }

        fn disconnect(&mut self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
            Box::pin(async move {
                self.connected = false;
                Ok(())
            })
        }

        fn send(&mut self, data: Bytes) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
            Box::pin(async move {
                self.sent.push(data);
                Ok(())
            })
        }

        fn recv(
            &mut self,
            _timeout: Duration,
        ) -> Pin<Box<dyn Future<Output = Result<Bytes>> + Send + '_>> {
            Box::pin(async move { Ok(self.replies.pop_front().unwrap_or_default()) })
        }

        fn is_connected(&self) -> bool {
            self.connected
        }
    }

    fn panel(replies: &[&'static [u8]]) -> LockPanel<MockTransport> {
        LockPanel::new(
            MockTransport::scripted(replies),
            Profile::Legacy,
            Duration::from_millis(100),
        )
    }

    #[tokio::test]
    async fn test_open_channel_exchange() {
        let mut panel = panel(&[b"\x01\x0201OKO\r"]);
        let response = panel.open_channel("01", 7).await.unwrap();
        assert_eq!(response.address.as_deref(), Some("01"));
        assert_eq!(response.status, Status::ChannelOpened);
        assert_eq!(&panel.transport.sent[0][..], b"\x01\x0201OPE007\r");
    }

    #[tokio::test]
    async fn test_identify_writes_reference_frame() {
        let mut panel = panel(&[]);
        panel.identify("01").await.unwrap();
        assert_eq!(&panel.transport.sent[0][..], b"\x01\x02ID001\r");
    }

    #[tokio::test]
    async fn test_exchange_times_out_on_silence() {
        let mut panel = panel(&[]);
        let err = panel.report_status("01").await.unwrap_err();
        assert!(matches!(err, Error::Timeout { .. }));
    }

    #[tokio::test]
    async fn test_exchange_surfaces_malformed_reply() {
        let mut panel = panel(&[b"\x01\x0201OKO"]);
        let err = panel.report_status("01").await.unwrap_err();
        assert!(matches!(err, Error::Frame(FrameError::Malformed { .. })));
    }

    #[tokio::test]
    async fn test_poll_maps_silence_to_none() {
        let mut panel = panel(&[]);
        assert_eq!(panel.poll().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_poll_decodes_badge_read() {
        let mut panel = panel(&[b"\x02B12345="]);
        let response = panel.poll().await.unwrap().unwrap();
        assert_eq!(response.status, Status::Card("12345".into()));
    }

    #[tokio::test]
    async fn test_invalid_command_rejected_before_write() {
        let mut panel = panel(&[]);
        let err = panel.report_status("123").await.unwrap_err();
        assert!(matches!(
            err,
            Error::Frame(FrameError::InvalidCommand { .. })
        ));
        assert!(panel.transport.sent.is_empty());
    }
}
