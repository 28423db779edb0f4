//! Frame encoding and decoding for the controller wire profiles.
//!
//! Four incompatible profiles are deployed in the field. Each is carried as a
//! named configuration, selected per deployment; nothing sniffs magic bytes
//! to pick one at runtime.
//!
//! ```text
//! Legacy       ┌──────┬──────┬─────────────────┬──────┐
//!              │ 0x01 │ 0x02 │ positional body │ 0x0D │
//!              └──────┴──────┴─────────────────┴──────┘
//! LegacyXor    ┌──────┬─────────────────┬─────┐
//!              │ 0x01 │ positional body │ xor │
//!              └──────┴─────────────────┴─────┘
//! Delimited    ┌──────┬──────────────────────┬────┬───┬──────┐
//!              │ 0x02 │ addr;op;len;payload; │ ck │ ; │ 0x0A │
//!              └──────┴──────────────────────┴────┴───┴──────┘
//! ```
//!
//! `Delimited` and `DelimitedXor` share the field layout and differ only in
//! the checksum field: two shifted-ASCII nibbles of the modulo-256 sum
//! versus the running XOR rendered as a decimal number. Delimited checksums
//! cover every byte from the start marker through the separator after the
//! payload; the positional XOR covers the body only.

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::FrameError;
use crate::protocol::checksum::ChecksumScheme;
use crate::protocol::command::{Command, MAX_PAYLOAD_LEN, Operation};
use crate::protocol::response::{Response, Status};

/// Field separator of the delimited profiles.
pub const SEPARATOR: u8 = b';';

/// Wire profile selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Profile {
    /// Positional ASCII body, no checksum. The oldest controllers.
    #[default]
    Legacy,
    /// Positional ASCII body closed by a raw XOR byte instead of a
    /// terminator.
    LegacyXor,
    /// `;`-delimited ASCII decimal fields with a two-byte modulo-ASCII
    /// checksum.
    Delimited,
    /// `;`-delimited fields with the XOR checksum rendered as ASCII decimal.
    DelimitedXor,
}

impl Profile {
    /// Start-of-frame sentinel bytes.
    #[must_use]
    pub const fn start_marker(self) -> &'static [u8] {
        match self {
            Self::Legacy => &[0x01, 0x02],
            Self::LegacyXor => &[0x01],
            Self::Delimited | Self::DelimitedXor => &[0x02],
        }
    }

    /// Trailing terminator bytes, empty for `LegacyXor`.
    #[must_use]
    pub const fn terminator(self) -> &'static [u8] {
        match self {
            Self::Legacy => b"\r",
            Self::LegacyXor => b"",
            Self::Delimited | Self::DelimitedXor => b"\n",
        }
    }

    /// Checksum scheme carried by this profile.
    #[must_use]
    pub const fn checksum(self) -> ChecksumScheme {
        match self {
            Self::Legacy => ChecksumScheme::None,
            Self::LegacyXor => ChecksumScheme::Xor,
            Self::Delimited => ChecksumScheme::ModuloAscii,
            Self::DelimitedXor => ChecksumScheme::XorDecimal,
        }
    }

    const fn is_delimited(self) -> bool {
        matches!(self, Self::Delimited | Self::DelimitedXor)
    }
}

/// Encodes a command into the exact byte sequence to transmit.
///
/// Deterministic for given inputs; no hidden state.
///
/// # Errors
///
/// Returns [`FrameError::InvalidCommand`] when the address or payload does
/// not fit the profile's fixed field widths.
pub fn encode(command: &Command, profile: Profile) -> Result<Bytes, FrameError> {
    command.validate()?;

    if profile.is_delimited() {
        encode_delimited(command, profile)
    } else {
        encode_positional(command, profile)
    }
}

fn encode_positional(command: &Command, profile: Profile) -> Result<Bytes, FrameError> {
    // The keepalive is two bare NUL bytes with no framing at all.
    if command.operation == Operation::Ping {
        return Ok(Bytes::from_static(&[0x00, 0x00]));
    }

    let addr = command.address_digits();
    let mut body = BytesMut::with_capacity(8 + command.payload.len());
    match command.operation {
        Operation::Identify => {
            body.put_slice(Operation::Identify.mnemonic());
            body.put_u8(b'0');
            body.put_slice(&addr);
        }
        Operation::ReportStatus => {
            body.put_slice(&addr);
            body.put_slice(Operation::ReportStatus.mnemonic());
        }
        Operation::OpenChannel(channel) => {
            if channel > 99 {
                return Err(FrameError::InvalidCommand {
                    reason: format!("channel {channel} exceeds two digits"),
                });
            }
            body.put_slice(&addr);
            body.put_slice(command.operation.mnemonic());
            body.put_u8(b'0');
            body.put_slice(&two_digits(channel));
        }
        // raw passes the payload straight through; ping returned above
        Operation::Raw | Operation::Ping => {}
    }
    body.put_slice(&command.payload);

    let mut frame = BytesMut::with_capacity(4 + body.len());
    frame.put_slice(profile.start_marker());
    frame.put_slice(&body);
    frame.put_slice(&profile.checksum().render(&body));
    frame.put_slice(profile.terminator());
    Ok(frame.freeze())
}

fn encode_delimited(command: &Command, profile: Profile) -> Result<Bytes, FrameError> {
    let payload = delimited_payload(command);
    if payload.len() > MAX_PAYLOAD_LEN {
        return Err(FrameError::InvalidCommand {
            reason: format!("payload exceeds {MAX_PAYLOAD_LEN} bytes"),
        });
    }

    let mut body = BytesMut::with_capacity(16 + payload.len());
    body.put_slice(profile.start_marker());
    body.put_slice(command.address.as_bytes());
    body.put_u8(SEPARATOR);
    body.put_slice(command.operation.code().to_string().as_bytes());
    body.put_u8(SEPARATOR);
    body.put_slice(payload.len().to_string().as_bytes());
    body.put_u8(SEPARATOR);
    body.put_slice(&payload);
    body.put_u8(SEPARATOR);

    let field = profile.checksum().render(&body);
    let mut frame = body;
    frame.put_slice(&field);
    frame.put_u8(SEPARATOR);
    frame.put_slice(profile.terminator());
    Ok(frame.freeze())
}

/// Payload as carried by the delimited field layout: open-channel folds the
/// channel number into the payload field, everything else passes the payload
/// through.
fn delimited_payload(command: &Command) -> Vec<u8> {
    match command.operation {
        Operation::OpenChannel(channel) => {
            let mut out = Vec::with_capacity(2 + command.payload.len());
            out.extend_from_slice(&two_digits(channel));
            out.extend_from_slice(&command.payload);
            out
        }
        _ => command.payload.to_vec(),
    }
}

fn two_digits(n: u8) -> [u8; 2] {
    [b'0' + n / 10, b'0' + n % 10]
}

/// Decodes raw bytes read from the channel into a [`Response`].
///
/// Trailing NUL padding from fixed-size read buffers is stripped first.
///
/// # Errors
///
/// - [`FrameError::Empty`] when nothing meaningful remains; the caller
///   decides whether that means "no data yet".
/// - [`FrameError::Malformed`] when the terminator is missing or the field
///   structure is wrong.
/// - [`FrameError::ChecksumMismatch`] when a checksum field is present and
///   does not verify.
pub fn decode(bytes: &[u8], profile: Profile) -> Result<Response, FrameError> {
    let end = bytes
        .iter()
        .rposition(|&b| b != 0x00)
        .map_or(0, |pos| pos + 1);
    let trimmed = &bytes[..end];
    if trimmed.is_empty() {
        return Err(FrameError::Empty);
    }

    if profile.is_delimited() {
        decode_delimited(trimmed, profile)
    } else {
        decode_positional(trimmed, profile)
    }
}

fn decode_positional(bytes: &[u8], profile: Profile) -> Result<Response, FrameError> {
    match bytes[0] {
        // Keepalive ack; the unit flushes junk after the leading byte.
        0x00 => Ok(Response {
            address: None,
            status: Status::Pong,
        }),
        0x01 => {
            let body: &[u8] = if profile == Profile::LegacyXor {
                let inner = &bytes[1..];
                if inner.len() < 2 {
                    return Err(FrameError::Malformed {
                        reason: "frame too short".into(),
                    });
                }
                let (body, field) = inner.split_at(inner.len() - 1);
                ChecksumScheme::Xor.verify(body, field)?;
                body
            } else {
                let Some(pos) = bytes.iter().position(|&b| b == 0x02) else {
                    return Err(FrameError::Malformed {
                        reason: "start marker not closed".into(),
                    });
                };
                let inner = &bytes[pos + 1..];
                let Some(body) = inner.strip_suffix(b"\r") else {
                    return Err(FrameError::Malformed {
                        reason: "missing terminator".into(),
                    });
                };
                body
            };
            parse_ack(body)
        }
        // Badge frame: 0x02 'B' <id...> '='
        0x02 => {
            let inner = &bytes[1..];
            let Some(end) = inner.iter().position(|&b| b == b'=') else {
                return Err(FrameError::Malformed {
                    reason: "unterminated badge frame".into(),
                });
            };
            let id = inner.get(1..end).unwrap_or_default();
            Ok(Response {
                address: None,
                status: Status::Card(String::from_utf8_lossy(id).into_owned()),
            })
        }
        // Badge frame, raw variant: the whole tail is the card id.
        0x03 => {
            let id = bytes[1..].strip_suffix(b"\r").unwrap_or(&bytes[1..]);
            Ok(Response {
                address: None,
                status: Status::Card(String::from_utf8_lossy(id).into_owned()),
            })
        }
        other => Err(FrameError::Malformed {
            reason: format!("unknown frame type 0x{other:02x}"),
        }),
    }
}

fn parse_ack(body: &[u8]) -> Result<Response, FrameError> {
    if body.is_empty() {
        return Err(FrameError::Malformed {
            reason: "empty ack body".into(),
        });
    }

    // Address-less identify confirmation comes back as a bare "OK".
    if body.starts_with(b"OK") && !body.starts_with(b"OKO") {
        return Ok(Response {
            address: None,
            status: Status::Identified,
        });
    }

    if body.len() > 2 && body[0].is_ascii_digit() && body[1].is_ascii_digit() {
        let address = String::from_utf8_lossy(&body[..2]).into_owned();
        let code = &body[2..];
        let status = Status::from_ack_code(code)
            .unwrap_or_else(|| Status::Data(Bytes::copy_from_slice(code)));
        return Ok(Response {
            address: Some(address),
            status,
        });
    }

    Ok(Response {
        address: None,
        status: Status::Data(Bytes::copy_from_slice(body)),
    })
}

fn decode_delimited(bytes: &[u8], profile: Profile) -> Result<Response, FrameError> {
    let Some(content) = bytes
        .strip_suffix(b"\n")
        .map(|c| c.strip_suffix(b"\r").unwrap_or(c))
    else {
        return Err(FrameError::Malformed {
            reason: "missing terminator".into(),
        });
    };
    if content.first() != Some(&0x02) {
        return Err(FrameError::Malformed {
            reason: "missing start marker".into(),
        });
    }

    let (address, rest) = split_field(&content[1..])?;
    let (op_field, rest) = split_field(rest)?;
    let (len_field, rest) = split_field(rest)?;
    let len = parse_decimal(len_field)? as usize;
    if rest.len() < len + 1 {
        return Err(FrameError::Malformed {
            reason: "truncated payload".into(),
        });
    }
    let (payload, rest) = rest.split_at(len);
    let Some(rest) = rest.strip_prefix(&[SEPARATOR]) else {
        return Err(FrameError::Malformed {
            reason: "payload length disagrees with length field".into(),
        });
    };
    let (field, rest) = split_field(rest)?;
    if !rest.is_empty() {
        return Err(FrameError::Malformed {
            reason: "trailing bytes after checksum".into(),
        });
    }

    // Everything from the start marker through the separator after the
    // payload is covered.
    let covered = content.len() - field.len() - 1;
    profile.checksum().verify(&content[..covered], field)?;

    let status = match parse_decimal(op_field)? {
        0 => Status::Pong,
        4 => Status::Card(String::from_utf8_lossy(payload).into_owned()),
        _ => Status::Data(Bytes::copy_from_slice(payload)),
    };
    Ok(Response {
        address: Some(String::from_utf8_lossy(address).into_owned()),
        status,
    })
}

fn split_field(bytes: &[u8]) -> Result<(&[u8], &[u8]), FrameError> {
    let Some(pos) = bytes.iter().position(|&b| b == SEPARATOR) else {
        return Err(FrameError::Malformed {
            reason: "missing field separator".into(),
        });
    };
    Ok((&bytes[..pos], &bytes[pos + 1..]))
}

fn parse_decimal(field: &[u8]) -> Result<u32, FrameError> {
    if field.is_empty() || field.len() > 3 || !field.iter().all(|b| b.is_ascii_digit()) {
        return Err(FrameError::Malformed {
            reason: "non-numeric field".into(),
        });
    }
    Ok(field
        .iter()
        .fold(0u32, |acc, &b| acc * 10 + u32::from(b - b'0')))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::checksum::{modulo_ascii, xor};

    #[test]
    fn test_encode_report_status_reference_frame() {
        let cmd = Command::new("01", Operation::ReportStatus);
        let frame = encode(&cmd, Profile::Legacy).unwrap();
        assert_eq!(&frame[..], b"\x01\x0201RES\r");
    }

    #[test]
    fn test_encode_identify_reference_frame() {
        let cmd = Command::new("01", Operation::Identify);
        let frame = encode(&cmd, Profile::Legacy).unwrap();
        assert_eq!(&frame[..], b"\x01\x02ID001\r");
    }

    #[test]
    fn test_encode_open_channel() {
        let cmd = Command::new("01", Operation::OpenChannel(7));
        let frame = encode(&cmd, Profile::Legacy).unwrap();
        assert_eq!(&frame[..], b"\x01\x0201OPE007\r");
    }

    #[test]
    fn test_encode_ping_is_bare_nuls() {
        let cmd = Command::new("00", Operation::Ping);
        let frame = encode(&cmd, Profile::Legacy).unwrap();
        assert_eq!(&frame[..], &[0x00, 0x00]);
    }

    #[test]
    fn test_encode_legacy_xor_appends_checksum() {
        let cmd = Command::new("01", Operation::ReportStatus);
        let frame = encode(&cmd, Profile::LegacyXor).unwrap();
        assert_eq!(frame[0], 0x01);
        assert_eq!(&frame[1..6], b"01RES");
        assert_eq!(frame[6], xor(b"01RES"));
        assert_eq!(frame.len(), 7);
    }

    #[test]
    fn test_encode_delimited_layout() {
        let cmd = Command::new("01", Operation::ReportStatus);
        let frame = encode(&cmd, Profile::Delimited).unwrap();
        let ck = modulo_ascii(b"\x0201;3;0;;");
        let mut expected = b"\x0201;3;0;;".to_vec();
        expected.extend_from_slice(&ck);
        expected.extend_from_slice(b";\n");
        assert_eq!(&frame[..], &expected[..]);
    }

    #[test]
    fn test_encode_delimited_xor_decimal_checksum() {
        let cmd = Command::new("01", Operation::ReportStatus);
        let frame = encode(&cmd, Profile::DelimitedXor).unwrap();
        let ck = xor(b"\x0201;3;0;;").to_string();
        let mut expected = b"\x0201;3;0;;".to_vec();
        expected.extend_from_slice(ck.as_bytes());
        expected.extend_from_slice(b";\n");
        assert_eq!(&frame[..], &expected[..]);
    }

    #[test]
    fn test_encode_deterministic() {
        let cmd = Command::new("01", Operation::OpenChannel(3)).with_payload(&b"ab"[..]);
        assert_eq!(
            encode(&cmd, Profile::Delimited).unwrap(),
            encode(&cmd, Profile::Delimited).unwrap()
        );
    }

    #[test]
    fn test_encode_rejects_wide_address() {
        let cmd = Command::new("123", Operation::Identify);
        assert!(matches!(
            encode(&cmd, Profile::Legacy),
            Err(FrameError::InvalidCommand { .. })
        ));
    }

    #[test]
    fn test_encode_rejects_overflowing_delimited_payload() {
        // 98 payload bytes plus the folded channel digits exceed the
        // two-digit length field
        let cmd = Command::new("01", Operation::OpenChannel(1)).with_payload(vec![b'x'; 98]);
        assert!(matches!(
            encode(&cmd, Profile::Delimited),
            Err(FrameError::InvalidCommand { .. })
        ));
    }

    #[test]
    fn test_decode_all_nul_buffer_is_empty() {
        assert_eq!(
            decode(&[0u8; 100], Profile::Legacy),
            Err(FrameError::Empty)
        );
        assert_eq!(decode(&[], Profile::Delimited), Err(FrameError::Empty));
    }

    #[test]
    fn test_decode_strips_nul_padding() {
        let mut buf = b"\x01\x0201OKO\r".to_vec();
        buf.resize(100, 0x00);
        let response = decode(&buf, Profile::Legacy).unwrap();
        assert_eq!(response.address.as_deref(), Some("01"));
        assert_eq!(response.status, Status::ChannelOpened);
    }

    #[test]
    fn test_decode_missing_terminator_is_malformed() {
        assert!(matches!(
            decode(b"\x01\x0201OKO", Profile::Legacy),
            Err(FrameError::Malformed { .. })
        ));
        assert!(matches!(
            decode(b"\x0201;3;0;;00;", Profile::Delimited),
            Err(FrameError::Malformed { .. })
        ));
    }

    #[test]
    fn test_decode_legacy_ack_codes() {
        let closed = decode(b"\x01\x0205RE\r", Profile::Legacy).unwrap();
        assert_eq!(closed.address.as_deref(), Some("05"));
        assert_eq!(closed.status, Status::ChannelClosed);

        let reset = decode(b"\x01\x0205RS\r", Profile::Legacy).unwrap();
        assert_eq!(reset.status, Status::ResetAck);

        let identified = decode(b"\x01\x02OK\r", Profile::Legacy).unwrap();
        assert_eq!(identified.address, None);
        assert_eq!(identified.status, Status::Identified);
    }

    #[test]
    fn test_decode_pong() {
        let response = decode(&[0x00, 0x31, 0x32], Profile::Legacy).unwrap();
        assert_eq!(response.status, Status::Pong);
    }

    #[test]
    fn test_decode_badge_frames() {
        let badge = decode(b"\x02B12345=", Profile::Legacy).unwrap();
        assert_eq!(badge.status, Status::Card("12345".into()));

        let raw = decode(b"\x0312345\r", Profile::Legacy).unwrap();
        assert_eq!(raw.status, Status::Card("12345".into()));
    }

    #[test]
    fn test_decode_legacy_round_trip() {
        let cmd = Command::new("01", Operation::ReportStatus);
        let frame = encode(&cmd, Profile::Legacy).unwrap();
        let response = decode(&frame, Profile::Legacy).unwrap();
        assert_eq!(response.address.as_deref(), Some("01"));
        assert_eq!(response.status, Status::Data(Bytes::from_static(b"RES")));
    }

    #[test]
    fn test_decode_legacy_xor_round_trip() {
        let cmd = Command::new("09", Operation::OpenChannel(4));
        let frame = encode(&cmd, Profile::LegacyXor).unwrap();
        let response = decode(&frame, Profile::LegacyXor).unwrap();
        assert_eq!(response.address.as_deref(), Some("09"));
        assert_eq!(response.status, Status::Data(Bytes::from_static(b"OPE004")));
    }

    #[test]
    fn test_decode_legacy_xor_corruption() {
        let cmd = Command::new("09", Operation::OpenChannel(4));
        let mut frame = encode(&cmd, Profile::LegacyXor).unwrap().to_vec();
        frame[2] ^= 0x20;
        assert!(matches!(
            decode(&frame, Profile::LegacyXor),
            Err(FrameError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn test_decode_delimited_round_trip() {
        let cmd = Command::new("01", Operation::ReportStatus).with_payload(&b"57"[..]);
        let frame = encode(&cmd, Profile::Delimited).unwrap();
        let response = decode(&frame, Profile::Delimited).unwrap();
        assert_eq!(response.address.as_deref(), Some("01"));
        assert_eq!(response.status, Status::Data(Bytes::from_static(b"57")));
    }

    #[test]
    fn test_decode_delimited_xor_round_trip() {
        let cmd = Command::new("02", Operation::Ping);
        let frame = encode(&cmd, Profile::DelimitedXor).unwrap();
        let response = decode(&frame, Profile::DelimitedXor).unwrap();
        assert_eq!(response.address.as_deref(), Some("02"));
        assert_eq!(response.status, Status::Pong);
    }

    #[test]
    fn test_decode_delimited_checksum_mismatch() {
        let cmd = Command::new("01", Operation::ReportStatus);
        let mut frame = encode(&cmd, Profile::Delimited).unwrap().to_vec();
        // flip a payload-adjacent byte without touching the checksum field
        frame[1] = b'9';
        let err = decode(&frame, Profile::Delimited).unwrap_err();
        assert!(matches!(err, FrameError::ChecksumMismatch { .. }));
    }

    #[test]
    fn test_decode_delimited_length_field_disagreement() {
        // length says 2 but only one payload byte precedes the separator
        let mut content = b"\x0201;3;2;x;".to_vec();
        let ck = modulo_ascii(&content);
        content.extend_from_slice(&ck);
        content.extend_from_slice(b";\n");
        assert!(matches!(
            decode(&content, Profile::Delimited),
            Err(FrameError::Malformed { .. })
        ));
    }

    #[test]
    fn test_decode_delimited_card_read() {
        // op 4 is the badge reader path
        let mut content = b"\x0200;4;5;54321;".to_vec();
        let ck = modulo_ascii(&content);
        content.extend_from_slice(&ck);
        content.extend_from_slice(b";\n");
        let response = decode(&content, Profile::Delimited).unwrap();
        assert_eq!(response.status, Status::Card("54321".into()));
    }

    #[test]
    fn test_decode_delimited_tolerates_crlf() {
        let cmd = Command::new("01", Operation::ReportStatus);
        let mut frame = encode(&cmd, Profile::Delimited).unwrap().to_vec();
        frame.pop();
        frame.extend_from_slice(b"\r\n");
        assert!(decode(&frame, Profile::Delimited).is_ok());
    }
}
