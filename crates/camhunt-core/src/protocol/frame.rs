//! Binary frame codec for the XM discovery protocol.
//!
//! Wire format:
//! ```text
//! [magic:1][version:1][command_code:2][session_id:4][packet_id:4][info:2][message_type:2][payload_len:4][payload:N]
//! ```
//! Total header size: 20 bytes. All multi-byte integers are little-endian.
//!
//! JSON frames end with a two-byte terminator (`0x0A 0x00`) that is counted
//! in `payload_len`.  The probe is the only frame without a body.
//!
//! JSON bodies are written with the separators the stock configuration tool
//! uses: `", "` between members and `" : "` between key and value.

use std::io;

use serde::{de::DeserializeOwned, Serialize};
use serde_json::ser::Formatter;
use thiserror::Error;

use crate::protocol::messages::MessageType;

// ── Frame constants ───────────────────────────────────────────────────────────

/// Total size of the frame header in bytes.
pub const HEADER_SIZE: usize = 20;

/// First byte of every frame.
pub const MAGIC: u8 = 0xFF;

/// Version byte sent in every frame this tool produces.
pub const PROTOCOL_VERSION: u8 = 0x00;

/// Bytes appended after every JSON body.
pub const TERMINATOR: [u8; 2] = [0x0A, 0x00];

/// Largest body `encode_frame` accepts so that body + terminator fits `u32`.
pub const MAX_PAYLOAD_LEN: usize = u32::MAX as usize - TERMINATOR.len();

/// Errors that can occur during frame encoding or decoding.
#[derive(Debug, Error, PartialEq)]
pub enum ProtocolError {
    /// The datagram is shorter than a frame header.
    #[error("malformed frame: need at least {needed} bytes, got {available}")]
    MalformedFrame { needed: usize, available: usize },

    /// The body could not be parsed as the expected JSON object.
    #[error("payload parse error: {0}")]
    PayloadParse(String),

    /// The body is too large for the 32-bit length field.
    #[error("payload of {0} bytes does not fit the length field")]
    PayloadTooLarge(usize),

    /// A payload value could not be serialized to JSON.
    #[error("payload encode error: {0}")]
    Encode(String),
}

// ── Header ────────────────────────────────────────────────────────────────────

/// 20-byte header prepended to every frame on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    /// Always [`MAGIC`] on frames this tool produces.
    pub magic: u8,
    pub version: u8,
    /// Legacy command word; 254 on configuration pushes, otherwise 0.
    pub command_code: u16,
    pub session_id: u32,
    pub packet_id: u32,
    pub info: u16,
    /// Raw message type code; replies are correlated on this field.
    pub message_type: u16,
    /// Length of the body that follows the header.
    pub payload_length: u32,
}

impl FrameHeader {
    /// Builds the header this tool sends for `message_type`.
    pub fn for_message(message_type: MessageType, payload_length: u32) -> Self {
        Self {
            magic: MAGIC,
            version: PROTOCOL_VERSION,
            command_code: message_type.command_code(),
            session_id: 0,
            packet_id: 0,
            info: 0,
            message_type: message_type as u16,
            payload_length,
        }
    }

    /// Returns the typed message type, or `None` for codes this tool does
    /// not know.
    pub fn kind(&self) -> Option<MessageType> {
        MessageType::try_from(self.message_type).ok()
    }

    /// Appends the 20 header bytes to `buf`.
    pub fn write_to(&self, buf: &mut Vec<u8>) {
        buf.push(self.magic);
        buf.push(self.version);
        buf.extend_from_slice(&self.command_code.to_le_bytes());
        buf.extend_from_slice(&self.session_id.to_le_bytes());
        buf.extend_from_slice(&self.packet_id.to_le_bytes());
        buf.extend_from_slice(&self.info.to_le_bytes());
        buf.extend_from_slice(&self.message_type.to_le_bytes());
        buf.extend_from_slice(&self.payload_length.to_le_bytes());
    }

    /// Parses the first 20 bytes of `bytes`.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::MalformedFrame`] if fewer than 20 bytes are
    /// available.
    pub fn parse(bytes: &[u8]) -> Result<Self, ProtocolError> {
        if bytes.len() < HEADER_SIZE {
            return Err(ProtocolError::MalformedFrame {
                needed: HEADER_SIZE,
                available: bytes.len(),
            });
        }

        Ok(Self {
            magic: bytes[0],
            version: bytes[1],
            command_code: read_u16(bytes, 2),
            session_id: read_u32(bytes, 4),
            packet_id: read_u32(bytes, 8),
            info: read_u16(bytes, 12),
            message_type: read_u16(bytes, 14),
            payload_length: read_u32(bytes, 16),
        })
    }
}

/// A decoded frame: header plus the cleaned body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub header: FrameHeader,
    /// Body bytes with the terminator removed and NUL padding stripped.
    pub payload: Vec<u8>,
}

impl Frame {
    /// `true` when the header declares a non-empty body.
    pub fn has_payload(&self) -> bool {
        self.header.payload_length > 0
    }
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Encodes `payload` as a frame of `message_type`, appending the terminator.
///
/// # Errors
///
/// Returns [`ProtocolError::PayloadTooLarge`] if the body plus terminator
/// does not fit the 32-bit length field.
///
/// # Examples
///
/// ```rust
/// use camhunt_core::{decode_frame, encode_frame, MessageType};
///
/// let bytes = encode_frame(MessageType::ConfigPush, br#"{"Ret":100}"#).unwrap();
/// let frame = decode_frame(&bytes).unwrap();
/// assert_eq!(frame.header.kind(), Some(MessageType::ConfigPush));
/// assert_eq!(frame.payload, br#"{"Ret":100}"#);
/// ```
pub fn encode_frame(message_type: MessageType, payload: &[u8]) -> Result<Vec<u8>, ProtocolError> {
    if payload.len() > MAX_PAYLOAD_LEN {
        return Err(ProtocolError::PayloadTooLarge(payload.len()));
    }
    let payload_length = (payload.len() + TERMINATOR.len()) as u32;

    let mut buf = Vec::with_capacity(HEADER_SIZE + payload_length as usize);
    FrameHeader::for_message(message_type, payload_length).write_to(&mut buf);
    buf.extend_from_slice(payload);
    buf.extend_from_slice(&TERMINATOR);
    Ok(buf)
}

/// Serializes `value` to JSON and encodes it as a frame of `message_type`.
///
/// # Errors
///
/// Returns [`ProtocolError::Encode`] if serialization fails, or any error of
/// [`encode_frame`].
pub fn encode_json_frame<T: Serialize>(
    message_type: MessageType,
    value: &T,
) -> Result<Vec<u8>, ProtocolError> {
    let mut body = Vec::new();
    let mut serializer = serde_json::Serializer::with_formatter(&mut body, StockFormatter);
    value
        .serialize(&mut serializer)
        .map_err(|e| ProtocolError::Encode(e.to_string()))?;
    encode_frame(message_type, &body)
}

/// JSON formatter producing `{"A" : 1, "B" : 2}`.
struct StockFormatter;

impl Formatter for StockFormatter {
    fn begin_array_value<W: ?Sized + io::Write>(&mut self, writer: &mut W, first: bool) -> io::Result<()> {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_key<W: ?Sized + io::Write>(&mut self, writer: &mut W, first: bool) -> io::Result<()> {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        writer.write_all(b" : ")
    }
}

/// Encodes the broadcast probe: a bare header with no body.
pub fn encode_probe() -> Vec<u8> {
    let mut buf = Vec::with_capacity(HEADER_SIZE);
    FrameHeader::for_message(MessageType::Probe, 0).write_to(&mut buf);
    buf
}

/// Decodes one frame from a received datagram.
///
/// The body is the `payload_length` bytes after the header, clipped to what
/// was actually received.  A trailing terminator is dropped and any NUL
/// padding is removed so the result can be handed to a JSON parser.
///
/// # Errors
///
/// Returns [`ProtocolError::MalformedFrame`] if `bytes` is shorter than the
/// header.
pub fn decode_frame(bytes: &[u8]) -> Result<Frame, ProtocolError> {
    let header = FrameHeader::parse(bytes)?;

    let declared_end = HEADER_SIZE.saturating_add(header.payload_length as usize);
    let end = declared_end.min(bytes.len());
    let mut body = &bytes[HEADER_SIZE..end];
    if let Some(stripped) = body.strip_suffix(&TERMINATOR) {
        body = stripped;
    }

    let payload = body.iter().copied().filter(|&b| b != 0).collect();
    Ok(Frame { header, payload })
}

/// Parses a cleaned frame body as JSON.
///
/// # Errors
///
/// Returns [`ProtocolError::PayloadParse`] if the body is not valid JSON for
/// `T`.  Callers receiving broadcast traffic treat this as "skip the packet".
pub fn decode_json_payload<T: DeserializeOwned>(payload: &[u8]) -> Result<T, ProtocolError> {
    serde_json::from_slice(payload).map_err(|e| ProtocolError::PayloadParse(e.to_string()))
}

// ── Primitive helpers ─────────────────────────────────────────────────────────

fn read_u16(buf: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([buf[offset], buf[offset + 1]])
}

fn read_u32(buf: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        buf[offset],
        buf[offset + 1],
        buf[offset + 2],
        buf[offset + 3],
    ])
}

// ── Tests ─────────────────────────────────────────────────────────────────────
