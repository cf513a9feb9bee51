//! Frame weather messages into checksummed radio packets and back.
//!
//! Responsibilities:
//! - Serialize a `WeatherMessage` (bincode, varint integers, little endian)
//! - Prefix the payload with its length and CRC-64
//! - Refuse to build frames that do not fit the channel
//! - Reject short headers, length overruns, and checksum failures on decode
//!
//! ```text
//! offset 0..1    length    u16 LE  = N
//! offset 2..9    checksum  u64 LE  = CRC-64/ECMA-182 of payload
//! offset 10..    payload   N bytes
//! ```

use std::io::Cursor;

use bincode::Options;
use byteorder::{ByteOrder, LittleEndian, ReadBytesExt};

use crate::crc::crc64;
use crate::types::*;

/// Length (2) + checksum (8).
pub const HEADER_LEN: usize = 10;

/// Framed packets must be strictly shorter than this.
pub const MAX_FRAME_LEN: usize = 150;

// ---------------------------------------------------------------------------
// Packet
// ---------------------------------------------------------------------------

/// A framed payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    /// Payload byte count
    pub length: u16,
    /// CRC-64 of `payload` (header excluded)
    pub checksum: u64,
    pub payload: Vec<u8>,
}

impl Packet {
    /// Frame a serialized payload. Fails if the result would not fit the channel.
    pub fn new(payload: Vec<u8>) -> Result<Self> {
        let framed = HEADER_LEN + payload.len();
        if framed >= MAX_FRAME_LEN {
            return Err(TxwxError::TooLong(framed));
        }
        Ok(Packet {
            length: payload.len() as u16,
            checksum: crc64(&payload),
            payload,
        })
    }

    /// Total bytes on the wire.
    pub fn framed_len(&self) -> usize {
        HEADER_LEN + self.payload.len()
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = vec![0u8; self.framed_len()];
        LittleEndian::write_u16(&mut buf[0..2], self.length);
        LittleEndian::write_u64(&mut buf[2..HEADER_LEN], self.checksum);
        buf[HEADER_LEN..].copy_from_slice(&self.payload);
        buf
    }

    /// Parse the header and extract the declared payload.
    ///
    /// Bytes past the declared payload are ignored; the radio layer may
    /// hand over padded buffers. The checksum is not verified here.
    pub fn parse(raw: &[u8]) -> Result<Self> {
        if raw.len() < HEADER_LEN {
            return Err(TxwxError::MalformedHeader(raw.len()));
        }

        let mut cursor = Cursor::new(raw);
        let length = cursor.read_u16::<LittleEndian>()?;
        let checksum = cursor.read_u64::<LittleEndian>()?;

        let end = HEADER_LEN + length as usize;
        if end > raw.len() {
            return Err(TxwxError::LengthOverrun {
                declared: length as usize,
                available: raw.len() - HEADER_LEN,
            });
        }

        Ok(Packet {
            length,
            checksum,
            payload: raw[HEADER_LEN..end].to_vec(),
        })
    }

    /// Recompute the payload checksum and compare with the header.
    pub fn verify(&self) -> Result<()> {
        let computed = crc64(&self.payload);
        if computed != self.checksum {
            return Err(TxwxError::ChecksumMismatch {
                expected: self.checksum,
                computed,
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Payload serialization
// ---------------------------------------------------------------------------

pub fn serialize_message(msg: &WeatherMessage) -> Result<Vec<u8>> {
    bincode::DefaultOptions::new()
        .serialize(msg)
        .map_err(|e| TxwxError::Encode(e.to_string()))
}

/// Deserialize a payload. Trailing bytes inside the payload are an error.
pub fn deserialize_message(payload: &[u8]) -> Result<WeatherMessage> {
    bincode::DefaultOptions::new()
        .with_limit(u16::MAX as u64)
        .reject_trailing_bytes()
        .deserialize(payload)
        .map_err(|e| TxwxError::Decode(e.to_string()))
}

// ---------------------------------------------------------------------------
// Encode / decode
// ---------------------------------------------------------------------------

/// Serialize and frame a message.
pub fn encode(msg: &WeatherMessage) -> Result<Packet> {
    Packet::new(serialize_message(msg)?)
}

/// Serialize and frame a message, returning the wire bytes.
pub fn encode_frame(msg: &WeatherMessage) -> Result<Vec<u8>> {
    encode(msg).map(|p| p.to_bytes())
}

/// Parse, bounds-check, verify, and deserialize a raw radio buffer.
pub fn decode(raw: &[u8]) -> Result<WeatherMessage> {
    let packet = Packet::parse(raw)?;
    packet.verify()?;
    deserialize_message(&packet.payload)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
