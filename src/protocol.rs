/// Exchange wire format
///
/// Two frame shapes, both fixed size:
///   - outbound request: 2 bytes, [call_type(1)][resend_sequence(1)]
///   - inbound record: 17 bytes,
///     [symbol(4)][side(1)][quantity(4)][price(4)][sequence(4)]
/// All integers are unsigned big-endian. There is no delimiter between
/// record frames on the stream.

use byteorder::{BigEndian, ByteOrder};
use serde::Serialize;

pub const RECORD_SIZE: usize = 17;
pub const REQUEST_SIZE: usize = 2;

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallType {
    /// Ask the server to emit its full current record set once.
    StreamAll = 1,
    /// Ask the server to retransmit exactly one sequence number.
    ResendOne = 2,
}

impl CallType {
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            1 => Some(CallType::StreamAll),
            2 => Some(CallType::ResendOne),
            _ => None,
        }
    }
}

/// One decoded record frame. Immutable once decoded; `sequence` is the
/// unique key assigned by the producer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Record {
    #[serde(serialize_with = "serialize_symbol")]
    pub symbol: [u8; 4],
    #[serde(serialize_with = "serialize_side")]
    pub side: u8,
    pub quantity: u32,
    /// Fixed-point; the scale is a contract with the producer, opaque here.
    pub price: u32,
    pub sequence: u32,
}

impl Record {
    /// Symbol bytes as text for display; the wire does not guarantee
    /// clean ASCII, so this is lossy.
    pub fn symbol_str(&self) -> String {
        String::from_utf8_lossy(&self.symbol).into_owned()
    }

    pub fn side_char(&self) -> char {
        self.side as char
    }
}

fn serialize_symbol<S: serde::Serializer>(symbol: &[u8; 4], s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&String::from_utf8_lossy(symbol))
}

fn serialize_side<S: serde::Serializer>(side: &u8, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_char(*side as char)
}

/// Encode one outbound request frame. Total function, no error path.
///
/// The resend field on the wire is a single byte: sequence numbers above 255
/// cannot be addressed through resend. The truncation matches the server's
/// frame layout and is deliberately not widened here.
pub fn encode_request(call_type: CallType, resend_sequence: u32) -> [u8; REQUEST_SIZE] {
    [call_type as u8, resend_sequence as u8]
}

/// Encode one record frame; round-trips bit-exactly with decoding.
pub fn encode_record(record: &Record) -> [u8; RECORD_SIZE] {
    let mut frame = [0u8; RECORD_SIZE];
    frame[0..4].copy_from_slice(&record.symbol);
    frame[4] = record.side;
    BigEndian::write_u32(&mut frame[5..9], record.quantity);
    BigEndian::write_u32(&mut frame[9..13], record.price);
    BigEndian::write_u32(&mut frame[13..17], record.sequence);
    frame
}
