/// Feed Recovery - Gap-Free Market Data Capture
///
/// TCP client for a sequenced market-data feed with a single-sequence
/// resend protocol. Features include:
/// - Fixed-size binary frame codec (17-byte records, 2-byte requests)
/// - Per-connection session lifecycle as an explicit state machine
/// - Sequence gap detection over the captured record set
/// - Per-gap resend with fixed-backoff retry
/// - Two-phase orchestration: full stream, then recovery

pub mod client;
pub mod decoder;
pub mod protocol;
pub mod recovery;
pub mod session;
pub mod store;

pub use client::{ClientConfig, ClientError, FeedClient};
pub use decoder::{decode_chunk, decode_record, DecodeError};
pub use protocol::{encode_record, encode_request, CallType, Record, RECORD_SIZE, REQUEST_SIZE};
pub use recovery::{RecoveryController, RecoveryError, RecoveryStats};
pub use session::{Session, SessionError, SessionState};
pub use store::RecordStore;
