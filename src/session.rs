/// Single-connection session
///
/// One Session owns one TCP connection for one request/response cycle and is
/// discarded afterward. The lifecycle is an explicit state machine:
///
///   Idle -> Connected -> RequestSent -> Receiving -> Closed
///
/// with Failed as a parallel terminal state reachable from any non-terminal
/// state on a transport error. No state is re-entrant.

use crate::decoder::decode_chunk;
use crate::protocol::{encode_request, CallType};
use crate::store::RecordStore;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, trace};

const READ_BUF_SIZE: usize = 64 * 1024;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("connect to {addr} failed: {source}")]
    Connect {
        addr: String,
        source: std::io::Error,
    },

    #[error("transport error in {state:?} state: {source}")]
    Transport {
        state: SessionState,
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Connected,
    RequestSent,
    Receiving,
    Closed,
    Failed,
}

impl SessionState {
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionState::Closed | SessionState::Failed)
    }

    /// Legal transitions of the session lifecycle, checkable without a
    /// socket in hand.
    pub fn can_transition(self, next: SessionState) -> bool {
        use SessionState::*;
        match (self, next) {
            (Idle, Connected) => true,
            (Connected, RequestSent) => true,
            (RequestSent, Receiving) => true,
            (Receiving, Closed) => true,
            (from, Failed) => !from.is_terminal(),
            _ => false,
        }
    }
}

pub struct Session {
    stream: TcpStream,
    state: SessionState,
}

impl Session {
    /// Establish the transport. Refusal, timeout, and reset all surface as
    /// `SessionError::Connect`.
    pub async fn connect(host: &str, port: u16) -> Result<Self, SessionError> {
        let addr = format!("{host}:{port}");
        let stream = TcpStream::connect(&addr)
            .await
            .map_err(|source| SessionError::Connect { addr: addr.clone(), source })?;
        debug!("connected to {addr}");

        let mut session = Session {
            stream,
            state: SessionState::Idle,
        };
        session.advance(SessionState::Connected);
        Ok(session)
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    fn advance(&mut self, next: SessionState) {
        debug_assert!(self.state.can_transition(next));
        trace!("session {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    fn fail(&mut self, source: std::io::Error) -> SessionError {
        let state = self.state;
        self.state = SessionState::Failed;
        SessionError::Transport { state, source }
    }

    /// Write one request frame, then receive until the connection closes.
    ///
    /// Every decoded record is pushed into the shared store. For StreamAll
    /// the write half is shut down after the first chunk that yields at
    /// least one record, then the stream is drained to close — one round of
    /// data, not a drained live feed. For ResendOne the connection is
    /// dropped outright after the first chunk is decoded, signalling the
    /// single-sequence resend complete.
    ///
    /// Consumes the session: one cycle per connection. On a transport error
    /// the connection is torn down before the error is returned.
    pub async fn run(
        mut self,
        call_type: CallType,
        resend_sequence: u32,
        store: &mut RecordStore,
    ) -> Result<(), SessionError> {
        let request = encode_request(call_type, resend_sequence);
        if let Err(e) = self.stream.write_all(&request).await {
            return Err(self.fail(e));
        }
        self.advance(SessionState::RequestSent);
        self.advance(SessionState::Receiving);

        let mut buf = vec![0u8; READ_BUF_SIZE];
        let mut closing = false;

        loop {
            let n = match self.stream.read(&mut buf).await {
                Ok(n) => n,
                Err(e) => return Err(self.fail(e)),
            };
            if n == 0 {
                self.advance(SessionState::Closed);
                return Ok(());
            }

            let inserted = decode_chunk(&buf[..n], store);
            trace!("received {n} bytes, {inserted} new records");

            match call_type {
                CallType::StreamAll => {
                    if inserted > 0 && !closing {
                        closing = true;
                        if let Err(e) = self.stream.shutdown().await {
                            return Err(self.fail(e));
                        }
                    }
                }
                CallType::ResendOne => {
                    // Active self-terminate: dropping the stream resets the
                    // connection so the next resend gets a fresh one.
                    self.advance(SessionState::Closed);
                    return Ok(());
                }
            }
        }
    }
}
