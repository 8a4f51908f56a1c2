/// Gap recovery
///
/// Walks the store's missing sequences and requests each one over a fresh
/// session, retrying a failed sequence after a fixed delay rather than
/// advancing past it. By default retries are unbounded: the policy is
/// at-least-once-until-success, and a permanently unreachable server stalls
/// the recovery phase forever. Operators who need a bound set `max_retries`.

use crate::protocol::CallType;
use crate::session::{Session, SessionError};
use crate::store::RecordStore;
use std::time::Duration;
use thiserror::Error;
use tokio::time::sleep;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum RecoveryError {
    #[error("gave up on sequence {sequence} after {attempts} attempts: {source}")]
    RetriesExhausted {
        sequence: u32,
        attempts: u32,
        source: SessionError,
    },
}

/// Counters for the run summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecoveryStats {
    pub sequences_recovered: usize,
    pub sessions_opened: usize,
    pub retries: usize,
}

#[derive(Debug, Clone)]
pub struct RecoveryController {
    host: String,
    port: u16,
    retry_delay: Duration,
    /// Per-sequence attempt bound; `None` retries forever.
    max_retries: Option<u32>,
}

impl RecoveryController {
    pub fn new(
        host: impl Into<String>,
        port: u16,
        retry_delay: Duration,
        max_retries: Option<u32>,
    ) -> Self {
        RecoveryController {
            host: host.into(),
            port,
            retry_delay,
            max_retries,
        }
    }

    /// Close every gap in `[1, max_sequence]`. The missing set is re-derived
    /// from the store on every pass, never cached across passes: a resend
    /// response may carry more than the requested sequence, shrinking later
    /// gaps. `max_sequence` itself is fixed by the full-stream phase; resend
    /// responses do not extend it.
    pub async fn recover(&self, store: &mut RecordStore) -> Result<RecoveryStats, RecoveryError> {
        let mut stats = RecoveryStats::default();

        loop {
            let missing = store.missing_sequences();
            if missing.is_empty() {
                break;
            }
            info!("{} sequence(s) missing", missing.len());

            for sequence in missing {
                // Filled since this pass's snapshot was taken.
                if store.contains(sequence) {
                    continue;
                }
                self.recover_one(sequence, store, &mut stats).await?;
            }
        }

        Ok(stats)
    }

    async fn recover_one(
        &self,
        sequence: u32,
        store: &mut RecordStore,
        stats: &mut RecoveryStats,
    ) -> Result<(), RecoveryError> {
        if sequence > u8::MAX as u32 {
            // The resend field is one byte on the wire; the request below
            // will carry a truncated sequence number.
            warn!("sequence {sequence} exceeds the 1-byte resend field");
        }

        let mut attempts = 0u32;
        loop {
            attempts += 1;
            stats.sessions_opened += 1;
            info!("requesting resend of sequence {sequence} (attempt {attempts})");

            let result = match Session::connect(&self.host, self.port).await {
                Ok(session) => session.run(CallType::ResendOne, sequence, store).await,
                Err(e) => Err(e),
            };

            match result {
                Ok(()) => {
                    stats.sequences_recovered += 1;
                    return Ok(());
                }
                Err(e) => {
                    if let Some(max) = self.max_retries {
                        if attempts > max {
                            return Err(RecoveryError::RetriesExhausted {
                                sequence,
                                attempts,
                                source: e,
                            });
                        }
                    }
                    stats.retries += 1;
                    warn!(
                        "resend of sequence {sequence} failed ({e}), retrying in {:?}",
                        self.retry_delay
                    );
                    sleep(self.retry_delay).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{encode_record, Record};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn record(seq: u32) -> Record {
        Record {
            symbol: *b"TEST",
            side: b'B',
            quantity: 1,
            price: 100,
            sequence: seq,
        }
    }

    /// Resend server that resets the first `failures` connections, then
    /// serves the requested sequence.
    async fn flaky_resend_server(listener: TcpListener, failures: usize) {
        let mut served = 0usize;
        loop {
            let (mut sock, _) = match listener.accept().await {
                Ok(conn) => conn,
                Err(_) => return,
            };
            served += 1;
            if served <= failures {
                // Linger 0 turns the close into an RST, so the client sees a
                // transport error rather than a clean EOF.
                let _ = sock.set_linger(Some(Duration::from_secs(0)));
                drop(sock);
                continue;
            }

            let mut req = [0u8; 2];
            if sock.read_exact(&mut req).await.is_err() {
                continue;
            }
            assert_eq!(req[0], 2);
            let frame = encode_record(&record(req[1] as u32));
            let _ = sock.write_all(&frame).await;
        }
    }

    #[tokio::test]
    async fn test_recover_nothing_missing_opens_no_sessions() {
        // Unroutable host: any connection attempt would fail the test by
        // exhausting the zero-retry budget.
        let controller =
            RecoveryController::new("127.0.0.1", 1, Duration::from_millis(1), Some(0));

        let mut store = RecordStore::new();
        for seq in 1..=4 {
            store.insert(record(seq));
        }

        let stats = controller.recover(&mut store).await.unwrap();
        assert_eq!(stats.sessions_opened, 0);
    }

    #[tokio::test]
    async fn test_recover_empty_store_is_quiet_success() {
        let controller =
            RecoveryController::new("127.0.0.1", 1, Duration::from_millis(1), Some(0));
        let mut store = RecordStore::new();
        let stats = controller.recover(&mut store).await.unwrap();
        assert_eq!(stats, RecoveryStats::default());
    }

    #[tokio::test]
    async fn test_recover_converges_after_repeated_failures() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(flaky_resend_server(listener, 2));

        let mut store = RecordStore::new();
        for seq in [1u32, 2, 4, 5] {
            store.insert(record(seq));
        }

        let controller =
            RecoveryController::new("127.0.0.1", port, Duration::from_millis(5), None);
        let stats = controller.recover(&mut store).await.unwrap();

        assert!(store.missing_sequences().is_empty());
        assert!(store.contains(3));
        assert_eq!(stats.sequences_recovered, 1);
        assert_eq!(stats.retries, 2);
        // The record landed in `seen` exactly once.
        assert_eq!(store.len(), 5);
    }

    #[tokio::test]
    async fn test_retries_exhausted_surfaces_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener); // nothing listening

        let mut store = RecordStore::new();
        store.insert(record(2)); // sequence 1 missing

        let controller =
            RecoveryController::new("127.0.0.1", port, Duration::from_millis(1), Some(2));
        let result = controller.recover(&mut store).await;
        assert!(matches!(
            result,
            Err(RecoveryError::RetriesExhausted { sequence: 1, .. })
        ));
    }
}
