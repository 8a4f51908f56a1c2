/// Top-level client flow
///
/// Two phases over one record store: request the full stream once, then
/// recover whatever the stream dropped. The caller receives the completed
/// store and decides where it goes; persistence and reporting live outside
/// this crate's core.

use crate::protocol::CallType;
use crate::recovery::{RecoveryController, RecoveryError, RecoveryStats};
use crate::session::{Session, SessionError};
use crate::store::RecordStore;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum ClientError {
    /// The initial full-stream connection is fatal to the run, no retry.
    #[error(transparent)]
    Stream(#[from] SessionError),

    #[error(transparent)]
    Recovery(#[from] RecoveryError),
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub host: String,
    pub port: u16,
    /// Fixed delay between resend attempts for the same sequence.
    pub retry_delay: Duration,
    /// Per-sequence resend attempt bound; `None` retries forever.
    pub max_retries: Option<u32>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            host: "127.0.0.1".to_string(),
            port: 3000,
            retry_delay: Duration::from_millis(1000),
            max_retries: None,
        }
    }
}

pub struct FeedClient {
    config: ClientConfig,
}

impl FeedClient {
    pub fn new(config: ClientConfig) -> Self {
        FeedClient { config }
    }

    /// Run both phases and return the completed store. On success every
    /// sequence in `[1, max_sequence]` is present.
    pub async fn run(&self) -> Result<(RecordStore, RecoveryStats), ClientError> {
        let mut store = RecordStore::new();

        info!(
            "requesting full stream from {}:{}",
            self.config.host, self.config.port
        );
        let session = Session::connect(&self.config.host, self.config.port).await?;
        session.run(CallType::StreamAll, 0, &mut store).await?;
        info!(
            "full stream complete: {} records, max sequence {}",
            store.len(),
            store.max_sequence()
        );

        if store.max_sequence() == 0 {
            warn!("full stream yielded no records; nothing to recover");
            return Ok((store, RecoveryStats::default()));
        }

        let controller = RecoveryController::new(
            self.config.host.clone(),
            self.config.port,
            self.config.retry_delay,
            self.config.max_retries,
        );
        let stats = controller.recover(&mut store).await?;

        debug_assert!(store.missing_sequences().is_empty());
        info!(
            "recovery complete: {} recovered over {} session(s), {} retr{}",
            stats.sequences_recovered,
            stats.sessions_opened,
            stats.retries,
            if stats.retries == 1 { "y" } else { "ies" }
        );

        Ok((store, stats))
    }
}
