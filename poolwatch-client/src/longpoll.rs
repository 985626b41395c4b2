//! Long-poll client for the pool status endpoint
//!
//! Each round POSTs the current cursor, hands the parsed response to a
//! callback, waits the poll delay and goes again with the cursor found in that
//! response. A failed round (non-success status, transport error or a body
//! that is not JSON) stops the loop: no follow-up request is scheduled and the
//! error is returned through [`PollHandle::join`].

use std::time::Duration;

use async_trait::async_trait;
use poolwatch_common::error::{PoolwatchError, Result};
use poolwatch_common::types::{Cursor, DEFAULT_POLL_DELAY_MS};
use serde_json::Value;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Raw answer of the status endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

impl TransportResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_ok(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Network side of a poll round
#[async_trait]
pub trait StatusTransport: Send + Sync {
    /// POST `body` as `application/json` to `url`
    async fn post_json(&self, url: &str, body: &Value) -> Result<TransportResponse>;
}

/// reqwest-backed transport
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Without a timeout a request waits as long as the server holds it.
    pub fn new(timeout: Option<Duration>) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| PoolwatchError::Transport(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl StatusTransport for HttpTransport {
    async fn post_json(&self, url: &str, body: &Value) -> Result<TransportResponse> {
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| PoolwatchError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| PoolwatchError::Transport(e.to_string()))?;

        Ok(TransportResponse { status, body })
    }
}

/// Waits between poll rounds
#[async_trait]
pub trait Scheduler: Send + Sync {
    async fn delay(&self, duration: Duration);
}

/// Sleeps on the tokio timer
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioScheduler;

#[async_trait]
impl Scheduler for TokioScheduler {
    async fn delay(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// How a poll loop ended
#[derive(Debug)]
pub enum PollOutcome {
    /// Stopped through [`PollHandle::cancel`]
    Cancelled { rounds: u64 },
    /// A round failed and polling stopped
    Failed { rounds: u64, error: PoolwatchError },
}

impl PollOutcome {
    /// Successful rounds completed before the loop ended
    pub fn rounds(&self) -> u64 {
        match self {
            PollOutcome::Cancelled { rounds } | PollOutcome::Failed { rounds, .. } => *rounds,
        }
    }

    pub fn error(&self) -> Option<&PoolwatchError> {
        match self {
            PollOutcome::Failed { error, .. } => Some(error),
            PollOutcome::Cancelled { .. } => None,
        }
    }
}

/// Long-poll loop over a status endpoint
pub struct LongPollClient<T, S = TokioScheduler> {
    url: String,
    transport: T,
    scheduler: S,
    delay: Duration,
}

impl<T: StatusTransport> LongPollClient<T, TokioScheduler> {
    pub fn new(url: impl Into<String>, transport: T) -> Self {
        Self {
            url: url.into(),
            transport,
            scheduler: TokioScheduler,
            delay: Duration::from_millis(DEFAULT_POLL_DELAY_MS),
        }
    }
}

impl<T: StatusTransport, S: Scheduler> LongPollClient<T, S> {
    /// Replace the scheduler used between rounds
    pub fn with_scheduler<S2: Scheduler>(self, scheduler: S2) -> LongPollClient<T, S2> {
        LongPollClient {
            url: self.url,
            transport: self.transport,
            scheduler,
            delay: self.delay,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Perform a single round and return the parsed response body
    pub async fn poll_once(&self, cursor: &Cursor) -> Result<Value> {
        let request = cursor.to_request_body();
        debug!("POST {} {}", self.url, request);

        let response = self.transport.post_json(&self.url, &request).await?;
        if !response.is_ok() {
            return Err(PoolwatchError::Http {
                status: response.status,
                body: response.body,
            });
        }

        Ok(serde_json::from_str(&response.body)?)
    }

    /// Poll until `cancel` fires or a round fails.
    ///
    /// The callback runs before the delay of the round is started, so request
    /// N+1 is only issued once response N has been fully processed.
    pub async fn run<F>(&self, cursor: Cursor, mut callback: F, cancel: CancellationToken) -> PollOutcome
    where
        F: FnMut(Value),
    {
        let mut cursor = cursor;
        let mut rounds = 0u64;
        info!("Long-polling {} every {:?}", self.url, self.delay);

        loop {
            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                result = self.poll_once(&cursor) => result,
            };

            let body = match result {
                Ok(body) => body,
                Err(error) => {
                    warn!("Status poll of {} failed after {} rounds, polling stopped: {}", self.url, rounds, error);
                    return PollOutcome::Failed { rounds, error };
                }
            };

            cursor = Cursor::from_response(&body);
            rounds += 1;
            callback(body);

            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = self.scheduler.delay(self.delay) => {}
            }
        }

        info!("Long-poll of {} cancelled after {} rounds", self.url, rounds);
        PollOutcome::Cancelled { rounds }
    }
}

impl<T, S> LongPollClient<T, S>
where
    T: StatusTransport + 'static,
    S: Scheduler + 'static,
{
    /// Run the loop on its own task
    pub fn spawn<F>(self, cursor: Cursor, callback: F) -> PollHandle
    where
        F: FnMut(Value) + Send + 'static,
    {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let task = tokio::spawn(async move { self.run(cursor, callback, token).await });
        PollHandle { cancel, task }
    }
}

/// Handle to a spawned poll loop
pub struct PollHandle {
    cancel: CancellationToken,
    task: JoinHandle<PollOutcome>,
}

impl PollHandle {
    /// Stop polling; a pending request is abandoned
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Token that stops the loop when cancelled
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the loop to end.
    ///
    /// A panic raised by the callback is resumed on the caller.
    pub async fn join(self) -> PollOutcome {
        match self.task.await {
            Ok(outcome) => outcome,
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(e) => {
                warn!("Poll task ended without an outcome: {}", e);
                PollOutcome::Cancelled { rounds: 0 }
            }
        }
    }
}
