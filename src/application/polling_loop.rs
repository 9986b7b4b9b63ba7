//! Polling Loop - drives the handler from the input key.
//!
//! Each cycle reads the input key once, runs the handler when the payload's
//! `timestamp` moved, and writes the result to the output key. Cycles never
//! overlap: the loop awaits every step in order and only suspends between
//! cycles, during the poll-interval sleep.
//!
//! ## Failure handling
//!
//! Nothing that happens inside a cycle stops the loop. Each step returns a
//! typed [`CycleError`]; the loop logs it and sleeps. A handler fault leaves
//! the change-detection snapshot untouched, so the same payload is retried on
//! the next cycle.
//!
//! ## Graceful Shutdown
//!
//! The loop listens on a watch channel. A signal delivered during the sleep
//! ends the loop immediately; one delivered mid-cycle is honoured once the
//! cycle finishes. No final flush is attempted.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use thiserror::Error;
use tokio::sync::watch;
use tokio::time;

use super::artifact_loader::Artifact;
use super::publisher::{PublishError, PublishReceipt, ResultPublisher};
use crate::config::RuntimeConfig;
use crate::domain::{
    invoke_guarded, CycleState, DecodeError, ExecutionContext, HandlerError, InputPayload, InputSnapshot,
    InvocationOutcome, StateMachine,
};
use crate::ports::{KeyValueStore, StoreError};

/// A step of one cycle failed. Never fatal to the loop.
#[derive(Debug, Error)]
pub enum CycleError {
    #[error("Failed to read input: {0}")]
    Store(#[from] StoreError),

    #[error("Invalid input payload: {0}")]
    Decode(#[from] DecodeError),

    #[error("Handler failed: {0}")]
    HandlerFault(#[from] HandlerError),

    #[error("Failed to publish result: {0}")]
    Publish(#[from] PublishError),
}

impl CycleError {
    /// Whether the loop should stop. Steady-state failures never do.
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Store(_) | Self::Decode(_) | Self::HandlerFault(_) | Self::Publish(_) => false,
        }
    }
}

/// How a successful cycle ended.
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    /// The input key was absent or empty.
    NoData,

    /// The payload's timestamp matched the last processed one.
    Unchanged,

    /// The handler ran and its result was written.
    Published {
        receipt: PublishReceipt,
        diagnostic: bool,
        elapsed: Duration,
    },
}

/// Counters reported when the loop stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    pub cycles: u64,
    pub executions: u64,
    pub publishes: u64,
    pub handler_faults: u64,
    pub errors: u64,
}

/// Polls the input key and runs the loaded handler on new data.
pub struct PollingLoop {
    store: Arc<dyn KeyValueStore>,
    input_key: String,
    artifact: Artifact,
    context: ExecutionContext,
    snapshot: InputSnapshot,
    publisher: ResultPublisher,
    poll_interval: Duration,
    state: CycleState,
    stats: RunStats,
}

impl PollingLoop {
    pub fn new(store: Arc<dyn KeyValueStore>, artifact: Artifact, config: &RuntimeConfig) -> Self {
        let store_config = config.store();
        Self {
            publisher: ResultPublisher::new(store.clone(), store_config.output_key.clone()),
            store,
            input_key: store_config.input_key.clone(),
            artifact,
            context: ExecutionContext::new(store_config),
            snapshot: InputSnapshot::new(),
            poll_interval: config.poll_interval(),
            state: CycleState::default(),
            stats: RunStats::default(),
        }
    }

    /// Override the sleep between cycles.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn context(&self) -> &ExecutionContext {
        &self.context
    }

    pub fn artifact(&self) -> &Artifact {
        &self.artifact
    }

    pub fn state(&self) -> CycleState {
        self.state
    }

    pub fn stats(&self) -> RunStats {
        self.stats
    }

    /// Run cycles until shutdown is signalled, sleeping `poll_interval`
    /// after each one.
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) -> RunStats {
        tracing::info!(
            input_key = %self.input_key,
            output_key = %self.publisher.output_key(),
            interval_secs = self.poll_interval.as_secs_f64(),
            "Polling loop started"
        );

        while !*shutdown.borrow() {
            // Every cycle error is recoverable and already logged.
            let _ = self.poll_once().await;

            if self.sleep_or_shutdown(&mut shutdown).await {
                break;
            }
            self.advance(CycleState::Idle);
        }

        let stats = self.stats;
        tracing::info!(
            cycles = stats.cycles,
            executions = stats.executions,
            publishes = stats.publishes,
            handler_faults = stats.handler_faults,
            errors = stats.errors,
            "Polling loop stopped"
        );
        stats
    }

    /// Run exactly one cycle, logging its outcome.
    ///
    /// Leaves the loop in `Sleeping`; the caller decides when to resume.
    pub async fn poll_once(&mut self) -> Result<CycleOutcome, CycleError> {
        if self.state == CycleState::Sleeping {
            self.advance(CycleState::Idle);
        }
        self.stats.cycles += 1;

        let result = self.cycle().await;
        self.advance(CycleState::Sleeping);
        self.report(&result);
        result
    }

    async fn cycle(&mut self) -> Result<CycleOutcome, CycleError> {
        let raw = match self.store.get(&self.input_key).await? {
            Some(raw) if !raw.is_empty() => raw,
            _ => return Ok(CycleOutcome::NoData),
        };

        let payload = InputPayload::decode(&raw)?;
        if !self.snapshot.detect(&payload).is_changed() {
            return Ok(CycleOutcome::Unchanged);
        }
        self.advance(CycleState::Changed);
        tracing::info!(
            timestamp = %payload.timestamp().map(ToString::to_string).unwrap_or_default(),
            fields = payload.len(),
            "New input detected"
        );

        self.advance(CycleState::Executing);
        self.context.mark_execution(Utc::now());
        self.stats.executions += 1;
        let started = Instant::now();
        let returned = invoke_guarded(self.artifact.handler_mut(), &payload, &mut self.context);
        let elapsed = started.elapsed();

        let outcome = InvocationOutcome::from_return(returned?);
        if let InvocationOutcome::Diagnostic { cause, .. } = &outcome {
            tracing::warn!(found = cause.found, result = %cause.rendering, "{}", cause);
        }

        self.advance(CycleState::Publishing);
        let receipt = self.publisher.publish(outcome.body()).await?;
        self.snapshot.record(payload);

        Ok(CycleOutcome::Published {
            receipt,
            diagnostic: outcome.is_diagnostic(),
            elapsed,
        })
    }

    fn report(&mut self, result: &Result<CycleOutcome, CycleError>) {
        match result {
            Ok(CycleOutcome::NoData) => {
                tracing::info!(key = %self.input_key, "Waiting for data");
            }
            Ok(CycleOutcome::Unchanged) => {
                tracing::debug!(key = %self.input_key, "Input unchanged");
            }
            Ok(CycleOutcome::Published { receipt, diagnostic, elapsed }) => {
                self.stats.publishes += 1;
                tracing::info!(
                    key = %self.publisher.output_key(),
                    keys = receipt.keys,
                    bytes = receipt.bytes,
                    diagnostic,
                    elapsed_ms = elapsed.as_secs_f64() * 1000.0,
                    "Result published: {} keys | {} bytes",
                    receipt.keys,
                    receipt.bytes
                );
            }
            Err(err) => {
                match err {
                    CycleError::Store(e) => {
                        tracing::error!(key = %self.input_key, error = %e, "Failed to read input");
                    }
                    CycleError::Decode(e) => {
                        tracing::warn!(key = %self.input_key, error = %e, "Skipping undecodable input");
                    }
                    CycleError::HandlerFault(e) => {
                        self.stats.handler_faults += 1;
                        tracing::error!(error = %e, "Handler failed, result not published");
                    }
                    CycleError::Publish(e) => {
                        tracing::error!(key = %self.publisher.output_key(), error = %e, "Failed to publish result");
                    }
                }
                self.stats.errors += 1;
                debug_assert!(!err.is_fatal());
            }
        }
    }

    /// Sleep for the poll interval. Returns true if shutdown was requested.
    async fn sleep_or_shutdown(&self, shutdown: &mut watch::Receiver<bool>) -> bool {
        let sleep = time::sleep(self.poll_interval);
        tokio::pin!(sleep);

        loop {
            tokio::select! {
                _ = &mut sleep => return false,
                changed = shutdown.changed() => {
                    // A dropped sender can never signal again; treat it as shutdown.
                    if changed.is_err() || *shutdown.borrow() {
                        return true;
                    }
                }
            }
        }
    }

    fn advance(&mut self, next: CycleState) {
        match self.state.transition_to(next) {
            Ok(state) => self.state = state,
            Err(e) => {
                tracing::warn!(error = %e, "Unexpected cycle transition");
                self.state = next;
            }
        }
    }
}
