//! Run-end store writes, kept off the tick path
//!
//! Inside a tokio runtime each submission runs on the blocking pool and its
//! reply comes back over a channel. Without a runtime the store is called in
//! place and the reply is queued the same way.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, warn};

use super::{LevelCompletion, Persistence, RunScore, SurvivalSubmission};

/// A store write owed for a finished run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submission {
    Survival { level: u32, score: RunScore },
    Completion { level: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionReply {
    Survival(SurvivalSubmission),
    Completion(LevelCompletion),
}

/// Answer to one submission, tagged with the caller's ticket
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreReply {
    pub ticket: u64,
    /// `None` when the store failed; the failure is already logged
    pub reply: Option<SubmissionReply>,
}

/// Owns a store and runs submissions against it in the background
pub struct StoreWorker<P> {
    store: Arc<Mutex<P>>,
    tx: UnboundedSender<StoreReply>,
    rx: UnboundedReceiver<StoreReply>,
    in_flight: usize,
}

impl<P: Persistence + Send + 'static> StoreWorker<P> {
    pub fn new(store: P) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            store: Arc::new(Mutex::new(store)),
            tx,
            rx,
            in_flight: 0,
        }
    }

    /// Direct access for calls outside the tick path. Waits for a running
    /// submission to release the store.
    pub fn store(&self) -> MutexGuard<'_, P> {
        lock(&self.store)
    }

    /// Queue `submission`; returns immediately when a runtime is available
    pub fn submit(&mut self, ticket: u64, submission: Submission) {
        self.in_flight += 1;
        let store = Arc::clone(&self.store);
        let tx = self.tx.clone();
        let job = move || {
            let reply = run_submission(&store, submission);
            // The receiver lives as long as the worker; a failed send means it is gone
            let _ = tx.send(StoreReply { ticket, reply });
        };

        match Handle::try_current() {
            Ok(handle) => {
                handle.spawn_blocking(job);
            }
            Err(_) => job(),
        }
    }

    /// A reply that has already arrived, if any
    pub fn try_reply(&mut self) -> Option<StoreReply> {
        let reply = self.rx.try_recv().ok()?;
        self.in_flight = self.in_flight.saturating_sub(1);
        Some(reply)
    }

    /// Wait for the next reply; `None` once nothing is in flight
    pub async fn next_reply(&mut self) -> Option<StoreReply> {
        if self.in_flight == 0 {
            return None;
        }
        let reply = self.rx.recv().await?;
        self.in_flight -= 1;
        Some(reply)
    }
}

fn lock<P>(store: &Mutex<P>) -> MutexGuard<'_, P> {
    // A panic inside a store call leaves its data as it was; keep using it
    store.lock().unwrap_or_else(PoisonError::into_inner)
}

fn run_submission<P: Persistence>(store: &Mutex<P>, submission: Submission) -> Option<SubmissionReply> {
    let mut store = lock(store);
    match submission {
        Submission::Survival { level, score } => {
            match store.submit_survival_score(level, score) {
                Ok(reply) => {
                    debug!(level, score_ms = score.score_ms, "survival score saved");
                    Some(SubmissionReply::Survival(reply))
                }
                Err(err) => {
                    warn!(error = %err, level, "survival score not saved");
                    None
                }
            }
        }
        Submission::Completion { level } => match store.complete_level(level) {
            Ok(reply) => {
                debug!(level, new_level = reply.new_level, "level completion saved");
                Some(SubmissionReply::Completion(reply))
            }
            Err(err) => {
                warn!(error = %err, level, "level completion not saved");
                None
            }
        },
    }
}
