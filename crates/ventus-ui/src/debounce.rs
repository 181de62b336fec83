//! Debounced search trigger.
//!
//! Each keystroke restarts an owned timer. When the quiet interval passes
//! without another keystroke, a settle message carrying the timer's
//! generation is sent to the owning model, which must confirm it with
//! [`SearchDebouncer::accept`] before acting on it.

use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;

/// Builds the model message for a settled term.
pub type SettleMessage<M> = fn(u64, String) -> M;

pub struct SearchDebouncer<M: Send + 'static> {
    runtime: Handle,
    delay: Duration,
    tx: UnboundedSender<M>,
    make_message: SettleMessage<M>,
    timer: Option<JoinHandle<()>>,
    generation: u64,
    last_emitted: String,
}

impl<M: Send + 'static> SearchDebouncer<M> {
    /// `initial_term` counts as already emitted, so typing and then
    /// restoring it within the window emits nothing.
    pub fn new(
        runtime: Handle,
        delay: Duration,
        initial_term: &str,
        tx: UnboundedSender<M>,
        make_message: SettleMessage<M>,
    ) -> Self {
        Self {
            runtime,
            delay,
            tx,
            make_message,
            timer: None,
            generation: 0,
            last_emitted: initial_term.trim().to_string(),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_pending(&self) -> bool {
        self.timer.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Restart the quiet interval for `term`.
    pub fn submit(&mut self, term: &str) {
        self.abort_timer();
        self.generation += 1;

        let generation = self.generation;
        let term = term.trim().to_string();
        let delay = self.delay;
        let tx = self.tx.clone();
        let make_message = self.make_message;

        tracing::debug!("Search debounce restarted (generation {})", generation);
        self.timer = Some(self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(make_message(generation, term));
        }));
    }

    /// Skip the wait: cancel any pending timer and emit `term` right away.
    /// Always emits, even when `term` equals the last emitted one.
    pub fn submit_now(&mut self, term: &str) -> String {
        self.cancel();
        let term = term.trim().to_string();
        self.last_emitted = term.clone();
        term
    }

    /// Confirm a settle message. Stale generations and terms equal to the
    /// last emitted one are rejected.
    pub fn accept(&mut self, generation: u64, term: &str) -> bool {
        if generation != self.generation {
            tracing::debug!(
                "Dropping stale search settle (generation {}, latest {})",
                generation,
                self.generation
            );
            return false;
        }
        self.timer = None;

        if term == self.last_emitted {
            tracing::debug!("Search term unchanged, not emitting");
            return false;
        }
        self.last_emitted = term.to_string();
        true
    }

    /// Drop any pending emission.
    pub fn cancel(&mut self) {
        self.abort_timer();
        self.generation += 1;
    }

    fn abort_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}

impl<M: Send + 'static> Drop for SearchDebouncer<M> {
    fn drop(&mut self) {
        self.abort_timer();
    }
}
