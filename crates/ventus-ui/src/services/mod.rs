//! Async request helpers used by the view-models.
//! All network work runs on the runtime; results come back over a channel.

pub mod issue_service;
pub mod settings_service;

use std::future::Future;

use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;

/// Where a model's requests run and the token that tears them down.
#[derive(Debug, Clone)]
pub struct TaskContext {
    runtime: Handle,
    cancel: CancellationToken,
}

impl TaskContext {
    pub fn new(runtime: Handle) -> Self {
        Self {
            runtime,
            cancel: CancellationToken::new(),
        }
    }

    pub fn runtime(&self) -> &Handle {
        &self.runtime
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Stop every in-flight request; their results are never delivered.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Spawn `task` so that it is dropped as soon as the context is cancelled.
    pub fn spawn<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if self.cancel.is_cancelled() {
            tracing::debug!("Not spawning request after shutdown");
            return;
        }
        let cancel = self.cancel.clone();
        self.runtime.spawn(async move {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => tracing::debug!("Request cancelled by shutdown"),
                _ = task => {}
            }
        });
    }
}
