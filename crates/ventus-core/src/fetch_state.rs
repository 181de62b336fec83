//! List fetch state machine (idle / fetching / error).
//!
//! Used by the list and detail view-models. There is no terminal state: the
//! machine lives as long as the view that owns it.

/// Phase of the remote fetch backing a view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchPhase {
    #[default]
    Idle,
    Fetching,
    Error,
}

impl FetchPhase {
    /// True while the latest dispatched request has not resolved.
    pub fn is_loading(self) -> bool {
        matches!(self, FetchPhase::Fetching)
    }

    /// State after a request is dispatched. Any phase may start a new fetch.
    pub fn on_dispatch(self) -> Self {
        FetchPhase::Fetching
    }

    /// State after the latest request succeeded.
    pub fn on_success(self) -> Self {
        FetchPhase::Idle
    }

    /// State after the latest request failed.
    pub fn on_failure(self) -> Self {
        FetchPhase::Error
    }
}
