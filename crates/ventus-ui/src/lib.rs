//! View-models for the tracker: list, detail and settings administration.
//!
//! Models are driven from a single owner thread. Network work runs on a
//! tokio runtime and its results are applied with `poll_channel` or
//! `process_next`.

pub mod debounce;
pub mod error_mapping;
pub mod models;
pub mod query_state;
pub mod services;
pub mod sort;

#[cfg(test)]
mod test_support;

pub use debounce::SearchDebouncer;
pub use models::{
    BulkParseError, DetailEvent, IssueDetailModel, IssueListModel, ListEvent, ListenerId,
    SettingsAdminModel,
};
pub use query_state::QueryState;
pub use services::TaskContext;
