pub mod bulk;
pub mod issue_detail_model;
pub mod issue_list_model;
pub mod listeners;
pub mod settings_model;

pub use bulk::{parse_bulk_titles, BulkParseError};
pub use issue_detail_model::{DetailEvent, IssueDetailModel};
pub use issue_list_model::{IssueListModel, ListEvent};
pub use listeners::{ListenerId, Listeners};
pub use settings_model::SettingsAdminModel;
