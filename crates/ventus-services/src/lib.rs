pub mod accounts;
pub mod client;
pub mod error;
pub mod issues;
pub mod query;
pub mod retry;
pub mod settings;
pub mod types;

pub use accounts::{AccountClient, ProfileQuery};
pub use client::ApiClient;
pub use error::ServiceError;
pub use issues::{IssueClient, IssueGateway};
pub use query::{FilterKey, IssueFilters, QueryIntent, SortDirection, SortKey};
pub use retry::{is_retryable_status, with_retry, RetryConfig, RetryDecision};
pub use settings::{MetaDraft, SettingResource, SettingsAdmin, SettingsClient, StatusDraft};
pub use types::{
    ApiKeyObject, Attachment, AttachmentUpload, Comment, CreateCommentRequest, CreateIssueRequest,
    Issue, IssueStatus, IssueType, OptionMeta, Page, PaginatedResponse, Priority, ProfileInfo,
    ProfileInfoUpdate, ProfilePage, ProfileTab, ProfileUpdate, ReferenceData, Severity,
    TabContent, UpdateIssueRequest, UserListItem, UserLite, UserProfile, UserStats,
};
