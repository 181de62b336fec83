//! Wire types for the tracker REST API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Compact user representation embedded in issues and comments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserLite {
    pub id: i64,
    pub username: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

impl UserLite {
    /// "First Last" when available, otherwise the username.
    pub fn display_name(&self) -> String {
        let full = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        if full.is_empty() {
            self.username.clone()
        } else {
            full
        }
    }
}

/// Shared shape of the reference-data entities (status, priority, ...).
pub trait OptionMeta {
    fn id(&self) -> i64;
    fn name(&self) -> &str;
    /// Ordinal rank, lower first. `None` falls back to lexical name order.
    fn order(&self) -> Option<i32>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssueStatus {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub order: Option<i32>,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub is_closed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Priority {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub order: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Severity {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub order: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssueType {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub order: Option<i32>,
}

macro_rules! impl_option_meta {
    ($($ty:ty),+) => {
        $(
            impl OptionMeta for $ty {
                fn id(&self) -> i64 {
                    self.id
                }
                fn name(&self) -> &str {
                    &self.name
                }
                fn order(&self) -> Option<i32> {
                    self.order
                }
            }
        )+
    };
}

impl_option_meta!(IssueStatus, Priority, Severity, IssueType);

/// A tracked issue as returned by the list and detail endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub status: IssueStatus,
    pub issue_type: IssueType,
    pub severity: Severity,
    pub priority: Priority,
    pub creator: UserLite,
    #[serde(default)]
    pub assignee: Option<UserLite>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub deadline: Option<String>,
    #[serde(default)]
    pub watchers: Vec<UserLite>,
}

/// Payload for `POST /issues/` and each entry of a bulk create.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CreateIssueRequest {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issue_type_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadline: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub watcher_ids: Option<Vec<i64>>,
}

impl CreateIssueRequest {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }
}

/// Partial update for `PATCH /issues/{id}/`.
///
/// Only the mutable subset of an issue can be expressed. For the nullable
/// fields, `Some(None)` clears the value and `None` leaves it untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UpdateIssueRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issue_type_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee_id: Option<Option<i64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadline: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub watchers_to_add: Option<Vec<i64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub watchers_to_remove: Option<Vec<i64>>,
}

impl UpdateIssueRequest {
    pub fn assign(assignee_id: Option<i64>) -> Self {
        Self {
            assignee_id: Some(assignee_id),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    #[serde(default)]
    pub issue: Option<i64>,
    pub author: UserLite,
    pub text: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateCommentRequest {
    pub issue: i64,
    pub text: String,
}

/// Attachment metadata as listed and returned by uploads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    pub id: i64,
    pub issue: i64,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub file_url: Option<String>,
    #[serde(default)]
    pub uploaded_at: Option<DateTime<Utc>>,
}

/// A file to attach to an issue; sent as the `file` part of
/// `POST /attachments/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentUpload {
    pub file_name: String,
    /// Sent as the part's content type when set.
    pub mime_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl AttachmentUpload {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            mime_type: None,
            bytes,
        }
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }
}

/// Envelope of every paginated list endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct PaginatedResponse<T> {
    pub count: u64,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub previous: Option<String>,
    pub results: Vec<T>,
}

/// Some list endpoints paginate and some return a bare array.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum ListOrPage<T> {
    Page(PaginatedResponse<T>),
    List(Vec<T>),
}

impl<T> ListOrPage<T> {
    pub(crate) fn into_vec(self) -> Vec<T> {
        match self {
            ListOrPage::Page(page) => page.results,
            ListOrPage::List(items) => items,
        }
    }
}

/// One page of the issue collection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub items: Vec<Issue>,
    pub total_count: u64,
}

impl From<PaginatedResponse<Issue>> for Page {
    fn from(resp: PaginatedResponse<Issue>) -> Self {
        Self {
            items: resp.results,
            total_count: resp.count,
        }
    }
}

/// Option lists used by filters and edit pickers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReferenceData {
    pub statuses: Vec<IssueStatus>,
    pub priorities: Vec<Priority>,
    pub severities: Vec<Severity>,
    pub issue_types: Vec<IssueType>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiKeyObject {
    pub key_display: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub expires_at: Option<String>,
}

/// Entry of `GET /users/`, used for picking who to act as.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserListItem {
    pub id: i64,
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub api_key_object: Option<ApiKeyObject>,
}

impl UserListItem {
    pub fn api_key(&self) -> Option<&str> {
        self.api_key_object
            .as_ref()
            .map(|k| k.key_display.as_str())
            .filter(|k| !k.is_empty())
    }

    pub fn to_lite(&self) -> UserLite {
        UserLite {
            id: self.id,
            username: self.username.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            avatar_url: self.avatar_url.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileInfo {
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

/// `GET /profile/me/`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: i64,
    pub username: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub profile: ProfileInfo,
    #[serde(default)]
    pub api_key_object: Option<ApiKeyObject>,
}

/// `PATCH /profile/me/` body. Unset fields are left alone.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<ProfileInfoUpdate>,
}

/// Nested profile part of [`ProfileUpdate`]; a `None` bio clears it.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProfileInfoUpdate {
    pub bio: Option<String>,
}

impl ProfileUpdate {
    /// Replace the bio; a blank one clears it.
    pub fn bio(bio: &str) -> Self {
        let bio = bio.trim();
        Self {
            profile: Some(ProfileInfoUpdate {
                bio: (!bio.is_empty()).then(|| bio.to_string()),
            }),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Which list a profile page shows below the user card.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileTab {
    /// Open issues assigned to the user
    #[default]
    Assigned,
    Watched,
    Comments,
}

impl ProfileTab {
    pub fn as_str(self) -> &'static str {
        match self {
            ProfileTab::Assigned => "assigned",
            ProfileTab::Watched => "watched",
            ProfileTab::Comments => "comments",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserStats {
    #[serde(default)]
    pub open_assigned: u64,
    #[serde(default)]
    pub watched: u64,
    #[serde(default)]
    pub comments: u64,
}

/// Issues for the assigned and watched tabs, comments for the comments tab.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TabContent {
    Issues(Vec<Issue>),
    Comments(Vec<Comment>),
}

impl Default for TabContent {
    fn default() -> Self {
        TabContent::Issues(Vec::new())
    }
}

impl TabContent {
    pub fn issues(&self) -> &[Issue] {
        match self {
            TabContent::Issues(items) => items,
            TabContent::Comments(_) => &[],
        }
    }

    pub fn comments(&self) -> &[Comment] {
        match self {
            TabContent::Comments(items) => items,
            TabContent::Issues(_) => &[],
        }
    }

    pub fn len(&self) -> usize {
        match self {
            TabContent::Issues(items) => items.len(),
            TabContent::Comments(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// `GET /profile/{username}/`: the user card plus one sorted tab.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfilePage {
    pub id: i64,
    pub username: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    /// Only present on the signed-in user's own page
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub profile: ProfileInfo,
    #[serde(default)]
    pub stats: UserStats,
    #[serde(default)]
    pub active_tab: ProfileTab,
    #[serde(default)]
    pub list_title: String,
    #[serde(default)]
    pub current_sort_field: Option<String>,
    /// `"asc"` or `"desc"`
    #[serde(default)]
    pub current_sort_direction: Option<String>,
    #[serde(default)]
    pub tab_content: TabContent,
}
