//! Fixtures and an in-memory gateway for view-model tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use ventus_services::*;

fn base_time() -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(1_767_225_600, 0).unwrap()
}

pub fn user(id: i64, username: &str) -> UserLite {
    UserLite {
        id,
        username: username.to_string(),
        first_name: None,
        last_name: None,
        avatar_url: None,
    }
}

pub fn issue(id: i64, title: &str) -> Issue {
    Issue {
        id,
        title: title.to_string(),
        description: None,
        status: status(1, "New", Some(1)),
        issue_type: IssueType {
            id: 1,
            name: "Bug".into(),
            color: None,
            order: Some(1),
        },
        severity: Severity {
            id: 2,
            name: "Normal".into(),
            color: None,
            order: Some(2),
        },
        priority: Priority {
            id: 2,
            name: "Normal".into(),
            color: None,
            order: Some(2),
        },
        creator: user(1, "admin"),
        assignee: None,
        created_at: base_time(),
        updated_at: base_time(),
        deadline: None,
        watchers: Vec::new(),
    }
}

pub fn status(id: i64, name: &str, order: Option<i32>) -> IssueStatus {
    IssueStatus {
        id,
        name: name.to_string(),
        color: None,
        order,
        slug: None,
        is_closed: false,
    }
}

pub fn priority(id: i64, name: &str, order: Option<i32>) -> Priority {
    Priority {
        id,
        name: name.to_string(),
        color: None,
        order,
    }
}

pub fn page(items: Vec<Issue>, total_count: u64) -> Page {
    Page { items, total_count }
}

pub fn reference_data() -> ReferenceData {
    ReferenceData {
        statuses: vec![status(1, "New", Some(1)), status(2, "Done", Some(2))],
        priorities: vec![
            priority(1, "Low", Some(1)),
            priority(2, "Normal", Some(2)),
            priority(3, "High", Some(3)),
        ],
        severities: vec![Severity {
            id: 2,
            name: "Normal".into(),
            color: None,
            order: Some(2),
        }],
        issue_types: vec![IssueType {
            id: 1,
            name: "Bug".into(),
            color: None,
            order: Some(1),
        }],
    }
}

pub fn users() -> Vec<UserLite> {
    vec![user(1, "admin"), user(7, "maria"), user(8, "omar")]
}

pub trait IssueFixture {
    fn with_priority(self, id: i64, name: &str, order: Option<i32>) -> Self;
    fn with_status(self, id: i64, name: &str, order: Option<i32>) -> Self;
    fn modified_at(self, minutes: i64) -> Self;
}

impl IssueFixture for Issue {
    fn with_priority(mut self, id: i64, name: &str, order: Option<i32>) -> Self {
        self.priority = priority(id, name, order);
        self
    }

    fn with_status(mut self, id: i64, name: &str, order: Option<i32>) -> Self {
        self.status = status(id, name, order);
        self
    }

    fn modified_at(mut self, minutes: i64) -> Self {
        self.updated_at = base_time() + chrono::Duration::minutes(minutes);
        self
    }
}

type PageResponder = Box<dyn Fn(&QueryIntent) -> (Duration, Result<Page, ServiceError>) + Send>;
type UpdateResponder = Box<dyn Fn(i64, &UpdateIssueRequest) -> Result<Issue, ServiceError> + Send>;
type DeleteResponder = Box<dyn Fn(i64) -> Result<(), ServiceError> + Send>;

/// Scriptable [`IssueGateway`]. Responses are computed from the request, so
/// tests stay deterministic no matter which spawned task runs first.
pub struct MockGateway {
    pub page_calls: Mutex<Vec<QueryIntent>>,
    pub update_calls: Mutex<Vec<(i64, UpdateIssueRequest)>>,
    pub create_calls: Mutex<Vec<CreateIssueRequest>>,
    pub bulk_calls: Mutex<Vec<Vec<CreateIssueRequest>>>,
    pub delete_calls: Mutex<Vec<i64>>,
    pub options_calls: AtomicUsize,
    pub issues: Mutex<HashMap<i64, Issue>>,
    pub comments: Mutex<Vec<Comment>>,
    pub attachments: Mutex<Vec<Attachment>>,
    page_responder: Mutex<PageResponder>,
    update_responder: Mutex<Option<UpdateResponder>>,
    delete_responder: Mutex<Option<DeleteResponder>>,
    next_id: AtomicI64,
}

impl Default for MockGateway {
    fn default() -> Self {
        Self {
            page_calls: Mutex::new(Vec::new()),
            update_calls: Mutex::new(Vec::new()),
            create_calls: Mutex::new(Vec::new()),
            bulk_calls: Mutex::new(Vec::new()),
            delete_calls: Mutex::new(Vec::new()),
            options_calls: AtomicUsize::new(0),
            issues: Mutex::new(HashMap::new()),
            comments: Mutex::new(Vec::new()),
            attachments: Mutex::new(Vec::new()),
            page_responder: Mutex::new(Box::new(|_| (Duration::ZERO, Ok(Page::default())))),
            update_responder: Mutex::new(None),
            delete_responder: Mutex::new(None),
            next_id: AtomicI64::new(100),
        }
    }
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Always answer page fetches with `page`.
    pub fn with_page(self, page: Page) -> Self {
        self.respond_pages(move |_| (Duration::ZERO, Ok(page.clone())))
    }

    pub fn respond_pages(
        self,
        f: impl Fn(&QueryIntent) -> (Duration, Result<Page, ServiceError>) + Send + 'static,
    ) -> Self {
        *self.page_responder.lock() = Box::new(f);
        self
    }

    pub fn respond_updates(
        self,
        f: impl Fn(i64, &UpdateIssueRequest) -> Result<Issue, ServiceError> + Send + 'static,
    ) -> Self {
        *self.update_responder.lock() = Some(Box::new(f));
        self
    }

    pub fn respond_deletes(self, f: impl Fn(i64) -> Result<(), ServiceError> + Send + 'static) -> Self {
        *self.delete_responder.lock() = Some(Box::new(f));
        self
    }

    pub fn with_issue(self, issue: Issue) -> Self {
        self.issues.lock().insert(issue.id, issue);
        self
    }

    pub fn page_call_count(&self) -> usize {
        self.page_calls.lock().len()
    }

    pub fn last_intent(&self) -> Option<QueryIntent> {
        self.page_calls.lock().last().cloned()
    }

    fn next_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    /// Default update behaviour: apply title and watcher changes to the
    /// stored issue.
    fn apply_stored_update(&self, id: i64, changes: &UpdateIssueRequest) -> Result<Issue, ServiceError> {
        let mut issues = self.issues.lock();
        let stored = issues
            .get_mut(&id)
            .ok_or_else(|| ServiceError::NotFound(format!("issue {}", id)))?;

        if let Some(title) = &changes.title {
            stored.title = title.clone();
        }
        for uid in changes.watchers_to_add.iter().flatten() {
            if let Some(u) = users().into_iter().find(|u| u.id == *uid) {
                stored.watchers.push(u);
            }
        }
        if let Some(remove) = &changes.watchers_to_remove {
            stored.watchers.retain(|w| !remove.contains(&w.id));
        }
        Ok(stored.clone())
    }
}

#[async_trait]
impl IssueGateway for MockGateway {
    async fn fetch_page(&self, intent: &QueryIntent) -> Result<Page, ServiceError> {
        self.page_calls.lock().push(intent.clone());
        let (delay, result) = (self.page_responder.lock())(intent);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        result
    }

    async fn fetch_options(&self) -> Result<ReferenceData, ServiceError> {
        self.options_calls.fetch_add(1, Ordering::SeqCst);
        Ok(reference_data())
    }

    async fn get_item(&self, id: i64) -> Result<Issue, ServiceError> {
        self.issues
            .lock()
            .get(&id)
            .cloned()
            .ok_or_else(|| ServiceError::NotFound(format!("issue {}", id)))
    }

    async fn update_item(&self, id: i64, changes: &UpdateIssueRequest) -> Result<Issue, ServiceError> {
        self.update_calls.lock().push((id, changes.clone()));
        if let Some(responder) = self.update_responder.lock().as_ref() {
            return responder(id, changes);
        }
        self.apply_stored_update(id, changes)
    }

    async fn create_item(&self, request: &CreateIssueRequest) -> Result<Issue, ServiceError> {
        self.create_calls.lock().push(request.clone());
        Ok(issue(self.next_id(), &request.title))
    }

    async fn delete_item(&self, id: i64) -> Result<(), ServiceError> {
        self.delete_calls.lock().push(id);
        if let Some(responder) = self.delete_responder.lock().as_ref() {
            return responder(id);
        }
        self.issues
            .lock()
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| ServiceError::NotFound(format!("issue {}", id)))
    }

    async fn bulk_create(&self, requests: &[CreateIssueRequest]) -> Result<Vec<Issue>, ServiceError> {
        self.bulk_calls.lock().push(requests.to_vec());
        Ok(requests
            .iter()
            .map(|r| issue(self.next_id(), &r.title))
            .collect())
    }

    async fn list_users(&self) -> Result<Vec<UserLite>, ServiceError> {
        Ok(users())
    }

    async fn list_comments(&self, issue_id: i64) -> Result<Vec<Comment>, ServiceError> {
        Ok(self
            .comments
            .lock()
            .iter()
            .filter(|c| c.issue == Some(issue_id))
            .cloned()
            .collect())
    }

    async fn add_comment(&self, issue_id: i64, text: &str) -> Result<Comment, ServiceError> {
        let comment = Comment {
            id: self.next_id(),
            issue: Some(issue_id),
            author: user(1, "admin"),
            text: text.to_string(),
            created_at: base_time(),
            updated_at: None,
        };
        self.comments.lock().push(comment.clone());
        Ok(comment)
    }

    async fn list_attachments(&self, issue_id: i64) -> Result<Vec<Attachment>, ServiceError> {
        Ok(self
            .attachments
            .lock()
            .iter()
            .filter(|a| a.issue == issue_id)
            .cloned()
            .collect())
    }

    async fn upload_attachment(
        &self,
        issue_id: i64,
        upload: AttachmentUpload,
    ) -> Result<Attachment, ServiceError> {
        let attachment = Attachment {
            id: self.next_id(),
            issue: issue_id,
            file_name: Some(upload.file_name),
            file_url: None,
            uploaded_at: Some(base_time()),
        };
        self.attachments.lock().push(attachment.clone());
        Ok(attachment)
    }

    async fn delete_attachment(&self, attachment_id: i64) -> Result<(), ServiceError> {
        let mut attachments = self.attachments.lock();
        let before = attachments.len();
        attachments.retain(|a| a.id != attachment_id);
        if attachments.len() == before {
            Err(ServiceError::NotFound(format!("attachment {}", attachment_id)))
        } else {
            Ok(())
        }
    }
}
