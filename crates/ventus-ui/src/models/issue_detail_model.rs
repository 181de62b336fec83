//! Single-issue detail view-model: the issue, its comments and attachments.
//!
//! Unlike the list, edits here are not optimistic; the view shows what the
//! server returned.

use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use ventus_core::{AppError, FetchPhase};
use ventus_services::{
    Attachment, AttachmentUpload, Comment, Issue, IssueGateway, ServiceError, UpdateIssueRequest,
};

use crate::models::listeners::{ListenerId, Listeners};
use crate::services::issue_service::{self, DetailSender, DetailServiceMessage};
use crate::services::TaskContext;

#[derive(Debug, Clone, PartialEq)]
pub enum DetailEvent {
    Loaded,
    LoadingChanged(bool),
    ErrorChanged(Option<String>),
    IssueChanged,
    CommentsChanged,
    AttachmentsChanged,
    Notification(String),
    /// The issue is gone (deleted here or elsewhere).
    Deleted,
    AuthRequired,
}

pub struct IssueDetailModel {
    gateway: Arc<dyn IssueGateway>,
    ctx: TaskContext,
    tx: DetailSender,
    rx: UnboundedReceiver<DetailServiceMessage>,
    issue_id: Option<i64>,
    issue: Option<Issue>,
    comments: Vec<Comment>,
    attachments: Vec<Attachment>,
    phase: FetchPhase,
    latest_seq: u64,
    saving: bool,
    deleted: bool,
    error_message: Option<String>,
    notification: Option<String>,
    shut_down: bool,
    listeners: Listeners<DetailEvent>,
}

impl IssueDetailModel {
    pub fn new(gateway: Arc<dyn IssueGateway>, runtime: Handle) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            gateway,
            ctx: TaskContext::new(runtime),
            tx,
            rx,
            issue_id: None,
            issue: None,
            comments: Vec::new(),
            attachments: Vec::new(),
            phase: FetchPhase::Idle,
            latest_seq: 0,
            saving: false,
            deleted: false,
            error_message: None,
            notification: None,
            shut_down: false,
            listeners: Listeners::default(),
        }
    }

    pub fn issue_id(&self) -> Option<i64> {
        self.issue_id
    }

    pub fn issue(&self) -> Option<&Issue> {
        self.issue.as_ref()
    }

    pub fn comments(&self) -> &[Comment] {
        &self.comments
    }

    pub fn attachments(&self) -> &[Attachment] {
        &self.attachments
    }

    pub fn is_loading(&self) -> bool {
        self.phase.is_loading()
    }

    pub fn is_saving(&self) -> bool {
        self.saving
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn notification(&self) -> Option<&str> {
        self.notification.as_deref()
    }

    pub fn take_notification(&mut self) -> Option<String> {
        self.notification.take()
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&DetailEvent) + Send + 'static) -> ListenerId {
        self.listeners.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        self.listeners.unsubscribe(id)
    }

    /// Load issue `id`. A later `load` supersedes an earlier one still in
    /// flight.
    pub fn load(&mut self, id: i64) {
        if self.shut_down {
            return;
        }
        if self.issue_id != Some(id) {
            self.issue = None;
            self.comments.clear();
            self.attachments.clear();
            self.saving = false;
        }
        self.issue_id = Some(id);
        self.deleted = false;
        self.latest_seq += 1;

        let was_loading = self.phase.is_loading();
        self.phase = self.phase.on_dispatch();
        if !was_loading {
            self.listeners.emit(&DetailEvent::LoadingChanged(true));
        }

        tracing::debug!("Loading issue {} (seq {})", id, self.latest_seq);
        issue_service::request_detail(&self.tx, &self.ctx, self.gateway.clone(), self.latest_seq, id);
    }

    pub fn reload(&mut self) {
        if let Some(id) = self.issue_id {
            self.load(id);
        }
    }

    /// Send a partial update. Returns `false` when there is nothing to send
    /// or no issue is loaded.
    pub fn update(&mut self, changes: UpdateIssueRequest) -> bool {
        if self.shut_down || changes.is_empty() {
            return false;
        }
        let Some(id) = self.loaded_id() else {
            return false;
        };
        self.saving = true;
        issue_service::request_detail_update(&self.tx, &self.ctx, self.gateway.clone(), id, changes);
        true
    }

    pub fn assign(&mut self, assignee_id: Option<i64>) -> bool {
        self.update(UpdateIssueRequest::assign(assignee_id))
    }

    /// No-op when the user already watches the issue.
    pub fn add_watcher(&mut self, user_id: i64) -> bool {
        if self.is_watcher(user_id) {
            return false;
        }
        self.update(UpdateIssueRequest {
            watchers_to_add: Some(vec![user_id]),
            ..Default::default()
        })
    }

    /// No-op when the user does not watch the issue.
    pub fn remove_watcher(&mut self, user_id: i64) -> bool {
        if !self.is_watcher(user_id) {
            return false;
        }
        self.update(UpdateIssueRequest {
            watchers_to_remove: Some(vec![user_id]),
            ..Default::default()
        })
    }

    pub fn is_watcher(&self, user_id: i64) -> bool {
        self.issue
            .as_ref()
            .is_some_and(|i| i.watchers.iter().any(|w| w.id == user_id))
    }

    /// Post a comment. Blank text is rejected without a request.
    pub fn add_comment(&mut self, text: &str) -> bool {
        if self.shut_down {
            return false;
        }
        let text = text.trim();
        if text.is_empty() {
            self.notify("A comment can't be empty.".to_string());
            return false;
        }
        let Some(id) = self.loaded_id() else {
            return false;
        };
        issue_service::request_add_comment(&self.tx, &self.ctx, self.gateway.clone(), id, text.to_string());
        true
    }

    /// Attach a file to the loaded issue. An empty file is rejected without
    /// a request.
    pub fn upload_attachment(&mut self, upload: AttachmentUpload) -> bool {
        if self.shut_down {
            return false;
        }
        if upload.bytes.is_empty() {
            self.notify(format!("{} is empty.", upload.file_name));
            return false;
        }
        let Some(id) = self.loaded_id() else {
            return false;
        };
        tracing::debug!("Uploading {} to issue {}", upload.file_name, id);
        issue_service::request_upload_attachment(&self.tx, &self.ctx, self.gateway.clone(), id, upload);
        true
    }

    pub fn delete_attachment(&mut self, attachment_id: i64) -> bool {
        if self.shut_down || self.attachments.iter().all(|a| a.id != attachment_id) {
            return false;
        }
        let Some(id) = self.loaded_id() else {
            return false;
        };
        issue_service::request_delete_attachment(
            &self.tx,
            &self.ctx,
            self.gateway.clone(),
            id,
            attachment_id,
        );
        true
    }

    pub fn delete(&mut self) -> bool {
        if self.shut_down {
            return false;
        }
        let Some(id) = self.loaded_id() else {
            return false;
        };
        self.saving = true;
        issue_service::request_detail_delete(&self.tx, &self.ctx, self.gateway.clone(), id);
        true
    }

    pub fn poll_channel(&mut self) -> usize {
        let mut handled = 0;
        while !self.shut_down {
            match self.rx.try_recv() {
                Ok(msg) => {
                    self.handle_message(msg);
                    handled += 1;
                }
                Err(_) => break,
            }
        }
        handled
    }

    pub async fn process_next(&mut self) -> bool {
        if self.shut_down {
            return false;
        }
        match self.rx.recv().await {
            Some(msg) => {
                self.handle_message(msg);
                true
            }
            None => false,
        }
    }

    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;
        self.ctx.cancel();
        self.issue = None;
        self.comments.clear();
        self.attachments.clear();
        self.phase = FetchPhase::Idle;
        self.saving = false;
        self.listeners.clear();
    }

    fn loaded_id(&self) -> Option<i64> {
        if self.deleted {
            return None;
        }
        self.issue.as_ref().map(|i| i.id)
    }

    fn handle_message(&mut self, msg: DetailServiceMessage) {
        if let Some(target) = msg.issue_id() {
            if self.issue_id != Some(target) {
                tracing::debug!("Dropping reply for issue {} (showing {:?})", target, self.issue_id);
                return;
            }
        }
        match msg {
            DetailServiceMessage::Loaded { seq, result } => {
                if seq != self.latest_seq {
                    tracing::debug!("Discarding superseded detail response (seq {})", seq);
                    return;
                }
                match result {
                    Ok((issue, comments, attachments)) => {
                        self.phase = self.phase.on_success();
                        self.deleted = false;
                        self.issue = Some(issue);
                        self.comments = comments;
                        self.attachments = attachments;
                        self.clear_error();
                        self.listeners.emit(&DetailEvent::Loaded);
                    }
                    Err(e) => {
                        self.phase = self.phase.on_failure();
                        if e.is_not_found() {
                            self.mark_deleted();
                        }
                        let message = self.report_failure(e, "Issue load");
                        self.set_error(message);
                    }
                }
                self.listeners.emit(&DetailEvent::LoadingChanged(false));
            }
            DetailServiceMessage::UpdateDone { result, .. } => {
                self.saving = false;
                match result {
                    Ok(issue) => {
                        self.issue = Some(issue);
                        self.listeners.emit(&DetailEvent::IssueChanged);
                    }
                    Err(e) => {
                        if e.is_not_found() {
                            self.mark_deleted();
                        }
                        let message = self.report_failure(e, "Issue update");
                        self.notify(message);
                    }
                }
            }
            DetailServiceMessage::CommentAdded { result, .. } => match result {
                Ok(comment) => {
                    self.comments.push(comment);
                    self.listeners.emit(&DetailEvent::CommentsChanged);
                }
                Err(e) => {
                    let message = self.report_failure(e, "Add comment");
                    self.notify(message);
                }
            },
            DetailServiceMessage::AttachmentUploaded { result, .. } => match result {
                Ok(attachment) => {
                    self.attachments.push(attachment);
                    self.listeners.emit(&DetailEvent::AttachmentsChanged);
                }
                Err(e) => {
                    let message = self.report_failure(e, "Upload attachment");
                    self.notify(message);
                }
            },
            DetailServiceMessage::AttachmentDeleted { id, result, .. } => match result {
                Ok(()) => self.remove_attachment(id),
                Err(e) if e.is_not_found() => {
                    tracing::debug!("Attachment {} already gone", id);
                    self.remove_attachment(id);
                }
                Err(e) => {
                    let message = self.report_failure(e, "Delete attachment");
                    self.notify(message);
                }
            },
            DetailServiceMessage::Deleted { result, .. } => {
                self.saving = false;
                match result {
                    Ok(()) => self.mark_deleted(),
                    Err(e) if e.is_not_found() => self.mark_deleted(),
                    Err(e) => {
                        let message = self.report_failure(e, "Issue delete");
                        self.notify(message);
                    }
                }
            }
        }
    }

    fn remove_attachment(&mut self, id: i64) {
        self.attachments.retain(|a| a.id != id);
        self.listeners.emit(&DetailEvent::AttachmentsChanged);
    }

    fn mark_deleted(&mut self) {
        if self.deleted {
            return;
        }
        tracing::info!("Issue {:?} no longer exists", self.issue_id);
        self.deleted = true;
        self.listeners.emit(&DetailEvent::Deleted);
    }

    fn report_failure(&mut self, e: ServiceError, action: &str) -> String {
        let message = e.user_message();
        let app: AppError = e.into();
        tracing::error!("{} failed: {}", action, app);
        if app.requires_login() {
            self.listeners.emit(&DetailEvent::AuthRequired);
        }
        message
    }

    fn set_error(&mut self, message: String) {
        self.error_message = Some(message.clone());
        self.listeners.emit(&DetailEvent::ErrorChanged(Some(message)));
    }

    fn clear_error(&mut self) {
        if self.error_message.take().is_some() {
            self.listeners.emit(&DetailEvent::ErrorChanged(None));
        }
    }

    fn notify(&mut self, message: String) {
        self.notification = Some(message.clone());
        self.listeners.emit(&DetailEvent::Notification(message));
    }
}

impl Drop for IssueDetailModel {
    fn drop(&mut self) {
        self.ctx.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::*;
    use parking_lot::Mutex;

    fn attachment(id: i64, issue: i64) -> Attachment {
        Attachment {
            id,
            issue,
            file_name: Some(format!("file-{}.log", id)),
            file_url: None,
            uploaded_at: None,
        }
    }

    fn gateway_with_issue() -> Arc<MockGateway> {
        let gateway = MockGateway::new().with_issue(issue(5, "Crash on save"));
        gateway.attachments.lock().push(attachment(50, 5));
        gateway.attachments.lock().push(attachment(51, 5));
        Arc::new(gateway)
    }

    async fn loaded(gateway: &Arc<MockGateway>) -> IssueDetailModel {
        let mut m = IssueDetailModel::new(gateway.clone(), Handle::current());
        m.load(5);
        assert!(m.process_next().await);
        m
    }

    #[tokio::test(start_paused = true)]
    async fn test_load_fetches_issue_and_side_lists() {
        let gateway = gateway_with_issue();
        let m = loaded(&gateway).await;

        assert_eq!(m.issue().unwrap().title, "Crash on save");
        assert_eq!(m.attachments().len(), 2);
        assert!(m.comments().is_empty());
        assert!(!m.is_loading());
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_issue_is_marked_deleted() {
        let gateway = Arc::new(MockGateway::new());
        let mut m = IssueDetailModel::new(gateway.clone(), Handle::current());
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        m.subscribe(move |e| sink.lock().push(e.clone()));

        m.load(404);
        assert!(m.process_next().await);
        assert!(m.is_deleted());
        assert!(m.error_message().is_some());
        assert!(events.lock().contains(&DetailEvent::Deleted));
        assert!(!m.add_comment("hello"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_update_applies_server_response() {
        let gateway = gateway_with_issue();
        let mut m = loaded(&gateway).await;

        assert!(!m.update(UpdateIssueRequest::default()));
        assert!(m.update(UpdateIssueRequest {
            title: Some("Crash on save (macOS)".into()),
            ..Default::default()
        }));
        assert!(m.is_saving());
        assert!(m.process_next().await);

        assert!(!m.is_saving());
        assert_eq!(m.issue().unwrap().title, "Crash on save (macOS)");
    }

    #[tokio::test(start_paused = true)]
    async fn test_watchers_are_not_duplicated() {
        let gateway = gateway_with_issue();
        let mut m = loaded(&gateway).await;

        assert!(!m.remove_watcher(7));
        assert!(m.add_watcher(7));
        assert!(m.process_next().await);
        assert!(m.is_watcher(7));

        assert!(!m.add_watcher(7));
        assert!(m.remove_watcher(7));
        assert!(m.process_next().await);
        assert!(!m.is_watcher(7));

        let calls = gateway.update_calls.lock();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].1.watchers_to_add, Some(vec![7]));
        assert_eq!(calls[1].1.watchers_to_remove, Some(vec![7]));
    }

    #[tokio::test(start_paused = true)]
    async fn test_update_on_vanished_issue() {
        let gateway = gateway_with_issue();
        let mut m = loaded(&gateway).await;
        gateway.issues.lock().clear();

        m.assign(Some(8));
        assert!(m.process_next().await);
        assert!(m.is_deleted());
        assert!(m.notification().unwrap().contains("no longer exists"));
        assert!(!m.assign(None));
    }

    #[tokio::test(start_paused = true)]
    async fn test_blank_comment_is_rejected_locally() {
        let gateway = gateway_with_issue();
        let mut m = loaded(&gateway).await;

        assert!(!m.add_comment("   \n"));
        assert!(m.take_notification().is_some());
        assert!(gateway.comments.lock().is_empty());

        assert!(m.add_comment("  Reproduced on 2.3  "));
        assert!(m.process_next().await);
        assert_eq!(m.comments().len(), 1);
        assert_eq!(m.comments()[0].text, "Reproduced on 2.3");
    }

    #[tokio::test(start_paused = true)]
    async fn test_delete_attachment() {
        let gateway = gateway_with_issue();
        let mut m = loaded(&gateway).await;

        assert!(!m.delete_attachment(99));
        assert!(m.delete_attachment(50));
        assert!(m.process_next().await);
        assert_eq!(m.attachments().len(), 1);
        assert_eq!(m.attachments()[0].id, 51);
    }

    #[tokio::test(start_paused = true)]
    async fn test_delete_issue() {
        let gateway = gateway_with_issue();
        let mut m = loaded(&gateway).await;

        assert!(m.delete());
        assert!(m.process_next().await);
        assert!(m.is_deleted());
        assert!(gateway.issues.lock().is_empty());
        assert!(!m.delete());
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_delete_does_not_mark_next_issue() {
        let gateway = Arc::new(
            MockGateway::new()
                .with_issue(issue(5, "Crash on save"))
                .with_issue(issue(6, "Slow search")),
        );
        let mut m = IssueDetailModel::new(gateway.clone(), Handle::current());
        m.load(5);
        assert!(m.process_next().await);

        assert!(m.delete());
        m.load(6);
        assert!(m.process_next().await);
        assert!(m.process_next().await);

        assert_eq!(m.issue().unwrap().id, 6);
        assert!(!m.is_deleted());
        assert!(!m.is_saving());
        assert!(m.add_comment("Still slow"));
        assert!(m.process_next().await);
        assert_eq!(m.comments()[0].issue, Some(6));
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_comment_for_previous_issue_is_dropped() {
        let gateway = Arc::new(
            MockGateway::new()
                .with_issue(issue(5, "Crash on save"))
                .with_issue(issue(6, "Slow search")),
        );
        let mut m = IssueDetailModel::new(gateway.clone(), Handle::current());
        m.load(5);
        assert!(m.process_next().await);

        assert!(m.add_comment("On 5"));
        assert!(m.assign(Some(7)));
        m.load(6);
        for _ in 0..3 {
            assert!(m.process_next().await);
        }

        assert_eq!(m.issue().unwrap().title, "Slow search");
        assert!(m.comments().is_empty());
        assert!(m.notification().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_upload_appends_attachment() {
        let gateway = gateway_with_issue();
        let mut m = loaded(&gateway).await;

        assert!(!m.upload_attachment(AttachmentUpload::new("empty.txt", Vec::new())));
        assert!(m.take_notification().unwrap().contains("empty.txt"));

        assert!(m.upload_attachment(AttachmentUpload::new("trace.log", b"panic at 0x0".to_vec())));
        assert!(m.process_next().await);
        assert_eq!(m.attachments().len(), 3);
        assert_eq!(m.attachments()[2].file_name.as_deref(), Some("trace.log"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_stops_processing() {
        let gateway = gateway_with_issue();
        let mut m = loaded(&gateway).await;

        m.shutdown();
        assert!(m.issue().is_none());
        assert!(!m.process_next().await);
        m.load(5);
        assert!(!m.is_loading());
    }
}
