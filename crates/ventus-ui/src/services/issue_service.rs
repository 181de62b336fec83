//! Issue backend: async list, detail and mutation requests.
//! Each `request_*` spawns on the model's [`TaskContext`] and reports back
//! with one message on the channel.

use std::sync::Arc;

use tokio::sync::mpsc::UnboundedSender;
use ventus_services::{
    Attachment, AttachmentUpload, Comment, CreateIssueRequest, Issue, IssueGateway, Page,
    QueryIntent, ReferenceData, ServiceError, UpdateIssueRequest, UserLite,
};

use super::TaskContext;

/// Messages sent from async operations back to the list model
#[derive(Debug)]
pub enum IssueServiceMessage {
    /// Page fetch tagged with the sequence number it was dispatched with
    PageLoaded {
        seq: u64,
        result: Result<Page, ServiceError>,
    },
    /// Reference data plus the user list
    OptionsLoaded(Result<(ReferenceData, Vec<UserLite>), ServiceError>),
    /// Result of a row update; `edit_seq` orders edits to the same row
    UpdateDone {
        id: i64,
        edit_seq: u64,
        result: Result<Issue, ServiceError>,
    },
    CreateDone(Result<Issue, ServiceError>),
    DeleteDone {
        id: i64,
        result: Result<(), ServiceError>,
    },
    BulkCreateDone(Result<Vec<Issue>, ServiceError>),
    /// Debounce timer expired
    SearchSettled { generation: u64, term: String },
}

pub type IssueSender = UnboundedSender<IssueServiceMessage>;

pub fn request_fetch_page(
    tx: &IssueSender,
    ctx: &TaskContext,
    gateway: Arc<dyn IssueGateway>,
    seq: u64,
    intent: QueryIntent,
) {
    let tx = tx.clone();
    ctx.spawn(async move {
        let result = gateway.fetch_page(&intent).await;
        let _ = tx.send(IssueServiceMessage::PageLoaded { seq, result });
    });
}

pub fn request_options(tx: &IssueSender, ctx: &TaskContext, gateway: Arc<dyn IssueGateway>) {
    let tx = tx.clone();
    ctx.spawn(async move {
        let result = tokio::try_join!(gateway.fetch_options(), gateway.list_users());
        let _ = tx.send(IssueServiceMessage::OptionsLoaded(result));
    });
}

pub fn request_update(
    tx: &IssueSender,
    ctx: &TaskContext,
    gateway: Arc<dyn IssueGateway>,
    id: i64,
    edit_seq: u64,
    changes: UpdateIssueRequest,
) {
    let tx = tx.clone();
    ctx.spawn(async move {
        let result = gateway.update_item(id, &changes).await;
        let _ = tx.send(IssueServiceMessage::UpdateDone {
            id,
            edit_seq,
            result,
        });
    });
}

pub fn request_create(
    tx: &IssueSender,
    ctx: &TaskContext,
    gateway: Arc<dyn IssueGateway>,
    request: CreateIssueRequest,
) {
    let tx = tx.clone();
    ctx.spawn(async move {
        let result = gateway.create_item(&request).await;
        let _ = tx.send(IssueServiceMessage::CreateDone(result));
    });
}

pub fn request_delete(tx: &IssueSender, ctx: &TaskContext, gateway: Arc<dyn IssueGateway>, id: i64) {
    let tx = tx.clone();
    ctx.spawn(async move {
        let result = gateway.delete_item(id).await;
        let _ = tx.send(IssueServiceMessage::DeleteDone { id, result });
    });
}

pub fn request_bulk_create(
    tx: &IssueSender,
    ctx: &TaskContext,
    gateway: Arc<dyn IssueGateway>,
    requests: Vec<CreateIssueRequest>,
) {
    let tx = tx.clone();
    ctx.spawn(async move {
        let result = gateway.bulk_create(&requests).await;
        let _ = tx.send(IssueServiceMessage::BulkCreateDone(result));
    });
}

/// Messages sent from async operations back to the detail model. Every
/// mutation carries the issue it was issued for so a late reply can be
/// matched against the issue currently shown.
#[derive(Debug)]
pub enum DetailServiceMessage {
    Loaded {
        seq: u64,
        result: Result<(Issue, Vec<Comment>, Vec<Attachment>), ServiceError>,
    },
    UpdateDone {
        issue_id: i64,
        result: Result<Issue, ServiceError>,
    },
    CommentAdded {
        issue_id: i64,
        result: Result<Comment, ServiceError>,
    },
    AttachmentUploaded {
        issue_id: i64,
        result: Result<Attachment, ServiceError>,
    },
    AttachmentDeleted {
        issue_id: i64,
        id: i64,
        result: Result<(), ServiceError>,
    },
    Deleted {
        issue_id: i64,
        result: Result<(), ServiceError>,
    },
}

impl DetailServiceMessage {
    /// Issue a mutation reply belongs to; `None` for loads, which are
    /// matched by sequence number instead.
    pub fn issue_id(&self) -> Option<i64> {
        match self {
            Self::Loaded { .. } => None,
            Self::UpdateDone { issue_id, .. }
            | Self::CommentAdded { issue_id, .. }
            | Self::AttachmentUploaded { issue_id, .. }
            | Self::AttachmentDeleted { issue_id, .. }
            | Self::Deleted { issue_id, .. } => Some(*issue_id),
        }
    }
}

pub type DetailSender = UnboundedSender<DetailServiceMessage>;

/// Load the issue with its comments and attachments. The issue itself is
/// required; the side lists degrade to empty on failure.
pub fn request_detail(
    tx: &DetailSender,
    ctx: &TaskContext,
    gateway: Arc<dyn IssueGateway>,
    seq: u64,
    id: i64,
) {
    let tx = tx.clone();
    ctx.spawn(async move {
        let (issue, comments, attachments) = tokio::join!(
            gateway.get_item(id),
            gateway.list_comments(id),
            gateway.list_attachments(id),
        );

        let comments = comments.unwrap_or_else(|e| {
            tracing::warn!("Failed to load comments for issue {}: {}", id, e);
            Vec::new()
        });
        let attachments = attachments.unwrap_or_else(|e| {
            tracing::warn!("Failed to load attachments for issue {}: {}", id, e);
            Vec::new()
        });

        let result = issue.map(|issue| (issue, comments, attachments));
        let _ = tx.send(DetailServiceMessage::Loaded { seq, result });
    });
}

pub fn request_detail_update(
    tx: &DetailSender,
    ctx: &TaskContext,
    gateway: Arc<dyn IssueGateway>,
    issue_id: i64,
    changes: UpdateIssueRequest,
) {
    let tx = tx.clone();
    ctx.spawn(async move {
        let result = gateway.update_item(issue_id, &changes).await;
        let _ = tx.send(DetailServiceMessage::UpdateDone { issue_id, result });
    });
}

pub fn request_add_comment(
    tx: &DetailSender,
    ctx: &TaskContext,
    gateway: Arc<dyn IssueGateway>,
    issue_id: i64,
    text: String,
) {
    let tx = tx.clone();
    ctx.spawn(async move {
        let result = gateway.add_comment(issue_id, &text).await;
        let _ = tx.send(DetailServiceMessage::CommentAdded { issue_id, result });
    });
}

pub fn request_upload_attachment(
    tx: &DetailSender,
    ctx: &TaskContext,
    gateway: Arc<dyn IssueGateway>,
    issue_id: i64,
    upload: AttachmentUpload,
) {
    let tx = tx.clone();
    ctx.spawn(async move {
        let result = gateway.upload_attachment(issue_id, upload).await;
        let _ = tx.send(DetailServiceMessage::AttachmentUploaded { issue_id, result });
    });
}

pub fn request_delete_attachment(
    tx: &DetailSender,
    ctx: &TaskContext,
    gateway: Arc<dyn IssueGateway>,
    issue_id: i64,
    id: i64,
) {
    let tx = tx.clone();
    ctx.spawn(async move {
        let result = gateway.delete_attachment(id).await;
        let _ = tx.send(DetailServiceMessage::AttachmentDeleted {
            issue_id,
            id,
            result,
        });
    });
}

pub fn request_detail_delete(
    tx: &DetailSender,
    ctx: &TaskContext,
    gateway: Arc<dyn IssueGateway>,
    issue_id: i64,
) {
    let tx = tx.clone();
    ctx.spawn(async move {
        let result = gateway.delete_item(issue_id).await;
        let _ = tx.send(DetailServiceMessage::Deleted { issue_id, result });
    });
}
