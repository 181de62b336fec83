//! Remote issue collection: the gateway trait and its HTTP implementation.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Method;
use tracing::instrument;
use ventus_auth::Session;
use ventus_core::Config;

use crate::client::ApiClient;
use crate::error::ServiceError;
use crate::query::QueryIntent;
use crate::settings::SettingResource;
use crate::types::*;

/// Stateless access to the remote issue collection.
///
/// Items keep server order. Every failure is a categorized [`ServiceError`].
#[async_trait]
pub trait IssueGateway: Send + Sync {
    /// One page of issues matching the intent's search and filters.
    async fn fetch_page(&self, intent: &QueryIntent) -> Result<Page, ServiceError>;

    /// Statuses, priorities, severities and issue types.
    async fn fetch_options(&self) -> Result<ReferenceData, ServiceError>;

    async fn get_item(&self, id: i64) -> Result<Issue, ServiceError>;

    async fn update_item(&self, id: i64, changes: &UpdateIssueRequest) -> Result<Issue, ServiceError>;

    async fn create_item(&self, request: &CreateIssueRequest) -> Result<Issue, ServiceError>;

    async fn delete_item(&self, id: i64) -> Result<(), ServiceError>;

    async fn bulk_create(&self, requests: &[CreateIssueRequest]) -> Result<Vec<Issue>, ServiceError>;

    async fn list_users(&self) -> Result<Vec<UserLite>, ServiceError>;

    async fn list_comments(&self, issue_id: i64) -> Result<Vec<Comment>, ServiceError>;

    async fn add_comment(&self, issue_id: i64, text: &str) -> Result<Comment, ServiceError>;

    async fn list_attachments(&self, issue_id: i64) -> Result<Vec<Attachment>, ServiceError>;

    /// Attach a file to an issue and return the stored metadata.
    async fn upload_attachment(
        &self,
        issue_id: i64,
        upload: AttachmentUpload,
    ) -> Result<Attachment, ServiceError>;

    async fn delete_attachment(&self, attachment_id: i64) -> Result<(), ServiceError>;
}

/// [`IssueGateway`] over the tracker REST API.
#[derive(Debug, Clone)]
pub struct IssueClient {
    api: ApiClient,
}

impl IssueClient {
    pub fn new(base_url: &str, session: Session) -> Self {
        Self {
            api: ApiClient::new(base_url, session),
        }
    }

    pub fn from_config(config: &Config, session: Session) -> Result<Self, ServiceError> {
        Ok(Self {
            api: ApiClient::from_config(config, session)?,
        })
    }

    pub fn from_api(api: ApiClient) -> Self {
        Self { api }
    }

    fn validate_intent(intent: &QueryIntent) -> Result<(), ServiceError> {
        if intent.page < 1 {
            return Err(ServiceError::InvalidRequest(format!(
                "page must be at least 1, got {}",
                intent.page
            )));
        }
        if intent.page_size < 1 {
            return Err(ServiceError::InvalidRequest(
                "page size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    async fn list_setting<T: SettingResource>(&self) -> Result<Vec<T>, ServiceError> {
        self.api.get_list(T::PATH, &[]).await
    }
}

#[async_trait]
impl IssueGateway for IssueClient {
    #[instrument(skip(self), level = "info")]
    async fn fetch_page(&self, intent: &QueryIntent) -> Result<Page, ServiceError> {
        Self::validate_intent(intent)?;

        let params = intent.build_request_params();
        let response: PaginatedResponse<Issue> = self.api.get_json("issues/", &params).await?;

        tracing::info!(
            "Fetched {} issues (page {}, total {})",
            response.results.len(),
            intent.page,
            response.count
        );
        Ok(Page::from(response))
    }

    #[instrument(skip(self), level = "info")]
    async fn fetch_options(&self) -> Result<ReferenceData, ServiceError> {
        let (statuses, priorities, severities, issue_types) = tokio::try_join!(
            self.list_setting::<IssueStatus>(),
            self.list_setting::<Priority>(),
            self.list_setting::<Severity>(),
            self.list_setting::<IssueType>(),
        )?;

        Ok(ReferenceData {
            statuses,
            priorities,
            severities,
            issue_types,
        })
    }

    #[instrument(skip(self), level = "info")]
    async fn get_item(&self, id: i64) -> Result<Issue, ServiceError> {
        self.api.get_json(&format!("issues/{}/", id), &[]).await
    }

    #[instrument(skip(self), level = "info")]
    async fn update_item(&self, id: i64, changes: &UpdateIssueRequest) -> Result<Issue, ServiceError> {
        if changes.is_empty() {
            return Err(ServiceError::InvalidRequest("no changes to send".to_string()));
        }
        let issue: Issue = self
            .api
            .send_json(Method::PATCH, &format!("issues/{}/", id), changes)
            .await?;
        tracing::info!("Updated issue {}", id);
        Ok(issue)
    }

    #[instrument(skip(self), level = "info")]
    async fn create_item(&self, request: &CreateIssueRequest) -> Result<Issue, ServiceError> {
        let issue: Issue = self.api.send_json(Method::POST, "issues/", request).await?;
        tracing::info!("Created issue {}", issue.id);
        Ok(issue)
    }

    #[instrument(skip(self), level = "info")]
    async fn delete_item(&self, id: i64) -> Result<(), ServiceError> {
        self.api.delete(&format!("issues/{}/", id)).await?;
        tracing::info!("Deleted issue {}", id);
        Ok(())
    }

    #[instrument(skip(self, requests), fields(count = requests.len()), level = "info")]
    async fn bulk_create(&self, requests: &[CreateIssueRequest]) -> Result<Vec<Issue>, ServiceError> {
        if requests.is_empty() {
            return Err(ServiceError::InvalidRequest("nothing to create".to_string()));
        }
        let issues: Vec<Issue> = self
            .api
            .send_json(Method::POST, "issues/bulk_create/", requests)
            .await?;
        tracing::info!("Bulk created {} issues", issues.len());
        Ok(issues)
    }

    #[instrument(skip(self), level = "info")]
    async fn list_users(&self) -> Result<Vec<UserLite>, ServiceError> {
        self.api.get_list("users/", &[]).await
    }

    #[instrument(skip(self), level = "info")]
    async fn list_comments(&self, issue_id: i64) -> Result<Vec<Comment>, ServiceError> {
        let query = [("issue_id".to_string(), issue_id.to_string())];
        self.api.get_list("comments/", &query).await
    }

    #[instrument(skip(self, text), level = "info")]
    async fn add_comment(&self, issue_id: i64, text: &str) -> Result<Comment, ServiceError> {
        let body = CreateCommentRequest {
            issue: issue_id,
            text: text.to_string(),
        };
        self.api.send_json(Method::POST, "comments/", &body).await
    }

    #[instrument(skip(self), level = "info")]
    async fn list_attachments(&self, issue_id: i64) -> Result<Vec<Attachment>, ServiceError> {
        let query = [("issue_id".to_string(), issue_id.to_string())];
        self.api.get_list("attachments/", &query).await
    }

    #[instrument(skip(self, upload), fields(file = %upload.file_name), level = "info")]
    async fn upload_attachment(
        &self,
        issue_id: i64,
        upload: AttachmentUpload,
    ) -> Result<Attachment, ServiceError> {
        if upload.file_name.trim().is_empty() {
            return Err(ServiceError::InvalidRequest("attachment needs a file name".into()));
        }
        let size = upload.bytes.len();
        let mut part = Part::bytes(upload.bytes).file_name(upload.file_name);
        if let Some(mime) = &upload.mime_type {
            part = part
                .mime_str(mime)
                .map_err(|_| ServiceError::InvalidRequest(format!("bad content type {}", mime)))?;
        }
        let form = Form::new()
            .part("file", part)
            .text("issue", issue_id.to_string());

        let attachment: Attachment = self
            .api
            .send_multipart(Method::POST, "attachments/", form)
            .await?;
        tracing::info!(
            "Uploaded attachment {} ({} bytes) to issue {}",
            attachment.id,
            size,
            issue_id
        );
        Ok(attachment)
    }

    #[instrument(skip(self), level = "info")]
    async fn delete_attachment(&self, attachment_id: i64) -> Result<(), ServiceError> {
        self.api
            .delete(&format!("attachments/{}/", attachment_id))
            .await
    }
}
