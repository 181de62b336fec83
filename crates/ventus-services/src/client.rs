//! Shared HTTP plumbing for the tracker REST API.

use std::time::Duration;

use reqwest::multipart::Form;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use ventus_auth::Session;
use ventus_core::Config;

use crate::error::ServiceError;
use crate::retry::{with_retry, RetryConfig};
use crate::types::ListOrPage;

/// Authenticated JSON client bound to one API base URL.
///
/// Cheap to clone; the issue, settings and account clients each hold one.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
    session: Session,
    retry: RetryConfig,
}

impl ApiClient {
    pub fn new(base_url: &str, session: Session) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            session,
            retry: RetryConfig::default(),
        }
    }

    /// Build from the loaded configuration (timeout and retry policy).
    pub fn from_config(config: &Config, session: Session) -> Result<Self, ServiceError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.api.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.api.base_url.trim_end_matches('/').to_string(),
            session,
            retry: RetryConfig::from(&config.retry),
        })
    }

    pub fn with_retry_config(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// `ApiKey <key>`, or `NotAuthenticated` without touching the network.
    fn auth_header(&self) -> Result<String, ServiceError> {
        let key = self
            .session
            .api_key()
            .map_err(|_| ServiceError::NotAuthenticated)?;
        Ok(format!("ApiKey {}", key))
    }

    /// `GET` with retry on transient statuses.
    pub(crate) async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(String, String)],
    ) -> Result<T, ServiceError> {
        let auth = self.auth_header()?;
        let url = self.url(path);
        tracing::debug!("GET {} {:?}", url, query);

        let response = with_retry(&self.retry, || {
            self.client
                .get(&url)
                .header("Authorization", &auth)
                .query(query)
                .send()
        })
        .await?;

        handle_response(response).await
    }

    /// `GET` a list endpoint that may or may not paginate.
    pub(crate) async fn get_list<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(String, String)],
    ) -> Result<Vec<T>, ServiceError> {
        let list: ListOrPage<T> = self.get_json(path, query).await?;
        Ok(list.into_vec())
    }

    /// Write with a JSON body; never retried.
    pub(crate) async fn send_json<B, T>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> Result<T, ServiceError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let auth = self.auth_header()?;
        let url = self.url(path);
        tracing::debug!("{} {}", method, url);

        let response = self
            .client
            .request(method, &url)
            .header("Authorization", auth)
            .json(body)
            .send()
            .await?;

        handle_response(response).await
    }

    /// Write with a multipart form body; never retried.
    pub(crate) async fn send_multipart<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        form: Form,
    ) -> Result<T, ServiceError> {
        let auth = self.auth_header()?;
        let url = self.url(path);
        tracing::debug!("{} {} (multipart)", method, url);

        let response = self
            .client
            .request(method, &url)
            .header("Authorization", auth)
            .multipart(form)
            .send()
            .await?;

        handle_response(response).await
    }

    /// `DELETE`; success is judged by status only.
    pub(crate) async fn delete(&self, path: &str) -> Result<(), ServiceError> {
        let auth = self.auth_header()?;
        let url = self.url(path);
        tracing::debug!("DELETE {}", url);

        let response = self
            .client
            .delete(&url)
            .header("Authorization", auth)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let text = response.text().await.unwrap_or_default();
            Err(error_for_status(status.as_u16(), text))
        }
    }
}

/// Map a response to the decoded body or a categorized error.
async fn handle_response<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ServiceError> {
    let status = response.status();

    if status.is_success() {
        response
            .json()
            .await
            .map_err(|e| ServiceError::Decode(e.to_string()))
    } else {
        let text = response.text().await.unwrap_or_default();
        Err(error_for_status(status.as_u16(), text))
    }
}

fn error_for_status(status: u16, body: String) -> ServiceError {
    match status {
        400 | 422 => ServiceError::validation_from_body(&body),
        401 => ServiceError::Unauthorized,
        403 => ServiceError::Forbidden,
        404 => ServiceError::NotFound(body),
        _ => {
            tracing::warn!("API returned {}: {}", status, body);
            ServiceError::Server {
                status,
                message: body,
            }
        }
    }
}
