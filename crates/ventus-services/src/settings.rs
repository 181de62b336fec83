//! Administrative CRUD over reference data, one typed capability per entity.

use async_trait::async_trait;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::instrument;
use ventus_auth::Session;

use crate::client::ApiClient;
use crate::error::ServiceError;
use crate::types::{IssueStatus, IssueType, OptionMeta, Priority, Severity};

/// A reference-data entity administered under `/settings/<kind>/`.
pub trait SettingResource:
    OptionMeta + DeserializeOwned + Clone + Send + Sync + std::fmt::Debug + 'static
{
    /// Collection path relative to the API base.
    const PATH: &'static str;
    /// Human label for log and user messages.
    const LABEL: &'static str;
    /// Body accepted by create and update.
    type Draft: Serialize + Clone + Send + Sync + std::fmt::Debug + 'static;

    fn to_draft(&self) -> Self::Draft;
}

/// Create/update body for priorities, severities and issue types.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetaDraft {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<i32>,
}

/// Create/update body for statuses.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusDraft {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<i32>,
    pub is_closed: bool,
}

impl SettingResource for IssueStatus {
    const PATH: &'static str = "settings/statuses/";
    const LABEL: &'static str = "status";
    type Draft = StatusDraft;

    fn to_draft(&self) -> StatusDraft {
        StatusDraft {
            name: self.name.clone(),
            color: self.color.clone(),
            order: self.order,
            is_closed: self.is_closed,
        }
    }
}

macro_rules! meta_resource {
    ($ty:ty, $path:literal, $label:literal) => {
        impl SettingResource for $ty {
            const PATH: &'static str = $path;
            const LABEL: &'static str = $label;
            type Draft = MetaDraft;

            fn to_draft(&self) -> MetaDraft {
                MetaDraft {
                    name: self.name.clone(),
                    color: self.color.clone(),
                    order: self.order,
                }
            }
        }
    };
}

meta_resource!(Priority, "settings/priorities/", "priority");
meta_resource!(Severity, "settings/severities/", "severity");
meta_resource!(IssueType, "settings/types/", "issue type");

/// List / create / update / delete for one reference-data entity.
#[async_trait]
pub trait SettingsAdmin<T: SettingResource>: Send + Sync {
    async fn list(&self) -> Result<Vec<T>, ServiceError>;

    async fn create(&self, draft: &T::Draft) -> Result<T, ServiceError>;

    /// Full replacement (`PUT`).
    async fn update(&self, id: i64, draft: &T::Draft) -> Result<T, ServiceError>;

    async fn delete(&self, id: i64) -> Result<(), ServiceError>;
}

/// [`SettingsAdmin`] for every [`SettingResource`] over the REST API.
#[derive(Debug, Clone)]
pub struct SettingsClient {
    api: ApiClient,
}

impl SettingsClient {
    pub fn new(base_url: &str, session: Session) -> Self {
        Self {
            api: ApiClient::new(base_url, session),
        }
    }

    pub fn from_api(api: ApiClient) -> Self {
        Self { api }
    }
}

#[async_trait]
impl<T: SettingResource> SettingsAdmin<T> for SettingsClient {
    #[instrument(skip(self), fields(kind = T::LABEL), level = "info")]
    async fn list(&self) -> Result<Vec<T>, ServiceError> {
        self.api.get_list(T::PATH, &[]).await
    }

    #[instrument(skip(self), fields(kind = T::LABEL), level = "info")]
    async fn create(&self, draft: &T::Draft) -> Result<T, ServiceError> {
        let created: T = self.api.send_json(Method::POST, T::PATH, draft).await?;
        tracing::info!("Created {} {}", T::LABEL, created.id());
        Ok(created)
    }

    #[instrument(skip(self), fields(kind = T::LABEL), level = "info")]
    async fn update(&self, id: i64, draft: &T::Draft) -> Result<T, ServiceError> {
        let path = format!("{}{}/", T::PATH, id);
        let updated: T = self.api.send_json(Method::PUT, &path, draft).await?;
        tracing::info!("Updated {} {}", T::LABEL, id);
        Ok(updated)
    }

    #[instrument(skip(self), fields(kind = T::LABEL), level = "info")]
    async fn delete(&self, id: i64) -> Result<(), ServiceError> {
        self.api.delete(&format!("{}{}/", T::PATH, id)).await?;
        tracing::info!("Deleted {} {}", T::LABEL, id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_draft_keeps_closed_flag() {
        let status = IssueStatus {
            id: 3,
            name: "Done".into(),
            color: Some("#0a0".into()),
            order: Some(4),
            slug: Some("done".into()),
            is_closed: true,
        };
        let json = serde_json::to_value(status.to_draft()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"name": "Done", "color": "#0a0", "order": 4, "is_closed": true})
        );
    }

    #[test]
    fn test_resource_paths() {
        assert_eq!(<IssueStatus as SettingResource>::PATH, "settings/statuses/");
        assert_eq!(<Priority as SettingResource>::PATH, "settings/priorities/");
        assert_eq!(<Severity as SettingResource>::PATH, "settings/severities/");
        assert_eq!(<IssueType as SettingResource>::PATH, "settings/types/");
    }
}
