//! User directory and the signed-in user's profile.

use tracing::instrument;
use ventus_auth::{AuthUser, Session};
use ventus_core::AuthError;

use reqwest::Method;

use crate::client::ApiClient;
use crate::error::ServiceError;
use crate::query::{SortDirection, SortKey};
use crate::types::{ProfilePage, ProfileTab, ProfileUpdate, UserListItem, UserProfile};

/// Tab and server-side sort for a profile page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProfileQuery {
    pub tab: ProfileTab,
    /// `None` leaves the order to the server (most recently updated first).
    pub sort: Option<(SortKey, SortDirection)>,
}

impl ProfileQuery {
    pub fn new(tab: ProfileTab) -> Self {
        Self { tab, sort: None }
    }

    /// Sort by `key`; picking the current key again flips the direction,
    /// a new key starts ascending.
    pub fn toggle_sort(&mut self, key: SortKey) {
        self.sort = match self.sort {
            Some((current, direction)) if current == key => Some((key, direction.flipped())),
            _ => Some((key, SortDirection::Ascending)),
        };
    }

    /// Switch tabs, keeping the sort.
    pub fn select_tab(&mut self, tab: ProfileTab) {
        self.tab = tab;
    }

    /// `tab`, then `sort_by` as `field` or `-field`.
    pub fn params(&self) -> Vec<(String, String)> {
        let mut params = vec![("tab".to_string(), self.tab.as_str().to_string())];
        if let Some((key, direction)) = self.sort {
            let prefix = match direction {
                SortDirection::Ascending => "",
                SortDirection::Descending => "-",
            };
            params.push(("sort_by".to_string(), format!("{}{}", prefix, key.api_field())));
        }
        params
    }
}

#[derive(Debug, Clone)]
pub struct AccountClient {
    api: ApiClient,
}

impl AccountClient {
    pub fn new(base_url: &str, session: Session) -> Self {
        Self {
            api: ApiClient::new(base_url, session),
        }
    }

    pub fn from_api(api: ApiClient) -> Self {
        Self { api }
    }

    /// `GET /users/`
    #[instrument(skip(self), level = "info")]
    pub async fn list_users(&self) -> Result<Vec<UserListItem>, ServiceError> {
        let users: Vec<UserListItem> = self.api.get_list("users/", &[]).await?;
        tracing::info!("Fetched {} users", users.len());
        Ok(users)
    }

    /// `GET /profile/me/`
    #[instrument(skip(self), level = "info")]
    pub async fn fetch_my_profile(&self) -> Result<UserProfile, ServiceError> {
        self.api.get_json("profile/me/", &[]).await
    }

    /// `GET /profile/{username}/` for one tab.
    #[instrument(skip(self), level = "info")]
    pub async fn fetch_profile(
        &self,
        username: &str,
        query: &ProfileQuery,
    ) -> Result<ProfilePage, ServiceError> {
        let username = username.trim();
        if username.is_empty() || username.contains('/') {
            return Err(ServiceError::InvalidRequest(format!(
                "invalid username {:?}",
                username
            )));
        }
        let page: ProfilePage = self
            .api
            .get_json(&format!("profile/{}/", username), &query.params())
            .await?;
        tracing::debug!(
            "Profile {} tab {} has {} entries",
            page.username,
            page.active_tab.as_str(),
            page.tab_content.len()
        );
        Ok(page)
    }

    /// `PATCH /profile/me/`. An empty update is refused without a request.
    #[instrument(skip(self, update), level = "info")]
    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<UserProfile, ServiceError> {
        if update.is_empty() {
            return Err(ServiceError::InvalidRequest("nothing to update".into()));
        }
        self.api
            .send_json(Method::PATCH, "profile/me/", update)
            .await
    }

    /// Act as `user` from now on. Users without an API key are refused.
    pub fn select_user(&self, user: &UserListItem) -> Result<AuthUser, AuthError> {
        self.api
            .session()
            .select_user(user.id, &user.username, user.api_key(), user.avatar_url.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_toggles_on_same_key() {
        let mut query = ProfileQuery::new(ProfileTab::Watched);
        assert_eq!(query.params(), vec![("tab".to_string(), "watched".to_string())]);

        query.toggle_sort(SortKey::Modified);
        assert_eq!(query.params()[1].1, "updated_at");
        query.toggle_sort(SortKey::Modified);
        assert_eq!(query.params()[1].1, "-updated_at");

        query.toggle_sort(SortKey::Priority);
        assert_eq!(query.params()[1].1, "priority");

        query.select_tab(ProfileTab::Assigned);
        assert_eq!(query.params()[0].1, "assigned");
        assert_eq!(query.params()[1].1, "priority");
    }

    #[tokio::test]
    async fn test_bad_username_is_rejected_before_sending() {
        let accounts = AccountClient::new("http://127.0.0.1:9", Session::from_api_key("k"));
        let err = accounts
            .fetch_profile("a/b", &ProfileQuery::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidRequest(_)));

        let err = accounts.update_profile(&ProfileUpdate::default()).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidRequest(_)));
    }
}
