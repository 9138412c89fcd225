use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::Deserialize;
use std::time::Duration;

use super::{AdminUser, IdentityAdmin, IdentityError};

/// Users per page when walking the admin listing
const PAGE_SIZE: usize = 1000;

/// GoTrue admin API client authenticated with a service key
pub struct GoTrueAdminClient {
    http_client: reqwest::Client,
    base_url: String,
}

#[derive(Deserialize)]
struct UserListResponse {
    #[serde(default)]
    users: Vec<AdminUser>,
}

impl GoTrueAdminClient {
    pub fn new(
        base_url: impl Into<String>,
        service_key: &str,
        timeout: Duration,
    ) -> Result<Self, IdentityError> {
        let invalid_key = |_| IdentityError::Config("Invalid service key format".to_string());

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", service_key)).map_err(invalid_key)?,
        );
        headers.insert(
            HeaderName::from_static("apikey"),
            HeaderValue::from_str(service_key).map_err(invalid_key)?,
        );

        let http_client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, IdentityError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(IdentityError::Upstream {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl IdentityAdmin for GoTrueAdminClient {
    async fn list_all_users(&self) -> Result<Vec<AdminUser>, IdentityError> {
        let mut all = Vec::new();
        let mut page = 1;

        loop {
            let response = self
                .http_client
                .get(format!("{}/admin/users", self.base_url))
                .query(&[("page", page), ("per_page", PAGE_SIZE)])
                .send()
                .await?;

            let batch: UserListResponse = Self::check(response).await?.json().await?;
            let fetched = batch.users.len();
            all.extend(batch.users);

            if fetched < PAGE_SIZE {
                break;
            }
            page += 1;
        }

        tracing::debug!(count = all.len(), "fetched users from identity provider");
        Ok(all)
    }

    async fn set_ban(&self, user_id: &str, ban_duration: &str) -> Result<AdminUser, IdentityError> {
        let response = self
            .http_client
            .put(format!("{}/admin/users/{}", self.base_url, user_id))
            .json(&serde_json::json!({ "ban_duration": ban_duration }))
            .send()
            .await?;

        Ok(Self::check(response).await?.json().await?)
    }
}
