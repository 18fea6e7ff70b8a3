//! Recipient directory: where alert push tokens come from.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::RecipientAddress;

#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("Directory request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Directory returned status {0}")]
    Status(reqwest::StatusCode),
}

#[async_trait]
pub trait RecipientDirectory: Send + Sync {
    /// Current recipients. Never contains empty tokens.
    async fn recipients(&self) -> Result<Vec<RecipientAddress>, DirectoryError>;
}

// ---

/// User record as listed by the directory service.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserRecord {
    push_token: Option<String>,
}

/// Reads the full user list from an HTTP endpoint.
pub struct HttpRecipientDirectory {
    client: reqwest::Client,
    url: String,
}

impl HttpRecipientDirectory {
    pub fn new(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

#[async_trait]
impl RecipientDirectory for HttpRecipientDirectory {
    async fn recipients(&self) -> Result<Vec<RecipientAddress>, DirectoryError> {
        // ---
        let response = self.client.get(&self.url).send().await?;
        if !response.status().is_success() {
            return Err(DirectoryError::Status(response.status()));
        }

        let users: Vec<UserRecord> = response.json().await?;
        let total = users.len();
        let addresses: Vec<RecipientAddress> = users
            .into_iter()
            .filter_map(|u| u.push_token.as_deref().and_then(RecipientAddress::parse))
            .collect();

        debug!(
            url = %self.url,
            users = total,
            with_token = addresses.len(),
            "Loaded recipients"
        );
        Ok(addresses)
    }
}

/// Fixed recipient list, for running without a directory service.
#[derive(Debug, Clone, Default)]
pub struct StaticRecipientDirectory {
    addresses: Vec<RecipientAddress>,
}

impl StaticRecipientDirectory {
    pub fn new<'a>(tokens: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            addresses: tokens.into_iter().filter_map(RecipientAddress::parse).collect(),
        }
    }
}

#[async_trait]
impl RecipientDirectory for StaticRecipientDirectory {
    async fn recipients(&self) -> Result<Vec<RecipientAddress>, DirectoryError> {
        Ok(self.addresses.clone())
    }
}
