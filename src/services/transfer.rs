//! Thin HTTP GET helper used to fetch the timetable index and workbooks.

use std::time::Duration;

use reqwest::Client;
use tracing::{debug, warn};

use crate::error::BotError;

#[derive(Clone)]
pub struct HttpTransfer {
    client: Client,
}

impl HttpTransfer {
    pub fn new(timeout: Duration) -> Result<Self, BotError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    /// Body as text, or `None` when the server answers with a non-success status.
    pub async fn get_string(&self, url: &str) -> Result<Option<String>, BotError> {
        let Some(response) = self.get(url).await? else {
            return Ok(None);
        };
        Ok(Some(response.text().await?))
    }

    /// Body as bytes, or `None` when the server answers with a non-success status.
    pub async fn get_bytes(&self, url: &str) -> Result<Option<Vec<u8>>, BotError> {
        let Some(response) = self.get(url).await? else {
            return Ok(None);
        };
        Ok(Some(response.bytes().await?.to_vec()))
    }

    async fn get(&self, url: &str) -> Result<Option<reqwest::Response>, BotError> {
        debug!("GET {}", url);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| BotError::Transport(format!("Request to {} failed: {}", url, e)))?;

        if !response.status().is_success() {
            warn!("GET {} returned {}", url, response.status());
            return Ok(None);
        }
        Ok(Some(response))
    }
}
