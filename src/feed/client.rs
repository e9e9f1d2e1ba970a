use anyhow::{anyhow, Result};
use reqwest::Client;
use serde_json::Value;

use super::retry::{retry_async, HttpStatusError, RetryConfig};
use crate::chat::ConversationFeed;
use crate::config::Config;
use crate::series::RawPoint;

/// One poll of the account-value series.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SeriesBatch {
    pub points: Vec<RawPoint>,
    pub model_ids: Vec<String>,
    /// Entries that could not be read as a point.
    pub skipped: usize,
}

/// Accepts a bare array of points, or an object carrying `series` (or
/// `points`) and optionally `modelIds` / `model_ids`.
pub fn parse_series(value: &Value) -> Result<SeriesBatch> {
    let (list, ids) = match value {
        Value::Array(items) => (items.as_slice(), None),
        Value::Object(map) => {
            let list = map
                .get("series")
                .or_else(|| map.get("points"))
                .and_then(Value::as_array)
                .ok_or_else(|| anyhow!("series response has no `series` array"))?;
            let ids = map.get("modelIds").or_else(|| map.get("model_ids")).and_then(Value::as_array);
            (list.as_slice(), ids)
        }
        _ => return Err(anyhow!("series response is neither an array nor an object")),
    };

    let mut batch = SeriesBatch::default();
    for item in list {
        match RawPoint::from_json(item) {
            Some(p) => batch.points.push(p),
            None => batch.skipped += 1,
        }
    }
    if let Some(ids) = ids {
        batch.model_ids = ids.iter().filter_map(Value::as_str).map(str::to_string).collect();
    }
    Ok(batch)
}

/// Read-only client for the board's upstream data API.
pub struct BoardApi {
    client: Client,
    config: Config,
    retry: RetryConfig,
}

impl BoardApi {
    pub fn new(config: Config) -> Result<Self> {
        Ok(Self {
            client: Client::builder().timeout(config.http_timeout()).build()?,
            config,
            retry: RetryConfig::default(),
        })
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    async fn get_json(&self, path: &str) -> Result<Value> {
        let url = self.config.endpoint(path);
        retry_async(&self.retry, path, || {
            let url = url.clone();
            async move {
                let resp = self.client.get(&url).send().await?;
                let status = resp.status();
                if !status.is_success() {
                    return Err(HttpStatusError { status: status.as_u16(), url }.into());
                }
                Ok(resp.json::<Value>().await?)
            }
        })
        .await
    }

    pub async fn fetch_series(&self) -> Result<SeriesBatch> {
        let value = self.get_json("since-inception-values").await?;
        parse_series(&value)
    }

    /// Debug endpoint; returned as-is for manual inspection.
    pub async fn fetch_account_totals(&self) -> Result<Value> {
        self.get_json("account-totals").await
    }

    pub async fn fetch_conversations(&self) -> Result<ConversationFeed> {
        let value = self.get_json("conversations").await?;
        Ok(ConversationFeed::from_json(&value))
    }
}
