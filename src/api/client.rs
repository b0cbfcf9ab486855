use anyhow::Result;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;

use super::types::{ApiResponse, ItemInfo, TopOrders};
use crate::core::config::MarketConfig;

/// Fetch failures as the monitors see them. Every variant is transient:
/// a monitoring run logs it and starts its next cycle.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("request timed out")]
    Timeout,
    #[error("transport error: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("unexpected status: {0}")]
    Status(StatusCode),
    #[error("response carried no data")]
    NoData,
    #[error("failed to decode response: {0}")]
    Decode(#[source] reqwest::Error),
}

/// The listings side of the market API. The sniper core only talks to
/// this trait, so tests can script fetch results without a network.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OrderSource: Send + Sync {
    /// Current top sell/buy orders for an item, optionally filtered by
    /// mod rank.
    async fn top_orders(&self, item_name: &str, rank: Option<u32>) -> Result<TopOrders, ApiError>;

    /// Item detail by the id orders carry in `item_id`.
    async fn item_detail(&self, item_id: &str) -> Result<ItemInfo, ApiError>;
}

pub struct MarketClient {
    client: Client,
    base_url: String,
}

impl MarketClient {
    pub fn new(config: &MarketConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert("platform", HeaderValue::from_static("pc"));
        headers.insert("crossplay", HeaderValue::from_static("true"));

        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ApiError> {
        let url = format!("{}/{}", self.base_url, path);

        let response = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ApiError::Timeout
                } else {
                    ApiError::Transport(e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status(status));
        }

        let body: ApiResponse<T> = response.json().await.map_err(|e| {
            if e.is_timeout() {
                ApiError::Timeout
            } else {
                ApiError::Decode(e)
            }
        })?;

        body.data.ok_or(ApiError::NoData)
    }
}

#[async_trait]
impl OrderSource for MarketClient {
    async fn top_orders(&self, item_name: &str, rank: Option<u32>) -> Result<TopOrders, ApiError> {
        let mut query: Vec<(&str, String)> = Vec::new();
        if let Some(rank) = rank {
            query.push(("rank", rank.to_string()));
        }

        self.get_json(&format!("orders/item/{}/top", item_name), &query)
            .await
    }

    async fn item_detail(&self, item_id: &str) -> Result<ItemInfo, ApiError> {
        self.get_json(&format!("item/{}", item_id), &[]).await
    }
}
