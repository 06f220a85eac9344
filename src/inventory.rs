use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{event, Level};

use crate::errors::InventoryClientError;

// the service only answers for codes it knows about, a missing code means
// not in stock
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryStatus {
    pub product_code: String,
    pub in_stock: bool,
}

#[derive(Debug, Clone)]
pub struct InventoryClientInitializationInfo {
    pub base_url: String,
    pub request_timeout: Duration,
    pub retry_policy: RetryPolicy,
}

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_backoff: Duration,
    pub backoff_multiplier: f64,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_retries: 2,
            initial_backoff: Duration::from_millis(100),
            backoff_multiplier: 2.0,
            max_backoff: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    // min(initial_backoff * multiplier^(attempt-1), max_backoff)
    pub fn backoff_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1);
        let backoff_millis =
            self.initial_backoff.as_millis() as f64 * self.backoff_multiplier.powi(exponent as i32);
        let capped_millis = backoff_millis.min(self.max_backoff.as_millis() as f64);
        Duration::from_millis(capped_millis as u64)
    }
}

// callers hand over a deduplicated code set, one batched lookup per order
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait InventoryClient: Send + Sync {
    async fn check_stock(
        &self,
        product_codes: Vec<String>,
    ) -> Result<Vec<InventoryStatus>, InventoryClientError>;
}

pub struct HttpInventoryClient {
    http_client: reqwest::Client,
    base_url: String,
    retry_policy: RetryPolicy,
}

impl HttpInventoryClient {
    pub fn new(info: &InventoryClientInitializationInfo) -> Result<HttpInventoryClient, String> {
        match reqwest::Client::builder().timeout(info.request_timeout).build() {
            Ok(http_client) => Ok(HttpInventoryClient {
                http_client: http_client,
                base_url: info.base_url.clone(),
                retry_policy: info.retry_policy.clone(),
            }),
            Err(e) => Err(format!("Failed to build inventory http client: {}", e)),
        }
    }

    async fn fetch_stock(
        &self,
        product_codes: &[String],
    ) -> Result<Vec<InventoryStatus>, InventoryClientError> {
        let query_params: Vec<(&str, &String)> = product_codes
            .iter()
            .map(|product_code| ("productCode", product_code))
            .collect();

        match self.http_client.get(&self.base_url).query(&query_params).send().await {
            Ok(response) => match response.error_for_status() {
                Ok(response) => match response.json::<Vec<InventoryStatus>>().await {
                    Ok(statuses) => Ok(statuses),
                    Err(e) => Err(InventoryClientError::from(e)),
                },
                Err(e) => Err(InventoryClientError::from(e)),
            },
            Err(e) => Err(InventoryClientError::from(e)),
        }
    }
}

#[async_trait]
impl InventoryClient for HttpInventoryClient {
    async fn check_stock(
        &self,
        product_codes: Vec<String>,
    ) -> Result<Vec<InventoryStatus>, InventoryClientError> {
        let mut attempt = 0;
        loop {
            match self.fetch_stock(&product_codes).await {
                Ok(statuses) => return Ok(statuses),
                Err(e) => {
                    if e.is_transient() && attempt < self.retry_policy.max_retries {
                        attempt += 1;
                        let backoff = self.retry_policy.backoff_for_attempt(attempt);
                        event!(
                            Level::WARN,
                            "Inventory lookup attempt {} failed ({}), retrying in {:?}",
                            attempt,
                            e,
                            backoff
                        );
                        tokio::time::sleep(backoff).await;
                    } else {
                        return Err(e);
                    }
                }
            }
        }
    }
}
