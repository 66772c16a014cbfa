use std::sync::Arc;

use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue},
    Client,
    StatusCode,
};
use serde_json::Value;

use crate::{config::ShopifyClientConfig, ShopifyApiError};

/// How the upstream answered one order push. Rate limiting is an expected
/// answer, not an error; the dispatcher turns it into a delayed re-enqueue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderPushOutcome {
    Delivered,
    RateLimited { retry_after_seconds: i64 },
    Rejected { status: u16, message: String },
}

#[derive(Clone)]
pub struct ShopifyApi {
    config: ShopifyClientConfig,
    client: Arc<Client>,
}

impl ShopifyApi {
    pub fn new(config: ShopifyClientConfig) -> Result<Self, ShopifyApiError> {
        let mut headers = HeaderMap::with_capacity(1);
        headers.insert("Content-Type", HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ShopifyApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    pub fn config(&self) -> &ShopifyClientConfig {
        &self.config
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.base_url.trim_end_matches('/'))
    }

    /// Pushes one order update to `POST /admin/orders/{order_id}`. The
    /// upstream applies updates idempotently under its own identifiers, so
    /// redelivery of the same payload is safe.
    pub async fn push_order_update(&self, order_id: &str, body: &Value) -> Result<OrderPushOutcome, ShopifyApiError> {
        let url = self.url(&format!("/admin/orders/{order_id}"));
        trace!("Pushing order update to {url}");
        let response =
            self.client.post(&url).json(body).send().await.map_err(|e| ShopifyApiError::Transport(e.to_string()))?;
        let status = response.status();
        if status.is_success() {
            debug!("Order {order_id} update delivered ({status})");
            return Ok(OrderPushOutcome::Delivered);
        }
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after_seconds = retry_after_seconds(response.headers());
            info!("Upstream rate limited order {order_id}; retry after {retry_after_seconds}s");
            return Ok(OrderPushOutcome::RateLimited { retry_after_seconds });
        }
        let message = response.text().await.unwrap_or_default();
        warn!("Upstream rejected order {order_id} update with {status}");
        Ok(OrderPushOutcome::Rejected { status: status.as_u16(), message })
    }
}

/// `Retry-After` in whole seconds, defaulting to 1 when the header is absent
/// or unparseable.
fn retry_after_seconds(headers: &HeaderMap) -> i64 {
    headers
        .get("Retry-After")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<i64>().ok())
        .filter(|secs| *secs >= 0)
        .unwrap_or(1)
}

#[cfg(test)]
mod test {
    use super::*;

    fn headers_with(value: Option<&str>) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Some(v) = value {
            headers.insert("Retry-After", HeaderValue::from_str(v).unwrap());
        }
        headers
    }

    #[test]
    fn retry_after_parses_whole_seconds() {
        assert_eq!(retry_after_seconds(&headers_with(Some("2"))), 2);
        assert_eq!(retry_after_seconds(&headers_with(Some(" 30 "))), 30);
    }

    #[test]
    fn retry_after_defaults_to_one_second() {
        assert_eq!(retry_after_seconds(&headers_with(None)), 1);
        assert_eq!(retry_after_seconds(&headers_with(Some("soon"))), 1);
        assert_eq!(retry_after_seconds(&headers_with(Some("-5"))), 1);
    }

    #[test]
    fn url_joins_without_doubled_slashes() {
        let api = ShopifyApi::new(ShopifyClientConfig::new("http://localhost:4001/")).unwrap();
        assert_eq!(api.url("/admin/orders/o1"), "http://localhost:4001/admin/orders/o1");
    }
}
