use std::time::Duration;

/// Upstream connection settings. `base_url` comes from `UPSTREAM_BASE_URL`;
/// the defaults match the upstream's documented admin rate limit of two
/// requests per second with a burst of two.
#[derive(Debug, Clone)]
pub struct ShopifyClientConfig {
    pub base_url: String,
    pub request_timeout: Duration,
    pub rate_limit_capacity: u32,
    pub rate_limit_per_second: f64,
}

impl ShopifyClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            request_timeout: Duration::from_secs(15),
            rate_limit_capacity: 2,
            rate_limit_per_second: 2.0,
        }
    }
}
