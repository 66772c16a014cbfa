use std::env;

use log::*;

const DEFAULT_API_HOST: &str = "127.0.0.1";
const DEFAULT_API_PORT: u16 = 4000;
const DEFAULT_MAX_DB_CONNECTIONS: u32 = 50;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// Base URL of the merchant platform's admin API. Outbound dispatch is
    /// disabled when unset.
    pub upstream_base_url: Option<String>,
    pub max_db_connections: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_API_HOST.to_string(),
            port: DEFAULT_API_PORT,
            database_url: String::default(),
            upstream_base_url: None,
            max_db_connections: DEFAULT_MAX_DB_CONNECTIONS,
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("API_HOST").ok().unwrap_or_else(|| DEFAULT_API_HOST.into());
        let port = env::var("API_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!("{s} is not a valid port for API_PORT. {e} Using the default, {DEFAULT_API_PORT}, instead.");
                    DEFAULT_API_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_API_PORT);
        let database_url = env::var("DATABASE_URL").ok().unwrap_or_else(|| {
            error!("DATABASE_URL is not set. Please set it to the URL for the relay database.");
            String::default()
        });
        let upstream_base_url = env::var("UPSTREAM_BASE_URL").ok();
        if upstream_base_url.is_none() {
            warn!("UPSTREAM_BASE_URL is not set. Merchant changes will not be pushed upstream.");
        }
        Self { host, port, database_url, upstream_base_url, max_db_connections: DEFAULT_MAX_DB_CONNECTIONS }
    }
}
