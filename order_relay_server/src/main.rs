use std::env;

use dotenvy::dotenv;
use log::{error, info};
use order_relay_server::{
    config::ServerConfig,
    server::{run_server, Shutdown},
};

#[actix_web::main]
async fn main() {
    dotenv().ok();
    env_logger::init();
    let config = ServerConfig::from_env_or_default();
    if !preflight_check(&config) {
        eprintln!("🚀️ Preflight check failed. Exiting. Check the logs for details.");
        std::process::exit(1);
    }

    info!("🚀️ Starting server on {}:{}", config.host, config.port);
    match run_server(config).await {
        Ok(Shutdown::Graceful) => println!("Bye!"),
        Ok(Shutdown::Interrupted) => std::process::exit(130),
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        },
    }
}

fn preflight_check(config: &ServerConfig) -> bool {
    if env::var("RELAY_SKIP_PREFLIGHT").ok() == Some("Yes".to_string()) {
        info!("🚦️ Skipping preflight checks. I hope you know what you're doing!");
        return true;
    }
    info!("🚦️ Running preflight checks...");
    let mut result = true;
    if config.database_url.is_empty() {
        error!("🚦️ DATABASE_URL is not set. Please set it to the URL for the relay database.");
        result = false;
    }
    if config.upstream_base_url.is_none() {
        info!("🚦️ UPSTREAM_BASE_URL is not set. The outbound dispatcher will stay disabled.");
    }
    if result {
        info!("🚦️ Preflight check PASSED.");
    } else {
        error!("🚦️ Preflight check FAILED: Please fix the issues above before starting the server.");
        info!(
            "🚦️ If you really know what you're doing and want to skip the preflight check, set \
             `RELAY_SKIP_PREFLIGHT` to `Yes` in your environment variables"
        );
    }
    result
}
