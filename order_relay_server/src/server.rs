use std::time::Duration;

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use log::*;
use order_relay_engine::{events::ShipmentBroadcaster, IngestApi, OrderQueryApi, SqliteDatabase};
use shopify_client::{ShopifyApi, ShopifyClientConfig};
use tokio::sync::watch;

use crate::{
    config::ServerConfig,
    errors::ServerError,
    ingest_worker::start_ingest_worker,
    outbound_worker::start_outbound_worker,
    routes::{courier_status_update, get_order, health, list_orders, shipment_stream, shopify_webhook},
};

/// How the process came to rest. `Interrupted` maps to exit code 130.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shutdown {
    Graceful,
    Interrupted,
}

/// Composition root: connects the database, runs migrations, spawns the two
/// pipeline workers and serves HTTP until the server exits or an interrupt
/// arrives. Workers finish their in-flight messages before the call returns.
pub async fn run_server(config: ServerConfig) -> Result<Shutdown, ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, config.max_db_connections)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    db.run_migrations().await.map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let broadcaster = ShipmentBroadcaster::default();

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let ingest_worker = start_ingest_worker(IngestApi::new(db.clone(), broadcaster.clone()), shutdown_rx.clone());
    let outbound_worker = match &config.upstream_base_url {
        Some(base_url) => {
            let api = ShopifyApi::new(ShopifyClientConfig::new(base_url))
                .map_err(|e| ServerError::InitializeError(e.to_string()))?;
            Some(start_outbound_worker(db.clone(), api, shutdown_rx))
        },
        None => None,
    };

    let srv = create_server_instance(&config, db, broadcaster)?;
    let handle = srv.handle();
    let mut server_task = tokio::spawn(srv);

    let interrupted = tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("🚀️ Interrupt received. Shutting down.");
            handle.stop(true).await;
            true
        },
        result = &mut server_task => {
            match result {
                Ok(Ok(())) => info!("🚀️ HTTP server exited."),
                Ok(Err(e)) => error!("🚀️ HTTP server failed: {e}"),
                Err(e) => error!("🚀️ HTTP server task panicked: {e}"),
            }
            false
        },
    };

    // Stop claiming new queue messages; in-flight ones run to completion.
    let _ = shutdown_tx.send(true);
    if interrupted {
        let _ = server_task.await;
    }
    if let Err(e) = ingest_worker.await {
        error!("🚀️ Ingest worker did not stop cleanly: {e}");
    }
    if let Some(worker) = outbound_worker {
        if let Err(e) = worker.await {
            error!("🚀️ Outbound worker did not stop cleanly: {e}");
        }
    }
    Ok(if interrupted { Shutdown::Interrupted } else { Shutdown::Graceful })
}

pub fn create_server_instance(
    config: &ServerConfig,
    db: SqliteDatabase,
    broadcaster: ShipmentBroadcaster,
) -> Result<Server, ServerError> {
    let srv = HttpServer::new(move || {
        let ingest_api = IngestApi::new(db.clone(), broadcaster.clone());
        let query_api = OrderQueryApi::new(db.clone());
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("order_relay"))
            .app_data(web::Data::new(ingest_api))
            .app_data(web::Data::new(query_api))
            .app_data(web::Data::new(broadcaster.clone()))
            .service(health)
            .route("/webhooks/shopify/orders", web::post().to(shopify_webhook::<SqliteDatabase>))
            .route("/events/courier/status_update", web::post().to(courier_status_update::<SqliteDatabase>))
            .route("/orders", web::get().to(list_orders::<SqliteDatabase>))
            .route("/orders/{id}", web::get().to(get_order::<SqliteDatabase>))
            .route("/stream/shipments", web::get().to(shipment_stream))
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .disable_signals()
    .bind((config.host.as_str(), config.port))?
    .run();
    Ok(srv)
}
