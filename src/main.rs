use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use dotenv::dotenv;
use std::sync::Arc;

mod adapters;
mod config;
mod controllers;
mod db;
mod error;
mod flow;
mod handlers;
mod models;
mod parser;
mod processor;
mod scheduler;

#[cfg(test)]
mod pipeline_tests;

use config::Config;
use db::SqliteFlowStore;
use flow::{FlowEngine, FlowStore};
use processor::CommandProcessor;
use scheduler::{Sweeper, SweeperConfig};

pub struct AppState {
    pub config: Config,
    pub processor: Arc<CommandProcessor>,
    pub flow_engine: Arc<FlowEngine>,
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();
    env_logger::init();

    let config = Config::from_env();
    let port = config.port;

    log::info!("Initializing flow store at {}", config.database_url);
    let store: Arc<dyn FlowStore> = Arc::new(
        SqliteFlowStore::new(&config.database_url).expect("Failed to initialize flow store"),
    );

    let flow_engine = Arc::new(FlowEngine::new(store, config.flow_ttl_minutes));

    log::info!("Initializing provider adapters");
    let providers = adapters::http::build(&config);

    log::info!("Initializing command handler registry");
    let registry = handlers::create_default_registry(&providers);
    log::info!("Registered {} command handlers", registry.len());

    let processor = Arc::new(CommandProcessor::new(registry, flow_engine.clone()));

    // Start the expiry sweeper
    let sweeper = Arc::new(Sweeper::new(
        flow_engine.clone(),
        SweeperConfig {
            enabled: true,
            poll_interval_secs: config.sweep_interval_secs,
        },
    ));
    let (sweeper_shutdown_tx, sweeper_shutdown_rx) = tokio::sync::oneshot::channel();
    tokio::spawn(async move {
        sweeper.start(sweeper_shutdown_rx).await;
    });

    log::info!(
        "Starting chainpilot server on port {} (flow TTL: {}m, sweep: {}s)",
        port,
        config.flow_ttl_minutes,
        config.sweep_interval_secs
    );

    let proc = processor.clone();
    let engine = flow_engine.clone();

    let result = HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        App::new()
            .app_data(web::Data::new(AppState {
                config: config.clone(),
                processor: Arc::clone(&proc),
                flow_engine: Arc::clone(&engine),
            }))
            .wrap(Logger::default())
            .wrap(cors)
            .configure(controllers::health::config)
            .configure(controllers::commands::config)
            .configure(controllers::flows::config)
    })
    .bind(("0.0.0.0", port))?
    .run()
    .await;

    // Stop the sweeper on server shutdown
    let _ = sweeper_shutdown_tx.send(());
    result
}
