use std::future::Future;
use std::sync::Arc;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use crate::advisor::GeminiClient;
use crate::bridge::Args;
use crate::bridge::config::{self, Config};
use crate::bridge::prettylog::log_startup_banner;
use crate::http::{server, AppState};
use crate::ingest::{LineSource, Producer};
use crate::sensor::ReadingCache;
use crate::utils;

pub async fn run_bridge() {
    let args = Args::parse();

    if let Err(e) = utils::init_tracing() {
        eprintln!("Failed to initialize logging: {}", e);
        return;
    }

    let mut cfg = match config::load(args.config.as_deref()) {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::error!("Invalid configuration: {:#}", e);
            return;
        }
    };
    cfg.apply_env();
    cfg.apply_args(&args);
    tracing::debug!("config: {:?}", cfg);

    log_startup_banner(&cfg, args.simulate);

    if let Err(e) = run(cfg, args.simulate, utils::shutdown_signal()).await {
        tracing::error!("Bridge error: {}", e);
        std::process::exit(1);
    }
}

/// Run ingest and the HTTP API until `shutdown` resolves or the server fails
pub async fn run(cfg: Config, simulate: bool, shutdown: impl Future<Output = ()>) -> crate::Result<()> {
    let cache = ReadingCache::new();

    // single attempt; without a board we keep serving synthetic data
    let source = if simulate {
        None
    } else {
        match LineSource::open(&cfg.serial.options()) {
            Ok(source) => Some(source),
            Err(e) => {
                tracing::warn!("{}, falling back to synthetic readings", e);
                None
            }
        }
    };

    let cancel = CancellationToken::new();
    let producer = Producer::new(cache.clone(), source)
        .with_pace(cfg.serial.pace())
        .synthesize_when_idle(cfg.serial.synthesize_when_idle);
    let producer_task = tokio::spawn(producer.run(cancel.clone()));

    if !cfg.advisor.has_api_key() {
        tracing::warn!("No model API key configured, recommendations will fail");
    }
    let recommender = Arc::new(GeminiClient::new(cfg.advisor.options()));
    let state = AppState::new(cache, recommender);

    let listen_addr = cfg.http.listen_addr.clone();
    let server_cancel = cancel.clone();
    let mut server_task = tokio::spawn(async move {
        server::start(&listen_addr, state, server_cancel).await
    });

    let finished = tokio::select! {
        _ = shutdown => {
            tracing::info!("Shutdown signal received, stopping");
            None
        }
        joined = &mut server_task => Some(joined),
    };

    cancel.cancel();
    let server_result = match finished {
        Some(joined) => joined,
        None => server_task.await,
    };
    if let Err(e) = producer_task.await {
        tracing::error!("Ingest task failed: {}", e);
    }

    server_result?
}
