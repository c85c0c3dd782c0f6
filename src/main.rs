//! Overwatch Simulation Server — composition root.
//!
//! Wires the concrete collaborators (Postgres persistence, the HTTP-backed
//! LLM client and satellite catalog client) behind the traits the library
//! crate depends on, then serves the axum router with a graceful-shutdown
//! signal handler — the same `CancellationToken` + `tokio::signal::ctrl_c`
//! shape as the teacher's `main.rs`, minus the multi-task `JoinSet`
//! supervisor: this server has exactly one long-running task (the HTTP
//! listener), the simulation's own two loops are spawned and owned per
//! scenario by `SimulationController::start`.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use overwatch_sim::api::{build_router, AppState};
use overwatch_sim::broadcast::BroadcastAdapter;
use overwatch_sim::catalog::{HttpSatelliteCatalog, SatelliteCatalog};
use overwatch_sim::config::{self, Config};
use overwatch_sim::engine::SimulationController;
use overwatch_sim::llm::client::{HttpLlmClient, LlmClient};
use overwatch_sim::persistence::{InMemoryPersistence, PersistenceLayer, PostgresPersistence};

#[derive(Parser, Debug)]
#[command(name = "overwatch-sim")]
#[command(about = "Real-time, time-compressed wargame simulation server")]
#[command(version)]
struct CliArgs {
    /// Override the HTTP bind port (defaults to PORT env var, then 3001).
    #[arg(short, long)]
    port: Option<u16>,

    /// Run against an in-process store instead of PostgreSQL — for local
    /// development and demos; state does not survive a restart.
    #[arg(long)]
    in_memory: bool,

    /// Run pending database migrations on startup, then exit.
    #[arg(long)]
    migrate: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args = CliArgs::parse();

    let mut cfg = Config::from_env();
    if let Some(port) = args.port {
        cfg.port = port;
    }
    config::init(cfg.clone());

    info!("overwatch-sim starting, port={}", cfg.port);

    let persistence: Arc<dyn PersistenceLayer> = if args.in_memory {
        warn!("running with in-memory persistence — state does not survive a restart");
        Arc::new(InMemoryPersistence::new())
    } else {
        let pg = PostgresPersistence::connect(&cfg.database_url)
            .await
            .context("failed to connect to PostgreSQL")?;
        pg.run_migrations().await.context("failed to run database migrations")?;
        if args.migrate {
            info!("migrations complete, exiting (--migrate)");
            return Ok(());
        }
        Arc::new(pg)
    };

    if args.migrate && args.in_memory {
        info!("--migrate has no effect with --in-memory, exiting");
        return Ok(());
    }

    let llm_client: Arc<dyn LlmClient> = Arc::new(HttpLlmClient::new(
        std::env::var("LLM_BASE_URL").unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),
        cfg.openai_api_key.clone().unwrap_or_default(),
    ));

    let satellite_catalog: Arc<dyn SatelliteCatalog> = Arc::new(HttpSatelliteCatalog::new(
        cfg.udl_base_url.clone().unwrap_or_else(|| "https://unifieddatalibrary.com/udl".to_string()),
        cfg.udl_username.clone().unwrap_or_default(),
        cfg.udl_password.clone().unwrap_or_default(),
    ));

    let broadcast = Arc::new(BroadcastAdapter::new());
    let controller = Arc::new(SimulationController::new(
        persistence.clone(),
        broadcast.clone(),
        llm_client.clone(),
        Arc::new(cfg.clone()),
    ));

    let state = AppState { persistence, broadcast, controller, llm_client, satellite_catalog };
    let app = build_router(state, &cfg.cors_origin);

    let addr = format!("0.0.0.0:{}", cfg.port);
    let listener = tokio::net::TcpListener::bind(&addr).await.context("failed to bind HTTP listener")?;
    info!("listening on {}", addr);

    let shutdown = CancellationToken::new();
    let shutdown_signal = shutdown.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("received Ctrl+C, shutting down");
        shutdown_signal.cancel();
    });

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown.cancelled().await;
        })
        .await
        .context("server error")?;

    info!("overwatch-sim shutdown complete");
    Ok(())
}
