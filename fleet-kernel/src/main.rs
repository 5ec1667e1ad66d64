/**
 * FLEET KERNEL - Point d'entrée du serveur de simulation
 *
 * RÔLE : Racine de composition. Charge la config, construit l'unique
 * FleetStore, démarre le ticker optionnel et sert l'API REST.
 *
 * ARCHITECTURE : un store (mutex unique) partagé par toutes les routes via AppState.
 * Ctrl-C : arrêt propre du serveur puis annulation des redémarrages différés.
 */

mod config;
mod health;
mod http;
mod state;

use crate::config::load_config;
use crate::state::AppState;
use anyhow::{Context, Result};
use fleet_sim::FleetStore;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Charger les variables d'environnement depuis .env (si présent)
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("fleet_kernel=info,fleet_sim=info")),
        )
        .init();

    let cfg = load_config().await;
    info!(listen = %cfg.listen, seed = ?cfg.seed, tick_interval_ms = ?cfg.tick_interval_ms, "kernel config loaded");

    let store = FleetStore::with_seed(cfg.simulation.clone(), cfg.seed);
    let ticker = cfg.tick_interval_ms.map(|ms| spawn_ticker(store.clone(), Duration::from_millis(ms)));

    let app = http::build_router(AppState::new(store.clone()));

    let listener = TcpListener::bind(&cfg.listen)
        .await
        .with_context(|| format!("failed to bind {}", cfg.listen))?;
    info!("listening on http://{}", cfg.listen);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("http server failed")?;

    if let Some(ticker) = ticker {
        ticker.abort();
    }
    let cancelled = store.shutdown();
    info!(cancelled, "kernel stopped");
    Ok(())
}

/// Fait évoluer la flotte en tâche de fond, indépendamment des lectures HTTP.
fn spawn_ticker(store: FleetStore, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            interval.tick().await;
            let fleet = store.get_current();
            debug!(generation = store.generation(), at = %fleet.last_update_time, "background tick");
        }
    })
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("ctrl-c received, shutting down");
    }
}
