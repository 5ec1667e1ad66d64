/**
 * CONFIGURATION KERNEL - Chargement de kernel.yaml + surcharges d'environnement
 *
 * RÔLE : Fournit l'adresse d'écoute, la graine aléatoire, la cadence du ticker
 * et les paramètres de simulation (SimParams).
 *
 * FONCTIONNEMENT : fichier YAML à $FLEET_KERNEL_CONFIG (ou kernel.yaml), puis
 * FLEET_LISTEN / FLEET_SEED par-dessus. Fichier absent, vide ou invalide :
 * valeurs par défaut + warning, le kernel démarre quand même.
 */

use fleet_sim::SimParams;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::fs;
use tracing::warn;

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct KernelConfig {
    pub listen: String,
    pub seed: Option<u64>,
    /// Background evolution cadence; `None` means the fleet only moves on reads.
    pub tick_interval_ms: Option<u64>,
    pub simulation: SimParams,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:3001".into(),
            seed: None,
            tick_interval_ms: None,
            simulation: SimParams::default(),
        }
    }
}

pub async fn load_config() -> KernelConfig {
    let path = std::env::var("FLEET_KERNEL_CONFIG").unwrap_or_else(|_| "kernel.yaml".into());
    let mut cfg = load_from(Path::new(&path)).await;
    apply_env_overrides(&mut cfg, |key| std::env::var(key).ok());
    cfg
}

pub async fn load_from(path: &Path) -> KernelConfig {
    if !path.exists() {
        warn!(path = %path.display(), "no kernel config, using defaults");
        return KernelConfig::default();
    }
    let txt = fs::read_to_string(path).await.unwrap_or_default();
    if txt.trim().is_empty() {
        return KernelConfig::default();
    }
    serde_yaml::from_str(&txt).unwrap_or_else(|e| {
        warn!(path = %path.display(), error = %e, "invalid kernel config, using defaults");
        KernelConfig::default()
    })
}

fn apply_env_overrides(cfg: &mut KernelConfig, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(listen) = lookup("FLEET_LISTEN").filter(|v| !v.trim().is_empty()) {
        cfg.listen = listen;
    }
    if let Some(raw) = lookup("FLEET_SEED") {
        match raw.trim().parse::<u64>() {
            Ok(seed) => cfg.seed = Some(seed),
            Err(_) => warn!(value = %raw, "FLEET_SEED is not a number, ignored"),
        }
    }
}
