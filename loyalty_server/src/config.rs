use std::{env, time::Duration};

use accrual_client::AccrualConfig;
use log::*;
use lp_common::helpers::{parse_boolean_flag, parse_millis};

use crate::accrual_worker::{WorkerConfig, DEFAULT_DRAIN_STEP_DELAY, DEFAULT_IDLE_POLL_DELAY};

const DEFAULT_DATABASE_URL: &str = "sqlite://data/loyalty.db";
const DEFAULT_MAX_DB_CONNECTIONS: u32 = 5;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub database_url: String,
    pub max_db_connections: u32,
    /// If true, the embedded database migrations are applied before the worker starts.
    pub run_migrations: bool,
    pub accrual: AccrualConfig,
    pub worker: WorkerConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            max_db_connections: DEFAULT_MAX_DB_CONNECTIONS,
            run_migrations: true,
            accrual: AccrualConfig::default(),
            worker: WorkerConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn from_env_or_default() -> Self {
        let accrual = AccrualConfig::new_from_env_or_default();
        Self::from_vars(|name| env::var(name).ok(), accrual)
    }

    /// Builds the configuration from the values `lookup` returns for each `LPS_*` variable. Missing or invalid values
    /// fall back to the defaults.
    pub fn from_vars<F>(lookup: F, accrual: AccrualConfig) -> Self
    where F: Fn(&str) -> Option<String> {
        let database_url = lookup("LPS_DATABASE_URL").unwrap_or_else(|| {
            info!("🪛️ LPS_DATABASE_URL is not set. Using the default, {DEFAULT_DATABASE_URL}.");
            DEFAULT_DATABASE_URL.to_string()
        });
        let max_db_connections = lookup("LPS_MAX_DB_CONNECTIONS")
            .map(|s| match s.trim().parse::<u32>() {
                Ok(n) if n > 0 => n,
                _ => {
                    error!(
                        "🪛️ {s} is not a valid pool size for LPS_MAX_DB_CONNECTIONS. Using the default, \
                         {DEFAULT_MAX_DB_CONNECTIONS}, instead."
                    );
                    DEFAULT_MAX_DB_CONNECTIONS
                },
            })
            .unwrap_or(DEFAULT_MAX_DB_CONNECTIONS);
        let run_migrations = parse_boolean_flag(lookup("LPS_RUN_MIGRATIONS"), true);
        let idle_poll_delay = delay_from(&lookup, "LPS_IDLE_POLL_DELAY_MS", DEFAULT_IDLE_POLL_DELAY);
        let drain_step_delay = delay_from(&lookup, "LPS_DRAIN_STEP_DELAY_MS", DEFAULT_DRAIN_STEP_DELAY);
        Self {
            database_url,
            max_db_connections,
            run_migrations,
            accrual,
            worker: WorkerConfig { idle_poll_delay, drain_step_delay },
        }
    }
}

fn delay_from<F>(lookup: &F, name: &str, default: Duration) -> Duration
where F: Fn(&str) -> Option<String> {
    let value = lookup(name);
    match parse_millis(value.as_deref()) {
        Ok(Some(delay)) => delay,
        Ok(None) => {
            info!("🪛️ {name} is not set. Using the default value of {}ms.", default.as_millis());
            default
        },
        Err(e) => {
            warn!("🪛️ Invalid configuration value for {name}. {e} Using the default value of {}ms.", default.as_millis());
            default
        },
    }
}
