use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    pub business_rules: BusinessRules,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    5
}

#[derive(Debug, Deserialize, Clone)]
pub struct BusinessRules {
    /// How long an unpaid order keeps its seat locks. 20 minutes unless
    /// overridden.
    #[serde(default = "default_hold_seconds")]
    pub hold_seconds: u64,
    /// Cadence of the expiry sweep that reconciles abandoned orders.
    #[serde(default = "default_sweep_interval_seconds")]
    pub sweep_interval_seconds: u64,
}

fn default_hold_seconds() -> u64 {
    20 * 60
}

fn default_sweep_interval_seconds() -> u64 {
    60
}

impl Default for BusinessRules {
    fn default() -> Self {
        Self {
            hold_seconds: default_hold_seconds(),
            sweep_interval_seconds: default_sweep_interval_seconds(),
        }
    }
}

impl BusinessRules {
    /// Hold duration in the form the order lifecycle wants it.
    pub fn hold(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.hold_seconds as i64)
    }

    pub fn sweep_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.sweep_interval_seconds)
    }
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            // Per-environment overrides, optional.
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Local overrides, not checked in.
            .add_source(config::File::with_name("config/local").required(false))
            // Environment wins: e.g. TRAX__DATABASE__URL.
            .add_source(config::Environment::with_prefix("TRAX").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
