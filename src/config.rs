use std::env;

/// Environment variable names - single source of truth
pub mod env_vars {
    pub const PORT: &str = "PORT";
    pub const DATABASE_URL: &str = "DATABASE_URL";
    // Flow engine
    pub const FLOW_TTL_MINUTES: &str = "PILOT_FLOW_TTL_MINUTES";
    pub const SWEEP_INTERVAL_SECS: &str = "PILOT_SWEEP_INTERVAL_SECS";
    // External providers
    pub const ADAPTER_TIMEOUT_SECS: &str = "PILOT_ADAPTER_TIMEOUT_SECS";
    pub const QUOTE_API_URL: &str = "PILOT_QUOTE_API_URL";
    pub const BRIDGE_API_URL: &str = "PILOT_BRIDGE_API_URL";
    pub const CHAIN_API_URL: &str = "PILOT_CHAIN_API_URL";
    pub const RESEARCH_API_URL: &str = "PILOT_RESEARCH_API_URL";
}

/// Default values
pub mod defaults {
    pub const PORT: u16 = 8080;
    pub const DATABASE_URL: &str = "./.db/chainpilot.db";
    pub const FLOW_TTL_MINUTES: i64 = 30;
    pub const SWEEP_INTERVAL_SECS: u64 = 30;
    pub const ADAPTER_TIMEOUT_SECS: u64 = 10;
    pub const QUOTE_API_URL: &str = "http://127.0.0.1:9101";
    pub const BRIDGE_API_URL: &str = "http://127.0.0.1:9102";
    pub const CHAIN_API_URL: &str = "http://127.0.0.1:9103";
    pub const RESEARCH_API_URL: &str = "http://127.0.0.1:9104";
}

fn env_string(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

#[derive(Clone)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    /// TTL applied to every new flow
    pub flow_ttl_minutes: i64,
    /// Poll interval of the expiry sweeper
    pub sweep_interval_secs: u64,
    /// Timeout applied to every external provider call
    pub adapter_timeout_secs: u64,
    pub quote_api_url: String,
    pub bridge_api_url: String,
    pub chain_api_url: String,
    pub research_api_url: String,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            port: env::var(env_vars::PORT)
                .unwrap_or_else(|_| defaults::PORT.to_string())
                .parse()
                .expect("PORT must be a valid number"),
            database_url: env_string(env_vars::DATABASE_URL, defaults::DATABASE_URL),
            flow_ttl_minutes: env::var(env_vars::FLOW_TTL_MINUTES)
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults::FLOW_TTL_MINUTES),
            sweep_interval_secs: env::var(env_vars::SWEEP_INTERVAL_SECS)
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults::SWEEP_INTERVAL_SECS),
            adapter_timeout_secs: env::var(env_vars::ADAPTER_TIMEOUT_SECS)
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults::ADAPTER_TIMEOUT_SECS),
            quote_api_url: env_string(env_vars::QUOTE_API_URL, defaults::QUOTE_API_URL),
            bridge_api_url: env_string(env_vars::BRIDGE_API_URL, defaults::BRIDGE_API_URL),
            chain_api_url: env_string(env_vars::CHAIN_API_URL, defaults::CHAIN_API_URL),
            research_api_url: env_string(env_vars::RESEARCH_API_URL, defaults::RESEARCH_API_URL),
        }
    }
}
