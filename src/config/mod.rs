//! Environment configuration (§6).
//!
//! Loaded once at startup from the process environment and exposed via a
//! global `OnceLock`, mirroring the teacher's `config::init()`/`config::get()`
//! pair in `src/config/mod.rs` — a missing config is a startup bug, not a
//! recoverable condition, so `get()` panics rather than returning `Option`.

pub mod defaults;

use std::sync::OnceLock;

static CONFIG: OnceLock<Config> = OnceLock::new();

/// Process-wide configuration, loaded from environment variables (§6).
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub openai_api_key: Option<String>,
    pub cors_origin: String,
    pub llm_flagship: String,
    pub llm_mid_range: String,
    pub llm_fast: String,
    pub udl_username: Option<String>,
    pub udl_password: Option<String>,
    pub udl_base_url: Option<String>,
    pub default_compression: f64,
    pub tick_interval_ms: u64,
    pub position_update_interval_ms: u64,
}

impl Config {
    /// Load configuration from the process environment. Values absent from
    /// the environment fall back to the documented defaults (§6).
    pub fn from_env() -> Self {
        Self {
            port: std::env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults::DEFAULT_PORT),
            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgres://localhost/overwatch_sim".to_string()),
            openai_api_key: std::env::var("OPENAI_API_KEY").ok(),
            cors_origin: std::env::var("CORS_ORIGIN").unwrap_or_else(|_| "*".to_string()),
            llm_flagship: std::env::var("LLM_FLAGSHIP").unwrap_or_else(|_| "gpt-4.1".to_string()),
            llm_mid_range: std::env::var("LLM_MID_RANGE").unwrap_or_else(|_| "gpt-4.1-mini".to_string()),
            llm_fast: std::env::var("LLM_FAST").unwrap_or_else(|_| "gpt-4.1-nano".to_string()),
            udl_username: std::env::var("UDL_USERNAME").ok(),
            udl_password: std::env::var("UDL_PASSWORD").ok(),
            udl_base_url: std::env::var("UDL_BASE_URL").ok(),
            default_compression: std::env::var("DEFAULT_COMPRESSION")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults::DEFAULT_COMPRESSION_RATIO),
            tick_interval_ms: std::env::var("TICK_INTERVAL_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults::TICK_INTERVAL_MS),
            position_update_interval_ms: std::env::var("POSITION_UPDATE_INTERVAL_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults::POSITION_UPDATE_INTERVAL_MS),
        }
    }
}

/// Initialize the global configuration. Must be called exactly once before
/// any call to `get()`.
pub fn init(config: Config) {
    if CONFIG.set(config).is_err() {
        tracing::warn!("config::init() called more than once — ignoring");
    }
}

/// Get a reference to the global configuration.
///
/// Panics if `init()` has not been called — a missing config is a fatal
/// startup error, not a recoverable condition.
pub fn get() -> &'static Config {
    CONFIG
        .get()
        .expect("config::get() called before config::init() — this is a startup bug")
}

pub fn is_initialized() -> bool {
    CONFIG.get().is_some()
}
