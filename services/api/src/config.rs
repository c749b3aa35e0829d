//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use campus_ai_core::GenerationConfig;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Settings for the outbound Gemini client.
#[derive(Clone, Debug)]
pub struct GeminiSettings {
    pub api_key: Option<String>,
    pub api_base: String,
    pub model: String,
    pub timeout: Duration,
    /// Explicit CA bundle. When unset, a bundle is searched for in well-known locations.
    pub ca_bundle: Option<PathBuf>,
    pub tls_verify: bool,
    pub max_attempts: u32,
    pub backoff_base: Duration,
    /// Sampling settings sent with every request.
    pub generation: GenerationConfig,
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub database_url: String,
    pub log_level: Level,
    pub storage_root: PathBuf,
    pub cors_origin: String,
    pub gemini: GeminiSettings,
    /// Lifetime of memoized quiz/summary results.
    pub cache_ttl: Duration,
    pub cache_capacity: u64,
    pub job_record_capacity: u64,
    /// Collapse concurrent cache misses for the same key into one generation.
    pub single_flight: bool,
    /// Lifetime of async job records.
    pub job_ttl: Duration,
    pub job_tries: u32,
    pub job_workers: usize,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // --- Server and Database Settings ---
        let bind_address: SocketAddr = parsed(&lookup, "BIND_ADDRESS", "0.0.0.0:3000".parse().ok())?;

        let database_url =
            lookup("DATABASE_URL").ok_or_else(|| ConfigError::MissingVar("DATABASE_URL".to_string()))?;

        let log_level_str = lookup("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let storage_root = lookup("STORAGE_ROOT")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./storage"));
        let cors_origin =
            lookup("CORS_ORIGIN").unwrap_or_else(|| "http://localhost:3000".to_string());

        // --- Gemini Settings ---
        let defaults = GenerationConfig::default();
        let gemini = GeminiSettings {
            api_key: lookup("GEMINI_API_KEY").filter(|k| !k.trim().is_empty()),
            api_base: lookup("GEMINI_API_BASE").unwrap_or_else(|| {
                "https://generativelanguage.googleapis.com/v1beta".to_string()
            }),
            model: lookup("GEMINI_MODEL").unwrap_or_else(|| "gemini-1.5-flash".to_string()),
            timeout: Duration::from_secs(parsed(&lookup, "GEMINI_TIMEOUT_SECS", Some(60))?),
            ca_bundle: lookup("GEMINI_CA_BUNDLE").map(PathBuf::from),
            tls_verify: parsed(&lookup, "GEMINI_TLS_VERIFY", Some(true))?,
            max_attempts: positive(&lookup, "GEMINI_MAX_ATTEMPTS", 3)?,
            backoff_base: Duration::from_millis(parsed(&lookup, "GEMINI_BACKOFF_BASE_MS", Some(1000))?),
            generation: GenerationConfig {
                temperature: parsed(&lookup, "GEMINI_TEMPERATURE", Some(defaults.temperature))?,
                top_k: parsed(&lookup, "GEMINI_TOP_K", Some(defaults.top_k))?,
                top_p: parsed(&lookup, "GEMINI_TOP_P", Some(defaults.top_p))?,
                max_output_tokens: parsed(
                    &lookup,
                    "GEMINI_MAX_OUTPUT_TOKENS",
                    Some(defaults.max_output_tokens),
                )?,
            },
        };

        // --- Pipeline Settings ---
        let cache_ttl = Duration::from_secs(parsed(&lookup, "AI_CACHE_TTL_SECS", Some(86_400))?);
        let cache_capacity = parsed(&lookup, "AI_CACHE_CAPACITY", Some(10_000))?;
        let job_record_capacity = parsed(&lookup, "AI_JOB_RECORD_CAPACITY", Some(10_000))?;
        let single_flight = parsed(&lookup, "AI_SINGLE_FLIGHT", Some(true))?;
        let job_ttl = Duration::from_secs(parsed(&lookup, "AI_JOB_TTL_SECS", Some(3_600))?);
        let job_tries = positive(&lookup, "AI_JOB_TRIES", 3)?;
        let job_workers = positive(&lookup, "AI_JOB_WORKERS", 2)? as usize;

        Ok(Self {
            bind_address,
            database_url,
            log_level,
            storage_root,
            cors_origin,
            gemini,
            cache_ttl,
            cache_capacity,
            job_record_capacity,
            single_flight,
            job_ttl,
            job_tries,
            job_workers,
        })
    }
}

fn parsed<T, F>(lookup: &F, name: &str, default: Option<T>) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidValue(name.to_string(), e.to_string())),
        None => default.ok_or_else(|| ConfigError::MissingVar(name.to_string())),
    }
}

fn positive<F>(lookup: &F, name: &str, default: u32) -> Result<u32, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let value: u32 = parsed(lookup, name, Some(default))?;
    if value == 0 {
        return Err(ConfigError::InvalidValue(
            name.to_string(),
            "must be at least 1".to_string(),
        ));
    }
    Ok(value)
}
