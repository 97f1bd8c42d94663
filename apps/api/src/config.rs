use std::time::Duration;

use anyhow::{bail, Context, Result};

const DEFAULT_POCKETBASE_URL: &str = "https://db.jobos.online";
const MAX_PAGE_SIZE: u32 = 500;
pub const DEFAULT_MAX_UPLOAD_MB: usize = 25;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    PocketBase,
    /// In-process store, for local runs without a backend.
    Memory,
}

/// Application configuration loaded from environment variables.
/// Fails at startup if a value is present but malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub store_backend: StoreBackend,
    pub pocketbase_url: String,
    pub store_timeout: Duration,
    /// Upper bound on records fetched per collection.
    pub list_page_size: u32,
    /// Body limit of the file selection route.
    pub max_upload_bytes: usize,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let env_or = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let store_backend = match env_or("STORE_BACKEND", "pocketbase").as_str() {
            "pocketbase" => StoreBackend::PocketBase,
            "memory" => StoreBackend::Memory,
            other => bail!("STORE_BACKEND must be 'pocketbase' or 'memory', got '{other}'"),
        };

        let list_page_size = env_or("LIST_PAGE_SIZE", "200")
            .parse::<u32>()
            .context("LIST_PAGE_SIZE must be a positive integer")?;
        if !(1..=MAX_PAGE_SIZE).contains(&list_page_size) {
            bail!("LIST_PAGE_SIZE must be between 1 and {MAX_PAGE_SIZE}");
        }

        let max_upload_mb = env_or("MAX_UPLOAD_MB", &DEFAULT_MAX_UPLOAD_MB.to_string())
            .parse::<usize>()
            .context("MAX_UPLOAD_MB must be a whole number of megabytes")?;
        if max_upload_mb == 0 {
            bail!("MAX_UPLOAD_MB must be at least 1");
        }

        Ok(Config {
            store_backend,
            pocketbase_url: env_or("POCKETBASE_URL", DEFAULT_POCKETBASE_URL),
            store_timeout: Duration::from_secs(
                env_or("STORE_TIMEOUT_SECS", "30")
                    .parse::<u64>()
                    .context("STORE_TIMEOUT_SECS must be a whole number of seconds")?,
            ),
            list_page_size,
            max_upload_bytes: max_upload_mb * 1024 * 1024,
            port: env_or("PORT", "8080")
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: env_or("RUST_LOG", "info"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.store_backend, StoreBackend::PocketBase);
        assert_eq!(config.pocketbase_url, DEFAULT_POCKETBASE_URL);
        assert_eq!(config.store_timeout, Duration::from_secs(30));
        assert_eq!(config.list_page_size, 200);
        assert_eq!(config.max_upload_bytes, 25 * 1024 * 1024);
        assert_eq!(config.port, 8080);
    }

    #[test]
    fn test_memory_backend_and_overrides() {
        let config = load(&[
            ("STORE_BACKEND", "memory"),
            ("LIST_PAGE_SIZE", "50"),
            ("PORT", "3000"),
            ("MAX_UPLOAD_MB", "5"),
        ])
        .unwrap();
        assert_eq!(config.max_upload_bytes, 5 * 1024 * 1024);
        assert_eq!(config.store_backend, StoreBackend::Memory);
        assert_eq!(config.list_page_size, 50);
        assert_eq!(config.port, 3000);
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(load(&[("STORE_BACKEND", "sqlite")]).is_err());
        assert!(load(&[("LIST_PAGE_SIZE", "0")]).is_err());
        assert!(load(&[("LIST_PAGE_SIZE", "501")]).is_err());
        assert!(load(&[("PORT", "http")]).is_err());
        assert!(load(&[("MAX_UPLOAD_MB", "0")]).is_err());
    }
}
