use crate::error::{Error, Result};
use dotenvy::dotenv;
use std::env;
use std::sync::OnceLock;
use std::time::Duration;
use validator::Validate;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_address: String,
    pub database_url: Option<String>,
    pub api_key: Option<String>,
    pub listings_file: Option<String>,
    pub scrape: ScrapeSettings,
}

/// Tunables for a scrape run. Every field can be overridden from the CLI.
#[derive(Debug, Clone, Validate)]
pub struct ScrapeSettings {
    #[validate(range(min = 1, max = 64))]
    pub workers: usize,
    #[validate(range(min = 1, max = 50))]
    pub max_pages: u32,
    #[validate(range(min = 1, max = 120))]
    pub timeout_secs: u64,
    pub delay_min_ms: u64,
    pub delay_max_ms: u64,
    #[validate(range(min = 1, max = 10))]
    pub retry_max_attempts: u32,
    pub retry_backoff_ms: u64,
    pub resolve_apply_urls: bool,
}

impl Default for ScrapeSettings {
    fn default() -> Self {
        Self {
            workers: 5,
            max_pages: 4,
            timeout_secs: 10,
            delay_min_ms: 1000,
            delay_max_ms: 2000,
            retry_max_attempts: 3,
            retry_backoff_ms: 1000,
            resolve_apply_urls: true,
        }
    }
}

impl ScrapeSettings {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        let settings = Self {
            workers: get_env_parse_or("SCRAPE_WORKERS", defaults.workers)?,
            max_pages: get_env_parse_or("SCRAPE_MAX_PAGES", defaults.max_pages)?,
            timeout_secs: get_env_parse_or("SCRAPE_TIMEOUT_SECS", defaults.timeout_secs)?,
            delay_min_ms: get_env_parse_or("SCRAPE_DELAY_MIN_MS", defaults.delay_min_ms)?,
            delay_max_ms: get_env_parse_or("SCRAPE_DELAY_MAX_MS", defaults.delay_max_ms)?,
            retry_max_attempts: get_env_parse_or(
                "RETRY_MAX_ATTEMPTS",
                defaults.retry_max_attempts,
            )?,
            retry_backoff_ms: get_env_parse_or("RETRY_BACKOFF_MS", defaults.retry_backoff_ms)?,
            resolve_apply_urls: get_env_parse_or(
                "RESOLVE_APPLY_URLS",
                defaults.resolve_apply_urls,
            )?,
        };
        settings.check()?;
        Ok(settings)
    }

    /// Field ranges plus the delay window ordering.
    pub fn check(&self) -> Result<()> {
        self.validate()?;
        if self.delay_min_ms > self.delay_max_ms {
            return Err(Error::Config(format!(
                "SCRAPE_DELAY_MIN_MS ({}) exceeds SCRAPE_DELAY_MAX_MS ({})",
                self.delay_min_ms, self.delay_max_ms
            )));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn page_delay(&self) -> (Duration, Duration) {
        (
            Duration::from_millis(self.delay_min_ms),
            Duration::from_millis(self.delay_max_ms),
        )
    }
}

pub static CONFIG: OnceLock<Config> = OnceLock::new();

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        Ok(Self {
            server_address: env::var("SERVER_ADDRESS")
                .unwrap_or_else(|_| "0.0.0.0:8000".to_string()),
            database_url: env::var("DATABASE_URL").ok(),
            api_key: env::var("API_KEY").ok().filter(|key| !key.is_empty()),
            listings_file: env::var("LISTINGS_FILE").ok(),
            scrape: ScrapeSettings::from_env()?,
        })
    }

    pub fn require_database_url(&self) -> Result<&str> {
        self.database_url
            .as_deref()
            .ok_or_else(|| Error::Config("Missing environment variable: DATABASE_URL".to_string()))
    }

    pub fn require_api_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .ok_or_else(|| Error::Config("Missing environment variable: API_KEY".to_string()))
    }
}

fn get_env_parse_or<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| Error::Config(format!("Invalid value for {}: {}", name, e))),
        Err(_) => Ok(default),
    }
}

pub fn init_config() -> Result<()> {
    let config = Config::from_env()?;
    CONFIG
        .set(config)
        .map_err(|_| Error::Config("Configuration has already been initialized".to_string()))?;
    Ok(())
}

pub fn get_config() -> &'static Config {
    CONFIG
        .get()
        .expect("Configuration has not been initialized")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_pass_validation() {
        assert!(ScrapeSettings::default().check().is_ok());
    }

    #[test]
    fn zero_workers_rejected() {
        let settings = ScrapeSettings {
            workers: 0,
            ..ScrapeSettings::default()
        };
        assert!(matches!(settings.check(), Err(Error::Validation(_))));
    }

    #[test]
    fn inverted_delay_window_rejected() {
        let settings = ScrapeSettings {
            delay_min_ms: 3000,
            delay_max_ms: 100,
            ..ScrapeSettings::default()
        };
        assert!(matches!(settings.check(), Err(Error::Config(_))));
    }
}
