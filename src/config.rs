use crate::shortener::ShortenerSettings;
use crate::token::DEFAULT_SHORT_URL_LENGTH;
use anyhow::{Context, Result};
use std::env;
use std::str::FromStr;
use std::time::Duration;
use url::Url;

const DEFAULT_PORT: &str = "3000";
const DATABASE_MAX_CONNECTIONS: u32 = 20;
const LINK_RETENTION_SECONDS: i64 = 10;
// A hundred years.
const MAX_LINK_RETENTION_SECONDS: i64 = 3_153_600_000;
const DNS_TIMEOUT_MS: u64 = 3000;
const CLEANING_JOB_CRON_EXPRESSION: &str = "1/10 * * * * *";
const SHORT_URL_LENGTH_RANGE: std::ops::RangeInclusive<usize> = 4..=32;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_address: String,
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub site_url: Option<String>,
    pub link_retention_seconds: i64,
    pub short_url_length: usize,
    pub dns_timeout_ms: u64,
    pub cleaning_job_cron: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let server_address = match env::var("SERVER_ADDRESS") {
            Ok(address) => address,
            Err(_) => format!(
                "0.0.0.0:{}",
                env::var("PORT").unwrap_or_else(|_| DEFAULT_PORT.to_string())
            ),
        };

        Ok(Self {
            server_address,
            database_url: optional_var("DATABASE_URL"),
            database_max_connections: parse_var("DATABASE_MAX_CONNECTIONS", DATABASE_MAX_CONNECTIONS)?,
            site_url: optional_var("SITE_URL"),
            link_retention_seconds: parse_var("LINK_RETENTION_SECONDS", LINK_RETENTION_SECONDS)?,
            short_url_length: parse_var("SHORT_URL_LENGTH", DEFAULT_SHORT_URL_LENGTH)?,
            dns_timeout_ms: parse_var("DNS_TIMEOUT_MS", DNS_TIMEOUT_MS)?,
            cleaning_job_cron: env::var("CLEANING_JOB_CRON")
                .unwrap_or_else(|_| CLEANING_JOB_CRON_EXPRESSION.to_string()),
        })
    }

    pub fn validate(&self) -> Result<()> {
        if !self.server_address.contains(':') {
            anyhow::bail!(
                "SERVER_ADDRESS must be in format 'host:port', got '{}'",
                self.server_address
            );
        }

        if let Some(ref database_url) = self.database_url {
            if !database_url.starts_with("postgres://") && !database_url.starts_with("postgresql://") {
                anyhow::bail!("DATABASE_URL must start with 'postgres://' or 'postgresql://'");
            }
        }

        if let Some(ref site_url) = self.site_url {
            let parsed = Url::parse(site_url).with_context(|| format!("SITE_URL '{site_url}' is not a valid url"))?;
            if !matches!(parsed.scheme(), "http" | "https") {
                anyhow::bail!("SITE_URL must be an http or https url, got '{}'", site_url);
            }
        }

        if self.database_max_connections == 0 {
            anyhow::bail!("DATABASE_MAX_CONNECTIONS must be at least 1");
        }
        if !(1..=MAX_LINK_RETENTION_SECONDS).contains(&self.link_retention_seconds) {
            anyhow::bail!(
                "LINK_RETENTION_SECONDS must be between 1 and {}, got {}",
                MAX_LINK_RETENTION_SECONDS,
                self.link_retention_seconds
            );
        }
        if !SHORT_URL_LENGTH_RANGE.contains(&self.short_url_length) {
            anyhow::bail!(
                "SHORT_URL_LENGTH must be between {} and {}, got {}",
                SHORT_URL_LENGTH_RANGE.start(),
                SHORT_URL_LENGTH_RANGE.end(),
                self.short_url_length
            );
        }
        if self.dns_timeout_ms == 0 {
            anyhow::bail!("DNS_TIMEOUT_MS must be greater than 0");
        }
        Ok(())
    }

    pub fn dns_timeout(&self) -> Duration {
        Duration::from_millis(self.dns_timeout_ms)
    }

    pub fn shortener_settings(&self) -> Result<ShortenerSettings> {
        let retention = chrono::Duration::try_seconds(self.link_retention_seconds)
            .with_context(|| format!("LINK_RETENTION_SECONDS {} is out of range", self.link_retention_seconds))?;
        Ok(ShortenerSettings {
            short_url_length: self.short_url_length,
            retention,
            site_url: self.site_url.clone(),
        })
    }

    pub fn print_summary(&self) {
        tracing::info!("Configuration loaded:");
        tracing::info!("  Server address: {}", self.server_address);
        match self.database_url {
            Some(ref database_url) => tracing::info!("  Database: {}", mask_connection_string(database_url)),
            None => tracing::warn!("  Database: DATABASE_URL not set, links are kept in memory"),
        }
        tracing::info!("  Site url: {}", self.site_url.as_deref().unwrap_or("(not set)"));
        tracing::info!("  Link retention: {}s", self.link_retention_seconds);
        tracing::info!("  Short url length: {}", self.short_url_length);
        tracing::info!("  DNS timeout: {}ms", self.dns_timeout_ms);
    }
}

pub fn load_from_env() -> Result<Config> {
    let config = Config::from_env()?;
    config.validate()?;
    Ok(config)
}

fn optional_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

fn parse_var<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional_var(name) {
        Some(value) => value
            .trim()
            .parse()
            .with_context(|| format!("{name} has an invalid value '{value}'")),
        None => Ok(default),
    }
}

fn mask_connection_string(url: &str) -> String {
    if let Some(start) = url.find("://") {
        let rest = &url[start + 3..];
        if let Some(at_pos) = rest.find('@') {
            let credentials = &rest[..at_pos];
            if let Some(colon_pos) = credentials.rfind(':') {
                return format!(
                    "{}://{}:***{}",
                    &url[..start],
                    &credentials[..colon_pos],
                    &rest[at_pos..]
                );
            }
        }
    }
    url.to_string()
}
