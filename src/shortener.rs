use crate::dao::{LinkStore, StoreError};
use crate::model::ShortLinkRecord;
use crate::token::generate_short_url;
use crate::validation::{HostResolver, UrlValidator, ValidationError};
use chrono::{Duration, Utc};
use std::sync::Arc;
use thiserror::Error;

/// Attempts shared between "token already present" and "duplicate key on insert".
pub const MAX_ATTEMPTS: usize = 5;

#[derive(Debug, Error)]
pub enum ShortenError {
    #[error(transparent)]
    InvalidUrl(#[from] ValidationError),
    #[error("no unused short url found after {0} attempts")]
    TokenExhaustion(usize),
    #[error("could not save short url: {0}")]
    Storage(#[source] StoreError),
    #[error("retention window of {0} overflows the expiry timestamp")]
    ExpiryOverflow(Duration),
}

#[derive(Debug, Clone)]
pub struct ShortenerSettings {
    pub short_url_length: usize,
    pub retention: Duration,
    pub site_url: Option<String>,
}

pub struct Shortener {
    store: Arc<dyn LinkStore>,
    validator: UrlValidator,
    settings: ShortenerSettings,
}

impl Shortener {
    pub fn new(
        store: Arc<dyn LinkStore>,
        resolver: Arc<dyn HostResolver>,
        settings: ShortenerSettings,
    ) -> Self {
        Self {
            store,
            validator: UrlValidator::new(resolver),
            settings,
        }
    }

    /// Stores `original_url` exactly as given.
    pub async fn shorten(&self, original_url: &str) -> Result<ShortLinkRecord, ShortenError> {
        self.validator.validate(original_url).await?;

        for attempt in 1..=MAX_ATTEMPTS {
            let short_url = generate_short_url(self.settings.short_url_length);
            match self.store.find_by_short_url(&short_url).await {
                Ok(Some(_)) => {
                    tracing::debug!("Short url {} already taken (attempt {})", short_url, attempt);
                    continue;
                }
                Ok(None) => {}
                Err(err) => {
                    tracing::error!("Checking if short url {} exists failed: {}", short_url, err);
                    continue;
                }
            }

            match self.store.create(self.new_record(original_url, short_url)?).await {
                Ok(record) => return Ok(record),
                Err(StoreError::DuplicateKey(short_url)) => {
                    tracing::warn!("Short url {} was claimed concurrently (attempt {})", short_url, attempt);
                }
                Err(err) => return Err(ShortenError::Storage(err)),
            }
        }
        tracing::error!("Could not persist new short url. Exhausted all retries of generating a unique id");
        Err(ShortenError::TokenExhaustion(MAX_ATTEMPTS))
    }

    pub async fn lookup(&self, short_url: &str) -> Result<Option<ShortLinkRecord>, StoreError> {
        self.store.find_by_short_url(short_url).await
    }

    pub async fn purge_expired(&self) -> Result<u64, StoreError> {
        self.store.delete_expired().await
    }

    fn new_record(&self, original_url: &str, short_url: String) -> Result<ShortLinkRecord, ShortenError> {
        let expires_at = Utc::now()
            .checked_add_signed(self.settings.retention)
            .ok_or(ShortenError::ExpiryOverflow(self.settings.retention))?;
        let short_link = self
            .settings
            .site_url
            .as_deref()
            .map(|site_url| format!("{}/{}", site_url.trim_end_matches('/'), short_url));
        Ok(ShortLinkRecord {
            original_url: original_url.to_string(),
            short_url,
            short_link,
            expires_at,
        })
    }
}
