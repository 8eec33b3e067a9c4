use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct ShortLinkRecord {
    pub original_url: String,
    pub short_url: String,
    pub short_link: Option<String>,
    pub expires_at: DateTime<Utc>,
}

impl ShortLinkRecord {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

#[derive(Debug, Deserialize)]
pub struct ShortUrlForm {
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct ShortUrlCreated {
    pub original_url: String,
    pub short_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub short_link: Option<String>,
}

impl From<ShortLinkRecord> for ShortUrlCreated {
    fn from(record: ShortLinkRecord) -> Self {
        Self {
            original_url: record.original_url,
            short_url: record.short_url,
            short_link: record.short_link,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ShortUrlError {
    pub error: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl ShortUrlError {
    pub const INVALID_URL: &'static str = "invalid url";
    pub const GENERATION_FAILED: &'static str = "Could not generate a unique short URL";
    pub const SAVE_FAILED: &'static str = "Could not save ShortURL in DB";
    pub const NOT_FOUND: &'static str = "No short URL found for the given input";

    pub fn invalid_url(url: &str) -> Self {
        Self {
            error: Self::INVALID_URL,
            url: Some(url.to_string()),
        }
    }

    pub fn message(error: &'static str) -> Self {
        Self { error, url: None }
    }
}

#[derive(Serialize)]
pub struct Greeting {
    pub greeting: &'static str,
}
