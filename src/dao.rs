use crate::model::ShortLinkRecord;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::error::ErrorKind;
use sqlx::{Error, PgPool};
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("short url '{0}' is already taken")]
    DuplicateKey(String),
    #[error("storage unavailable: {0}")]
    Unavailable(#[source] Error),
}

/// Unique on `short_url`; expired records are never returned.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LinkStore: Send + Sync {
    async fn find_by_short_url(&self, short_url: &str) -> Result<Option<ShortLinkRecord>, StoreError>;

    async fn create(&self, record: ShortLinkRecord) -> Result<ShortLinkRecord, StoreError>;

    async fn delete_expired(&self) -> Result<u64, StoreError>;
}

pub struct PgLinkStore {
    db_connection_pool: PgPool,
}

impl PgLinkStore {
    pub fn new(db_connection_pool: PgPool) -> Self {
        Self { db_connection_pool }
    }
}

#[async_trait]
impl LinkStore for PgLinkStore {
    async fn find_by_short_url(&self, short_url: &str) -> Result<Option<ShortLinkRecord>, StoreError> {
        sqlx::query_as(
            r#"
              select original_url, short_url, short_link, expires_at from short_urls
              where short_url = $1 and expires_at > $2
            "#,
        )
        .bind(short_url)
        .bind(Utc::now())
        .fetch_optional(&self.db_connection_pool)
        .await
        .map_err(StoreError::Unavailable)
    }

    async fn create(&self, record: ShortLinkRecord) -> Result<ShortLinkRecord, StoreError> {
        sqlx::query_as(
            r#"
              insert into short_urls(original_url, short_url, short_link, expires_at) values ($1, $2, $3, $4)
              returning original_url, short_url, short_link, expires_at
            "#,
        )
        .bind(&record.original_url)
        .bind(&record.short_url)
        .bind(&record.short_link)
        .bind(record.expires_at)
        .fetch_one(&self.db_connection_pool)
        .await
        .map_err(|err| match err {
            Error::Database(db_err) if db_err.kind() == ErrorKind::UniqueViolation => {
                StoreError::DuplicateKey(record.short_url.clone())
            }
            err => StoreError::Unavailable(err),
        })
    }

    async fn delete_expired(&self) -> Result<u64, StoreError> {
        sqlx::query("delete from short_urls where expires_at <= $1")
            .bind(Utc::now())
            .execute(&self.db_connection_pool)
            .await
            .map(|result| result.rows_affected())
            .map_err(StoreError::Unavailable)
    }
}

#[derive(Default)]
pub struct MemoryLinkStore {
    records: RwLock<HashMap<String, ShortLinkRecord>>,
}

impl MemoryLinkStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LinkStore for MemoryLinkStore {
    async fn find_by_short_url(&self, short_url: &str) -> Result<Option<ShortLinkRecord>, StoreError> {
        let now = Utc::now();
        Ok(self
            .records
            .read()
            .await
            .get(short_url)
            .filter(|record| !record.is_expired_at(now))
            .cloned())
    }

    async fn create(&self, record: ShortLinkRecord) -> Result<ShortLinkRecord, StoreError> {
        let mut records = self.records.write().await;
        if records.contains_key(&record.short_url) {
            return Err(StoreError::DuplicateKey(record.short_url));
        }
        records.insert(record.short_url.clone(), record.clone());
        Ok(record)
    }

    async fn delete_expired(&self) -> Result<u64, StoreError> {
        let now = Utc::now();
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|_, record| !record.is_expired_at(now));
        Ok((before - records.len()) as u64)
    }
}
