//! # Settings Repository
//!
//! Key/value store for admin-configured settings. Values are JSON text;
//! [`SettingsRepository::get_json`] and [`SettingsRepository::put_json`]
//! handle the serde round-trip for typed callers such as the
//! integration credentials.

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;

#[derive(Debug, Clone)]
pub struct SettingsRepository {
    pool: SqlitePool,
}

impl SettingsRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SettingsRepository { pool }
    }

    pub async fn get(&self, key: &str) -> DbResult<Option<String>> {
        let value: Option<String> = sqlx::query_scalar("SELECT value FROM settings WHERE key = ?1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        Ok(value)
    }

    /// Inserts or replaces a setting.
    pub async fn put(&self, key: &str, value: &str) -> DbResult<()> {
        debug!(key = %key, "Writing setting");

        sqlx::query(
            r#"
            INSERT INTO settings (key, value, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> DbResult<Option<T>> {
        match self.get(key).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    pub async fn put_json<T: Serialize>(&self, key: &str, value: &T) -> DbResult<()> {
        let raw = serde_json::to_string(value)?;
        self.put(key, &raw).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DbError;
    use crate::repository::test_support::test_db;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Toggle {
        enabled: bool,
        label: String,
    }

    #[tokio::test]
    async fn test_put_overwrites() {
        let db = test_db().await;
        assert!(db.settings().get("store.name").await.unwrap().is_none());

        db.settings().put("store.name", "Mercadinho").await.unwrap();
        db.settings().put("store.name", "Mercadinho da Vila").await.unwrap();

        assert_eq!(
            db.settings().get("store.name").await.unwrap().as_deref(),
            Some("Mercadinho da Vila")
        );
    }

    #[tokio::test]
    async fn test_json_round_trip_and_corrupt_value() {
        let db = test_db().await;
        let value = Toggle {
            enabled: true,
            label: "pix".to_string(),
        };
        db.settings().put_json("toggle", &value).await.unwrap();
        let loaded: Option<Toggle> = db.settings().get_json("toggle").await.unwrap();
        assert_eq!(loaded, Some(value));

        db.settings().put("toggle", "{not json").await.unwrap();
        let err = db.settings().get_json::<Toggle>("toggle").await.unwrap_err();
        assert!(matches!(err, DbError::Serialization(_)));
    }
}
