use crate::error::StorageError;
use crate::storage::Storage;
use async_trait::async_trait;
use sqlx::{Pool, Sqlite};

/// Session storage in a SQLite table of `(key, value)` rows.
#[derive(Clone, Debug)]
pub struct SqlStorage {
    pool: Pool<Sqlite>,
    table_name: String,
}

impl SqlStorage {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self {
            pool,
            table_name: "kitchensink_storage".to_string(),
        }
    }

    pub fn with_table_name(pool: Pool<Sqlite>, table_name: String) -> Self {
        Self { pool, table_name }
    }

    /// Create the backing table if it does not exist.
    pub async fn migrate(&self) -> Result<(), StorageError> {
        let query = format!(
            "CREATE TABLE IF NOT EXISTS {} (key TEXT PRIMARY KEY NOT NULL, value TEXT NOT NULL)",
            self.table_name
        );
        sqlx::query(&query)
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::Backend(format!("Sqlite migrate error: {}", e)))?;
        Ok(())
    }
}

#[async_trait]
impl Storage for SqlStorage {
    async fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        let query = format!("SELECT value FROM {} WHERE key = ?1", self.table_name);
        let row: Option<(String,)> = sqlx::query_as(&query)
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::Backend(format!("Sqlite get_item error: {}", e)))?;
        Ok(row.map(|(value,)| value))
    }

    async fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let query = format!(
            "INSERT INTO {} (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = ?2",
            self.table_name
        );
        sqlx::query(&query)
            .bind(key)
            .bind(value)
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::Backend(format!("Sqlite set_item error: {}", e)))?;
        Ok(())
    }

    async fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        let query = format!("DELETE FROM {} WHERE key = ?1", self.table_name);
        sqlx::query(&query)
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::Backend(format!("Sqlite remove_item error: {}", e)))?;
        Ok(())
    }
}
