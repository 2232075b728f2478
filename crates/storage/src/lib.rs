use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Pool, Row, Sqlite,
};
use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};
use tracing::debug;
use uuid::Uuid;

use shared::domain::{Item, ItemId};

#[derive(Clone)]
pub struct Storage {
    pool: Pool<Sqlite>,
}

#[derive(Debug, Clone)]
pub struct StoredItem {
    pub id: ItemId,
    pub text: String,
    pub done: bool,
    pub created_at: DateTime<Utc>,
}

impl From<StoredItem> for Item {
    fn from(value: StoredItem) -> Self {
        Self {
            id: value.id,
            text: value.text,
            done: value.done,
        }
    }
}

impl Storage {
    pub async fn new(database_url: &str) -> Result<Self> {
        ensure_sqlite_parent_dir_exists(database_url)?;

        let connect_options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let mut pool_options = SqlitePoolOptions::new().max_connections(5);
        if is_in_memory(database_url) {
            // Every connection to an in-memory URL opens its own empty database,
            // and the data dies with the connection.
            pool_options = pool_options
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
        }
        let pool = pool_options.connect_with(connect_options).await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    pub async fn health_check(&self) -> Result<()> {
        let _: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("sqlite ping failed")?;
        Ok(())
    }

    /// Inserts a pending item and returns the id the store assigned to it.
    pub async fn create_item(&self, text: &str) -> Result<ItemId> {
        let id = ItemId(Uuid::new_v4().simple().to_string());
        sqlx::query("INSERT INTO items (id, text, done, created_at) VALUES (?, ?, 0, ?)")
            .bind(id.as_str())
            .bind(text)
            .bind(Utc::now())
            .execute(&self.pool)
            .await
            .with_context(|| format!("failed to insert item '{text}'"))?;
        debug!(item_id = %id, "stored new item");
        Ok(id)
    }

    /// Full collection ordered by text, ties broken by id.
    pub async fn list_items(&self) -> Result<Vec<StoredItem>> {
        let rows = sqlx::query(
            "SELECT id, text, done, created_at FROM items ORDER BY text ASC, id ASC",
        )
        .fetch_all(&self.pool)
        .await
        .context("failed to list items")?;

        rows.into_iter().map(|row| stored_item_from_row(&row)).collect()
    }

    pub async fn get_item(&self, id: &ItemId) -> Result<Option<StoredItem>> {
        let row = sqlx::query("SELECT id, text, done, created_at FROM items WHERE id = ?")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await?;
        row.map(|row| stored_item_from_row(&row)).transpose()
    }

    /// Returns `false` when no item has this id.
    pub async fn set_done(&self, id: &ItemId, done: bool) -> Result<bool> {
        let result = sqlx::query("UPDATE items SET done = ? WHERE id = ?")
            .bind(done)
            .bind(id.as_str())
            .execute(&self.pool)
            .await
            .with_context(|| format!("failed to update item {id}"))?;
        Ok(result.rows_affected() > 0)
    }

    /// Returns `false` when no item has this id.
    pub async fn delete_item(&self, id: &ItemId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM items WHERE id = ?")
            .bind(id.as_str())
            .execute(&self.pool)
            .await
            .with_context(|| format!("failed to delete item {id}"))?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn delete_all_items(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM items")
            .execute(&self.pool)
            .await
            .context("failed to purge items")?;
        Ok(result.rows_affected())
    }
}

fn stored_item_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<StoredItem> {
    Ok(StoredItem {
        id: ItemId(row.try_get::<String, _>("id")?),
        text: row.try_get("text")?,
        done: row.try_get("done")?,
        created_at: row.try_get("created_at")?,
    })
}

fn is_in_memory(database_url: &str) -> bool {
    database_url.starts_with("sqlite::memory:") || database_url.contains("mode=memory")
}

fn ensure_sqlite_parent_dir_exists(database_url: &str) -> Result<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent() else {
        return Ok(());
    };

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })?;

    Ok(())
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if is_in_memory(database_url) || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
