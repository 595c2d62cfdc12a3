//! SQLite implementation of the response cache.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::Arc;
use url::Url;

use crate::db::Database;
use crate::error::StorageError;

use super::traits::{CacheStorage, CachedResponse, RequestKey};

/// SQLite-based cache storage.
pub struct SqliteStorage {
  db: Arc<Database>,
}

impl SqliteStorage {
  pub fn new(db: Arc<Database>) -> Self {
    Self { db }
  }
}

fn ensure_generation(conn: &Connection, generation: &str) -> Result<(), StorageError> {
  conn.execute(
    "INSERT OR IGNORE INTO cache_generations (generation) VALUES (?)",
    params![generation],
  )?;
  Ok(())
}

fn insert_entry(
  conn: &Connection,
  generation: &str,
  key: &RequestKey,
  entry: &CachedResponse,
) -> Result<(), StorageError> {
  let headers = serde_json::to_vec(&entry.headers)?;

  conn.execute(
    "INSERT OR REPLACE INTO cache_entries
       (generation, key_hash, method, url, status, headers, body, response_url, stored_at)
     VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
    params![
      generation,
      key.hash(),
      key.method().as_str(),
      key.url().as_str(),
      entry.status,
      headers,
      entry.body,
      entry.url.as_str(),
      entry.stored_at.to_rfc3339(),
    ],
  )?;
  Ok(())
}

#[async_trait]
impl CacheStorage for SqliteStorage {
  async fn open(&self, generation: &str) -> Result<(), StorageError> {
    let conn = self.db.conn()?;
    ensure_generation(&conn, generation)
  }

  async fn match_entry(
    &self,
    generation: &str,
    key: &RequestKey,
  ) -> Result<Option<CachedResponse>, StorageError> {
    let conn = self.db.conn()?;

    let row: Option<(u16, Vec<u8>, Vec<u8>, String, String)> = conn
      .query_row(
        "SELECT status, headers, body, response_url, stored_at FROM cache_entries
         WHERE generation = ? AND key_hash = ?",
        params![generation, key.hash()],
        |row| {
          Ok((
            row.get(0)?,
            row.get(1)?,
            row.get(2)?,
            row.get(3)?,
            row.get(4)?,
          ))
        },
      )
      .optional()?;

    let Some((status, headers, body, response_url, stored_at)) = row else {
      return Ok(None);
    };

    let headers: Vec<(String, String)> = serde_json::from_slice(&headers)?;
    let url =
      Url::parse(&response_url).map_err(|e| StorageError::corrupt("cache_entries", e))?;

    Ok(Some(CachedResponse {
      status,
      headers,
      body,
      url,
      stored_at: parse_datetime(&stored_at)?,
    }))
  }

  async fn put(
    &self,
    generation: &str,
    key: &RequestKey,
    entry: &CachedResponse,
  ) -> Result<(), StorageError> {
    let conn = self.db.conn()?;
    ensure_generation(&conn, generation)?;
    insert_entry(&conn, generation, key, entry)
  }

  async fn put_all(
    &self,
    generation: &str,
    entries: &[(RequestKey, CachedResponse)],
  ) -> Result<(), StorageError> {
    let mut conn = self.db.conn()?;
    let tx = conn.transaction()?;

    ensure_generation(&tx, generation)?;
    for (key, entry) in entries {
      insert_entry(&tx, generation, key, entry)?;
    }

    tx.commit()?;
    Ok(())
  }

  async fn delete(&self, generation: &str, key: &RequestKey) -> Result<bool, StorageError> {
    let conn = self.db.conn()?;
    let removed = conn.execute(
      "DELETE FROM cache_entries WHERE generation = ? AND key_hash = ?",
      params![generation, key.hash()],
    )?;
    Ok(removed > 0)
  }

  async fn list_generations(&self) -> Result<Vec<String>, StorageError> {
    let conn = self.db.conn()?;
    let mut stmt =
      conn.prepare("SELECT generation FROM cache_generations ORDER BY created_at, generation")?;

    let generations = stmt
      .query_map([], |row| row.get(0))?
      .collect::<Result<Vec<String>, _>>()?;

    Ok(generations)
  }

  async fn delete_generation(&self, generation: &str) -> Result<bool, StorageError> {
    let mut conn = self.db.conn()?;
    let tx = conn.transaction()?;

    tx.execute(
      "DELETE FROM cache_entries WHERE generation = ?",
      params![generation],
    )?;
    let removed = tx.execute(
      "DELETE FROM cache_generations WHERE generation = ?",
      params![generation],
    )?;

    tx.commit()?;
    Ok(removed > 0)
  }
}

/// Parse an RFC 3339 timestamp written by this module.
fn parse_datetime(s: &str) -> Result<DateTime<Utc>, StorageError> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| StorageError::corrupt("cache_entries", format!("bad timestamp '{}': {}", s, e)))
}
