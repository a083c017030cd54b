use serde_json::Value;
use sqlx::PgPool;

use crate::store::{BallotStore, StoreError, StoredRecord};

/// Ballot store backed by the `ballot_store.blobs` table.
pub struct PgBlobStore {
    pool: PgPool,
}

impl PgBlobStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn backend_error(e: sqlx::Error) -> StoreError {
    StoreError::Backend(e.to_string())
}

/// Smallest string that sorts after every key starting with `prefix`, in
/// code point order. `None` when no such bound exists (empty prefix).
fn prefix_upper_bound(prefix: &str) -> Option<String> {
    let mut chars: Vec<char> = prefix.chars().collect();
    while let Some(last) = chars.pop() {
        if let Some(next) = (last as u32 + 1..=char::MAX as u32).find_map(char::from_u32) {
            chars.push(next);
            return Some(chars.into_iter().collect());
        }
    }
    None
}

#[rocket::async_trait]
impl BallotStore for PgBlobStore {
    async fn put(&self, key: &str, value: &Value) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO ballot_store.blobs (key, value)
             VALUES ($1, $2)
             ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value, created_at = NOW()",
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await
        .map_err(backend_error)?;
        Ok(())
    }

    async fn create(&self, key: &str, value: &Value) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "INSERT INTO ballot_store.blobs (key, value)
             VALUES ($1, $2)
             ON CONFLICT (key) DO NOTHING",
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await
        .map_err(backend_error)?;
        Ok(result.rows_affected() == 1)
    }

    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        sqlx::query_scalar::<_, Value>("SELECT value FROM ballot_store.blobs WHERE key = $1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend_error)
    }

    async fn list_by_prefix(&self, prefix: &str) -> Result<Vec<StoredRecord>, StoreError> {
        // `~>=~` and `~<~` compare bytewise, matching the text_pattern_ops index.
        let rows = match prefix_upper_bound(prefix) {
            Some(upper) => {
                sqlx::query_as::<_, (String, Value)>(
                    "SELECT key, value FROM ballot_store.blobs
                     WHERE key ~>=~ $1 AND key ~<~ $2
                     ORDER BY key",
                )
                .bind(prefix)
                .bind(upper)
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query_as::<_, (String, Value)>(
                    "SELECT key, value FROM ballot_store.blobs ORDER BY key",
                )
                .fetch_all(&self.pool)
                .await
            }
        }
        .map_err(backend_error)?;

        Ok(rows
            .into_iter()
            .map(|(key, value)| StoredRecord { key, value })
            .collect())
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM ballot_store.blobs WHERE key = $1")
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(backend_error)?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_upper_bound() {
        assert_eq!(prefix_upper_bound("votes/").as_deref(), Some("votes0"));
        assert_eq!(prefix_upper_bound("voters/abc/").as_deref(), Some("voters/abc0"));
        assert_eq!(prefix_upper_bound("a\u{10FFFF}").as_deref(), Some("b"));
        assert_eq!(prefix_upper_bound("\u{D7FF}").as_deref(), Some("\u{E000}"));
        assert_eq!(prefix_upper_bound(""), None);
    }

    #[test]
    fn test_upper_bound_excludes_neighbours() {
        let upper = prefix_upper_bound("votes/").unwrap();
        assert!("votes/nominee-1.json" < upper.as_str());
        assert!("votes/\u{10FFFF}" < upper.as_str());
        assert!("votesX.json" >= upper.as_str());
    }
}
