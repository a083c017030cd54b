use std::future::Future;
use std::time::Duration;

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use crate::store::StoreError;

/// Runs one store call under `limit`. Expiry is reported as a storage error.
pub async fn bounded<T, F>(limit: Duration, call: F) -> Result<T, StoreError>
where
    F: Future<Output = Result<T, StoreError>>,
{
    tokio::time::timeout(limit, call)
        .await
        .map_err(|_| StoreError::Timeout(limit))?
}

pub fn encode_record<T: Serialize>(key: &str, record: &T) -> Result<Value, StoreError> {
    serde_json::to_value(record).map_err(|e| StoreError::Codec {
        key: key.to_string(),
        reason: e.to_string(),
    })
}

pub fn decode_record<T: DeserializeOwned>(key: &str, value: Value) -> Result<T, StoreError> {
    serde_json::from_value(value).map_err(|e| StoreError::Codec {
        key: key.to_string(),
        reason: e.to_string(),
    })
}

/// Compares two secrets without short-circuiting on the first differing byte.
pub fn tokens_match(given: &str, expected: &str) -> bool {
    let (given, expected) = (given.as_bytes(), expected.as_bytes());
    if given.len() != expected.len() {
        return false;
    }
    given.iter().zip(expected).fold(0u8, |acc, (a, b)| acc | (a ^ b)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokens_match() {
        assert!(tokens_match("letmein", "letmein"));
        assert!(!tokens_match("letmeout", "letmein"));
        assert!(!tokens_match("letmei", "letmein"));
        assert!(!tokens_match("", "letmein"));
    }
}
