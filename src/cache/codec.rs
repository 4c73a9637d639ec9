//! Entry encoding. JSON keeps entries self-describing and readable from
//! `redis-cli`.

use bytes::Bytes;
use serde::{Serialize, de::DeserializeOwned};

use super::error::CacheError;

pub fn encode<T: Serialize>(key: &str, value: &T) -> Result<Bytes, CacheError> {
    serde_json::to_vec(value)
        .map(Bytes::from)
        .map_err(|source| CacheError::Encode {
            key: key.to_string(),
            source,
        })
}

pub fn decode<T: DeserializeOwned>(key: &str, raw: &[u8]) -> Result<T, CacheError> {
    serde_json::from_slice(raw).map_err(|source| CacheError::Decode {
        key: key.to_string(),
        source,
    })
}
