// src/cache/error.rs
use thiserror::Error;

/// Failures inside the cache. None of them reach the caller of `lookup`.
#[derive(Error, Debug)]
pub enum CacheError {
    /// The backing store could not be reached or returned an error.
    #[error("Scan store unavailable: {0}")]
    StoreUnavailable(String),

    /// A stored scan cannot be fingerprinted.
    #[error("Malformed scan record {id}: {reason}")]
    MalformedRecord { id: i64, reason: String },
}

impl CacheError {
    pub fn store(err: anyhow::Error) -> Self {
        CacheError::StoreUnavailable(format!("{:#}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CacheError::store(anyhow::anyhow!("connection refused"));
        assert_eq!(err.to_string(), "Scan store unavailable: connection refused");

        let err = CacheError::MalformedRecord {
            id: 7,
            reason: "empty description".to_string(),
        };
        assert_eq!(err.to_string(), "Malformed scan record 7: empty description");
    }
}
