//! Counter store port: the shared ephemeral key-value store.
//!
//! Both the rate limiter and the IP threat mitigator keep their transient
//! state here. The contract demands atomic read-modify-write so concurrent
//! requests never undercount; slight overcounting under extreme races is
//! acceptable, undercounting that defeats a limit is not.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Result type for counter store operations.
pub type CounterStoreResult<T> = Result<T, CounterStoreError>;

/// Fast key-value store with per-key expiry.
///
/// Keys hold either a counter or a small text value; every entry self-expires
/// after its TTL. Implementations must make [`CounterStore::increment`] and
/// [`CounterStore::compare_and_clear`] atomic.
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Atomically increments a counter, creating it with `ttl` when absent
    /// or expired. Returns the new count.
    ///
    /// The TTL is only applied on creation; later increments keep the
    /// original expiry, so a counter lives exactly one window.
    async fn increment(&self, key: &str, ttl: Duration) -> CounterStoreResult<u64>;

    /// Returns the current count, or zero when absent or expired.
    async fn count(&self, key: &str) -> CounterStoreResult<u64>;

    /// Returns the remaining lifetime of a key, or `None` when absent.
    async fn time_to_live(&self, key: &str) -> CounterStoreResult<Option<Duration>>;

    /// Stores a text value with an expiry, replacing any previous value.
    async fn put(&self, key: &str, value: &str, ttl: Duration) -> CounterStoreResult<()>;

    /// Returns the text value at `key`, or `None` when absent or expired.
    async fn fetch(&self, key: &str) -> CounterStoreResult<Option<String>>;

    /// Removes a key. Removing an absent key is not an error.
    async fn delete(&self, key: &str) -> CounterStoreResult<()>;

    /// Atomically compares the value at `key` with `expected` and, on a
    /// match, deletes `key` together with every key in `clear`.
    ///
    /// Returns whether the comparison matched. Used to clear an IP block,
    /// its failure counter, and its challenge in one step so a stale partial
    /// clear can never survive.
    async fn compare_and_clear(
        &self,
        key: &str,
        expected: &str,
        clear: &[&str],
    ) -> CounterStoreResult<bool>;
}

/// Errors returned by counter store implementations.
#[derive(Debug, Clone, Error)]
pub enum CounterStoreError {
    /// The key holds a value of the wrong kind for the operation.
    #[error("key '{0}' holds a non-counter value")]
    NotACounter(String),

    /// Backend failure, including timeouts; treated as transient.
    #[error("counter store error: {0}")]
    Backend(Arc<dyn std::error::Error + Send + Sync>),
}

impl CounterStoreError {
    /// Wraps a backend error.
    pub fn backend(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Backend(Arc::new(err))
    }
}
