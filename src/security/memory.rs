//! In-memory counter store with clock-driven expiry.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockable::Clock;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::counter::{CounterStore, CounterStoreError, CounterStoreResult};

#[derive(Debug, Clone, PartialEq, Eq)]
enum StoredValue {
    Count(u64),
    Text(String),
}

#[derive(Debug, Clone)]
struct Entry {
    value: StoredValue,
    expires_at: DateTime<Utc>,
}

/// Thread-safe in-memory counter store.
///
/// A single mutex makes every operation atomic, which is exactly the
/// semantics the port demands from a networked store's atomic primitives.
/// Expiry is lazy: entries past their deadline are treated as absent and
/// dropped on the next touch. The clock is injected so tests can step time.
#[derive(Debug, Clone)]
pub struct InMemoryCounterStore<C: Clock + Send + Sync> {
    entries: Arc<Mutex<HashMap<String, Entry>>>,
    clock: Arc<C>,
}

impl<C: Clock + Send + Sync> InMemoryCounterStore<C> {
    /// Creates an empty store reading time from `clock`.
    #[must_use]
    pub fn new(clock: Arc<C>) -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            clock,
        }
    }

    fn lock(&self) -> CounterStoreResult<std::sync::MutexGuard<'_, HashMap<String, Entry>>> {
        self.entries
            .lock()
            .map_err(|err| CounterStoreError::backend(std::io::Error::other(err.to_string())))
    }
}

fn expiry(now: DateTime<Utc>, ttl: Duration) -> DateTime<Utc> {
    now + chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::hours(1))
}

/// Returns the live entry at `key`, dropping it when expired.
fn live_entry<'a>(
    entries: &'a mut HashMap<String, Entry>,
    key: &str,
    now: DateTime<Utc>,
) -> Option<&'a mut Entry> {
    if let Some(entry) = entries.get(key)
        && entry.expires_at <= now
    {
        entries.remove(key);
        return None;
    }
    entries.get_mut(key)
}

#[async_trait]
impl<C: Clock + Send + Sync> CounterStore for InMemoryCounterStore<C> {
    async fn increment(&self, key: &str, ttl: Duration) -> CounterStoreResult<u64> {
        let now = self.clock.utc();
        let mut entries = self.lock()?;
        match live_entry(&mut entries, key, now) {
            Some(entry) => match &mut entry.value {
                StoredValue::Count(count) => {
                    *count += 1;
                    Ok(*count)
                }
                StoredValue::Text(_) => Err(CounterStoreError::NotACounter(key.to_owned())),
            },
            None => {
                entries.insert(
                    key.to_owned(),
                    Entry {
                        value: StoredValue::Count(1),
                        expires_at: expiry(now, ttl),
                    },
                );
                Ok(1)
            }
        }
    }

    async fn count(&self, key: &str) -> CounterStoreResult<u64> {
        let now = self.clock.utc();
        let mut entries = self.lock()?;
        match live_entry(&mut entries, key, now) {
            Some(entry) => match &entry.value {
                StoredValue::Count(count) => Ok(*count),
                StoredValue::Text(_) => Err(CounterStoreError::NotACounter(key.to_owned())),
            },
            None => Ok(0),
        }
    }

    async fn time_to_live(&self, key: &str) -> CounterStoreResult<Option<Duration>> {
        let now = self.clock.utc();
        let mut entries = self.lock()?;
        Ok(live_entry(&mut entries, key, now)
            .and_then(|entry| (entry.expires_at - now).to_std().ok()))
    }

    async fn put(&self, key: &str, value: &str, ttl: Duration) -> CounterStoreResult<()> {
        let now = self.clock.utc();
        let mut entries = self.lock()?;
        entries.insert(
            key.to_owned(),
            Entry {
                value: StoredValue::Text(value.to_owned()),
                expires_at: expiry(now, ttl),
            },
        );
        Ok(())
    }

    async fn fetch(&self, key: &str) -> CounterStoreResult<Option<String>> {
        let now = self.clock.utc();
        let mut entries = self.lock()?;
        Ok(
            live_entry(&mut entries, key, now).and_then(|entry| match &entry.value {
                StoredValue::Text(text) => Some(text.clone()),
                StoredValue::Count(count) => Some(count.to_string()),
            }),
        )
    }

    async fn delete(&self, key: &str) -> CounterStoreResult<()> {
        let mut entries = self.lock()?;
        entries.remove(key);
        Ok(())
    }

    async fn compare_and_clear(
        &self,
        key: &str,
        expected: &str,
        clear: &[&str],
    ) -> CounterStoreResult<bool> {
        let now = self.clock.utc();
        let mut entries = self.lock()?;
        let matched = match live_entry(&mut entries, key, now) {
            Some(entry) => match &entry.value {
                StoredValue::Text(text) => text == expected,
                StoredValue::Count(count) => count.to_string() == expected,
            },
            None => false,
        };
        if matched {
            entries.remove(key);
            for extra in clear {
                entries.remove(*extra);
            }
        }
        Ok(matched)
    }
}
