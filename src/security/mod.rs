//! Abusive-traffic mitigation: rate limiting and IP blocking.
//!
//! Both subsystems share one ephemeral [`CounterStore`], an external
//! key-value store with atomic increment-with-expiry. An in-memory adapter
//! backs tests and single-node deployments.

pub mod captcha;
pub mod counter;
pub mod ip_guard;
pub mod memory;
pub mod rate_limit;

pub use captcha::{CaptchaChallenge, arithmetic_challenge};
pub use counter::{CounterStore, CounterStoreError, CounterStoreResult};
pub use ip_guard::{IpGuard, IpGuardConfig, IpGuardError};
pub use memory::InMemoryCounterStore;
pub use rate_limit::{RateLimitConfig, RateLimitError, RateLimitUsage, RateLimiter, RoleLimits};
