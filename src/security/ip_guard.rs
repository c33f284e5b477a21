//! Per-address failure tracking, blocking, and CAPTCHA challenges.
//!
//! Applies only to API paths; admin paths bypass the guard entirely. State
//! lives in the shared counter store under three linked keys per address:
//! a failure counter, a blocked flag, and the active challenge.

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use super::captcha::{CaptchaChallenge, arithmetic_challenge};
use super::counter::{CounterStore, CounterStoreError};

/// IP guard configuration: path gating, CORS allow-list, and thresholds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IpGuardConfig {
    /// Prefix of guarded request paths.
    pub api_prefix: String,
    /// Prefix of paths that bypass the guard entirely.
    pub admin_prefix: String,
    /// Origins allowed to make cross-origin requests.
    pub allowed_origins: Vec<String>,
    /// Lifetime of the failure counter.
    pub failure_window: Duration,
    /// Lifetime of a block and its challenge.
    pub block_duration: Duration,
    /// Failures within the window that trigger a block.
    pub max_failures: u64,
}

impl Default for IpGuardConfig {
    /// Production defaults: 5 failures in 10 minutes block for 1 hour.
    fn default() -> Self {
        Self {
            api_prefix: "/api/".to_owned(),
            admin_prefix: "/admin/".to_owned(),
            allowed_origins: Vec::new(),
            failure_window: Duration::from_secs(10 * 60),
            block_duration: Duration::from_secs(60 * 60),
            max_failures: 5,
        }
    }
}

/// Rejections produced by the IP guard. All map to HTTP 403.
#[derive(Debug, Clone, Error)]
pub enum IpGuardError {
    /// The `Origin` header is not on the allow-list.
    #[error("origin '{origin}' is not allowed")]
    OriginDenied {
        /// Offending origin.
        origin: String,
    },

    /// The address is blocked pending a correct CAPTCHA answer.
    #[error("address {addr} is blocked pending CAPTCHA")]
    Blocked {
        /// Blocked source address.
        addr: IpAddr,
        /// Stored challenge question, when one survives.
        challenge: Option<String>,
    },

    /// Counter store failure; treated as transient.
    #[error(transparent)]
    Store(#[from] CounterStoreError),
}

impl IpGuardError {
    /// HTTP status this rejection maps to at the boundary.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::OriginDenied { .. } | Self::Blocked { .. } => 403,
            Self::Store(_) => 500,
        }
    }

    /// Response body detail for the boundary layer.
    #[must_use]
    pub fn detail(&self) -> String {
        match self {
            Self::OriginDenied { .. } => "CORS origin not allowed".to_owned(),
            Self::Blocked { .. } => "IP blocked. Solve CAPTCHA.".to_owned(),
            Self::Store(_) => "Service temporarily unavailable.".to_owned(),
        }
    }
}

/// Abusive-traffic mitigation over the shared counter store.
#[derive(Debug, Clone)]
pub struct IpGuard<S: CounterStore> {
    store: Arc<S>,
    config: IpGuardConfig,
}

impl<S: CounterStore> IpGuard<S> {
    /// Creates a guard with default thresholds and an empty origin
    /// allow-list.
    #[must_use]
    pub fn new(store: Arc<S>) -> Self {
        Self::with_config(store, IpGuardConfig::default())
    }

    /// Creates a guard with custom configuration.
    #[must_use]
    pub const fn with_config(store: Arc<S>, config: IpGuardConfig) -> Self {
        Self { store, config }
    }

    /// Returns whether the guard applies to a request path.
    ///
    /// Admin paths are exempt even when nested under the API prefix.
    #[must_use]
    pub fn applies_to(&self, path: &str) -> bool {
        !path.starts_with(&self.config.admin_prefix) && path.starts_with(&self.config.api_prefix)
    }

    /// Rejects cross-origin requests from origins outside the allow-list.
    ///
    /// Requests without an `Origin` header are same-origin or non-browser
    /// traffic and pass through.
    ///
    /// # Errors
    ///
    /// Returns [`IpGuardError::OriginDenied`] for a disallowed origin.
    pub fn check_origin(&self, origin: Option<&str>) -> Result<(), IpGuardError> {
        match origin {
            Some(origin) if !self.config.allowed_origins.iter().any(|o| o == origin) => {
                Err(IpGuardError::OriginDenied {
                    origin: origin.to_owned(),
                })
            }
            _ => Ok(()),
        }
    }

    /// Admits or rejects a request from `addr` before it executes.
    ///
    /// A blocked address must present the stored challenge answer; a correct
    /// answer clears the block, the failure counter, and the challenge in
    /// one atomic store operation, so the next failure counts from zero.
    ///
    /// # Errors
    ///
    /// Returns [`IpGuardError::Blocked`] with the challenge question when
    /// the answer is absent or wrong.
    pub async fn admit(
        &self,
        addr: IpAddr,
        captcha_answer: Option<&str>,
    ) -> Result<(), IpGuardError> {
        if self.store.fetch(&block_key(addr)).await?.is_none() {
            return Ok(());
        }

        if let Some(answer) = captcha_answer {
            let cleared = self
                .store
                .compare_and_clear(
                    &answer_key(addr),
                    answer,
                    &[&block_key(addr), &fail_key(addr), &question_key(addr)],
                )
                .await?;
            if cleared {
                debug!(%addr, "captcha solved, block cleared");
                return Ok(());
            }
        }

        let challenge = self.store.fetch(&question_key(addr)).await?;
        Err(IpGuardError::Blocked { addr, challenge })
    }

    /// Observes a downstream response and tracks authentication failures.
    ///
    /// Responses with status 400 or 401 increment the failure counter;
    /// reaching the threshold issues a fresh challenge and blocks the
    /// address for the configured duration.
    ///
    /// # Errors
    ///
    /// Returns [`IpGuardError::Store`] on backend failure.
    pub async fn observe_response(&self, addr: IpAddr, status: u16) -> Result<(), IpGuardError> {
        if status != 400 && status != 401 {
            return Ok(());
        }
        let failures = self
            .store
            .increment(&fail_key(addr), self.config.failure_window)
            .await?;
        if failures >= self.config.max_failures {
            self.block(addr).await?;
        }
        Ok(())
    }

    async fn block(&self, addr: IpAddr) -> Result<(), IpGuardError> {
        let CaptchaChallenge { question, answer } = arithmetic_challenge();
        let ttl = self.config.block_duration;
        self.store.put(&answer_key(addr), &answer, ttl).await?;
        self.store.put(&question_key(addr), &question, ttl).await?;
        self.store.put(&block_key(addr), "1", ttl).await?;
        warn!(%addr, "address blocked after repeated auth failures");
        Ok(())
    }
}

fn fail_key(addr: IpAddr) -> String {
    format!("fail:{addr}")
}

fn block_key(addr: IpAddr) -> String {
    format!("ip-blocked:{addr}")
}

fn answer_key(addr: IpAddr) -> String {
    format!("captcha:{addr}")
}

fn question_key(addr: IpAddr) -> String {
    format!("captcha-question:{addr}")
}
