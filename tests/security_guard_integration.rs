//! Request-gate flows combining the rate limiter and the IP guard.
//!
//! Simulates what the HTTP middleware chain does per request: origin and
//! path checks, IP admission, rate-limit check, downstream execution, then
//! success recording or failure observation.

#![expect(
    clippy::indexing_slicing,
    reason = "Test code uses indexing after length checks"
)]

use std::net::IpAddr;
use std::sync::Arc;

use chrono::{DateTime, Local, TimeZone, Utc};
use mockable::Clock;
use taskrail::access::ActionClass;
use taskrail::principal::{Principal, PrincipalId, Role};
use taskrail::security::{
    InMemoryCounterStore, IpGuard, IpGuardConfig, IpGuardError, RateLimitConfig, RateLimitError,
    RateLimiter, RoleLimits,
};

/// Clock pinned to a single instant.
#[derive(Debug, Clone, Copy)]
struct FixedClock(DateTime<Utc>);

impl Clock for FixedClock {
    fn local(&self) -> DateTime<Local> {
        self.0.with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        self.0
    }
}

fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 4, 1, 10, 0, 0)
        .single()
        .expect("valid time")
}

fn addr() -> IpAddr {
    "198.51.100.23".parse().expect("valid address")
}

fn solve(question: &str) -> String {
    let parts: Vec<u64> = question
        .split(|c: char| !c.is_ascii_digit())
        .filter(|s| !s.is_empty())
        .filter_map(|s| s.parse().ok())
        .collect();
    (parts[0] + parts[1]).to_string()
}

#[tokio::test(flavor = "multi_thread")]
async fn repeated_auth_failures_end_in_a_solvable_block() -> eyre::Result<()> {
    let store = Arc::new(InMemoryCounterStore::new(Arc::new(FixedClock(fixed_now()))));
    let guard = IpGuard::with_config(
        Arc::clone(&store),
        IpGuardConfig {
            allowed_origins: vec!["https://tasks.example.com".to_owned()],
            ..IpGuardConfig::default()
        },
    );
    let client = addr();

    assert!(guard.applies_to("/api/tasks/"));
    assert!(!guard.applies_to("/admin/login/"));
    guard.check_origin(Some("https://tasks.example.com"))?;

    // Five bad logins: admitted each time, observed each time.
    for _ in 0..5 {
        guard.admit(client, None).await?;
        guard.observe_response(client, 401).await?;
    }

    let rejected = guard.admit(client, None).await;
    let Err(IpGuardError::Blocked {
        challenge: Some(question),
        ..
    }) = rejected
    else {
        panic!("expected a block with a challenge, got {rejected:?}");
    };

    // Solving the challenge restores access and resets failure tracking.
    guard.admit(client, Some(&solve(&question))).await?;
    guard.admit(client, None).await?;
    guard.observe_response(client, 401).await?;
    guard.admit(client, None).await?;
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn write_budget_gates_only_successful_requests() -> eyre::Result<()> {
    let clock = Arc::new(FixedClock(fixed_now()));
    let store = Arc::new(InMemoryCounterStore::new(Arc::clone(&clock)));
    let limiter = RateLimiter::with_config(
        store,
        clock,
        RateLimitConfig {
            developer: RoleLimits {
                read: Some(100),
                write: Some(3),
            },
            ..RateLimitConfig::default()
        },
    );
    let dev = Principal::new(PrincipalId::new(), Role::Developer, "Europe/London");

    // Two successes and one failure: only the successes count.
    limiter.check(&dev, ActionClass::Write).await?;
    limiter.record_success(&dev, ActionClass::Write).await?;
    limiter.check(&dev, ActionClass::Write).await?;
    limiter.record_success(&dev, ActionClass::Write).await?;
    limiter.check(&dev, ActionClass::Write).await?;
    // Downstream returned 400: nothing recorded.

    let usage = limiter.usage(&dev).await?;
    assert_eq!(usage.write_count, 2);

    // Third success exhausts the budget; the fourth check is rejected.
    limiter.check(&dev, ActionClass::Write).await?;
    limiter.record_success(&dev, ActionClass::Write).await?;
    let rejected = limiter.check(&dev, ActionClass::Write).await;
    let Err(err @ RateLimitError::Exceeded { .. }) = rejected else {
        panic!("expected rejection, got {rejected:?}");
    };
    assert_eq!(err.status_code(), 429);

    // Reads remain unaffected.
    limiter.check(&dev, ActionClass::Read).await?;
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn auditors_read_freely_but_never_write() -> eyre::Result<()> {
    let clock = Arc::new(FixedClock(fixed_now()));
    let store = Arc::new(InMemoryCounterStore::new(Arc::clone(&clock)));
    let limiter = RateLimiter::new(store, clock);
    let auditor = Principal::new(PrincipalId::new(), Role::Auditor, "Europe/London");

    for _ in 0..300 {
        limiter.check(&auditor, ActionClass::Read).await?;
        limiter.record_success(&auditor, ActionClass::Read).await?;
    }

    let rejected = limiter.check(&auditor, ActionClass::Write).await;
    let Err(err) = rejected else {
        panic!("expected auditor write rejection");
    };
    assert!(matches!(err, RateLimitError::WriteForbidden));
    assert_eq!(err.detail(), "Auditors are not allowed to modify data.");
    Ok(())
}
