//! Sliding-window rate limiting: a `maxMessages=5, timeWindow=1s` scenario,
//! driven with synthetic `Instant`s rather than real sleeps so the test is
//! deterministic and fast.

use std::{
    net::{IpAddr, Ipv4Addr},
    time::{Duration, Instant},
};

use sockeon::ratelimit::{RateLimitRule, RateLimiter};

fn ip() -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1))
}

#[test]
fn five_messages_pass_the_sixth_is_denied_and_the_window_resets_after_silence() {
    let mut limiter = RateLimiter::new();
    let rule = RateLimitRule::new(5, Duration::from_secs(1));
    let t0 = Instant::now();

    for i in 0..5u64 {
        let at = t0 + Duration::from_millis(i * 150);
        assert!(limiter.check("chat", ip(), &rule, at).is_ok(), "message {i} should have been allowed");
    }

    let sixth = limiter.check("chat", ip(), &rule, t0 + Duration::from_millis(750));
    assert!(sixth.is_err(), "the 6th message within the window should be denied");

    // 1.1s of silence measured from the last accepted event (t0 + 600ms).
    let seventh = limiter.check("chat", ip(), &rule, t0 + Duration::from_millis(600 + 1100));
    assert!(seventh.is_ok(), "the window should have fully reset after 1.1s of silence");
}

#[test]
fn whitelisted_ips_never_get_denied() {
    let mut limiter = RateLimiter::new();
    limiter.whitelist(ip());
    let rule = RateLimitRule::new(1, Duration::from_secs(60));
    let now = Instant::now();

    for _ in 0..10 {
        assert!(limiter.check("chat", ip(), &rule, now).is_ok());
    }
}

#[test]
fn burst_allowance_admits_extra_events_above_the_steady_state_rate() {
    let mut limiter = RateLimiter::new();
    let rule = RateLimitRule::new(5, Duration::from_secs(1)).burst(2);
    let now = Instant::now();

    for i in 0..7u64 {
        assert!(limiter.check("chat", ip(), &rule, now).is_ok(), "event {i} should fit within max_events + burst");
    }
    assert!(limiter.check("chat", ip(), &rule, now).is_err(), "the 8th event exceeds max_events + burst");
}

#[test]
fn a_rule_that_bypasses_the_global_bucket_is_not_constrained_by_it() {
    let mut limiter = RateLimiter::new();
    let global = RateLimitRule::new(1, Duration::from_secs(60));
    let specific = RateLimitRule::new(10, Duration::from_secs(60)).bypass_global(true);
    let now = Instant::now();

    // Exhaust the global bucket on a different scope first.
    assert!(limiter.check("global-ws", ip(), &global, now).is_ok());
    assert!(limiter.check("global-ws", ip(), &global, now).is_err());

    // The bypassing rule ignores that exhausted global bucket entirely.
    for _ in 0..5 {
        assert!(limiter.check_layered(ip(), "global-ws", &global, "event:ping", Some(&specific), now).is_ok());
    }
}
