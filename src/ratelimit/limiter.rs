//! Sliding-window limiter implementation.

use std::{
    collections::{HashMap, HashSet, VecDeque},
    net::IpAddr,
    time::{Duration, Instant},
};

use super::RateLimitError;

/// A single rate-limit rule: at most `max_events + burst` within `window`.
#[derive(Debug, Clone, Copy)]
pub struct RateLimitRule {
    /// Maximum number of events allowed within the window at the steady-state rate.
    pub max_events: u32,
    /// The sliding window duration.
    pub window: Duration,
    /// Extra events above `max_events` allowed to burst through within the
    /// same window before the rule starts denying.
    pub burst: u32,
    /// When set, this rule's scope is never subject to the matching global
    /// bucket (`global-http`/`global-ws`) in addition to its own.
    pub bypass_global: bool,
}

impl RateLimitRule {
    /// Build a new rule with no burst allowance.
    pub fn new(max_events: u32, window: Duration) -> Self {
        Self { max_events, window, burst: 0, bypass_global: false }
    }

    /// Set [`Self::burst`].
    pub fn burst(mut self, burst: u32) -> Self {
        self.burst = burst;
        self
    }

    /// Set [`Self::bypass_global`].
    pub fn bypass_global(mut self, bypass: bool) -> Self {
        self.bypass_global = bypass;
        self
    }
}

/// A sliding-window rate limiter keyed by `(scope, ip)`.
#[derive(Debug, Default)]
pub struct RateLimiter {
    windows: HashMap<(String, IpAddr), VecDeque<Instant>>,
    whitelist: HashSet<IpAddr>,
}

impl RateLimiter {
    /// Create an empty limiter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Exempt `ip` from every rate-limit check.
    pub fn whitelist(&mut self, ip: IpAddr) {
        self.whitelist.insert(ip);
    }

    /// Record one event against `scope`/`ip` at `now`, checked against `rule`.
    ///
    /// Returns `Err` (without recording the event) if `rule` would be exceeded.
    pub fn check(&mut self, scope: &str, ip: IpAddr, rule: &RateLimitRule, now: Instant) -> Result<(), RateLimitError> {
        if self.whitelist.contains(&ip) {
            return Ok(());
        }

        let key = (scope.to_string(), ip);
        let window = self.windows.entry(key).or_default();

        while let Some(&front) = window.front() {
            if now.duration_since(front) > rule.window {
                window.pop_front();
            } else {
                break;
            }
        }

        let allowed = rule.max_events + rule.burst;
        if window.len() as u32 >= allowed {
            let oldest = *window.front().expect("len >= allowed > 0 implies non-empty");
            let retry_after = rule.window.saturating_sub(now.duration_since(oldest));
            return Err(RateLimitError { scope: scope.to_string(), retry_after });
        }

        window.push_back(now);
        Ok(())
    }

    /// Check a global bucket and an optional, more specific bucket together,
    /// the way a route or event with its own [`RateLimitRule`] layers on top
    /// of the server-wide bucket: if the specific rule opts out of the global
    /// bucket (`bypass_global`), only it is checked; otherwise the global
    /// bucket is checked first and the specific one second, and the first to
    /// deny wins.
    pub fn check_layered(
        &mut self,
        ip: IpAddr,
        global_scope: &str,
        global_rule: &RateLimitRule,
        specific_scope: &str,
        specific_rule: Option<&RateLimitRule>,
        now: Instant,
    ) -> Result<(), RateLimitError> {
        if let Some(rule) = specific_rule {
            if rule.bypass_global {
                return self.check(specific_scope, ip, rule, now);
            }
        }

        self.check(global_scope, ip, global_rule, now)?;

        if let Some(rule) = specific_rule {
            self.check(specific_scope, ip, rule, now)?;
        }

        Ok(())
    }

    /// Remove buckets with no timestamps left inside `window` as of `now`,
    /// bounding memory for IPs/scopes that have gone idle.
    pub fn sweep(&mut self, now: Instant, max_age: Duration) {
        self.windows.retain(|_, window| {
            while let Some(&front) = window.front() {
                if now.duration_since(front) > max_age {
                    window.pop_front();
                } else {
                    break;
                }
            }
            !window.is_empty()
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    fn ip() -> IpAddr {
        IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))
    }

    #[test]
    fn allows_events_under_the_limit() {
        let mut limiter = RateLimiter::new();
        let rule = RateLimitRule::new(3, Duration::from_secs(1));
        let now = Instant::now();

        for _ in 0..3 {
            limiter.check("global-ws", ip(), &rule, now).unwrap();
        }
    }

    #[test]
    fn rejects_the_event_over_the_limit() {
        let mut limiter = RateLimiter::new();
        let rule = RateLimitRule::new(2, Duration::from_secs(1));
        let now = Instant::now();

        limiter.check("global-ws", ip(), &rule, now).unwrap();
        limiter.check("global-ws", ip(), &rule, now).unwrap();
        let err = limiter.check("global-ws", ip(), &rule, now).unwrap_err();
        assert_eq!(err.scope, "global-ws");
    }

    #[test]
    fn window_slides_and_frees_up_capacity() {
        let mut limiter = RateLimiter::new();
        let rule = RateLimitRule::new(1, Duration::from_millis(100));
        let t0 = Instant::now();

        limiter.check("event:chat", ip(), &rule, t0).unwrap();
        assert!(limiter.check("event:chat", ip(), &rule, t0).is_err());

        let t1 = t0 + Duration::from_millis(150);
        limiter.check("event:chat", ip(), &rule, t1).unwrap();
    }

    #[test]
    fn whitelisted_ip_always_passes() {
        let mut limiter = RateLimiter::new();
        limiter.whitelist(ip());
        let rule = RateLimitRule::new(1, Duration::from_secs(1));
        let now = Instant::now();

        limiter.check("global-ws", ip(), &rule, now).unwrap();
        limiter.check("global-ws", ip(), &rule, now).unwrap();
    }

    #[test]
    fn layered_check_consults_global_then_specific() {
        let mut limiter = RateLimiter::new();
        let global = RateLimitRule::new(10, Duration::from_secs(1));
        let specific = RateLimitRule::new(1, Duration::from_secs(1));
        let now = Instant::now();

        limiter.check_layered(ip(), "global-ws", &global, "event:chat", Some(&specific), now).unwrap();
        let err = limiter.check_layered(ip(), "global-ws", &global, "event:chat", Some(&specific), now).unwrap_err();
        assert_eq!(err.scope, "event:chat");
    }

    #[test]
    fn burst_extends_the_admitted_count_above_max_events() {
        let mut limiter = RateLimiter::new();
        let rule = RateLimitRule::new(2, Duration::from_secs(1)).burst(1);
        let now = Instant::now();

        limiter.check("global-ws", ip(), &rule, now).unwrap();
        limiter.check("global-ws", ip(), &rule, now).unwrap();
        limiter.check("global-ws", ip(), &rule, now).unwrap();
        assert!(limiter.check("global-ws", ip(), &rule, now).is_err());
    }

    #[test]
    fn bypass_global_skips_the_global_bucket() {
        let mut limiter = RateLimiter::new();
        let global = RateLimitRule::new(0, Duration::from_secs(1));
        let specific = RateLimitRule::new(1, Duration::from_secs(1)).bypass_global(true);
        let now = Instant::now();

        limiter.check_layered(ip(), "global-ws", &global, "event:chat", Some(&specific), now).unwrap();
    }

    #[test]
    fn sweep_drops_buckets_with_no_recent_events() {
        let mut limiter = RateLimiter::new();
        let rule = RateLimitRule::new(5, Duration::from_secs(1));
        let t0 = Instant::now();
        limiter.check("global-ws", ip(), &rule, t0).unwrap();

        limiter.sweep(t0 + Duration::from_secs(2), Duration::from_secs(1));
        assert!(limiter.windows.is_empty());
    }

    #[test]
    fn separate_scopes_have_independent_windows() {
        let mut limiter = RateLimiter::new();
        let rule = RateLimitRule::new(1, Duration::from_secs(1));
        let now = Instant::now();

        limiter.check("global-ws", ip(), &rule, now).unwrap();
        limiter.check("event:chat:message", ip(), &rule, now).unwrap();
    }
}
