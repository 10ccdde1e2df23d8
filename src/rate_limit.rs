//! Per-subscriber rate limiting for the on-demand status command
//!
//! Each subscriber runs through a small state machine:
//!
//! ```text
//! Normal { requests }
//!   --(record, requests > max)--> Banned { windows = ban_windows }
//! Banned { windows }
//!   --(tick, windows <= 1)--> cleared
//! ```
//!
//! `tick` is driven by an independent window timer (default one minute),
//! completely decoupled from poll cycles: it resets every request counter
//! and decrements every active ban. Requests from a banned subscriber are
//! rejected without touching the counter.

use std::collections::HashMap;

use tracing::debug;

use crate::config::RateLimitConfig;

/// Outcome of recording one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allowed,
    /// Rejected; the ban lasts this many more windows.
    Banned { windows_remaining: u32 },
}

#[derive(Debug, Clone, Copy)]
enum SubscriberState {
    Normal { requests: u32 },
    Banned { windows: u32 },
}

/// Request counting and temporary banning, keyed by subscriber id.
#[derive(Debug)]
pub struct RateLimiter {
    config: RateLimitConfig,
    states: HashMap<String, SubscriberState>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            states: HashMap::new(),
        }
    }

    /// Records one request for `id` and decides whether to serve it.
    ///
    /// A disabled limiter allows everything and keeps no state.
    pub fn record(&mut self, id: &str) -> Decision {
        if !self.config.enabled {
            return Decision::Allowed;
        }

        let state = self
            .states
            .entry(id.to_string())
            .or_insert(SubscriberState::Normal { requests: 0 });

        match state {
            SubscriberState::Banned { windows } => Decision::Banned {
                windows_remaining: *windows,
            },
            SubscriberState::Normal { requests } => {
                *requests += 1;
                if *requests > self.config.max_messages_per_window {
                    let windows = self.config.ban_windows;
                    debug!("banning {id} for {windows} windows");
                    *state = SubscriberState::Banned { windows };
                    Decision::Banned {
                        windows_remaining: windows,
                    }
                } else {
                    Decision::Allowed
                }
            }
        }
    }

    /// Advances the window: resets all request counters and decrements
    /// active bans, clearing those that reach zero.
    pub fn tick(&mut self) {
        self.states.retain(|id, state| match state {
            SubscriberState::Normal { .. } => false,
            SubscriberState::Banned { windows } => {
                // A ban of zero windows ends at the next reset.
                if *windows <= 1 {
                    debug!("ban for {id} expired");
                    false
                } else {
                    *windows -= 1;
                    true
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn limiter(max: u32, ban_windows: u32) -> RateLimiter {
        RateLimiter::new(RateLimitConfig {
            enabled: true,
            max_messages_per_window: max,
            ban_windows,
        })
    }

    #[test]
    fn requests_within_the_limit_are_allowed() {
        let mut limiter = limiter(3, 5);

        for _ in 0..3 {
            assert_eq!(limiter.record("u1"), Decision::Allowed);
        }
    }

    #[test]
    fn exceeding_the_limit_bans_for_the_configured_windows() {
        let mut limiter = limiter(3, 5);

        for _ in 0..3 {
            limiter.record("u1");
        }

        assert_eq!(
            limiter.record("u1"),
            Decision::Banned {
                windows_remaining: 5
            }
        );
    }

    #[test]
    fn banned_requests_are_rejected_without_counting() {
        let mut limiter = limiter(1, 3);
        limiter.record("u1");
        limiter.record("u1"); // over the limit, banned for 3 windows

        // Hammering while banned never extends the ban.
        for _ in 0..10 {
            assert_matches!(
                limiter.record("u1"),
                Decision::Banned {
                    windows_remaining: 3
                }
            );
        }
    }

    #[test]
    fn ban_decrements_per_tick_and_clears_at_zero() {
        let mut limiter = limiter(3, 2);

        for _ in 0..4 {
            limiter.record("u1");
        }

        limiter.tick();
        assert_eq!(
            limiter.record("u1"),
            Decision::Banned {
                windows_remaining: 1
            }
        );

        limiter.tick();
        assert_eq!(limiter.record("u1"), Decision::Allowed);
    }

    #[test]
    fn zero_window_ban_clears_at_the_next_tick() {
        let mut limiter = limiter(1, 0);

        limiter.record("u1");
        assert_eq!(
            limiter.record("u1"),
            Decision::Banned {
                windows_remaining: 0
            }
        );

        limiter.tick();
        assert_eq!(limiter.record("u1"), Decision::Allowed);

        // Further ticks on a clean slate stay a no-op.
        limiter.tick();
        limiter.tick();
        assert_eq!(limiter.record("u2"), Decision::Allowed);
    }

    #[test]
    fn tick_resets_request_counters() {
        let mut limiter = limiter(3, 5);

        for _ in 0..3 {
            limiter.record("u1");
        }
        limiter.tick();

        // A fresh window: three more requests fit before the ban.
        for _ in 0..3 {
            assert_eq!(limiter.record("u1"), Decision::Allowed);
        }
        assert_matches!(limiter.record("u1"), Decision::Banned { .. });
    }

    #[test]
    fn subscribers_are_limited_independently() {
        let mut limiter = limiter(1, 5);

        limiter.record("u1");
        limiter.record("u1"); // u1 banned

        assert_matches!(limiter.record("u1"), Decision::Banned { .. });
        assert_eq!(limiter.record("u2"), Decision::Allowed);
    }

    #[test]
    fn disabled_limiter_always_allows() {
        let mut limiter = RateLimiter::new(RateLimitConfig::default());

        for _ in 0..100 {
            assert_eq!(limiter.record("u1"), Decision::Allowed);
        }
    }
}
