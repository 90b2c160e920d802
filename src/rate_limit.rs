//! Sliding-window rate limiting for room-creation and join-attempt calls.
//!
//! Keyed per caller (`user_id` for room-creation, `user_id` for
//! join-attempts — a distinct instance of this limiter backs each). Also
//! backs the per-remote-IP connection cap paired with the Hub's register
//! channel (§4.1, §9's supplemented admission control).

use dashmap::DashMap;
use std::collections::VecDeque;
use std::hash::Hash;
use std::sync::Mutex;
use std::time::{Duration, Instant};

pub struct SlidingWindowLimiter<K> {
    window: Duration,
    max_events: usize,
    hits: DashMap<K, Mutex<VecDeque<Instant>>>,
}

impl<K> SlidingWindowLimiter<K>
where
    K: Eq + Hash + Clone,
{
    pub fn new(max_events: usize, window: Duration) -> Self {
        Self {
            window,
            max_events,
            hits: DashMap::new(),
        }
    }

    /// Records an attempt for `key` now; returns `true` if it is allowed
    /// under the window, `false` if the caller is over the limit.
    pub fn check(&self, key: &K) -> bool {
        let now = Instant::now();
        let entry = self
            .hits
            .entry(key.clone())
            .or_insert_with(|| Mutex::new(VecDeque::new()));
        let mut events = entry.lock().expect("rate limiter mutex poisoned");
        while let Some(front) = events.front() {
            if now.duration_since(*front) > self.window {
                events.pop_front();
            } else {
                break;
            }
        }
        if events.len() >= self.max_events {
            return false;
        }
        events.push_back(now);
        true
    }

    /// Drops bookkeeping for keys with no events inside the window; call
    /// periodically to bound memory for a long-lived process with a high
    /// churn of distinct callers.
    pub fn sweep(&self) {
        let now = Instant::now();
        self.hits.retain(|_, events| {
            let mut events = events.lock().expect("rate limiter mutex poisoned");
            while let Some(front) = events.front() {
                if now.duration_since(*front) > self.window {
                    events.pop_front();
                } else {
                    break;
                }
            }
            !events.is_empty()
        });
    }
}

/// Bundles the two caller-facing limiters the Coordinator consults plus the
/// per-IP connection cap the Hub consults at admission.
pub struct FabricRateLimits {
    pub room_creation: SlidingWindowLimiter<uuid::Uuid>,
    pub join_attempts: SlidingWindowLimiter<uuid::Uuid>,
    pub connections_per_ip: SlidingWindowLimiter<std::net::IpAddr>,
}

impl FabricRateLimits {
    pub fn new(
        room_creation_per_minute: usize,
        join_attempts_per_minute: usize,
        connections_per_ip_per_minute: usize,
    ) -> Self {
        let minute = Duration::from_secs(60);
        Self {
            room_creation: SlidingWindowLimiter::new(room_creation_per_minute, minute),
            join_attempts: SlidingWindowLimiter::new(join_attempts_per_minute, minute),
            connections_per_ip: SlidingWindowLimiter::new(connections_per_ip_per_minute, minute),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_up_to_limit_then_rejects() {
        let limiter = SlidingWindowLimiter::new(3, Duration::from_secs(60));
        let key = "alice".to_string();
        assert!(limiter.check(&key));
        assert!(limiter.check(&key));
        assert!(limiter.check(&key));
        assert!(!limiter.check(&key));
    }

    #[test]
    fn distinct_keys_do_not_share_budget() {
        let limiter = SlidingWindowLimiter::new(1, Duration::from_secs(60));
        assert!(limiter.check(&"alice".to_string()));
        assert!(limiter.check(&"bob".to_string()));
    }

    #[test]
    fn window_expiry_frees_budget() {
        let limiter = SlidingWindowLimiter::new(1, Duration::from_millis(20));
        let key = "alice".to_string();
        assert!(limiter.check(&key));
        assert!(!limiter.check(&key));
        std::thread::sleep(Duration::from_millis(40));
        assert!(limiter.check(&key));
    }

    #[test]
    fn sweep_drops_idle_keys() {
        let limiter = SlidingWindowLimiter::new(1, Duration::from_millis(10));
        limiter.check(&"alice".to_string());
        std::thread::sleep(Duration::from_millis(30));
        limiter.sweep();
        assert_eq!(limiter.hits.len(), 0);
    }
}
