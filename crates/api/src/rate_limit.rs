use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Sliding-window request counter keyed by client address.
///
/// A `max_requests` of 0 disables limiting. Keys with no hit inside the
/// window are swept at most once per window.
#[derive(Debug, Clone)]
pub struct IpRateLimiter {
    inner: Arc<Mutex<LimiterState>>,
    window: Duration,
    max_requests: usize,
}

#[derive(Debug)]
struct LimiterState {
    hits: HashMap<String, VecDeque<Instant>>,
    last_sweep: Instant,
}

impl IpRateLimiter {
    pub fn new(window: Duration, max_requests: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(LimiterState {
                hits: HashMap::new(),
                last_sweep: Instant::now(),
            })),
            window,
            max_requests,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.max_requests > 0
    }

    pub fn tracked_keys(&self) -> usize {
        self.inner.lock().hits.len()
    }

    pub fn allow(&self, key: &str) -> bool {
        if !self.is_enabled() {
            return true;
        }

        let now = Instant::now();
        let window = self.window;
        let mut guard = self.inner.lock();

        if now.duration_since(guard.last_sweep) > window {
            guard.hits.retain(|_, queue| {
                queue
                    .back()
                    .is_some_and(|last| now.duration_since(*last) <= window)
            });
            guard.last_sweep = now;
        }

        let queue = guard.hits.entry(key.to_string()).or_default();

        while let Some(front) = queue.front() {
            if now.duration_since(*front) > window {
                queue.pop_front();
            } else {
                break;
            }
        }

        if queue.len() >= self.max_requests {
            return false;
        }

        queue.push_back(now);
        true
    }
}
