use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use tracing::warn;

#[derive(Debug)]
struct Window {
    opened: Instant,
    attempts: u32,
}

/// Fixed-window attempt counter per client key.
#[derive(Debug)]
pub struct RateLimiter {
    windows: Mutex<HashMap<String, Window>>,
    max_attempts: u32,
    window: Duration,
}

impl RateLimiter {
    pub fn new(max_attempts: u32, window: Duration) -> Self {
        Self {
            windows: Mutex::new(HashMap::new()),
            max_attempts,
            window,
        }
    }

    /// Counts an attempt for `key`. When the key is over its limit, returns
    /// how long until its window reopens.
    pub fn check(&self, key: &str) -> Result<(), Duration> {
        self.check_at(key, Instant::now())
    }

    fn check_at(&self, key: &str, now: Instant) -> Result<(), Duration> {
        if self.max_attempts == 0 {
            return Ok(());
        }

        let mut windows = self.windows.lock().unwrap_or_else(PoisonError::into_inner);
        windows.retain(|_, w| now.duration_since(w.opened) <= self.window * 2);

        let window = windows.entry(key.to_string()).or_insert(Window { opened: now, attempts: 0 });
        if now.duration_since(window.opened) > self.window {
            *window = Window { opened: now, attempts: 0 };
        }

        if window.attempts >= self.max_attempts {
            let wait = (window.opened + self.window).saturating_duration_since(now);
            warn!("Rate limit triggered for {}, retry in {:?}", key, wait);
            return Err(wait);
        }
        window.attempts += 1;
        Ok(())
    }
}
