//! Per-key sliding-window admission control.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, trace};

/// Keys above this count trigger a sweep of idle entries. Provider-key
/// cardinality is small, so this is a safety bound, not a working limit.
const KEY_TABLE_SOFT_CAP: usize = 1024;

/// Sliding-window admission control, one window per key.
///
/// `admit` suspends until the call fits the budget of at most `max_calls`
/// admissions per trailing `window`. Admission per key is serialized by a
/// per-key async mutex held across the wait, so concurrent callers line up
/// rather than racing the budget.
///
/// # Examples
///
/// ```
/// use remora_rate_limit::RateGate;
/// use std::time::Duration;
///
/// # async fn demo() {
/// let gate = RateGate::new(Duration::from_secs(60), 30);
/// gate.admit("real_debrid").await;
/// // call the provider
/// # }
/// ```
#[derive(Debug)]
pub struct RateGate {
    window: Duration,
    max_calls: usize,
    keys: StdMutex<HashMap<String, Arc<Mutex<VecDeque<Instant>>>>>,
}

impl RateGate {
    /// Create a gate admitting at most `max_calls` per trailing `window`.
    ///
    /// A `max_calls` of zero is clamped to one; a zero budget would never
    /// admit anything.
    pub fn new(window: Duration, max_calls: usize) -> Self {
        Self {
            window,
            max_calls: max_calls.max(1),
            keys: StdMutex::new(HashMap::new()),
        }
    }

    /// Suspend until a call for `key` fits the window, then record it.
    pub async fn admit(&self, key: &str) {
        let slot = self.slot(key);
        // Held across the wait: admission per key is serialized.
        let mut calls = slot.lock().await;

        let now = Instant::now();
        Self::prune(&mut calls, now, self.window);

        if calls.len() >= self.max_calls
            && let Some(&oldest) = calls.front()
        {
            let reopens_at = oldest + self.window;
            debug!(
                key,
                wait_ms = reopens_at.saturating_duration_since(now).as_millis() as u64,
                in_window = calls.len(),
                "Rate window full, waiting"
            );
            tokio::time::sleep_until(reopens_at).await;
            Self::prune(&mut calls, Instant::now(), self.window);
        }

        calls.push_back(Instant::now());
        trace!(key, in_window = calls.len(), "Admitted call");
    }

    /// Number of admissions currently inside the window for `key`.
    pub async fn in_window(&self, key: &str) -> usize {
        let slot = self.slot(key);
        let mut calls = slot.lock().await;
        Self::prune(&mut calls, Instant::now(), self.window);
        calls.len()
    }

    fn slot(&self, key: &str) -> Arc<Mutex<VecDeque<Instant>>> {
        let mut keys = self.keys.lock().unwrap_or_else(|e| e.into_inner());
        if keys.len() > KEY_TABLE_SOFT_CAP {
            let window = self.window;
            let now = Instant::now();
            keys.retain(|_, slot| {
                Arc::strong_count(slot) > 1
                    || slot
                        .try_lock()
                        .map(|mut calls| {
                            Self::prune(&mut calls, now, window);
                            !calls.is_empty()
                        })
                        .unwrap_or(true)
            });
        }
        keys.entry(key.to_string()).or_default().clone()
    }

    fn prune(calls: &mut VecDeque<Instant>, now: Instant, window: Duration) {
        while let Some(&front) = calls.front() {
            if now.saturating_duration_since(front) >= window {
                calls.pop_front();
            } else {
                break;
            }
        }
    }
}
